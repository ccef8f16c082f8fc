//! Composite codecs built from an element serde
//!
//! Collections are encoded as a length-prefixed sequence of element encodings:
//!
//! ```text
//! [count: u32 BE] ([len: u32 BE] [element bytes])*
//! ```
//!
//! Map codecs encode key/value pairs with the serde of the `(K, V)` dataset they come
//! from, so a map view and the dataset it was built from share one element encoding.

use super::{Serde, SerializationError, SharedSerde};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

const LEN_PREFIX: usize = 4;

fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<(), SerializationError> {
    let len = u32::try_from(len).map_err(|_| {
        SerializationError::SerializationFailed(format!("length {} exceeds u32 framing", len))
    })?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Cursor over a length-prefixed payload
struct FrameReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_len(&mut self) -> Result<usize, SerializationError> {
        let end = self.pos + LEN_PREFIX;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            SerializationError::framing(format!(
                "expected {} length bytes at offset {}, payload is {} bytes",
                LEN_PREFIX,
                self.pos,
                self.bytes.len()
            ))
        })?;
        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(slice);
        self.pos = end;
        Ok(u32::from_be_bytes(prefix) as usize)
    }

    fn read_frame(&mut self) -> Result<&'a [u8], SerializationError> {
        let len = self.read_len()?;
        let end = self.pos + len;
        let frame = self.bytes.get(self.pos..end).ok_or_else(|| {
            SerializationError::framing(format!(
                "frame of {} bytes at offset {} overruns payload of {} bytes",
                len,
                self.pos,
                self.bytes.len()
            ))
        })?;
        self.pos = end;
        Ok(frame)
    }

    fn finish(&self) -> Result<(), SerializationError> {
        if self.pos != self.bytes.len() {
            return Err(SerializationError::framing(format!(
                "{} trailing bytes after last frame",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

fn encode_frames<'a, T: 'a>(
    serde: &dyn Serde<T>,
    count: usize,
    items: impl Iterator<Item = &'a T>,
) -> Result<Vec<u8>, SerializationError> {
    let mut buf = Vec::new();
    write_len(&mut buf, count)?;
    for item in items {
        let bytes = serde.serialize(item)?;
        write_len(&mut buf, bytes.len())?;
        buf.extend_from_slice(&bytes);
    }
    Ok(buf)
}

fn decode_frames<T>(serde: &dyn Serde<T>, bytes: &[u8]) -> Result<Vec<T>, SerializationError> {
    let mut reader = FrameReader::new(bytes);
    let count = reader.read_len()?;
    let mut items = Vec::with_capacity(count.min(bytes.len()));
    for _ in 0..count {
        items.push(serde.deserialize(reader.read_frame()?)?);
    }
    reader.finish()?;
    Ok(items)
}

/// Codec for `Vec<T>` using an element serde
pub struct IterableCodec<T> {
    element: SharedSerde<T>,
}

impl<T> IterableCodec<T> {
    pub fn new(element: SharedSerde<T>) -> Self {
        Self { element }
    }
}

impl<T> Serde<Vec<T>> for IterableCodec<T> {
    fn serialize(&self, value: &Vec<T>) -> Result<Vec<u8>, SerializationError> {
        encode_frames(self.element.as_ref(), value.len(), value.iter())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<T>, SerializationError> {
        decode_frames(self.element.as_ref(), bytes)
    }

    fn format_name(&self) -> &'static str {
        "iterable"
    }
}

/// Codec for `HashMap<K, V>` using the serde of its `(K, V)` entries
///
/// Decoding rejects payloads that carry the same key twice.
pub struct KvMapCodec<K, V> {
    entry: SharedSerde<(K, V)>,
}

impl<K, V> KvMapCodec<K, V> {
    pub fn new(entry: SharedSerde<(K, V)>) -> Self {
        Self { entry }
    }
}

impl<K, V> Serde<HashMap<K, V>> for KvMapCodec<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn serialize(&self, value: &HashMap<K, V>) -> Result<Vec<u8>, SerializationError> {
        let entries: Vec<(K, V)> = value
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        encode_frames(self.entry.as_ref(), entries.len(), entries.iter())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<HashMap<K, V>, SerializationError> {
        let entries = decode_frames(self.entry.as_ref(), bytes)?;
        let mut map = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            if map.contains_key(&key) {
                return Err(SerializationError::DeserializationFailed(format!(
                    "duplicate key {:?} in map payload",
                    key
                )));
            }
            map.insert(key, value);
        }
        Ok(map)
    }

    fn format_name(&self) -> &'static str {
        "map"
    }
}

/// Codec for `HashMap<K, Vec<V>>` using the serde of its flattened `(K, V)` entries
pub struct KvMultimapCodec<K, V> {
    entry: SharedSerde<(K, V)>,
}

impl<K, V> KvMultimapCodec<K, V> {
    pub fn new(entry: SharedSerde<(K, V)>) -> Self {
        Self { entry }
    }
}

impl<K, V> Serde<HashMap<K, Vec<V>>> for KvMultimapCodec<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn serialize(&self, value: &HashMap<K, Vec<V>>) -> Result<Vec<u8>, SerializationError> {
        let entries: Vec<(K, V)> = value
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
            .collect();
        encode_frames(self.entry.as_ref(), entries.len(), entries.iter())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<HashMap<K, Vec<V>>, SerializationError> {
        let mut map: HashMap<K, Vec<V>> = HashMap::new();
        for (key, value) in decode_frames(self.entry.as_ref(), bytes)? {
            map.entry(key).or_default().push(value);
        }
        Ok(map)
    }

    fn format_name(&self) -> &'static str {
        "multimap"
    }
}
