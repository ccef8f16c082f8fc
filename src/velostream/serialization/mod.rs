//! Pluggable serialization for pipeline elements
//!
//! Every element that crosses a stage boundary can be encoded with a [`Serde`]. Datasets
//! carry the serde of their element type, and the assertion stages use it to give the
//! checked value its own deep copy.
//!
//! # Quick Start
//!
//! ```rust
//! use velo_assert::velostream::serialization::{clone_via, JsonCodec, Serde};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = JsonCodec::new();
//! let bytes = Serde::<Vec<u32>>::serialize(&codec, &vec![1, 2, 3])?;
//! let restored: Vec<u32> = codec.deserialize(&bytes)?;
//! assert_eq!(restored, vec![1, 2, 3]);
//!
//! let copy = clone_via(&codec, &restored)?;
//! assert_eq!(copy, restored);
//! # Ok(())
//! # }
//! ```

mod composite;
mod error;
mod helpers;
mod json_codec;
mod traits;

pub use composite::{IterableCodec, KvMapCodec, KvMultimapCodec};
pub use error::SerializationError;
pub use helpers::clone_via;
pub use json_codec::JsonCodec;
pub use traits::{Serde, SharedSerde};
