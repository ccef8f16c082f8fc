pub mod observability;
pub mod pipeline;
pub mod serialization;
pub mod testing;
