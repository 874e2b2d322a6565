//! Binary serialization primitives

pub mod codec;

pub use codec::{CodecError, DataDeserializer, DataSerializer};
