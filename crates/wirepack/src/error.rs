//! Serialiser error type.

use thiserror::Error;
use wirepack_buffers::BufferError;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("bad stream header")]
    BadHeader,
    #[error("unknown wire tag {tag:#04x} at offset {offset}")]
    BadTag { offset: usize, tag: u8 },
    #[error("wire tag {found:#04x} does not match field `{field}`")]
    TagMismatch { field: String, found: u8 },
    #[error("composite field `{0}` has no end marker")]
    UnterminatedField(String),
    #[error("unknown variant `{name}` for enum field `{field}`")]
    UnknownVariant { field: String, name: String },
    #[error("field `{field}`: {reason}")]
    Access { field: String, reason: &'static str },
    #[error("no schema registered for the target type")]
    UnregisteredType,
}
