use plypick_core::Cancelled;
use thiserror::Error;

/// Errors raised while parsing a PLY header or decoding its vertex body.
#[derive(Debug, Error)]
pub enum PlyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("magic mismatch: expected 'ply', found {found:?}")]
    MagicMismatch { found: String },

    #[error("unsupported data format {found:?}, expected 'format binary_little_endian 1.0'")]
    UnsupportedFormat { found: String },

    #[error("header ended before 'end_header'")]
    MissingEndHeader,

    #[error("malformed header line {line:?}: {reason}")]
    MalformedLine { line: String, reason: &'static str },

    #[error("unsupported property type in {line:?}")]
    UnsupportedPropertyType { line: String },

    #[error("property width does not match its type in {line:?}")]
    PropertyWidthMismatch { line: String },

    #[error("invalid vertex count {found:?}")]
    InvalidVertexCount { found: String },

    #[error("header declares no vertex element")]
    MissingVertexCount,

    #[error("body ended at vertex {vertex} of {vertex_count}")]
    UnexpectedEof { vertex: u64, vertex_count: u64 },

    #[error("decode cancelled")]
    Cancelled,
}

impl PlyError {
    /// Whether this is a problem with the file's header rather than with
    /// reading it.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlyError::MagicMismatch { .. }
                | PlyError::UnsupportedFormat { .. }
                | PlyError::MissingEndHeader
                | PlyError::MalformedLine { .. }
                | PlyError::UnsupportedPropertyType { .. }
                | PlyError::PropertyWidthMismatch { .. }
                | PlyError::InvalidVertexCount { .. }
                | PlyError::MissingVertexCount
        )
    }
}

impl From<Cancelled> for PlyError {
    fn from(_: Cancelled) -> Self {
        PlyError::Cancelled
    }
}

pub type PlyResult<T> = Result<T, PlyError>;
