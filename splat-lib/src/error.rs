use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplatError {
    #[error("Unable to read .ply file header: no 'end_header' terminator")]
    HeaderNotFound,
    #[error("Invalid .ply header: {0}")]
    InvalidHeader(String),
    #[error("Failed to find vertex count in PLY header")]
    MissingVertexCount,
    #[error("Field '{0}' not found in the PLY header")]
    UnknownField(String),
    #[error("Binary data is too short, need {needed} bytes, have {available}")]
    TruncatedBody { needed: usize, available: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
