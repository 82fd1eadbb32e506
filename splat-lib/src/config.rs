use crate::common::{DEFAULT_SIMILARITY_EPSILON, DEFAULT_TEXTURE_WIDTH, HEADER_SCAN_LIMIT};
use crate::error::SplatError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Texture width in texels. Each splat takes two texels.
    pub texture_width: usize,
    /// A resort is skipped while the viewing direction stays within
    /// `1 - similarity_epsilon` cosine similarity of the last sorted view.
    pub similarity_epsilon: f32,
    /// How many leading bytes of a file may hold the PLY header.
    pub header_scan_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            texture_width: DEFAULT_TEXTURE_WIDTH,
            similarity_epsilon: DEFAULT_SIMILARITY_EPSILON,
            header_scan_limit: HEADER_SCAN_LIMIT,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), SplatError> {
        if self.texture_width == 0 || self.texture_width % 2 != 0 {
            return Err(SplatError::InvalidConfig(format!(
                "texture width must be a non-zero even number, got {}",
                self.texture_width
            )));
        }
        if !(0.0..1.0).contains(&self.similarity_epsilon) {
            return Err(SplatError::InvalidConfig(format!(
                "similarity epsilon must be in [0, 1), got {}",
                self.similarity_epsilon
            )));
        }
        if self.header_scan_limit == 0 {
            return Err(SplatError::InvalidConfig(
                "header scan limit must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
