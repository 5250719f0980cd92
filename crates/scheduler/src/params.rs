use crate::viewport::Domain;

/// Pixel dimensions shared by both feedback buffers and the visible surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything a compute pass hands the shader besides the input buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputeParams {
    pub dimensions: Dimensions,
    pub domain: Domain,
    /// Discard history and write a seed state for `domain`.
    pub reset: bool,
}

/// The present pass only needs to know how large the buffer is; domain and
/// reset are meaningless when colorizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentParams {
    pub dimensions: Dimensions,
}
