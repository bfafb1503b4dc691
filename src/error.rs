use thiserror::Error;

/// Errors surfaced while validating cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
	/// The segment count must be a power of two so keys can be routed with a
	/// mask instead of a modulo.
	#[error("segment count must be a power of two, got {0}")]
	SegmentCountNotPow2(usize),

	/// The shrink ratio must fall within `(0, 1]`.
	#[error("shrink ratio must be within (0, 1], got {0}")]
	ShrinkRatioInvalid(f64),
}
