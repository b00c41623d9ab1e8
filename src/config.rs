//! Configuration types for the graph explorer.
//!
//! The [`ExplorerConfig`] struct controls how far the incremental graph
//! explorer will walk from the viewer. The depth comes from the viewer's
//! stored visibility preference; callers resolve that preference and pass
//! it in via [`ExplorerConfig::with_depth`].
//!
//! # Example
//! ```rust
//! use tierlink::ExplorerConfig;
//!
//! // Use the default visibility depth (3 hops)
//! let config = ExplorerConfig::default();
//!
//! // A viewer who prefers a tighter network view
//! let config = ExplorerConfig::with_depth(2);
//! ```

use crate::error::ValidationError;

/// Default visibility depth when the viewer has no stored preference.
pub const DEFAULT_VISIBILITY_DEPTH: u32 = 3;

/// Upper bound on visibility depth.
///
/// Expansion work grows with the neighborhood size at each hop; depths
/// beyond this produce unusable visualizations long before they produce
/// interesting ones.
pub const MAX_VISIBILITY_DEPTH: u32 = 6;

/// Graph explorer configuration options.
///
/// Use struct update syntax to override specific settings:
///
/// ```rust
/// use tierlink::ExplorerConfig;
///
/// let config = ExplorerConfig {
///     max_depth: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ExplorerConfig {
    /// Maximum hop distance from the viewer that may be expanded.
    ///
    /// Nodes at exactly this distance are still shown, but expanding
    /// them is a no-op.
    pub max_depth: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_VISIBILITY_DEPTH,
        }
    }
}

impl ExplorerConfig {
    /// Creates a new ExplorerConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config for a specific visibility depth.
    pub fn with_depth(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `GraphExplorer::new()`. You can also call
    /// this explicitly to check a resolved preference before use.
    ///
    /// # Errors
    /// Returns `ValidationError` if `max_depth` is 0 or greater than
    /// [`MAX_VISIBILITY_DEPTH`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_depth == 0 {
            return Err(ValidationError::invalid_field(
                "max_depth",
                "must be greater than 0",
            ));
        }

        if self.max_depth > MAX_VISIBILITY_DEPTH {
            return Err(ValidationError::invalid_field(
                "max_depth",
                format!(
                    "must be at most {}, got {}",
                    MAX_VISIBILITY_DEPTH, self.max_depth
                ),
            ));
        }

        Ok(())
    }
}
