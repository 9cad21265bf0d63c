//! # Lumen Core
//!
//! Renderer-independent building blocks shared by the Lumen crates:
//! math helpers, local transforms, change counters and serialisable
//! material parameters.

pub mod change;
pub mod math;
pub mod parameter;
pub mod transform;

pub use change::{next_revision, ChangeCounter, ChangeCursor};
pub use parameter::{ControlType, Parameter, ParameterGroup, ParameterValue, PresetError};
pub use transform::Transform;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
