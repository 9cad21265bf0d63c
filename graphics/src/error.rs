//! Graphics error types.

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A shader program could not be turned into a pipeline.
    #[error("shader '{label}' failed to compile: {message}")]
    ShaderCompilationFailed { label: String, message: String },
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");

        let err = GraphicsError::ShaderCompilationFailed {
            label: "Standard".to_string(),
            message: "missing entry point".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "shader 'Standard' failed to compile: missing entry point"
        );
    }
}
