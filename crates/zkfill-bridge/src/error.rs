//! Native bridge error types.

/// Unified error type for native-messaging transport and normalization.
#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    /// No native host is configured for this installation.
    #[error("native host not configured")]
    Unavailable,

    /// The native host process could not be launched.
    #[error("failed to launch native host: {reason}")]
    Spawn { reason: String },

    /// The native host closed its stream without sending a response.
    #[error("native host closed without responding")]
    NoResponse,

    /// The native host answered with an error shape.
    #[error("native host reported an error: {reason}")]
    Rejected { reason: String },

    /// The response was accepted but carried no usable credentials.
    #[error("native host returned no usable credentials")]
    NoCredentials,

    /// A frame exceeded the inbound size guard.
    #[error("frame too large: {len} bytes")]
    FrameTooLarge { len: usize },

    /// A frame was not valid JSON, or a request failed to serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pipe I/O with the native host failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NativeError {
    /// The tag surfaced at the message boundary for this failure. The
    /// host's own error reason passes through unchanged; everything else
    /// maps onto the fixed `native_*` vocabulary.
    pub fn wire_tag(&self) -> String {
        match self {
            Self::Unavailable => "native_unsupported".to_string(),
            Self::Spawn { .. } => "native_spawn_failed".to_string(),
            Self::NoResponse => "native_no_response".to_string(),
            Self::Rejected { reason } => reason.clone(),
            Self::NoCredentials => "native_no_credentials".to_string(),
            Self::FrameTooLarge { .. } | Self::Serialization(_) => {
                "native_invalid_response".to_string()
            }
            Self::Io(_) => "native_error".to_string(),
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, NativeError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
