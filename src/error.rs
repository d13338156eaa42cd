//! Error types and handling for hwshm

/// Result type alias for hwshm operations
pub type Result<T> = std::result::Result<T, ShmError>;

/// Signature the producer writes when it stops publishing ("DEAD")
pub const INACTIVE_SIGNATURE: u32 = 0x4441_4544;

/// Error types for opening and decoding a telemetry segment
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// I/O related errors (open, fstat, mmap)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The named segment does not exist (producer not running or sharing disabled)
    #[error("Shared memory segment not found: {name}")]
    NotFound { name: String },

    /// Header signature does not match the requested layout
    #[error("Signature mismatch: expected {expected:#010x}, got {actual:#010x}")]
    SignatureMismatch { expected: u32, actual: u32 },

    /// A read would cross the end of the segment or the configured ceiling
    #[error("Truncated segment: {needed} bytes at offset {offset} exceed extent {extent}")]
    Truncated {
        offset: usize,
        needed: usize,
        extent: usize,
    },

    /// A section's element stride is shorter than the record stored in it
    #[error("Stride too small at offset {offset}: {element_size} bytes per element, record needs {record_size}")]
    StrideTooSmall {
        offset: usize,
        element_size: usize,
        record_size: usize,
    },

    /// A count field is larger than any sane producer would publish
    #[error("Implausible count in {field}: {count} exceeds limit {limit}")]
    CountTooLarge {
        field: &'static str,
        count: u64,
        limit: u64,
    },

    /// A single record references a group that does not exist
    #[error("Malformed record {index}: group index {group_index} out of range (group count {group_count})")]
    MalformedRecord {
        index: usize,
        group_index: u32,
        group_count: usize,
    },

    /// The mapping was already released
    #[error("Mapping closed: {name}")]
    Closed { name: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Platform-specific errors
    #[error("Platform error: {message}")]
    Platform { message: String },
}

impl ShmError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a segment not found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a signature mismatch error
    pub fn signature_mismatch(expected: u32, actual: u32) -> Self {
        Self::SignatureMismatch { expected, actual }
    }

    /// Create a truncation error
    pub fn truncated(offset: usize, needed: usize, extent: usize) -> Self {
        Self::Truncated {
            offset,
            needed,
            extent,
        }
    }

    /// Create an implausible count error
    pub fn count_too_large(field: &'static str, count: u64, limit: u64) -> Self {
        Self::CountTooLarge {
            field,
            count,
            limit,
        }
    }

    /// Create a stride error
    pub fn stride_too_small(offset: usize, element_size: usize, record_size: usize) -> Self {
        Self::StrideTooSmall {
            offset,
            element_size,
            record_size,
        }
    }

    /// Create a malformed record error
    pub fn malformed_record(index: usize, group_index: u32, group_count: usize) -> Self {
        Self::MalformedRecord {
            index,
            group_index,
            group_count,
        }
    }

    /// Create a closed mapping error
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed { name: name.into() }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Structural failures abort a whole decode pass
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::SignatureMismatch { .. }
                | Self::Truncated { .. }
                | Self::StrideTooSmall { .. }
                | Self::CountTooLarge { .. }
        )
    }

    /// Whether a later poll cycle may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::SignatureMismatch { actual, .. } => *actual == INACTIVE_SIGNATURE,
            _ => false,
        }
    }
}

impl From<std::io::Error> for ShmError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}
