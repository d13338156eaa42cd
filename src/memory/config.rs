//! Configuration types for telemetry segment mappings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{DEFAULT_SEGMENT_NAME, MAX_SEGMENT_BYTES};

/// Where the segment bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackingType {
    /// POSIX shared memory object opened by name
    #[cfg(unix)]
    PosixShm,
    /// Regular file (recorded segment dumps)
    FileBacked,
}

impl Default for BackingType {
    fn default() -> Self {
        #[cfg(unix)]
        {
            Self::PosixShm
        }
        #[cfg(not(unix))]
        {
            Self::FileBacked
        }
    }
}

impl BackingType {
    /// Check if this backing type is supported on the current platform
    pub fn is_supported(&self) -> bool {
        match self {
            #[cfg(unix)]
            BackingType::PosixShm => true,
            BackingType::FileBacked => true,
        }
    }

    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            BackingType::PosixShm => "posix-shm",
            BackingType::FileBacked => "file-backed",
        }
    }
}

/// Configuration for opening a telemetry segment read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Segment name as published by the producer
    pub name: String,
    /// Backing type for the segment
    pub backing_type: BackingType,
    /// File path for file-backed segments
    pub file_path: Option<PathBuf>,
    /// Upper bound on the number of bytes exposed from the mapping
    pub max_extent: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SEGMENT_NAME.to_string(),
            backing_type: BackingType::default(),
            file_path: None,
            max_extent: MAX_SEGMENT_BYTES,
        }
    }
}

impl SegmentConfig {
    /// Create a configuration for a named segment
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a configuration for a segment dump stored in a file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            backing_type: BackingType::FileBacked,
            file_path: Some(path),
            ..Default::default()
        }
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path for file-backed segments
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the maximum number of bytes exposed from the mapping
    pub fn with_max_extent(mut self, max_extent: usize) -> Self {
        self.max_extent = max_extent;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::ShmError;

        if self.name.is_empty() {
            return Err(ShmError::invalid_parameter(
                "name",
                "Segment name cannot be empty",
            ));
        }

        if self.max_extent == 0 {
            return Err(ShmError::invalid_parameter(
                "max_extent",
                "Maximum extent must be greater than 0",
            ));
        }

        if !self.backing_type.is_supported() {
            return Err(ShmError::invalid_parameter(
                "backing_type",
                format!(
                    "Backing type {} is not supported on this platform",
                    self.backing_type.name()
                ),
            ));
        }

        if self.backing_type == BackingType::FileBacked && self.file_path.is_none() {
            return Err(ShmError::invalid_parameter(
                "file_path",
                "File path must be specified for file-backed segments",
            ));
        }

        Ok(())
    }

    /// Name of the POSIX shared memory object for this segment.
    ///
    /// Windows kernel namespace prefixes (`Global\`, `Local\`) are stripped and
    /// a leading slash is added, so `Global\HWiNFO_SENS_SM2` becomes
    /// `/HWiNFO_SENS_SM2`.
    pub fn posix_name(&self) -> String {
        let mut name = self.name.as_str();
        for prefix in ["Global\\", "Local\\"] {
            if let Some(stripped) = name.strip_prefix(prefix) {
                name = stripped;
                break;
            }
        }
        let name = name.trim_start_matches('/');
        format!("/{}", name)
    }
}
