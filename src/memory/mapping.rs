//! Read-only mapping of a producer-owned telemetry segment

use std::fs::File;

use log::debug;
use memmap2::{Mmap, MmapOptions};

use crate::error::{Result, ShmError};

use super::config::{BackingType, SegmentConfig};

/// A read-only view onto a named telemetry segment.
///
/// The producer keeps writing into the segment while it is mapped, so the
/// bytes returned by [`MappingHandle::bytes`] are a live window, not a
/// snapshot. Views borrow the handle, which means [`MappingHandle::close`]
/// cannot run while any decoder still holds one.
#[derive(Debug)]
pub struct MappingHandle {
    /// Segment name the handle was opened from
    name: String,
    /// Backing the mapping came from
    backing_type: BackingType,
    /// Live mapping, `None` once closed
    mmap: Option<Mmap>,
    /// Length of the underlying object at open time
    mapped_len: usize,
    /// Number of bytes exposed to decoders (mapped length capped by config)
    extent: usize,
}

impl MappingHandle {
    /// Open a segment read-only.
    ///
    /// The descriptor used to create the mapping is closed before this
    /// returns; the view stays valid until the handle is closed or dropped.
    pub fn open(config: &SegmentConfig) -> Result<Self> {
        config.validate()?;

        let file = Self::open_backing(config)?;
        let mapped_len = file
            .metadata()
            .map_err(|e| ShmError::from_io(e, "Failed to stat segment"))?
            .len() as usize;

        if mapped_len == 0 {
            return Err(ShmError::truncated(0, 1, 0));
        }

        let mmap = unsafe {
            MmapOptions::new()
                .len(mapped_len)
                .map(&file)
                .map_err(|e| ShmError::from_io(e, "Failed to map segment"))?
        };
        drop(file);

        let extent = mapped_len.min(config.max_extent);
        debug!(
            "Mapped segment '{}' ({}): {} bytes, {} exposed",
            config.name,
            config.backing_type.name(),
            mapped_len,
            extent
        );

        Ok(Self {
            name: config.name.clone(),
            backing_type: config.backing_type,
            mmap: Some(mmap),
            mapped_len,
            extent,
        })
    }

    fn open_backing(config: &SegmentConfig) -> Result<File> {
        match config.backing_type {
            #[cfg(unix)]
            BackingType::PosixShm => Self::open_posix_shm(config),
            BackingType::FileBacked => Self::open_file(config),
        }
    }

    #[cfg(unix)]
    fn open_posix_shm(config: &SegmentConfig) -> Result<File> {
        use nix::{errno::Errno, fcntl::OFlag, sys::mman::shm_open, sys::stat::Mode};

        let posix_name = config.posix_name();
        match shm_open(posix_name.as_str(), OFlag::O_RDONLY, Mode::empty()) {
            Ok(fd) => Ok(File::from(fd)),
            Err(Errno::ENOENT) => Err(ShmError::not_found(&config.name)),
            Err(errno) => Err(ShmError::from_io(
                std::io::Error::from(errno),
                &format!("Failed to open shared memory object {}", posix_name),
            )),
        }
    }

    fn open_file(config: &SegmentConfig) -> Result<File> {
        let path = config
            .file_path
            .as_ref()
            .ok_or_else(|| ShmError::invalid_parameter("file_path", "No file path configured"))?;

        File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ShmError::not_found(&config.name),
            _ => ShmError::from_io(e, "Failed to open segment file"),
        })
    }

    /// Bytes of the live segment, capped at the configured extent
    pub fn bytes(&self) -> Result<&[u8]> {
        match &self.mmap {
            Some(mmap) => Ok(&mmap[..self.extent]),
            None => Err(ShmError::closed(&self.name)),
        }
    }

    /// Release the view. Safe to call more than once.
    pub fn close(&mut self) {
        if self.mmap.take().is_some() {
            debug!("Unmapped segment '{}'", self.name);
        }
    }

    /// Whether the view is still mapped
    pub fn is_open(&self) -> bool {
        self.mmap.is_some()
    }

    /// Get the name of the segment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backing type
    pub fn backing_type(&self) -> BackingType {
        self.backing_type
    }

    /// Size of the underlying object when it was mapped
    pub fn mapped_len(&self) -> usize {
        self.mapped_len
    }

    /// Number of bytes decoders may address
    pub fn extent(&self) -> usize {
        self.extent
    }
}

/// Check whether a segment can be opened, without decoding it
pub fn segment_exists(config: &SegmentConfig) -> Result<bool> {
    match MappingHandle::open(config) {
        Ok(mut handle) => {
            handle.close();
            Ok(true)
        }
        Err(ShmError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
