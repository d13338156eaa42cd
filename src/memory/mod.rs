//! Read-only access to the producer's shared memory segment

pub mod config;
pub mod mapping;

pub use config::{BackingType, SegmentConfig};
pub use mapping::{segment_exists, MappingHandle};
