/// Platform-specific functionality: storage-media detection used to size
/// the walker pool.

pub mod disk_class;

pub use disk_class::{DiskClass, DiskClassCache, MediaProbe, SystemProbe};
