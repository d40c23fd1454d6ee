//! Deterministic snapshot encoding for I/O devices.
//!
//! Device state is stored as a small tag-length-value (TLV) record list behind a fixed header:
//! - tags are written in ascending order, so equal state always produces equal bytes
//! - readers skip tags they do not know about
//! - both the container format and each device carry a major/minor version

mod version;

pub use version::{
    codec, SnapshotError, SnapshotHeader, SnapshotReader, SnapshotResult, SnapshotVersion,
    SnapshotWriter,
};

/// Snapshotting contract for emulated I/O devices.
///
/// `DEVICE_ID` must never change once published. Within one major version, new state may only
/// be added as new TLV fields whose absence has a sensible default.
pub trait IoSnapshot {
    const DEVICE_ID: [u8; 4];
    const DEVICE_VERSION: SnapshotVersion;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}
