//! Read-only views over the shared session state.

use std::sync::Arc;
use std::time::SystemTime;

use autordp_graphics::pointer::DecodedPointer;

/// A copy of the screen buffer at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub width: u16,
    pub height: u16,
    /// Strictly monotonically increasing; one increment per applied frame.
    pub version: u64,
    /// Wall-clock time of the last applied update.
    pub last_updated: SystemTime,
    /// Packed RGB, `width * height * 3` bytes, rows top-down.
    pub rgb_data: Vec<u8>,
}

/// A copy of the pointer presentation at one instant.
#[derive(Debug, Clone)]
pub struct PointerSnapshot {
    pub position: (u16, u16),
    pub visible: bool,
    /// The active cache slot, when a transmitted pointer is shown.
    pub cache_index: Option<u16>,
    /// The decoded image of the active pointer, premultiplied RGBA.
    pub image: Option<Arc<DecodedPointer>>,
}
