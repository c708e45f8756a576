//! # Myth Display
//!
//! Incremental render-object compiler and draw-list scheduler.
//!
//! The host's scene traversal hands each renderable node's active state cores
//! to [`Display::compile_object`]. The display caches GPU programs and state
//! chunks by content, orders objects by a packed state-sort key, and rebuilds
//! only the parts of the pipeline invalidated since the last frame. Picking
//! reuses the same object list through off-screen colour-index and packed
//! depth passes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use myth_display::{Display, DisplaySettings, ObjectId, PickRequest, RenderOptions};
//!
//! let mut display = Display::new(DisplaySettings::default());
//! display.compile_object(&mut device, ObjectId(1), &cores)?;
//! display.render(&mut device, RenderOptions::default())?;
//!
//! if let Some(hit) = display.pick(&mut device, PickRequest { canvas_x: 10.0, canvas_y: 20.0, ray_pick: true })? {
//!     log::info!("picked {} at {:?}", hit.name, hit.world_pos);
//! }
//! ```

pub mod errors;
pub mod renderer;
pub mod scene;

pub use errors::{DisplayError, Result};
pub use renderer::{
    DirtyFlags, Display, DisplaySettings, DisplayStats, DrawCommand, GpuDevice, ObjectId,
    PickRequest, PickResult, RecordingDevice, RenderOptions, SortKeyOverflow,
};
pub use renderer::picking::{
    decode_pick_index, encode_pick_index, pack_depth, unpack_depth, unproject_canvas,
};
pub use scene::{ActiveCores, derive_ambient};
