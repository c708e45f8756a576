//! Display Scheduler
//!
//! Turns per-object state cores into sorted, run-length deduplicated command
//! lists and executes them against a [`GpuDevice`]:
//!
//! ```text
//! ActiveCores ──compile──▶ RenderObject ──sort──▶ object list
//!                  │                                   │
//!            ProgramCache                         build_draw_lists
//!            ChunkCache                                │
//!                                         image list / pick list
//!                                                      │
//!                                                   execute ──▶ GpuDevice
//! ```
//!
//! - `display`: the host-facing [`Display`] facade and dirty-flag cascade
//! - `compiler`: chunk resolution for one object
//! - `draw_list`: render-target grouping and run-length dedup
//! - `executor`: pass setup and command execution
//! - `picking`: pick buffers, pick-index and depth codecs, unprojection
//! - `device`: the GPU seam and a recording implementation

pub mod chunk;
pub mod compiler;
pub mod device;
pub mod dirty;
pub mod display;
pub mod draw_list;
pub mod executor;
pub mod frame;
pub mod object;
pub mod picking;
pub mod pipeline;
pub mod settings;
pub mod sort_key;
pub mod tags;

pub use chunk::{Chunk, ChunkCache, ChunkHandle, ChunkKey, ChunkKind, ChunkPayload, SLOT_COUNT};
pub use device::{GpuDevice, PickTargetKind, RecordingDevice};
pub use dirty::DirtyFlags;
pub use display::{Display, DisplayStats, RenderOptions};
pub use draw_list::{DrawCommand, DrawLists};
pub use frame::{FrameContext, PassMode};
pub use object::{ObjectId, ObjectKey, ObjectRegistry, RenderObject};
pub use picking::{
    PickRequest, PickResult, Picker, decode_pick_index, encode_pick_index, pack_depth,
    unpack_depth, unproject_canvas,
};
pub use pipeline::{ProgramCache, ProgramId, ProgramKey};
pub use settings::{DisplaySettings, SortKeyOverflow};
pub use sort_key::{SortKeyFields, StateSortKey, TextureSlots};
pub use tags::TagSelector;
