//! Display Settings
//!
//! Configuration consumed by [`Display::new`](crate::renderer::Display::new).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_display::renderer::{DisplaySettings, SortKeyOverflow};
//!
//! // Default: opaque canvas, clear every frame, saturating sort keys
//! let settings = DisplaySettings::default();
//!
//! // Composited over a page background, strict sort keys
//! let settings = DisplaySettings {
//!     transparent: true,
//!     sort_key_overflow: SortKeyOverflow::Reject,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SortKeyOverflow
// ---------------------------------------------------------------------------

/// What to do when a sort-key component does not fit its bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKeyOverflow {
    /// Clamp the component to the field maximum. Objects may tie but keep
    /// their relative order on every other field.
    #[default]
    Saturate,
    /// Give the object the unbound key so it sorts first.
    Reject,
}

// ---------------------------------------------------------------------------
// DisplaySettings
// ---------------------------------------------------------------------------

/// Global configuration of one display scheduler.
///
/// # Fields
///
/// | Field                       | Description                                | Default      |
/// |-----------------------------|--------------------------------------------|--------------|
/// | `transparent`               | Clear to transparent black                 | `false`      |
/// | `clear_by_default`          | Clear buffers when `RenderOptions::clear` is unset | `true` |
/// | `vertex_attrib_reset_slots` | Generic attribute slots reset after a pass | `10`         |
/// | `pick_color_format`         | Colour pick buffer format                  | `Rgba8Unorm` |
/// | `ray_pick_format`           | Ray pick buffer format                     | `Rgba8Unorm` |
/// | `sort_key_overflow`         | Sort-key overflow policy                   | `Saturate`   |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    // === Frame Defaults ===
    /// Clear to `(0, 0, 0, 0)` instead of the ambient colour.
    pub transparent: bool,

    /// Whether a pass clears colour, depth and stencil when the caller does
    /// not say otherwise.
    pub clear_by_default: bool,

    /// Number of generic vertex attribute slots disabled after each pass when
    /// the device exposes vertex array objects.
    pub vertex_attrib_reset_slots: u32,

    // === Picking ===
    /// Format of the colour-index pick buffer. Must be 8 bits per channel.
    #[serde(skip, default = "default_pick_format")]
    pub pick_color_format: wgpu::TextureFormat,

    /// Format of the packed-depth ray pick buffer. Must be 8 bits per channel.
    #[serde(skip, default = "default_pick_format")]
    pub ray_pick_format: wgpu::TextureFormat,

    // === Ordering ===
    pub sort_key_overflow: SortKeyOverflow,
}

fn default_pick_format() -> wgpu::TextureFormat {
    wgpu::TextureFormat::Rgba8Unorm
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            transparent: false,
            clear_by_default: true,
            vertex_attrib_reset_slots: 10,
            pick_color_format: default_pick_format(),
            ray_pick_format: default_pick_format(),
            sort_key_overflow: SortKeyOverflow::default(),
        }
    }
}
