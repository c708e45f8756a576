//! Picking
//!
//! Two independent off-screen passes resolve what lies under a canvas pixel:
//!
//! | Pass        | Buffer                 | Pixel payload                        |
//! |-------------|------------------------|--------------------------------------|
//! | Colour pick | colour + depth target  | 1-based pick index as RGB            |
//! | Ray pick    | packed-depth target    | normalized depth packed into RGBA    |
//!
//! Both buffers are allocated lazily at drawing-buffer size and go stale on
//! different triggers: the colour buffer whenever the image is redrawn, the
//! ray buffer whenever geometry that could be hit changes. [`Picker`] keeps
//! the two flags apart.

use std::sync::Arc;

use glam::{DVec4, Mat4, Vec3, Vec4};

use crate::errors::{DisplayError, Result};
use crate::renderer::device::{GpuDevice, PickTargetKind, TargetHandle};
use crate::scene::NameCore;

// ─── Codecs ──────────────────────────────────────────────────────────────────

/// RGBA encoding of a pick index; alpha is always opaque.
#[inline]
#[must_use]
pub fn encode_pick_index(index: u32) -> [u8; 4] {
    [
        (index & 0xff) as u8,
        ((index >> 8) & 0xff) as u8,
        ((index >> 16) & 0xff) as u8,
        0xff,
    ]
}

/// Inverse of [`encode_pick_index`]; alpha is ignored. Zero means no hit.
#[inline]
#[must_use]
pub fn decode_pick_index(pixel: [u8; 4]) -> u32 {
    u32::from(pixel[0]) + u32::from(pixel[1]) * 256 + u32::from(pixel[2]) * 65_536
}

/// Weights turning `[r, g, b, a] / 255` back into a depth.
const UNPACK_WEIGHTS: Vec4 = Vec4::new(
    1.0 / (256.0 * 256.0 * 256.0),
    1.0 / (256.0 * 256.0),
    1.0 / 256.0,
    1.0,
);

/// Packs a depth in `[0, 1)` into four bytes, most significant in alpha.
///
/// Mirrors the packing done by the ray-pick fragment shader.
#[must_use]
pub fn pack_depth(depth: f32) -> [u8; 4] {
    let mut residual = f64::from(depth.clamp(0.0, 1.0));
    let mut bytes = [0u8; 4];
    // a, b, g, r
    for channel in [3usize, 2, 1, 0] {
        let byte = (residual * 255.0).floor().clamp(0.0, 255.0);
        bytes[channel] = byte as u8;
        residual = (residual - byte / 255.0) * 256.0;
    }
    bytes
}

/// Decodes a depth produced by [`pack_depth`].
#[inline]
#[must_use]
pub fn unpack_depth(pixel: [u8; 4]) -> f32 {
    let bytes = Vec4::new(
        f32::from(pixel[0]),
        f32::from(pixel[1]),
        f32::from(pixel[2]),
        f32::from(pixel[3]),
    ) / 255.0;
    bytes.dot(UNPACK_WEIGHTS)
}

/// World-space point under canvas pixel `(x, y)` at normalized `depth`.
///
/// Canvas coordinates have a top-left origin. The ray from the near plane
/// (z = -1) to the far plane (z = +1) is interpolated linearly by `depth`.
#[must_use]
pub fn unproject_canvas(
    canvas: (f32, f32),
    size: (u32, u32),
    depth: f32,
    view: Mat4,
    projection: Mat4,
) -> Vec3 {
    let half_w = size.0 as f32 / 2.0;
    let half_h = size.1 as f32 / 2.0;
    let x = (canvas.0 - half_w) / half_w;
    let y = -(canvas.1 - half_h) / half_h;

    let inverse = (projection * view).as_dmat4().inverse();
    let unproject = |z: f64| {
        let p = inverse * DVec4::new(f64::from(x), f64::from(y), z, 1.0);
        p.truncate() / p.w
    };
    let near = unproject(-1.0);
    let far = unproject(1.0);
    near.lerp(far, f64::from(depth)).as_vec3()
}

// ─── Picker ──────────────────────────────────────────────────────────────────

/// Pick request issued by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRequest {
    pub canvas_x: f32,
    pub canvas_y: f32,
    /// Also resolve the world-space hit position.
    pub ray_pick: bool,
}

/// Object hit by a pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    pub name: String,
    pub path: String,
    pub node_id: u64,
    pub canvas_pos: [f32; 2],
    pub world_pos: Option<Vec3>,
}

impl PickResult {
    #[must_use]
    pub fn new(name: &NameCore, canvas_pos: [f32; 2]) -> Self {
        Self {
            name: name.name.clone(),
            path: name.path.clone(),
            node_id: name.node_id,
            canvas_pos,
            world_pos: None,
        }
    }
}

/// One lazily-allocated off-screen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickBuffer {
    pub target: TargetHandle,
    pub width: u32,
    pub height: u32,
}

/// Pick buffers, their staleness and the state captured by the last passes.
#[derive(Debug)]
pub struct Picker {
    color: Option<PickBuffer>,
    ray: Option<PickBuffer>,
    color_stale: bool,
    ray_stale: bool,
    /// Names captured by the last colour pass, in pick-index order.
    pub(crate) pick_names: Vec<Arc<NameCore>>,
    /// View and projection in effect during the last ray pass.
    pub(crate) view: Mat4,
    pub(crate) projection: Mat4,
}

impl Default for Picker {
    fn default() -> Self {
        Self {
            color: None,
            ray: None,
            color_stale: true,
            ray_stale: true,
            pick_names: Vec::new(),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl Picker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_color_stale(&self) -> bool {
        self.color_stale
    }

    #[inline]
    #[must_use]
    pub fn is_ray_stale(&self) -> bool {
        self.ray_stale
    }

    pub fn mark_color_stale(&mut self) {
        self.color_stale = true;
    }

    pub fn mark_ray_stale(&mut self) {
        self.ray_stale = true;
    }

    pub(crate) fn mark_fresh(&mut self, kind: PickTargetKind) {
        match kind {
            PickTargetKind::Color => self.color_stale = false,
            PickTargetKind::RayDepth => self.ray_stale = false,
        }
    }

    #[must_use]
    pub fn buffer(&self, kind: PickTargetKind) -> Option<PickBuffer> {
        match kind {
            PickTargetKind::Color => self.color,
            PickTargetKind::RayDepth => self.ray,
        }
    }

    /// Returns the buffer of `kind`, allocating it at the drawing-buffer size.
    ///
    /// A buffer whose size no longer matches is reallocated and goes stale.
    pub fn ensure_buffer(
        &mut self,
        device: &mut dyn GpuDevice,
        kind: PickTargetKind,
        format: wgpu::TextureFormat,
    ) -> Result<PickBuffer> {
        let (width, height) = device.drawing_buffer_size();
        if let Some(buffer) = self.buffer(kind) {
            if buffer.width == width && buffer.height == height {
                return Ok(buffer);
            }
            device.destroy_target(buffer.target);
            self.set_buffer(kind, None);
        }

        let target = device
            .create_pick_target(kind, width, height, format)
            .map_err(|reason| DisplayError::PickBufferIncomplete {
                kind,
                width,
                height,
                reason,
            })?;
        let buffer = PickBuffer {
            target,
            width,
            height,
        };
        self.set_buffer(kind, Some(buffer));
        match kind {
            PickTargetKind::Color => self.color_stale = true,
            PickTargetKind::RayDepth => self.ray_stale = true,
        }
        log::info!("Allocated {kind:?} pick buffer ({width}x{height})");
        Ok(buffer)
    }

    /// Destroys both buffers; they are reallocated on the next pick.
    pub fn destroy_buffers(&mut self, device: &mut dyn GpuDevice) {
        for buffer in [self.color.take(), self.ray.take()].into_iter().flatten() {
            device.destroy_target(buffer.target);
        }
        self.color_stale = true;
        self.ray_stale = true;
    }

    /// Forgets both buffers without touching the device (context lost).
    pub fn forget_buffers(&mut self) {
        self.color = None;
        self.ray = None;
        self.color_stale = true;
        self.ray_stale = true;
    }

    fn set_buffer(&mut self, kind: PickTargetKind, buffer: Option<PickBuffer>) {
        match kind {
            PickTargetKind::Color => self.color = buffer,
            PickTargetKind::RayDepth => self.ray = buffer,
        }
    }

    /// Name record for a decoded pick index, `None` for no hit.
    #[must_use]
    pub fn name_for(&self, index: u32) -> Option<&Arc<NameCore>> {
        let slot = index.checked_sub(1)?;
        self.pick_names.get(slot as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::RecordingDevice;

    #[test]
    fn test_pick_index_round_trip() {
        for index in 0..(1u32 << 16) {
            assert_eq!(decode_pick_index(encode_pick_index(index)), index);
        }
        assert_eq!(decode_pick_index(encode_pick_index(0x00ab_cdef)), 0x00ab_cdef);
    }

    #[test]
    fn test_depth_round_trip() {
        for depth in [0.0_f32, 0.125, 0.333_333, 0.5, 0.75, 0.999] {
            let decoded = unpack_depth(pack_depth(depth));
            assert!((decoded - depth).abs() < 1e-5, "{depth} decoded as {decoded}");
        }
    }

    #[test]
    fn test_unproject_center_hits_view_axis() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 1.0, 100.0);
        let near = unproject_canvas((50.0, 50.0), (100, 100), 0.0, view, projection);
        let far = unproject_canvas((50.0, 50.0), (100, 100), 1.0, view, projection);
        assert!(near.x.abs() < 1e-4 && near.y.abs() < 1e-4);
        assert!((near.z - 9.0).abs() < 1e-3);
        assert!((far.z + 90.0).abs() < 1e-2);
    }

    #[test]
    fn test_unproject_flips_canvas_y() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 1.0, 100.0);
        let top = unproject_canvas((50.0, 0.0), (100, 100), 0.0, view, projection);
        assert!(top.y > 0.0);
    }

    #[test]
    fn test_name_lookup_is_one_based() {
        let mut picker = Picker::new();
        picker.pick_names.push(Arc::new(NameCore::new("a", "a", 7)));
        assert!(picker.name_for(0).is_none());
        assert_eq!(picker.name_for(1).map(|n| n.node_id), Some(7));
        assert!(picker.name_for(2).is_none());
    }

    #[test]
    fn test_buffer_reallocated_on_resize() {
        let mut device = RecordingDevice::new(10, 10);
        let mut picker = Picker::new();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let first = picker
            .ensure_buffer(&mut device, PickTargetKind::Color, format)
            .unwrap();
        picker.mark_fresh(PickTargetKind::Color);
        assert_eq!(
            picker.ensure_buffer(&mut device, PickTargetKind::Color, format).unwrap(),
            first
        );
        device.set_size(20, 10);
        let second = picker
            .ensure_buffer(&mut device, PickTargetKind::Color, format)
            .unwrap();
        assert_ne!(first.target, second.target);
        assert!(picker.is_color_stale());
    }
}
