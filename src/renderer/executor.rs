//! Frame Executor
//!
//! Walks one command list against a freshly reset [`FrameContext`]:
//!
//! 1. Reset the frame context and bind the pass target.
//! 2. Viewport = full drawing buffer.
//! 3. Clear colour: transparent black for transparent canvases and pick
//!    passes, the ambient colour (alpha 1) otherwise.
//! 4. Clear colour, depth and stencil unless the caller opted out.
//! 5. Default state: culling and blending off.
//! 6. Run each command's draw- or pick-mode binder.
//! 7. Flush, then reset vertex-array state if the device tracks it.

use glam::Vec3;

use crate::renderer::chunk::{BindContext, ChunkCache};
use crate::renderer::device::{ClearFlags, GpuDevice, TargetHandle};
use crate::renderer::draw_list::DrawCommand;
use crate::renderer::frame::{FrameContext, PassMode};
use crate::renderer::pipeline::ProgramCache;

/// Per-pass parameters.
#[derive(Debug, Clone, Copy)]
pub struct PassOptions {
    pub mode: PassMode,
    /// Off-screen target for the pass; `None` draws to the default framebuffer.
    pub target: Option<TargetHandle>,
    pub clear: bool,
    pub transparent: bool,
    pub ambient: Vec3,
    pub vertex_attrib_reset_slots: u32,
}

/// Clear colour for a pass.
#[must_use]
pub fn clear_color(mode: PassMode, transparent: bool, ambient: Vec3) -> wgpu::Color {
    if transparent || mode.is_pick() {
        wgpu::Color::TRANSPARENT
    } else {
        wgpu::Color {
            r: f64::from(ambient.x),
            g: f64::from(ambient.y),
            b: f64::from(ambient.z),
            a: 1.0,
        }
    }
}

/// Executes `list` once.
pub fn execute(
    device: &mut dyn GpuDevice,
    frame: &mut FrameContext,
    list: &[DrawCommand],
    chunks: &ChunkCache,
    programs: &ProgramCache,
    options: &PassOptions,
) {
    frame.reset(options.mode, options.target, options.ambient);
    device.bind_target(options.target);

    let (width, height) = device.drawing_buffer_size();
    device.set_viewport(0, 0, width, height);
    device.set_clear_color(clear_color(options.mode, options.transparent, options.ambient));
    if options.clear {
        device.clear(ClearFlags::COLOR | ClearFlags::DEPTH | ClearFlags::STENCIL);
    }

    frame.set_cull_mode(device, None);
    frame.set_blend(device, None);

    let mut cx = BindContext {
        device,
        frame,
        programs,
    };
    for command in list {
        match command {
            DrawCommand::BindRenderTarget(core) => {
                cx.device.bind_render_target(&core.targets);
                cx.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
                cx.frame.render_target = Some(core.id);
            }
            DrawCommand::UnbindRenderTarget => {
                cx.device.bind_target(cx.frame.pass_target);
                cx.frame.render_target = None;
            }
            DrawCommand::Chunk { handle, key } => {
                let Some(chunk) = chunks.get(*handle) else {
                    log::debug!("Skipping released chunk {key}");
                    continue;
                };
                if options.mode.is_pick() {
                    chunk.pick(&mut cx);
                } else {
                    chunk.draw(&mut cx);
                }
            }
        }
    }

    let device = cx.device;
    device.flush();

    if device.has_vertex_array_objects() {
        device.unbind_vertex_array();
        for slot in 0..options.vertex_attrib_reset_slots {
            device.disable_vertex_attrib(slot);
        }
    }
}
