//! Draw-mode and pick-mode binders for every chunk kind.

use glam::Vec4;

use super::{Chunk, ChunkPayload};
use crate::renderer::device::{DepthState, GpuDevice, UniformName, UniformValue};
use crate::renderer::frame::FrameContext;
use crate::renderer::picking::encode_pick_index;
use crate::renderer::pipeline::{ProgramCache, ProgramMode};
use crate::scene::{LightKind, ShaderParamList};

/// Texture unit reserved for the environment cube map.
const CUBEMAP_TEXTURE_UNIT: u32 = 10;

/// Everything a binder may touch while a list executes.
pub struct BindContext<'a> {
    pub device: &'a mut dyn GpuDevice,
    pub frame: &'a mut FrameContext,
    pub programs: &'a ProgramCache,
}

impl Chunk {
    /// Binds this chunk for the image pass.
    pub fn draw(&self, cx: &mut BindContext<'_>) {
        let device = &mut *cx.device;
        match &self.payload {
            ChunkPayload::Program(id) => {
                let Some(entry) = cx.programs.get(*id) else {
                    log::warn!("Program {id} missing while drawing {}", self.key);
                    return;
                };
                cx.frame.program = Some(*id);
                device.use_program(entry.variant(ProgramMode::Draw));
                device.set_uniform(
                    UniformName::AmbientColor,
                    UniformValue::Vec3(cx.frame.ambient),
                );
            }
            ChunkPayload::ModelTransform(core) => {
                device.set_uniform(UniformName::ModelMatrix, UniformValue::Mat4(core.matrix));
                device.set_uniform(
                    UniformName::NormalMatrix,
                    UniformValue::Mat4(core.normal_matrix),
                );
            }
            ChunkPayload::ViewTransform(core) => {
                cx.frame.view_matrix = core.matrix;
                cx.frame.eye = core.eye;
                device.set_uniform(UniformName::ViewMatrix, UniformValue::Mat4(core.matrix));
                device.set_uniform(UniformName::EyePosition, UniformValue::Vec3(core.eye));
            }
            ChunkPayload::ProjectionTransform(core) => {
                cx.frame.projection_matrix = core.matrix;
                device.set_uniform(
                    UniformName::ProjectionMatrix,
                    UniformValue::Mat4(core.matrix),
                );
            }
            ChunkPayload::Flags(core) => {
                let cull = if core.backfaces {
                    None
                } else {
                    Some(wgpu::Face::Back)
                };
                cx.frame.set_cull_mode(device, cull);
                cx.frame.set_front_face(device, core.front_face);
            }
            ChunkPayload::Shader(core) => set_params(device, &core.defaults),
            ChunkPayload::ShaderParams(core) => set_params(device, &core.params),
            ChunkPayload::Style(core) => cx.frame.set_line_width(device, core.line_width),
            ChunkPayload::DepthBuffer(core) => cx.frame.set_depth_state(
                device,
                DepthState {
                    enabled: core.enabled,
                    compare: core.compare,
                    clear_depth: core.clear_depth,
                },
            ),
            ChunkPayload::ColorBuffer(core) => {
                cx.frame.set_blend(device, core.blend);
                cx.frame.set_color_mask(device, core.write_mask);
            }
            ChunkPayload::View(core) => cx.frame.set_scissor_test(device, core.scissor_test),
            ChunkPayload::Name(_) => {}
            ChunkPayload::Lights(core) => {
                for (index, light) in core.lights.iter().enumerate() {
                    let index = index as u8;
                    device.set_uniform(
                        UniformName::LightColor(index),
                        UniformValue::Vec3(light.color),
                    );
                    match light.kind {
                        LightKind::Ambient => {}
                        LightKind::Directional(dir) => device.set_uniform(
                            UniformName::LightDirection(index),
                            UniformValue::Vec3(dir.direction),
                        ),
                        LightKind::Point(point) => {
                            device.set_uniform(
                                UniformName::LightPosition(index),
                                UniformValue::Vec3(point.position),
                            );
                            device.set_uniform(
                                UniformName::LightAttenuation(index),
                                UniformValue::Vec3(point.attenuation),
                            );
                        }
                    }
                }
            }
            ChunkPayload::Material(core) => {
                device.set_uniform(UniformName::BaseColor, UniformValue::Vec3(core.base_color));
                device.set_uniform(
                    UniformName::SpecularColor,
                    UniformValue::Vec3(core.specular_color),
                );
                device.set_uniform(UniformName::Specular, UniformValue::Float(core.specular));
                device.set_uniform(UniformName::Shine, UniformValue::Float(core.shine));
                device.set_uniform(UniformName::Alpha, UniformValue::Float(core.alpha));
                device.set_uniform(UniformName::Emit, UniformValue::Float(core.emit));
            }
            ChunkPayload::Texture(core) => {
                for (unit, layer) in core.layers.iter().enumerate() {
                    device.bind_texture(unit as u32, layer.texture);
                    device.set_uniform(
                        UniformName::Sampler(unit as u8),
                        UniformValue::Int(unit as i32),
                    );
                    device.set_uniform(
                        UniformName::TextureBlendFactor(unit as u8),
                        UniformValue::Float(layer.blend_factor),
                    );
                }
            }
            ChunkPayload::Cubemap(core) => {
                device.bind_texture(CUBEMAP_TEXTURE_UNIT, core.texture);
                device.set_uniform(
                    UniformName::CubemapSampler,
                    UniformValue::Int(CUBEMAP_TEXTURE_UNIT as i32),
                );
                device.set_uniform(
                    UniformName::CubemapIntensity,
                    UniformValue::Float(core.intensity),
                );
            }
            ChunkPayload::Clips(_) | ChunkPayload::Geometry { .. } | ChunkPayload::Draw(_) => {
                self.bind_shared(cx);
            }
        }
    }

    /// Binds this chunk for a pick pass (colour-index or ray).
    pub fn pick(&self, cx: &mut BindContext<'_>) {
        let device = &mut *cx.device;
        match &self.payload {
            ChunkPayload::Program(id) => {
                let Some(entry) = cx.programs.get(*id) else {
                    log::warn!("Program {id} missing while picking {}", self.key);
                    return;
                };
                cx.frame.program = Some(*id);
                device.use_program(entry.variant(ProgramMode::Pick));
                device.set_uniform(
                    UniformName::RayPick,
                    UniformValue::Bool(cx.frame.mode.is_ray_pick()),
                );
            }
            ChunkPayload::ModelTransform(core) => {
                device.set_uniform(UniformName::ModelMatrix, UniformValue::Mat4(core.matrix));
            }
            ChunkPayload::Name(core) => {
                let index = cx.frame.push_pick_name(core);
                let [r, g, b, a] = encode_pick_index(index);
                device.set_uniform(
                    UniformName::PickColor,
                    UniformValue::Vec4(
                        Vec4::new(f32::from(r), f32::from(g), f32::from(b), f32::from(a)) / 255.0,
                    ),
                );
            }
            ChunkPayload::Shader(core) => set_params(device, &core.defaults),
            ChunkPayload::ShaderParams(_)
            | ChunkPayload::ColorBuffer(_)
            | ChunkPayload::Lights(_)
            | ChunkPayload::Material(_)
            | ChunkPayload::Texture(_)
            | ChunkPayload::Cubemap(_) => {}
            ChunkPayload::ViewTransform(_)
            | ChunkPayload::ProjectionTransform(_)
            | ChunkPayload::Flags(_)
            | ChunkPayload::Style(_)
            | ChunkPayload::DepthBuffer(_)
            | ChunkPayload::View(_) => self.draw(cx),
            ChunkPayload::Clips(_) | ChunkPayload::Geometry { .. } | ChunkPayload::Draw(_) => {
                self.bind_shared(cx);
            }
        }
    }

    /// Binding identical in both passes.
    fn bind_shared(&self, cx: &mut BindContext<'_>) {
        let device = &mut *cx.device;
        match &self.payload {
            ChunkPayload::Clips(core) => {
                for (index, clip) in core.clips.iter().enumerate() {
                    let index = index as u8;
                    device.set_uniform(
                        UniformName::ClipNormal(index),
                        UniformValue::Vec3(clip.normal),
                    );
                    device.set_uniform(
                        UniformName::ClipDistance(index),
                        UniformValue::Float(clip.distance),
                    );
                    device.set_uniform(
                        UniformName::ClipMode(index),
                        UniformValue::Int(clip.mode.as_uniform()),
                    );
                }
            }
            ChunkPayload::Geometry { geometry, morph } => match morph {
                Some(morph) => {
                    device.bind_geometry(geometry.buffers, &morph.targets);
                    device.set_uniform(UniformName::MorphFactor, UniformValue::Float(morph.factor));
                }
                None => device.bind_geometry(geometry.buffers, &[]),
            },
            ChunkPayload::Draw(geometry) => {
                device.draw(
                    geometry.primitive.topology(),
                    geometry.element_count,
                    geometry.indexed,
                );
                cx.frame.draw_calls += 1;
            }
            _ => {}
        }
    }
}

fn set_params(device: &mut dyn GpuDevice, params: &ShaderParamList) {
    for (name, value) in params {
        device.set_uniform(UniformName::Custom(name.clone()), *value);
    }
}
