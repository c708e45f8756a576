//! Draw-List Tests
//!
//! Tests for:
//! - Run-length dedup of shared state, one draw per visible object
//! - State-sort ordering (stage priority, transparency bucket)
//! - Culling: enable, flags, layer and tag selector
//! - Render-target grouping order
//! - Pick-list participation and stage pickability

use glam::{Mat4, Vec3};

use myth_display::renderer::device::{GeometryHandle, GpuCommand, TargetHandle, TextureHandle};
use myth_display::renderer::{
    ChunkKind, DirtyFlags, Display, DisplaySettings, DrawCommand, RenderOptions,
};
use myth_display::scene::{
    ActiveCores, CoreRef, EnableCore, FlagsCore, GeometryCore, LayerCore, MaterialCore,
    ModelTransformCore, NameCore, Primitive, ProjectionCore, RenderTargetBinding,
    RenderTargetCore, RenderTargetKind, StageCore, StateId, TagCore, TextureApplyTo, TextureCore,
    TextureLayer, VertexAttributes, ViewTransformCore,
};
use myth_display::{DisplayError, ObjectId, RecordingDevice};

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    device: RecordingDevice,
    display: Display,
    view: CoreRef<ViewTransformCore>,
    projection: CoreRef<ProjectionCore>,
    material: CoreRef<MaterialCore>,
    geometry: CoreRef<GeometryCore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            device: RecordingDevice::new(64, 64),
            display: Display::new(DisplaySettings::default()),
            view: CoreRef::new(ViewTransformCore::look_at(Vec3::Z * 5.0, Vec3::ZERO, Vec3::Y)),
            projection: CoreRef::new(ProjectionCore::perspective(1.0, 1.0, 0.1, 50.0)),
            material: CoreRef::new(MaterialCore::default()),
            geometry: CoreRef::new(GeometryCore::new(
                Primitive::Triangles,
                GeometryHandle(3),
                6,
                false,
                VertexAttributes::NORMALS | VertexAttributes::UV,
            )),
        }
    }

    /// Cores of a named object with its own model transform.
    fn cores(&self, node_id: u64) -> ActiveCores {
        ActiveCores {
            model_transform: CoreRef::new(ModelTransformCore::new(Mat4::from_translation(
                Vec3::X * node_id as f32,
            ))),
            view_transform: self.view.clone(),
            projection: self.projection.clone(),
            material: self.material.clone(),
            geometry: self.geometry.clone(),
            name: CoreRef::new(NameCore::new(
                format!("node{node_id}"),
                format!("/node{node_id}"),
                node_id,
            )),
            ..ActiveCores::default()
        }
    }

    fn compile(&mut self, id: u64, cores: &ActiveCores) {
        self.display
            .compile_object(&mut self.device, ObjectId(id), cores)
            .unwrap();
    }

    fn render(&mut self) {
        self.display
            .render(&mut self.device, RenderOptions::default())
            .unwrap();
    }

    fn image_count(&self, kind: ChunkKind) -> usize {
        count(self.display.image_commands(), kind)
    }

    fn pick_count(&self, kind: ChunkKind) -> usize {
        count(self.display.pick_commands(), kind)
    }

    /// Model-transform core ids in image-list order.
    fn model_order(&self) -> Vec<StateId> {
        self.display
            .image_commands()
            .iter()
            .filter_map(DrawCommand::chunk_key)
            .filter(|key| key.kind == ChunkKind::ModelTransform)
            .filter_map(|key| key.core)
            .collect()
    }
}

fn count(list: &[DrawCommand], kind: ChunkKind) -> usize {
    list.iter()
        .filter_map(DrawCommand::chunk_key)
        .filter(|key| key.kind == kind)
        .count()
}

fn model_id(cores: &ActiveCores) -> StateId {
    cores.model_transform.state_id().unwrap()
}

/// Asserts that no two adjacent commands at one slot repeat a non-unique key.
fn assert_no_adjacent_repeats(list: &[DrawCommand]) {
    let mut last = [None; myth_display::renderer::SLOT_COUNT];
    for key in list.iter().filter_map(DrawCommand::chunk_key) {
        if !key.kind.unique() {
            assert_ne!(last[key.slot()], Some(*key), "repeated {key}");
        }
        last[key.slot()] = Some(*key);
    }
}

// ============================================================================
// Dedup & Cardinality
// ============================================================================

#[test]
fn shared_state_is_emitted_once() {
    let mut fx = Fixture::new();
    for id in 1..=5 {
        let cores = fx.cores(id);
        fx.compile(id, &cores);
    }
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Program), 1);
    assert_eq!(fx.image_count(ChunkKind::Material), 1);
    assert_eq!(fx.image_count(ChunkKind::ViewTransform), 1);
    assert_eq!(fx.image_count(ChunkKind::Geometry), 1);
    assert_eq!(fx.image_count(ChunkKind::ModelTransform), 5);
    assert_eq!(fx.image_count(ChunkKind::Draw), 5);
    assert_no_adjacent_repeats(fx.display.image_commands());
    assert_no_adjacent_repeats(fx.display.pick_commands());
}

#[test]
fn draw_chunks_match_visible_objects() {
    let mut fx = Fixture::new();
    for id in 1..=4 {
        let mut cores = fx.cores(id);
        if id == 2 {
            cores.enable = CoreRef::new(EnableCore::new(false));
        }
        fx.compile(id, &cores);
    }
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Draw), 3);
    assert_eq!(fx.device.draw_calls(), 3);
    assert_eq!(fx.display.stats().draw_calls, 3);
}

#[test]
fn empty_core_leaves_slot_unbound() {
    let mut fx = Fixture::new();
    let mut cores = fx.cores(1);
    cores.material = CoreRef::Empty;
    fx.compile(1, &cores);
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Material), 0);
    assert_eq!(fx.image_count(ChunkKind::Draw), 1);
}

// ============================================================================
// Sort Order
// ============================================================================

#[test]
fn higher_stage_priority_draws_later() {
    let mut fx = Fixture::new();
    let mut late = fx.cores(1);
    late.stage = CoreRef::new(StageCore::new(5, true));
    let mut early = fx.cores(2);
    early.stage = CoreRef::new(StageCore::new(1, true));
    fx.compile(1, &late);
    fx.compile(2, &early);
    fx.render();

    assert_eq!(fx.model_order(), vec![model_id(&early), model_id(&late)]);
}

#[test]
fn negative_layer_draws_before_default_layer() {
    let mut fx = Fixture::new();
    let plain = fx.cores(1);
    let mut backdrop = fx.cores(2);
    backdrop.layer = CoreRef::new(LayerCore::new(-3, true));
    fx.compile(1, &plain);
    fx.compile(2, &backdrop);
    fx.render();

    assert_eq!(fx.model_order(), vec![model_id(&backdrop), model_id(&plain)]);
}

#[test]
fn layer_priority_orders_within_stage() {
    let mut fx = Fixture::new();
    let mut top = fx.cores(1);
    top.layer = CoreRef::new(LayerCore::new(3, true));
    let mut bottom = fx.cores(2);
    bottom.layer = CoreRef::new(LayerCore::new(0, true));
    fx.compile(1, &top);
    fx.compile(2, &bottom);
    fx.render();

    assert_eq!(fx.model_order(), vec![model_id(&bottom), model_id(&top)]);
}

#[test]
fn transparent_object_follows_opaque_objects() {
    let mut fx = Fixture::new();

    let mut glass = fx.cores(1);
    glass.flags = CoreRef::new(FlagsCore::transparent());
    glass.texture = CoreRef::new(TextureCore::new([TextureLayer {
        texture: TextureHandle(9),
        apply_to: TextureApplyTo::Alpha,
        blend_factor: 0.5,
    }]));
    fx.compile(1, &glass);
    let opaque: Vec<_> = (2..=4)
        .map(|id| {
            let cores = fx.cores(id);
            fx.compile(id, &cores);
            cores
        })
        .collect();
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Program), 2);
    assert_eq!(fx.image_count(ChunkKind::Draw), 4);

    let glass_program = fx.display.object(ObjectId(1)).unwrap().program;
    let opaque_program = fx.display.object(ObjectId(2)).unwrap().program;
    assert_ne!(glass_program, opaque_program);

    let image = fx.display.image_commands();
    let glass_start = image
        .iter()
        .position(|c| {
            c.chunk_key()
                .is_some_and(|key| key.kind == ChunkKind::Program && key.program == glass_program)
        })
        .unwrap();
    let last_opaque_draw = image
        .iter()
        .enumerate()
        .filter(|(_, c)| c.chunk_key().is_some_and(|key| key.kind == ChunkKind::Draw))
        .map(|(index, _)| index)
        .nth(2)
        .unwrap();
    assert!(last_opaque_draw < glass_start);

    let order = fx.model_order();
    assert_eq!(order.last(), Some(&model_id(&glass)));
    for cores in &opaque {
        assert!(order[..3].contains(&model_id(cores)));
    }
}

#[test]
fn transform_change_resorts_without_rebuilding_object_list() {
    let mut fx = Fixture::new();
    let cores = fx.cores(1);
    fx.compile(1, &cores);
    fx.render();

    let moved = fx.cores(1);
    fx.compile(1, &moved);
    assert_eq!(
        fx.display.dirty(),
        DirtyFlags::STATE_ORDER
            | DirtyFlags::STATE_SORT
            | DirtyFlags::DRAW_LIST
            | DirtyFlags::IMAGE
    );
    fx.render();
    assert_eq!(fx.model_order(), vec![model_id(&moved)]);
}

// ============================================================================
// Culling
// ============================================================================

#[test]
fn disabled_flags_and_layers_are_culled() {
    let mut fx = Fixture::new();
    let mut hidden_flags = fx.cores(1);
    hidden_flags.flags = CoreRef::new(FlagsCore {
        enabled: false,
        ..FlagsCore::default()
    });
    let mut hidden_layer = fx.cores(2);
    hidden_layer.layer = CoreRef::new(LayerCore::new(0, false));
    let visible = fx.cores(3);

    fx.compile(1, &hidden_flags);
    fx.compile(2, &hidden_layer);
    fx.compile(3, &visible);
    fx.render();

    assert_eq!(fx.model_order(), vec![model_id(&visible)]);
    assert_eq!(fx.pick_count(ChunkKind::Draw), 1);
}

#[test]
fn tag_selector_culls_tagged_objects_only() {
    let mut fx = Fixture::new();
    let mut hud = fx.cores(1);
    hud.tag = CoreRef::new(TagCore::new("hud"));
    let mut world = fx.cores(2);
    world.tag = CoreRef::new(TagCore::new("world"));
    let untagged = fx.cores(3);
    fx.compile(1, &hud);
    fx.compile(2, &world);
    fx.compile(3, &untagged);

    fx.display.select_tags("^hud$").unwrap();
    fx.render();
    assert_eq!(fx.model_order(), vec![model_id(&hud), model_id(&untagged)]);
    assert_eq!(
        fx.display.object(ObjectId(2)).unwrap().tag_match.map(|(_, m)| m),
        Some(false)
    );

    fx.display.clear_tag_selector();
    assert!(fx.display.dirty().contains(DirtyFlags::DRAW_LIST));
    assert!(!fx.display.dirty().contains(DirtyFlags::STATE_SORT));
    fx.render();
    assert_eq!(fx.image_count(ChunkKind::Draw), 3);
}

#[test]
fn tag_match_is_memoized_per_selector() {
    let mut fx = Fixture::new();
    let mut world = fx.cores(1);
    world.tag = CoreRef::new(TagCore::new("world"));
    fx.compile(1, &world);

    fx.display.select_tags("wor").unwrap();
    fx.render();
    let first = fx.display.object(ObjectId(1)).unwrap().tag_match;
    assert_eq!(first.map(|(_, m)| m), Some(true));

    fx.display.request_redraw();
    fx.render();
    assert_eq!(fx.display.object(ObjectId(1)).unwrap().tag_match, first);

    fx.display.select_tags("^hud").unwrap();
    fx.render();
    let second = fx.display.object(ObjectId(1)).unwrap().tag_match.unwrap();
    assert!(!second.1);
    assert_ne!(Some(second.0), first.map(|(version, _)| version));
    assert_eq!(fx.image_count(ChunkKind::Draw), 0);
}

#[test]
fn invalid_tag_selector_keeps_previous_selector() {
    let mut fx = Fixture::new();
    let mut hud = fx.cores(1);
    hud.tag = CoreRef::new(TagCore::new("hud"));
    let mut world = fx.cores(2);
    world.tag = CoreRef::new(TagCore::new("world"));
    fx.compile(1, &hud);
    fx.compile(2, &world);

    fx.display.select_tags("hud").unwrap();
    let err = fx.display.select_tags("(unclosed").unwrap_err();
    assert!(matches!(err, DisplayError::InvalidTagSelector(_)));

    fx.render();
    assert_eq!(fx.model_order(), vec![model_id(&hud)]);
}

// ============================================================================
// Render Targets
// ============================================================================

fn target(handle: u64) -> CoreRef<RenderTargetCore> {
    CoreRef::new(RenderTargetCore::new([RenderTargetBinding {
        target: TargetHandle(handle),
        kind: RenderTargetKind::Color,
    }]))
}

#[test]
fn render_target_groups_precede_default_group() {
    let mut fx = Fixture::new();
    let first_target = target(100);
    let second_target = target(200);

    let plain = fx.cores(1);
    let mut a = fx.cores(2);
    a.render_target = first_target.clone();
    let mut b = fx.cores(3);
    b.render_target = second_target.clone();
    let mut c = fx.cores(4);
    c.render_target = first_target.clone();

    for (id, cores) in [(1, &plain), (2, &a), (3, &b), (4, &c)] {
        fx.compile(id, cores);
    }
    fx.render();

    let image = fx.display.image_commands();
    let bound: Vec<_> = image
        .iter()
        .filter_map(|command| match command {
            DrawCommand::BindRenderTarget(core) => Some(core.id),
            _ => None,
        })
        .collect();
    assert_eq!(
        bound,
        vec![
            first_target.state_id().unwrap(),
            second_target.state_id().unwrap()
        ]
    );
    assert_eq!(
        image
            .iter()
            .filter(|c| matches!(c, DrawCommand::UnbindRenderTarget))
            .count(),
        1
    );
    assert_eq!(
        fx.model_order(),
        vec![model_id(&a), model_id(&c), model_id(&b), model_id(&plain)]
    );

    let unbind = image
        .iter()
        .position(|c| matches!(c, DrawCommand::UnbindRenderTarget))
        .unwrap();
    assert_eq!(count(&image[unbind..], ChunkKind::Draw), 1);

    assert!(
        fx.display
            .pick_commands()
            .iter()
            .all(|c| matches!(c, DrawCommand::Chunk { .. }))
    );
}

#[test]
fn no_unbind_without_render_targets() {
    let mut fx = Fixture::new();
    let mut cores = fx.cores(1);
    cores.render_target = CoreRef::new(RenderTargetCore::new(Vec::<RenderTargetBinding>::new()));
    fx.compile(1, &cores);
    fx.render();

    assert!(
        fx.display
            .image_commands()
            .iter()
            .all(|c| matches!(c, DrawCommand::Chunk { .. }))
    );
}

#[test]
fn render_target_objects_stay_out_of_pick_list() {
    let mut fx = Fixture::new();
    let mut offscreen = fx.cores(1);
    offscreen.render_target = target(100);
    fx.compile(1, &offscreen);
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Draw), 1);
    assert_eq!(fx.pick_count(ChunkKind::Draw), 0);
    assert_eq!(fx.pick_count(ChunkKind::Name), 0);

    let onscreen = fx.cores(2);
    fx.compile(2, &onscreen);
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Draw), 2);
    assert_eq!(fx.pick_count(ChunkKind::Draw), 1);
    assert_eq!(fx.pick_count(ChunkKind::Name), 1);
}

#[test]
fn render_target_commands_reach_the_device() {
    let mut fx = Fixture::new();
    let mut cores = fx.cores(1);
    cores.render_target = target(300);
    fx.compile(1, &cores);
    fx.render();

    let commands = fx.device.commands();
    let bind = commands
        .iter()
        .position(|c| matches!(c, GpuCommand::BindRenderTarget(_)))
        .unwrap();
    let draw = commands
        .iter()
        .position(|c| matches!(c, GpuCommand::Draw { .. }))
        .unwrap();
    assert!(bind < draw);
    assert!(commands[draw..].contains(&GpuCommand::BindTarget(None)));
}

// ============================================================================
// Pick List
// ============================================================================

#[test]
fn pick_list_skips_draw_only_chunks() {
    let mut fx = Fixture::new();
    let cores = fx.cores(1);
    fx.compile(1, &cores);
    fx.render();

    assert_eq!(fx.pick_count(ChunkKind::Material), 0);
    assert_eq!(fx.pick_count(ChunkKind::Name), 1);
    assert_eq!(fx.pick_count(ChunkKind::Draw), 1);
    assert_eq!(fx.image_count(ChunkKind::Name), 0);
}

#[test]
fn unpickable_stage_and_flags_leave_pick_list() {
    let mut fx = Fixture::new();
    let mut overlay = fx.cores(1);
    overlay.stage = CoreRef::new(StageCore::new(0, false));
    let mut ghost = fx.cores(2);
    ghost.flags = CoreRef::new(FlagsCore {
        picking: false,
        ..FlagsCore::default()
    });
    let mut unnamed = fx.cores(3);
    unnamed.name = CoreRef::Absent;
    let pickable = fx.cores(4);

    fx.compile(1, &overlay);
    fx.compile(2, &ghost);
    fx.compile(3, &unnamed);
    fx.compile(4, &pickable);
    fx.render();

    assert_eq!(fx.image_count(ChunkKind::Draw), 4);
    assert_eq!(fx.pick_count(ChunkKind::Draw), 1);
    assert_eq!(fx.pick_count(ChunkKind::Name), 1);
}
