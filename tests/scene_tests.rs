//! State Core Tests
//!
//! Tests for:
//! - Primitive parsing and the triangles fallback
//! - GeometryDesc validation
//! - Ambient derivation from light lists
//! - Shader-relevant hashing feeding program selection
//! - Geometry / morph-geometry chunk pairing

use glam::{Mat4, Vec3};

use myth_display::renderer::device::{GeometryHandle, GpuCommand};
use myth_display::renderer::{ChunkKind, Display, DisplaySettings};
use myth_display::scene::{
    ActiveCores, Clip, ClipMode, ClipsCore, CoreRef, GeometryDesc, Light, LightsCore,
    ModelTransformCore, MorphGeometryCore, Primitive, VertexAttributes,
};
use myth_display::{DisplayError, ObjectId, RecordingDevice, RenderOptions, derive_ambient};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn geometry(primitive: &str) -> GeometryDesc {
    GeometryDesc {
        primitive: Some(primitive.to_string()),
        buffers: Some(GeometryHandle(5)),
        element_count: Some(12),
        indexed: true,
        attributes: VertexAttributes::NORMALS,
    }
}

// ============================================================================
// Primitives & Geometry
// ============================================================================

#[test]
fn primitive_names_map_to_topologies() {
    assert_eq!(
        Primitive::parse("line-strip").unwrap().topology(),
        wgpu::PrimitiveTopology::LineStrip
    );
    assert_eq!(
        Primitive::parse("points").unwrap().topology(),
        wgpu::PrimitiveTopology::PointList
    );
}

#[test]
fn unsupported_primitive_is_reported() {
    let err = Primitive::parse("triangle-fan").unwrap_err();
    assert!(matches!(err, DisplayError::UnsupportedPrimitive(name) if name == "triangle-fan"));
}

#[test]
fn unsupported_primitive_falls_back_to_triangles() {
    init_logger();
    assert_eq!(Primitive::parse_or_default("line-loop"), Primitive::Triangles);

    let built = geometry("quads").build().unwrap();
    assert_eq!(built.core.primitive, Primitive::Triangles);
    assert_eq!(built.core.element_count, 12);
    assert!(matches!(
        built.fallback,
        Some(DisplayError::UnsupportedPrimitive(name)) if name == "quads"
    ));
}

#[test]
fn supported_primitive_reports_no_fallback() {
    let built = geometry("triangle-strip").build().unwrap();
    assert_eq!(built.core.primitive, Primitive::TriangleStrip);
    assert!(built.fallback.is_none());

    let unnamed = GeometryDesc {
        primitive: None,
        ..geometry("points")
    };
    let built = unnamed.build().unwrap();
    assert_eq!(built.core.primitive, Primitive::Triangles);
    assert!(built.fallback.is_none());
}

#[test]
fn geometry_without_buffers_is_rejected() {
    let desc = GeometryDesc {
        buffers: None,
        ..geometry("triangles")
    };
    assert!(matches!(
        desc.build(),
        Err(DisplayError::MissingGeometryField {
            field: "buffers",
            ..
        })
    ));

    let desc = GeometryDesc {
        element_count: None,
        ..geometry("triangles")
    };
    assert!(matches!(
        desc.build(),
        Err(DisplayError::MissingGeometryField {
            field: "element_count",
            ..
        })
    ));
}

#[test]
fn primitive_reaches_draw_call() {
    let mut device = RecordingDevice::new(10, 10);
    let mut display = Display::new(DisplaySettings::default());
    let cores = ActiveCores {
        geometry: CoreRef::new(geometry("lines").build().unwrap().core),
        ..ActiveCores::default()
    };
    display.compile_object(&mut device, ObjectId(1), &cores).unwrap();
    display
        .render(&mut device, RenderOptions::default())
        .unwrap();

    assert!(device.commands().contains(&GpuCommand::Draw {
        topology: wgpu::PrimitiveTopology::LineList,
        count: 12,
        indexed: true,
    }));
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn ambient_is_first_ambient_light() {
    let lights = LightsCore::new([
        Light::point(Vec3::ONE, Vec3::Y),
        Light::ambient(Vec3::new(0.1, 0.2, 0.3)),
        Light::ambient(Vec3::ONE),
    ]);
    assert_eq!(derive_ambient(&lights), Some(Vec3::new(0.1, 0.2, 0.3)));
}

#[test]
fn no_ambient_light_keeps_previous_ambient() {
    let mut device = RecordingDevice::new(10, 10);
    let mut display = Display::new(DisplaySettings::default());

    let lit = ActiveCores {
        lights: CoreRef::new(LightsCore::new([Light::ambient(Vec3::splat(0.25))])),
        ..ActiveCores::default()
    };
    display.compile_object(&mut device, ObjectId(1), &lit).unwrap();

    let directional = ActiveCores {
        lights: CoreRef::new(LightsCore::new([Light::directional(Vec3::ONE, Vec3::NEG_Y)])),
        ..ActiveCores::default()
    };
    display
        .compile_object(&mut device, ObjectId(2), &directional)
        .unwrap();

    assert_eq!(display.ambient_color(), Vec3::splat(0.25));
}

// ============================================================================
// Shader-Relevant Hashing
// ============================================================================

#[test]
fn clip_count_selects_program_but_clip_distance_does_not() {
    let mut device = RecordingDevice::new(10, 10);
    let mut display = Display::new(DisplaySettings::default());
    let clip = |distance: f32| Clip {
        normal: Vec3::X,
        distance,
        mode: ClipMode::Inside,
    };

    let one = ActiveCores {
        clips: CoreRef::new(ClipsCore::new([clip(1.0)])),
        ..ActiveCores::default()
    };
    let one_moved = ActiveCores {
        clips: CoreRef::new(ClipsCore::new([clip(4.0)])),
        ..ActiveCores::default()
    };
    let two = ActiveCores {
        clips: CoreRef::new(ClipsCore::new([clip(1.0), clip(2.0)])),
        ..ActiveCores::default()
    };

    display.compile_object(&mut device, ObjectId(1), &one).unwrap();
    display.compile_object(&mut device, ObjectId(2), &one_moved).unwrap();
    display.compile_object(&mut device, ObjectId(3), &two).unwrap();

    let program = |id| display.object(ObjectId(id)).unwrap().program;
    assert_eq!(program(1), program(2));
    assert_ne!(program(1), program(3));
    assert_eq!(display.programs().len(), 2);
}

#[test]
fn morph_geometry_pairs_with_geometry_chunk() {
    let mut device = RecordingDevice::new(10, 10);
    let mut display = Display::new(DisplaySettings::default());
    let base = CoreRef::new(geometry("triangles").build().unwrap().core);
    let morph = CoreRef::new(MorphGeometryCore::new(
        [GeometryHandle(6), GeometryHandle(7)],
        0.5,
    ));

    let plain = ActiveCores {
        model_transform: CoreRef::new(ModelTransformCore::new(Mat4::IDENTITY)),
        geometry: base.clone(),
        ..ActiveCores::default()
    };
    let morphed = ActiveCores {
        morph_geometry: morph.clone(),
        ..plain.clone()
    };
    display.compile_object(&mut device, ObjectId(1), &plain).unwrap();
    display.compile_object(&mut device, ObjectId(2), &morphed).unwrap();

    let slot = |id| {
        display
            .object(ObjectId(id))
            .unwrap()
            .chunk(ChunkKind::Geometry)
            .unwrap()
            .key
    };
    assert_eq!(slot(1).secondary, None);
    assert_eq!(slot(2).secondary, morph.state_id());
    assert_eq!(slot(2).core, base.state_id());
    // Morph targets change the program
    assert_ne!(slot(1).program, slot(2).program);
}
