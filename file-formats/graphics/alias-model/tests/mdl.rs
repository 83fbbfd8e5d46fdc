//! Loading Quake `.mdl` files end to end

mod common;

use alias_model::{
    AliasConfig, AliasError, Animator, BoneScratch, FrameBlend, LoadContext, Material,
    ModelFormat, SkinFile, SyncType, load_model,
};
use common::{MdlBuilder, TestLibrary, load, load_with};
use glam::{Vec2, Vec3};
use pretty_assertions::assert_eq;

#[test]
fn test_quad_loads() {
    let model = load("progs/quad.mdl", &MdlBuilder::quad().build()).unwrap();

    assert_eq!(model.format, ModelFormat::Mdl);
    assert_eq!(model.animator, Animator::MdlMorph);
    assert_eq!(model.sync_type, SyncType::Sync);
    assert_eq!(model.mesh.num_vertices(), 4);
    assert_eq!(model.mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    assert_eq!(model.surfaces.len(), 1);
    assert_eq!(model.surfaces[0].name, "default");
    assert_eq!(model.mesh.vertices[2], Vec3::new(10.0, 10.0, 0.0));
    assert_eq!(model.mesh.texcoords[1], Vec2::new(0.5, 0.0));
    assert_eq!(model.num_poses(), 1);
    assert!(!model.is_animated());
    assert_eq!(model.bounds.normal_maxs, Vec3::new(10.0, 10.0, 0.0));
    assert_eq!(model.mesh.short_triangles.as_ref().map(Vec::len), Some(2));
}

#[test]
fn test_back_facing_seam_vertex_gets_shifted_copy() {
    let mut builder = MdlBuilder::quad();
    builder.verts[0].0 = true;
    builder.tris[1].0 = false;
    let model = load("progs/seam.mdl", &builder.build()).unwrap();

    // Between the original count and twice it
    let n = model.mesh.num_vertices();
    assert_eq!(n, 5);
    assert!((4..=8).contains(&n));
    let copy = model.mesh.triangles[1][0] as usize;
    assert_eq!(copy, 4);
    assert_eq!(model.mesh.texcoords[copy], model.mesh.texcoords[0] + Vec2::new(0.5, 0.0));
    // Both copies share the position
    assert_eq!(model.mesh.vertices[copy], model.mesh.vertices[0]);
}

#[test]
fn test_frames_become_scenes() {
    let mut builder = MdlBuilder::quad();
    let moved = vec![[0, 0, 8], [10, 0, 8], [10, 10, 8], [0, 10, 8]];
    builder.frames.push(("walk1".into(), moved));
    let model = load("progs/walk.mdl", &builder.build()).unwrap();

    assert_eq!(model.frame_scenes.len(), 2);
    assert_eq!(model.frame_scenes[1].name, "walk1");
    assert_eq!(model.frame_scenes[1].first_frame, 1);
    assert_eq!(model.frame_scenes[1].frame_count, 1);
    assert!((model.frame_scenes[1].frame_rate - 10.0).abs() < 1e-4);
    assert!(model.is_animated());
    assert_eq!(model.bounds.normal_maxs.z, 8.0);

    let mut scratch = BoneScratch::new();
    let half = model.animate_vertices(&FrameBlend::lerp(0, 1, 0.5), None, &mut scratch);
    assert!((half[0].z - 4.0).abs() < 1e-4);
}

#[test]
fn test_forced_animated_classification() {
    let mut builder = MdlBuilder::quad();
    builder.frames.push(("walk1".into(), builder.frames[0].1.clone()));

    let model = load("progs/still.mdl", &builder.build()).unwrap();
    assert!(!model.is_animated());

    let config = AliasConfig::new().with_force_animated("1");
    let model = load_with("progs/still.mdl", &builder.build(), config).unwrap();
    assert!(model.is_animated());
}

#[test]
fn test_scale_and_origin_apply() {
    let mut builder = MdlBuilder::quad();
    builder.scale = [0.5, 0.5, 2.0];
    builder.origin = [-4.0, 1.0, 3.0];
    builder.frames[0].1[2] = [10, 10, 1];
    let model = load("progs/scaled.mdl", &builder.build()).unwrap();
    assert_eq!(model.mesh.vertices[2], Vec3::new(1.0, 6.0, 5.0));
}

#[test]
fn test_embedded_skins_are_named_after_the_model() {
    let mut builder = MdlBuilder::quad();
    builder.num_skins = 2;
    let mut library = TestLibrary::default();
    let mut ctx = LoadContext::new(&mut library);
    let model = load_model("progs/ogre.mdl", &builder.build(), &mut ctx).unwrap();

    assert_eq!(model.num_skins(), 2);
    assert_eq!(model.textures_for_skin(1)[0].name, "progs/ogre.mdl_1");
    assert!(library.requests.contains(&"internal progs/ogre.mdl_0 8x8 64".to_string()));
    // The numbered image probe stops at the first miss
    assert!(library.requests.contains(&"external progs/ogre.mdl_2".to_string()));
}

#[test]
fn test_external_skins_extend_the_table() {
    let mut library = TestLibrary::default();
    library
        .external
        .insert("progs/ogre.mdl_1".into(), Material::wall("ogre_red"));
    let mut ctx = LoadContext::new(&mut library);
    let model = load_model("progs/ogre.mdl", &MdlBuilder::quad().build(), &mut ctx).unwrap();
    assert_eq!(model.num_skins(), 2);
    assert_eq!(model.textures_for_skin(1)[0].name, "ogre_red");
}

#[test]
fn test_skin_files_replace_embedded_skins() {
    let mut library = TestLibrary::default();
    library.skin_files = vec![
        SkinFile::parse("default,progs/ogre_blue.tga"),
        SkinFile::parse("other,progs/unused"),
    ];
    let mut ctx = LoadContext::new(&mut library);
    let model = load_model("progs/ogre.mdl", &MdlBuilder::quad().build(), &mut ctx).unwrap();
    assert_eq!(model.num_skins(), 2);
    assert_eq!(model.textures_for_skin(0)[0].name, "progs/ogre_blue");
    assert!(model.textures_for_skin(1)[0]
        .flags
        .contains(alias_model::MaterialFlags::NODRAW));
}

#[test]
fn test_model_without_skins_gets_missing_material() {
    let mut builder = MdlBuilder::quad();
    builder.num_skins = 0;
    let model = load("progs/bare.mdl", &builder.build()).unwrap();
    assert_eq!(model.num_skins(), 1);
    assert_eq!(model.textures, vec![Material::missing("progs/bare.mdl")]);
}

#[test]
fn test_header_flags_become_effects() {
    let mut builder = MdlBuilder::quad();
    builder.flags = 0x08;
    let model = load("progs/rocket.mdl", &builder.build()).unwrap();
    assert_eq!(model.effects, 0x0800_0000);
}

#[test]
fn test_no_lerp_list() {
    let config = AliasConfig::new().with_no_lerp_list("progs/flame.mdl progs/flame2.mdl");
    let model = load_with("progs/flame.mdl", &MdlBuilder::quad().build(), config.clone()).unwrap();
    assert!(model.no_lerp);
    let model = load_with("progs/quad.mdl", &MdlBuilder::quad().build(), config).unwrap();
    assert!(!model.no_lerp);
}

#[test]
fn test_wrong_version() {
    let mut bytes = MdlBuilder::quad().build();
    bytes[4] = 5;
    let err = load("progs/old.mdl", &bytes).unwrap_err();
    assert!(matches!(err, AliasError::UnsupportedVersion { version: 5, .. }), "{err}");
}

#[test]
fn test_negative_vertex_count() {
    let mut builder = MdlBuilder::quad();
    builder.verts.clear();
    let mut bytes = builder.build();
    // numverts lives after ident, version, scale, origin, radius, eye, numskins, w, h
    let at = 4 + 4 + 12 + 12 + 4 + 12 + 12;
    bytes[at..at + 4].copy_from_slice(&(-3i32).to_le_bytes());
    let err = load("progs/bad.mdl", &bytes).unwrap_err();
    assert!(
        matches!(err, AliasError::InvalidCount { field: "numverts", value: -3, .. }),
        "{err}"
    );
}

#[test]
fn test_truncated_frames() {
    let mut bytes = MdlBuilder::quad().build();
    bytes.truncate(bytes.len() - 6);
    let err = load("progs/cut.mdl", &bytes).unwrap_err();
    assert!(matches!(err, AliasError::OutOfBounds { .. }), "{err}");
    assert_eq!(err.model(), Some("progs/cut.mdl"));
}

#[test]
fn test_triangles_without_vertices_rejected() {
    let mut builder = MdlBuilder::quad();
    builder.verts.clear();
    builder.tris = vec![(true, [0, 0, 0])];
    builder.frames = vec![("stand1".into(), Vec::new())];
    let err = load("progs/hollow.mdl", &builder.build()).unwrap_err();
    assert!(matches!(err, AliasError::Validation { .. }), "{err}");
}
