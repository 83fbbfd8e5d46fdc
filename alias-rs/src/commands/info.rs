//! Model summary

use anyhow::Result;
use std::path::Path;

use super::load_file;
use crate::utils::{ListTable, format_bytes, format_vec3};

pub fn execute(path: &Path, detailed: bool) -> Result<()> {
    let (model, size) = load_file(path)?;

    println!("=== {} Model Information ===", model.format);
    println!("File: {} ({})", path.display(), format_bytes(size));
    println!("Vertices: {}", model.mesh.num_vertices());
    println!("Triangles: {}", model.mesh.num_triangles());
    println!("Surfaces: {}", model.surfaces.len());
    println!("Skins: {}", model.num_skins());
    println!("Frames: {}", model.num_poses());
    println!("Bones: {}", model.num_bones());
    println!("Tags: {}", model.num_attachment_points());
    println!("Animated: {}", if model.is_animated() { "yes" } else { "no" });

    let bounds = model.bounds();
    println!(
        "Bounds: {} - {}",
        format_vec3(bounds.normal_mins),
        format_vec3(bounds.normal_maxs)
    );
    println!("Radius: {:.3}", bounds.radius);

    if !detailed {
        return Ok(());
    }

    println!("\n=== Scenes ===");
    let mut table = ListTable::new(&["#", "Name", "First", "Count", "Rate", "Loop"]);
    for (i, scene) in model.frame_scenes.iter().enumerate() {
        table.push([
            i.to_string(),
            scene.name.clone(),
            scene.first_frame.to_string(),
            scene.frame_count.to_string(),
            format!("{:.1}", scene.frame_rate),
            scene.looping.to_string(),
        ]);
    }
    table.print();

    println!("\n=== Surfaces ===");
    let mut table = ListTable::new(&["#", "Name", "Triangles", "Vertices", "Material"]);
    for (i, surface) in model.surfaces().iter().enumerate() {
        let material = model.surface_material(surface).map_or("-", |m| m.name.as_str());
        table.push([
            i.to_string(),
            surface.name.clone(),
            surface.num_triangles.to_string(),
            surface.num_vertices.to_string(),
            material.to_string(),
        ]);
    }
    table.print();

    if model.num_bones() > 0 {
        println!("\n=== Bones ===");
        let mut table = ListTable::new(&["#", "Name", "Parent"]);
        for (i, bone) in model.bones().iter().enumerate() {
            table.push([i.to_string(), bone.name.clone(), bone.parent.to_string()]);
        }
        table.print();
    }

    Ok(())
}
