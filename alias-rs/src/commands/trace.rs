//! Line trace against a posed model

use alias_model::{FrameBlend, TraceMasks};
use anyhow::Result;
use glam::Vec3;
use std::path::Path;

use super::load_file;
use crate::utils::format_vec3;

pub fn execute(path: &Path, start: [f32; 3], end: [f32; 3], frame: usize) -> Result<()> {
    let (model, _) = load_file(path)?;
    let (start, end) = (Vec3::from(start), Vec3::from(end));
    let trace = model.trace_line(
        &FrameBlend::single(frame),
        None,
        start,
        end,
        TraceMasks::default(),
    );

    if trace.hit() {
        println!("Hit at fraction {:.6}", trace.fraction);
        println!("Impact: {}", format_vec3(trace.end_position));
        println!("Normal: {}", format_vec3(trace.plane_normal));
        if let Some(texture) = trace.hit_texture {
            println!("Texture: {texture}");
        }
    } else {
        println!("No hit (fraction 1)");
        println!("End: {}", format_vec3(trace.end_position));
    }
    Ok(())
}
