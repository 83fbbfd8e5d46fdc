//! Model validation

use anyhow::Result;
use std::path::Path;

use super::load_file;

pub fn execute(path: &Path) -> Result<()> {
    let (model, _) = load_file(path)?;
    log::info!("{} loaded as {}", path.display(), model.format);
    println!(
        "✓ {} is a valid {} model ({} vertices, {} triangles)",
        path.display(),
        model.format,
        model.mesh.num_vertices(),
        model.mesh.num_triangles()
    );
    Ok(())
}
