//! Command implementations

pub mod info;
pub mod tags;
pub mod trace;
pub mod validate;

use alias_model::{AliasModel, LoadContext, NullMaterialLibrary, load_model};
use anyhow::{Context, Result};
use std::path::Path;

/// Read and load a model, naming it by the path as given
pub(crate) fn load_file(path: &Path) -> Result<(AliasModel, u64)> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path.display().to_string();
    let mut materials = NullMaterialLibrary;
    let mut ctx = LoadContext::new(&mut materials);
    let model = load_model(&name, &data, &mut ctx)
        .with_context(|| format!("Failed to load model from {}", path.display()))?;
    Ok((model, data.len() as u64))
}
