//! Tag and bone listing

use alias_model::FrameBlend;
use anyhow::Result;
use std::path::Path;

use super::load_file;
use crate::utils::{ListTable, format_vec3};

pub fn execute(path: &Path, frame: usize) -> Result<()> {
    let (model, _) = load_file(path)?;
    let count = model.num_attachment_points();
    if count == 0 {
        println!("{} has no tags", path.display());
        return Ok(());
    }

    let blend = FrameBlend::single(frame);
    let mut table = ListTable::new(&["#", "Name", "Parent", "Origin"]);
    for index in 0..count {
        let info = model.get_extended_tag_info(0, &blend, None, index)?;
        let origin = model.get_tag_matrix(&blend, None, index)?.origin();
        table.push([
            (index + 1).to_string(),
            info.name.to_string(),
            info.parent.to_string(),
            format_vec3(origin),
        ]);
    }
    println!("Tags at frame {frame}:");
    table.print();
    Ok(())
}
