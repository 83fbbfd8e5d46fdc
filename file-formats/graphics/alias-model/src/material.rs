//! Materials and the interface to the engine's texture system
//!
//! The core never decodes images or parses shader scripts. Loaders ask a
//! [`MaterialLibrary`] for a material by name and store whatever comes back in
//! the model's skin table.

use bitflags::bitflags;

bitflags! {
    /// Rendering properties of a material
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serde-support",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct MaterialFlags: u32 {
        /// Ordinary opaque surface
        const WALL = 0x0000_0001;
        /// Not drawn at all
        const NODRAW = 0x0000_0002;
        /// Casts no shadow
        const NOSHADOW = 0x0000_0004;
        /// Alpha tested
        const ALPHATEST = 0x0000_0008;
        /// Additive blending
        const ADD = 0x0000_0010;
        /// Alpha blending
        const ALPHA = 0x0000_0020;
        /// Custom blend function
        const CUSTOMBLEND = 0x0000_0040;
        /// Fullbright, ignores lighting
        const FULLBRIGHT = 0x0000_0080;
        /// Two-sided
        const NOCULLFACE = 0x0000_0100;

        /// Any flag that lets geometry behind the surface show through
        const TRANSLUCENT = Self::ADD.bits() | Self::ALPHA.bits() | Self::CUSTOMBLEND.bits();
    }
}

bitflags! {
    /// Collision contents reported by surfaces
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serde-support",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct SuperContents: u32 {
        const SOLID = 0x0000_0001;
        const WATER = 0x0000_0002;
        const SLIME = 0x0000_0004;
        const LAVA = 0x0000_0008;
        const SKY = 0x0000_0010;
        const BODY = 0x0000_0020;
        const CORPSE = 0x0000_0040;
        const NODROP = 0x0000_0080;
        const PLAYERCLIP = 0x0000_0100;
        const MONSTERCLIP = 0x0000_0200;
        const BOTCLIP = 0x0000_0400;
        /// Blocks light and sight
        const OPAQUE = 0x0000_0800;
    }
}

/// One resolved skin entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Material {
    pub name: String,
    pub flags: MaterialFlags,
    pub contents: SuperContents,
}

impl Material {
    /// Opaque, solid material
    pub fn wall(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: MaterialFlags::WALL,
            contents: SuperContents::SOLID,
        }
    }

    /// Placeholder for a skin that could not be resolved
    pub fn missing(name: impl Into<String>) -> Self {
        Self::wall(name)
    }

    /// Placeholder for a mesh a skin file does not mention
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: MaterialFlags::NODRAW | MaterialFlags::NOSHADOW,
            contents: SuperContents::SOLID,
        }
    }

    pub fn is_translucent(&self) -> bool {
        self.flags.intersects(MaterialFlags::TRANSLUCENT)
    }

    /// Contents a triangle with this material reports to traces
    pub fn surface_contents(&self) -> SuperContents {
        if self.is_translucent() {
            SuperContents::SOLID
        } else {
            SuperContents::SOLID | SuperContents::OPAQUE
        }
    }
}

/// Engine texture and shader lookup used by the loaders
pub trait MaterialLibrary {
    /// Material defined by a shader script, if one exists under `name`
    fn load_shader(&mut self, model: &str, name: &str) -> Option<Material>;

    /// Material built from an 8-bit palettized image embedded in the model
    fn load_internal_skin(&mut self, name: &str, pixels: &[u8], width: usize, height: usize)
    -> Material;

    /// Material from a separate image file, if it exists
    fn load_external_skin(&mut self, name: &str) -> Option<Material>;

    /// Skin files shipped next to the model (`model_0.skin`, `model_1.skin`, ...)
    fn load_skin_files(&mut self, model: &str) -> Vec<SkinFile>;

    /// Material used when nothing else resolves
    fn missing(&mut self, name: &str) -> Material {
        Material::missing(name)
    }

    /// Shader lookup that falls back to a plain image material
    fn resolve(&mut self, model: &str, name: &str) -> Material {
        self.load_shader(model, name)
            .unwrap_or_else(|| Material::wall(name))
    }
}

/// Library without any assets: no shaders, no external images, no skin files
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMaterialLibrary;

impl MaterialLibrary for NullMaterialLibrary {
    fn load_shader(&mut self, _model: &str, _name: &str) -> Option<Material> {
        None
    }

    fn load_internal_skin(
        &mut self,
        name: &str,
        _pixels: &[u8],
        _width: usize,
        _height: usize,
    ) -> Material {
        Material::wall(name)
    }

    fn load_external_skin(&mut self, _name: &str) -> Option<Material> {
        None
    }

    fn load_skin_files(&mut self, _model: &str) -> Vec<SkinFile> {
        Vec::new()
    }
}

/// One `mesh,replacement` line of a skin file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinFileItem {
    pub mesh: String,
    pub replacement: String,
}

/// Per-mesh texture replacements for one skin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkinFile {
    pub items: Vec<SkinFileItem>,
}

impl SkinFile {
    /// Parse skin file text
    ///
    /// Accepts `mesh,replacement` and `replace mesh replacement` lines.
    /// Attachment lines (`tag_*`) and anything unrecognized are skipped.
    pub fn parse(text: &str) -> Self {
        let mut items = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let (mesh, replacement) = if let Some(rest) = line.strip_prefix("replace ") {
                let mut words = rest.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(mesh), Some(replacement)) => (mesh, replacement),
                    _ => continue,
                }
            } else if let Some((mesh, replacement)) = line.split_once(',') {
                (mesh.trim(), replacement.trim())
            } else {
                continue;
            };
            if mesh.is_empty() || mesh.starts_with("tag_") {
                continue;
            }
            items.push(SkinFileItem {
                mesh: mesh.to_string(),
                replacement: replacement.to_string(),
            });
        }
        Self { items }
    }

    /// Replacement for a mesh, exact name match
    pub fn replacement_for(&self, mesh: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.mesh == mesh)
            .map(|item| item.replacement.as_str())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["tga", "png", "jpg", "jpeg", "pcx", "wal", "lmp", "dds", "bmp"];

/// Drop a trailing image file extension, keeping any other suffix
pub fn strip_image_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !ext.contains('/')
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem
        }
        _ => name,
    }
}

/// Build one skin's material for a mesh from skin files or its default shader
///
/// With skin files, every file yields one material: the replacement named for
/// `mesh`, or a hidden placeholder when the file does not mention it. Without
/// skin files the single result comes from `default_shader`.
pub(crate) fn materials_for_mesh(
    library: &mut dyn MaterialLibrary,
    model: &str,
    skin_files: &[SkinFile],
    mesh: &str,
    default_shader: &str,
) -> Vec<Material> {
    if skin_files.is_empty() {
        log::trace!("{model}: using default shader {default_shader} for {mesh}");
        return vec![library.resolve(model, strip_image_extension(default_shader))];
    }
    skin_files
        .iter()
        .map(|skin| match skin.replacement_for(mesh) {
            Some(replacement) => library.resolve(model, strip_image_extension(replacement)),
            None => {
                log::warn!("{model}: skin file does not mention mesh {mesh}, it will not be drawn");
                Material::hidden(mesh)
            }
        })
        .collect()
}
