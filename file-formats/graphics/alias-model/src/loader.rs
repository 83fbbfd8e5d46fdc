//! Format detection and the state threaded through a load

use crate::config::AliasConfig;
use crate::error::{AliasError, Result};
use crate::formats::{iqm, md2, md3, mdl};
use crate::material::MaterialLibrary;
use crate::model::AliasModel;

/// Everything a loader needs besides the file bytes
pub struct LoadContext<'a> {
    pub config: AliasConfig,
    pub materials: &'a mut dyn MaterialLibrary,
}

impl<'a> LoadContext<'a> {
    /// Context with the default configuration
    pub fn new(materials: &'a mut dyn MaterialLibrary) -> Self {
        Self {
            config: AliasConfig::default(),
            materials,
        }
    }

    pub fn with_config(mut self, config: AliasConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for LoadContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Load a model of any supported format, chosen by its identifier
///
/// `name` is used in error messages, for skin file lookup and for the
/// generated names of embedded skins.
pub fn load_model(name: &str, data: &[u8], ctx: &mut LoadContext<'_>) -> Result<AliasModel> {
    if data.starts_with(&mdl::IDENT) {
        log::debug!("{name}: detected MDL");
        mdl::load(name, data, ctx)
    } else if data.starts_with(&md2::IDENT) {
        log::debug!("{name}: detected MD2");
        md2::load(name, data, ctx)
    } else if data.starts_with(&md3::IDENT) {
        log::debug!("{name}: detected MD3");
        md3::load(name, data, ctx)
    } else if data.starts_with(iqm::MAGIC) {
        log::debug!("{name}: detected IQM");
        iqm::load(name, data, ctx)
    } else {
        let actual = &data[..data.len().min(4)];
        Err(AliasError::InvalidMagic {
            expected: "IDPO, IDP2, IDP3 or INTERQUAKEMODEL".to_string(),
            actual: String::from_utf8_lossy(actual).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::NullMaterialLibrary;

    #[test]
    fn test_unknown_magic() {
        let mut library = NullMaterialLibrary;
        let mut ctx = LoadContext::new(&mut library);
        let err = load_model("junk.bin", b"RIFF\0\0\0\0", &mut ctx).unwrap_err();
        assert!(matches!(err, AliasError::InvalidMagic { ref actual, .. } if actual == "RIFF"));

        let err = load_model("empty", b"", &mut ctx).unwrap_err();
        assert!(matches!(err, AliasError::InvalidMagic { .. }));
    }

    #[test]
    fn test_truncated_header_is_out_of_bounds() {
        let mut library = NullMaterialLibrary;
        let mut ctx = LoadContext::new(&mut library);
        for data in [&b"IDPO\x06\0\0\0"[..], b"IDP2", b"IDP3\x0f\0\0\0", b"INTERQUAKEMODEL\0"] {
            let err = load_model("short", data, &mut ctx).unwrap_err();
            assert!(matches!(err, AliasError::OutOfBounds { .. }), "{err}");
            assert_eq!(err.model(), Some("short"));
        }
    }
}
