//! Behaviour switches for loading and animating alias models
//!
//! These mirror the console variables an engine exposes for its model code.
//! The core never registers or reads them itself: the caller builds an
//! [`AliasConfig`] and hands it to the loader and the animation entry points.

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Implementation used for skeletal vertex blending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum SkinningBackend {
    /// Plain scalar loop, available everywhere
    Generic,
    /// Column-vector SIMD loop, used when the CPU supports it
    #[default]
    Vectorized,
}

/// Configuration consumed by the loaders, the vertex blender and tag queries
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct AliasConfig {
    /// Preferred skeletal blending implementation
    pub skinning_backend: SkinningBackend,
    /// Keep scale factors in tag matrices; when false they are renormalized
    pub support_tag_scale: bool,
    /// Non-empty value overrides the animated classification of every model
    pub force_animated: String,
    /// Bone whose matrix gets perturbed for debugging (-1 disables)
    pub debug_bone: i32,
    /// Matrix component (modulo 12) perturbed on the debug bone
    pub debug_bone_component: i32,
    /// Offset added to the perturbed component
    pub debug_bone_value: f32,
    /// Multipliers applied to the translation column of every skeletal bone
    pub debug_translate: [f32; 3],
    /// Models whose name occurs in this list have interpolation disabled
    pub no_lerp_list: String,
    /// Weight face normals by triangle area when building vertex normals
    pub smooth_normals_area_weighting: bool,
    /// Upper bound on numbered external skins probed for MDL models
    pub max_external_skins: usize,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            skinning_backend: SkinningBackend::Vectorized,
            support_tag_scale: true,
            force_animated: String::new(),
            debug_bone: -1,
            debug_bone_component: 3,
            debug_bone_value: 100.0,
            debug_translate: [1.0, 1.0, 1.0],
            no_lerp_list: String::new(),
            smooth_normals_area_weighting: true,
            max_external_skins: 256,
        }
    }
}

impl AliasConfig {
    /// Create a configuration with engine defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the skeletal blending implementation
    pub fn with_skinning_backend(mut self, backend: SkinningBackend) -> Self {
        self.skinning_backend = backend;
        self
    }

    /// Enable or disable scale in tag matrices
    pub fn with_tag_scale(mut self, enabled: bool) -> Self {
        self.support_tag_scale = enabled;
        self
    }

    /// Set the animated classification override
    pub fn with_force_animated(mut self, value: impl Into<String>) -> Self {
        self.force_animated = value.into();
        self
    }

    /// Set the no-interpolation model list
    pub fn with_no_lerp_list(mut self, list: impl Into<String>) -> Self {
        self.no_lerp_list = list.into();
        self
    }

    /// Configure the debug bone perturbation
    pub fn with_debug_bone(mut self, bone: i32, component: i32, value: f32) -> Self {
        self.debug_bone = bone;
        self.debug_bone_component = component;
        self.debug_bone_value = value;
        self
    }

    /// Set the skeletal translation multipliers
    pub fn with_debug_translate(mut self, translate: [f32; 3]) -> Self {
        self.debug_translate = translate;
        self
    }

    /// Set the cap for the numbered external skin probe
    pub fn with_max_external_skins(mut self, max: usize) -> Self {
        self.max_external_skins = max;
        self
    }

    /// Resolved override of the animated classification
    ///
    /// `None` when no override is configured. The value is read the way the
    /// engine reads integer cvars: leading digits with optional sign, anything
    /// unparsable counts as zero.
    pub fn forced_animated(&self) -> Option<bool> {
        if self.force_animated.is_empty() {
            return None;
        }
        Some(parse_leading_int(&self.force_animated) != 0)
    }

    /// Whether interpolation is disabled for the named model
    pub fn is_no_lerp(&self, model_name: &str) -> bool {
        !model_name.is_empty() && self.no_lerp_list.contains(model_name)
    }

    /// Whether the debug perturbation targets this bone
    pub(crate) fn is_debug_bone(&self, bone: usize) -> bool {
        usize::try_from(self.debug_bone).is_ok_and(|b| b == bone)
    }

    /// Component index of the debug perturbation, wrapped into `0..12`
    pub(crate) fn debug_component(&self) -> usize {
        self.debug_bone_component.rem_euclid(12) as usize
    }
}

fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative { -value } else { value }
}
