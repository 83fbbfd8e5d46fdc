//! Runtime CPU detection for the vectorized skinning path
//!
//! The vectorized skinning loop works on 16-byte aligned column vectors
//! (`glam::Vec3A`), which map onto SSE2 registers on x86-64 and NEON registers
//! on ARM64. Other targets use the scalar loop.

use std::sync::LazyLock;

use crate::config::SkinningBackend;

/// CPU capabilities detected at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuFeatures {
    /// SSE2 support (baseline on x86-64)
    pub has_sse2: bool,
    /// SSE4.1 support for dot-product instructions
    pub has_sse41: bool,
    /// AVX2 support for 256-bit vector operations
    pub has_avx2: bool,
    /// ARM NEON support (ARM64 only)
    pub has_neon: bool,
}

impl Default for CpuFeatures {
    fn default() -> Self {
        detect_cpu_features()
    }
}

impl CpuFeatures {
    /// Whether column-vector skinning runs in vector registers
    pub fn supports_vector_skinning(&self) -> bool {
        self.has_sse2 || self.has_neon
    }
}

static FEATURES: LazyLock<CpuFeatures> = LazyLock::new(|| {
    let features = detect_cpu_features();
    log::debug!(
        "Skeletal animation uses {} code path",
        if features.supports_vector_skinning() {
            "vectorized"
        } else {
            "generic"
        }
    );
    features
});

/// Features of the running CPU, detected once
pub fn cpu_features() -> CpuFeatures {
    *FEATURES
}

/// Backend actually used for a requested one
///
/// A vectorized request falls back to the generic loop on CPUs without
/// vector support.
pub fn resolve_backend(requested: SkinningBackend) -> SkinningBackend {
    match requested {
        SkinningBackend::Vectorized if cpu_features().supports_vector_skinning() => {
            SkinningBackend::Vectorized
        }
        _ => SkinningBackend::Generic,
    }
}

/// Runtime CPU feature detection
fn detect_cpu_features() -> CpuFeatures {
    #[cfg(target_arch = "x86_64")]
    {
        CpuFeatures {
            has_sse2: is_x86_feature_detected!("sse2"),
            has_sse41: is_x86_feature_detected!("sse4.1"),
            has_avx2: is_x86_feature_detected!("avx2"),
            has_neon: false,
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        CpuFeatures {
            has_sse2: false,
            has_sse41: false,
            has_avx2: false,
            has_neon: std::arch::is_aarch64_feature_detected!("neon"),
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        CpuFeatures {
            has_sse2: false,
            has_sse41: false,
            has_avx2: false,
            has_neon: false,
        }
    }
}
