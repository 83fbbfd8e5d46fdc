//! Weighted frame selection for one animation evaluation

/// Capacity of a [`FrameBlend`]
pub const MAX_FRAME_BLENDS: usize = 8;

/// One weighted pose sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameBlendEntry {
    /// Index into the model's pose (frame) table
    pub subframe: usize,
    /// Weight of this sample, positive
    pub lerp: f32,
}

impl FrameBlendEntry {
    pub const fn new(subframe: usize, lerp: f32) -> Self {
        Self { subframe, lerp }
    }
}

const BASE_ENTRIES: [FrameBlendEntry; 1] = [FrameBlendEntry::new(0, 1.0)];

/// Up to [`MAX_FRAME_BLENDS`] weighted pose samples
///
/// The list has an explicit length. Entries with a non-positive weight are
/// never stored and entries beyond the capacity are dropped, so every stored
/// entry contributes. Weights are expected to sum to at most 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBlend {
    entries: [FrameBlendEntry; MAX_FRAME_BLENDS],
    len: usize,
}

impl Default for FrameBlend {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBlend {
    /// Empty blend
    ///
    /// Evaluating an empty blend behaves like [`FrameBlend::single`]`(0)`.
    pub const fn new() -> Self {
        Self {
            entries: [FrameBlendEntry::new(0, 0.0); MAX_FRAME_BLENDS],
            len: 0,
        }
    }

    /// One subframe at full weight
    pub fn single(subframe: usize) -> Self {
        let mut blend = Self::new();
        blend.push(subframe, 1.0);
        blend
    }

    /// Interpolate from `from` to `to` by `fraction`
    ///
    /// A fraction of 0 or 1 yields a single entry.
    pub fn lerp(from: usize, to: usize, fraction: f32) -> Self {
        let mut blend = Self::new();
        blend.push(from, 1.0 - fraction);
        blend.push(to, fraction);
        blend
    }

    /// Build from `(subframe, weight)` pairs, ignoring the ones that do not fit
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f32)>) -> Self {
        let mut blend = Self::new();
        for (subframe, lerp) in pairs {
            blend.push(subframe, lerp);
        }
        blend
    }

    /// Append an entry
    ///
    /// Returns false when the entry was ignored because its weight is not
    /// positive or the blend is full.
    pub fn push(&mut self, subframe: usize, lerp: f32) -> bool {
        if !(lerp > 0.0) || self.len >= MAX_FRAME_BLENDS {
            return false;
        }
        self.entries[self.len] = FrameBlendEntry::new(subframe, lerp);
        self.len += 1;
        true
    }

    /// Stored entries
    pub fn entries(&self) -> &[FrameBlendEntry] {
        &self.entries[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries to evaluate: the stored ones, or frame 0 at full weight
    pub fn effective_entries(&self) -> &[FrameBlendEntry] {
        if self.len == 0 {
            &BASE_ENTRIES
        } else {
            self.entries()
        }
    }

    /// Sum of all weights
    pub fn total_weight(&self) -> f32 {
        self.entries().iter().map(|e| e.lerp).sum()
    }

    /// Whether this selects exactly frame 0 with full weight
    ///
    /// Such a blend reproduces the static mesh, so queries can use data
    /// precomputed at load time.
    pub fn is_base_frame(&self) -> bool {
        match self.effective_entries() {
            [only] => only.subframe == 0 && only.lerp == 1.0,
            _ => false,
        }
    }

    /// Copy with every subframe clamped below `num_frames`
    pub fn clamped(&self, num_frames: usize) -> Self {
        let mut out = *self;
        let last = num_frames.saturating_sub(1);
        for entry in &mut out.entries[..out.len] {
            entry.subframe = entry.subframe.min(last);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_skips_non_positive_weights() {
        let mut blend = FrameBlend::new();
        assert!(!blend.push(3, 0.0));
        assert!(!blend.push(3, -0.5));
        assert!(!blend.push(3, f32::NAN));
        assert!(blend.push(4, 0.25));
        assert_eq!(blend.entries(), &[FrameBlendEntry::new(4, 0.25)]);
    }

    #[test]
    fn test_lerp_endpoints_collapse() {
        assert_eq!(FrameBlend::lerp(2, 3, 0.0).entries(), &[FrameBlendEntry::new(2, 1.0)]);
        assert_eq!(FrameBlend::lerp(2, 3, 1.0).entries(), &[FrameBlendEntry::new(3, 1.0)]);
        assert_eq!(FrameBlend::lerp(2, 3, 0.25).len(), 2);
    }

    #[test]
    fn test_base_frame_detection() {
        assert!(FrameBlend::new().is_base_frame());
        assert!(FrameBlend::single(0).is_base_frame());
        assert!(!FrameBlend::single(1).is_base_frame());
        assert!(!FrameBlend::from_pairs([(0, 0.5)]).is_base_frame());
        assert!(!FrameBlend::lerp(0, 1, 0.5).is_base_frame());
    }

    #[test]
    fn test_clamped_subframes() {
        let blend = FrameBlend::from_pairs([(0, 0.5), (9, 0.5)]).clamped(4);
        assert_eq!(blend.entries()[1].subframe, 3);
        assert_eq!(FrameBlend::single(5).clamped(0).entries()[0].subframe, 0);
    }

    proptest! {
        #[test]
        fn prop_capacity_is_never_exceeded(
            pairs in prop::collection::vec((0usize..100, -1.0f32..1.0), 0..32)
        ) {
            let blend = FrameBlend::from_pairs(pairs.iter().copied());
            let positive = pairs.iter().filter(|(_, w)| *w > 0.0).count();
            prop_assert_eq!(blend.len(), positive.min(MAX_FRAME_BLENDS));
            prop_assert!(blend.entries().iter().all(|e| e.lerp > 0.0));
        }
    }
}
