//! Per-vertex bone influences for skeletal meshes
//!
//! Each vertex refers to a single "blend" index. Indices below the bone count
//! name one bone that owns the vertex outright; indices from the bone count
//! upward name an entry of the model's [`BlendTable`], a deduplicated set of
//! up to four weighted bones.

/// Up to four bone influences with byte weights summing to 255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BlendWeights {
    pub index: [u8; 4],
    pub influence: [u8; 4],
}

impl BlendWeights {
    /// Sum of the influence bytes
    pub fn total(&self) -> u32 {
        self.influence.iter().map(|&v| u32::from(v)).sum()
    }

    /// Whether a single bone owns the vertex
    pub fn is_single(&self) -> bool {
        self.influence[1] == 0
    }
}

/// Deduplicated multi-bone influence sets of one model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendTable {
    num_bones: usize,
    entries: Vec<BlendWeights>,
}

impl BlendTable {
    pub fn new(num_bones: usize) -> Self {
        Self {
            num_bones,
            entries: Vec::new(),
        }
    }

    /// Store a weight set and return the vertex blend index for it
    ///
    /// A set whose second influence is zero maps straight to its first bone.
    /// Otherwise an identical stored set is reused, or the set is appended.
    pub fn add(&mut self, weights: BlendWeights) -> usize {
        if weights.is_single() {
            return usize::from(weights.index[0]);
        }
        let slot = match self.entries.iter().position(|w| *w == weights) {
            Some(existing) => existing,
            None => {
                self.entries.push(weights);
                self.entries.len() - 1
            }
        };
        self.num_bones + slot
    }

    /// Quantize float influences to bytes and store the result
    ///
    /// Influences are scaled so they sum to 255 and truncated. Any rounding
    /// shortfall or excess is then spread one unit at a time over the slots,
    /// in slot order, until the bytes sum to exactly 255.
    pub fn compress(&mut self, index: [u8; 4], influence: [f32; 4]) -> usize {
        match compress_blend(index, influence) {
            Some(weights) => self.add(weights),
            None => usize::from(index[0]),
        }
    }

    pub fn num_bones(&self) -> usize {
        self.num_bones
    }

    pub fn entries(&self) -> &[BlendWeights] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight set behind a vertex blend index, if it is a table entry
    pub fn get(&self, blend_index: usize) -> Option<&BlendWeights> {
        blend_index
            .checked_sub(self.num_bones)
            .and_then(|i| self.entries.get(i))
    }

    pub fn into_entries(self) -> Vec<BlendWeights> {
        self.entries
    }
}

/// Quantize four float influences into a weight set summing to 255
///
/// Returns `None` for a single-bone vertex (second influence zero) or when the
/// influences do not sum to a positive value.
pub fn compress_blend(index: [u8; 4], influence: [f32; 4]) -> Option<BlendWeights> {
    if influence[1] == 0.0 {
        return None;
    }
    let sum: f32 = influence.iter().sum();
    if !(sum > 0.0) {
        return None;
    }
    let scale = 255.0 / sum;
    let mut weights = BlendWeights {
        index,
        influence: [0; 4],
    };
    let mut total = 0u32;
    for (out, &value) in weights.influence.iter_mut().zip(influence.iter()) {
        *out = (value * scale) as u8;
        total += u32::from(*out);
    }
    while total > 255 {
        for slot in &mut weights.influence {
            if *slot > 0 && total > 255 {
                *slot -= 1;
                total -= 1;
            }
        }
    }
    while total < 255 {
        for slot in &mut weights.influence {
            if *slot < 255 && total < 255 {
                *slot += 1;
                total += 1;
            }
        }
    }
    Some(weights)
}
