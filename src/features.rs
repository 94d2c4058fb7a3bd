//! Feature row assembly for price model inference.
//!
//! The regression model was fitted on rows laid out as
//! `[text features .. | image features ..]`. [`FeatureRow::new`] is the only
//! way to build a row, so the two halves cannot be swapped.

use anyhow::Result;

/// Width of the pooled ResNet50 embedding
pub const IMAGE_EMBEDDING_DIM: usize = 2048;

/// Fixed-width sparse vector with entries sorted by index
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    dimension: usize,
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    /// All-zero vector of the given width
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Build from entries already sorted by strictly increasing index.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range or the entries are not sorted.
    pub fn from_sorted(dimension: usize, entries: Vec<(u32, f32)>) -> Self {
        assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "sparse entries must be sorted by index"
        );
        assert!(
            entries.last().map_or(true, |&(i, _)| (i as usize) < dimension),
            "sparse index out of range"
        );
        Self { dimension, entries }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored (non-zero) entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.entries.iter().map(|&(_, v)| v)
    }

    /// Scatter the entries into `out`, which must be `dimension` long
    fn write_dense(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.dimension);
        for &(index, value) in &self.entries {
            out[index as usize] = value;
        }
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.dimension];
        self.write_dense(&mut dense);
        dense
    }
}

/// Dense image embedding of exactly [`IMAGE_EMBEDDING_DIM`] values
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEmbedding(Vec<f32>);

impl ImageEmbedding {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.len() != IMAGE_EMBEDDING_DIM {
            anyhow::bail!(
                "image embedding has {} values, expected {}",
                values.len(),
                IMAGE_EMBEDDING_DIM
            );
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// One model input row: text features first, image features second
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    text: SparseVector,
    image: ImageEmbedding,
}

impl FeatureRow {
    pub fn new(text: SparseVector, image: ImageEmbedding) -> Self {
        Self { text, image }
    }

    /// Total width: text dimension + 2048
    pub fn len(&self) -> usize {
        self.text.dimension() + IMAGE_EMBEDDING_DIM
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text_width(&self) -> usize {
        self.text.dimension()
    }

    pub fn text(&self) -> &SparseVector {
        &self.text
    }

    pub fn image(&self) -> &ImageEmbedding {
        &self.image
    }

    /// Dense `f32` row in model column order
    pub fn to_dense(&self) -> Vec<f32> {
        let mut row = vec![0.0; self.len()];
        let (text, image) = row.split_at_mut(self.text.dimension());
        self.text.write_dense(text);
        image.copy_from_slice(self.image.as_slice());
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(fill: f32) -> ImageEmbedding {
        ImageEmbedding::new(vec![fill; IMAGE_EMBEDDING_DIM]).unwrap()
    }

    #[test]
    fn test_text_features_come_first() {
        let text = SparseVector::from_sorted(4, vec![(1, 0.6), (3, 0.8)]);
        let row = FeatureRow::new(text, embedding(7.0));
        let dense = row.to_dense();

        assert_eq!(row.len(), 4 + IMAGE_EMBEDDING_DIM);
        assert_eq!(dense.len(), row.len());
        assert_eq!(&dense[..4], &[0.0, 0.6, 0.0, 0.8]);
        assert!(dense[4..].iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_row_width_independent_of_text_content() {
        let empty = FeatureRow::new(SparseVector::zeros(10), embedding(0.0));
        let full = FeatureRow::new(
            SparseVector::from_sorted(10, (0..10).map(|i| (i, 1.0)).collect()),
            embedding(1.0),
        );
        assert_eq!(empty.len(), full.len());
        assert_eq!(empty.text_width(), 10);
    }

    #[test]
    fn test_embedding_width_enforced() {
        assert!(ImageEmbedding::new(vec![0.0; 1000]).is_err());
        assert!(ImageEmbedding::new(vec![0.0; IMAGE_EMBEDDING_DIM + 1]).is_err());
    }

    #[test]
    #[should_panic(expected = "sorted")]
    fn test_unsorted_entries_panic() {
        SparseVector::from_sorted(5, vec![(3, 1.0), (1, 1.0)]);
    }
}
