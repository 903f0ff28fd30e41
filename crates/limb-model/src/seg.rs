//! Segmented vectors: a flat buffer partitioned into per-joint ranges.

use crate::error::ModelError;
use crate::joint::JointId;
use limb_math::Scalar;
use std::ops::{Index, IndexMut, Range};

/// A flat vector with O(1) access to the contiguous slice belonging to each
/// joint. Ranges cover the buffer exactly once, in joint-id order.
#[derive(Clone, Debug)]
pub struct SegmentedVec<T> {
    data: Vec<T>,
    ranges: Vec<Range<usize>>,
}

impl<T: Scalar> SegmentedVec<T> {
    /// Zero-filled buffer over validated ranges.
    pub fn zeros(ranges: Vec<Range<usize>>) -> Result<Self, ModelError> {
        let mut expected_start = 0;
        for r in &ranges {
            if r.start != expected_start || r.end < r.start {
                return Err(ModelError::InvalidArgument(format!(
                    "segment ranges must tile the buffer contiguously; got {r:?} at offset {expected_start}"
                )));
            }
            expected_start = r.end;
        }
        Ok(Self {
            data: vec![T::ZERO; expected_start],
            ranges,
        })
    }

    /// Ranges from per-joint segment widths.
    pub fn from_widths(widths: impl IntoIterator<Item = usize>) -> Self {
        let mut ranges = Vec::new();
        let mut start = 0;
        for w in widths {
            ranges.push(start..start + w);
            start += w;
        }
        Self {
            data: vec![T::ZERO; start],
            ranges,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn num_segments(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    #[inline]
    pub fn range(&self, joint: JointId) -> Range<usize> {
        self.ranges[joint.index()].clone()
    }

    #[inline]
    pub fn segment(&self, joint: JointId) -> &[T] {
        &self.data[self.ranges[joint.index()].clone()]
    }

    #[inline]
    pub fn segment_mut(&mut self, joint: JointId) -> &mut [T] {
        &mut self.data[self.ranges[joint.index()].clone()]
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrite the whole buffer; the source must match exactly.
    pub fn copy_from_slice(&mut self, src: &[T]) -> Result<(), ModelError> {
        if src.len() != self.data.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.data.len(),
                got: src.len(),
            });
        }
        self.data.copy_from_slice(src);
        Ok(())
    }
}

impl<T: Scalar> Index<usize> for SegmentedVec<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T: Scalar> IndexMut<usize> for SegmentedVec<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}
