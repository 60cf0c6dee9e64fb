//! Hyperslab selection helpers.

use serde::{Deserialize, Serialize};

/// Selection along one dimension: `[start, end)` every `stride` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisSlice {
    pub start: usize,
    pub end: usize,
    pub stride: usize,
}

impl AxisSlice {
    pub fn new(start: usize, end: usize, stride: usize) -> Self {
        Self { start, end, stride }
    }

    /// Every element of a dimension of length `len`.
    pub fn full(len: usize) -> Self {
        Self::new(0, len, 1)
    }

    /// A single index.
    pub fn index(i: usize) -> Self {
        Self::new(i, i + 1, 1)
    }

    /// Number of selected elements.
    pub fn len(&self) -> usize {
        if self.end <= self.start || self.stride == 0 {
            0
        } else {
            (self.end - self.start).div_ceil(self.stride)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the selection against a dimension length.
    pub fn check(&self, dim_len: usize) -> Result<(), String> {
        if self.stride == 0 {
            return Err("stride must be >= 1".to_string());
        }
        if self.start >= self.end {
            return Err(format!("empty range {}..{}", self.start, self.end));
        }
        if self.end > dim_len {
            return Err(format!(
                "range {}..{} exceeds dimension length {}",
                self.start, self.end, dim_len
            ));
        }
        Ok(())
    }
}

/// Check rank and per-axis bounds of a selection over an array of `shape`.
pub fn check_slices(shape: &[usize], slices: &[AxisSlice]) -> Result<(), String> {
    if shape.len() != slices.len() {
        return Err(format!(
            "{} slices given for a {}-dimensional array",
            slices.len(),
            shape.len()
        ));
    }
    slices
        .iter()
        .zip(shape)
        .try_for_each(|(slice, &len)| slice.check(len))
}

/// Flat row-major offsets of a hyperslab over an array of `shape`.
pub fn hyperslab_offsets(shape: &[usize], slices: &[AxisSlice]) -> Result<Vec<usize>, String> {
    check_slices(shape, slices)?;

    // Row-major strides
    let mut dim_strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        dim_strides[i] = dim_strides[i + 1] * shape[i + 1];
    }

    let total: usize = slices.iter().map(AxisSlice::len).product();
    let mut offsets = Vec::with_capacity(total);
    let mut counter = vec![0usize; slices.len()];

    if slices.is_empty() {
        offsets.push(0);
        return Ok(offsets);
    }

    loop {
        let offset: usize = counter
            .iter()
            .zip(slices)
            .zip(&dim_strides)
            .map(|((&c, s), &st)| (s.start + c * s.stride) * st)
            .sum();
        offsets.push(offset);

        // Odometer increment over the selection
        let mut axis = slices.len();
        loop {
            if axis == 0 {
                return Ok(offsets);
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < slices[axis].len() {
                break;
            }
            counter[axis] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_slice_len() {
        assert_eq!(AxisSlice::new(0, 10, 1).len(), 10);
        assert_eq!(AxisSlice::new(0, 10, 3).len(), 4);
        assert_eq!(AxisSlice::new(2, 3, 5).len(), 1);
        assert!(AxisSlice::new(3, 3, 1).is_empty());
    }

    #[test]
    fn test_hyperslab_offsets_2d() {
        // 3x4 array, rows 1..3, cols 0..4 step 2
        let offsets =
            hyperslab_offsets(&[3, 4], &[AxisSlice::new(1, 3, 1), AxisSlice::new(0, 4, 2)])
                .unwrap();
        assert_eq!(offsets, vec![4, 6, 8, 10]);
    }

    #[test]
    fn test_hyperslab_scalar() {
        assert_eq!(hyperslab_offsets(&[], &[]).unwrap(), vec![0]);
    }

    #[test]
    fn test_check_slices() {
        let slab = [
            AxisSlice::full(72),
            AxisSlice::new(0, 500, 4),
            AxisSlice::new(10, 20, 1),
        ];
        assert!(check_slices(&[72, 500, 500], &slab).is_ok());
        assert!(check_slices(&[4, 4], &[AxisSlice::new(0, 4, 0), AxisSlice::full(4)]).is_err());
        assert!(check_slices(&[4], &[]).is_err());
    }

    #[test]
    fn test_hyperslab_rejects_out_of_bounds() {
        assert!(hyperslab_offsets(&[3], &[AxisSlice::new(0, 4, 1)]).is_err());
        assert!(hyperslab_offsets(&[3, 3], &[AxisSlice::full(3)]).is_err());
    }
}
