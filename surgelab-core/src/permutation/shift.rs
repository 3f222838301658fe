//! Mixed-radix odometer over index vectors.

use super::PermutationError;

/// Advance `indices` by one grid step.
///
/// Dimension 0 is incremented; any dimension that exceeds its max resets to
/// zero and carries into the next. After `grid_size(max)` shifts the vector is
/// back to all-zero.
pub fn shift_indices(indices: &[usize], max: &[usize]) -> Result<Vec<usize>, PermutationError> {
    if indices.is_empty() {
        return Err(PermutationError::EmptyIndices);
    }
    if indices.len() != max.len() {
        return Err(PermutationError::ArityMismatch {
            expected: max.len(),
            got: indices.len(),
        });
    }

    let mut next = indices.to_vec();
    for (value, &limit) in next.iter_mut().zip(max) {
        *value += 1;
        if *value > limit {
            *value = 0;
        } else {
            break;
        }
    }
    Ok(next)
}

/// Number of grid points, `Π(max_i + 1)`, saturating at `u64::MAX`.
///
/// An empty descriptor list still has one point: the unmodified target.
pub fn grid_size(max: &[usize]) -> u64 {
    max.iter()
        .try_fold(1u64, |acc, &m| acc.checked_mul(m as u64 + 1))
        .unwrap_or(u64::MAX)
}
