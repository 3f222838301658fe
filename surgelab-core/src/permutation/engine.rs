//! Materializing grid points into configurations.

use std::collections::HashSet;

use tracing::warn;

use super::{grid_size, shift_indices, ParamDescriptor, ParamValue, PermutationError};

/// A configuration whose fields can be addressed by stable string ids.
pub trait Permutable: Clone {
    /// The search space this configuration offers when none is given explicitly.
    fn permutable_descriptors(&self) -> Vec<ParamDescriptor>;

    /// Overwrite the field named `id`.
    ///
    /// Unknown ids and values of the wrong kind are rejected.
    fn set_value(&mut self, id: &str, value: ParamValue) -> Result<(), PermutationError>;

    /// Current value of the field named `id`, if it exists.
    fn value_of(&self, id: &str) -> Option<ParamValue>;
}

/// Grid over a base configuration.
#[derive(Debug, Clone)]
pub struct PermutationEngine<T> {
    target: T,
    descriptors: Vec<ParamDescriptor>,
    max: Vec<usize>,
}

impl<T: Permutable> PermutationEngine<T> {
    /// Validate `descriptors` against `target` and precompute the max indices.
    ///
    /// Every descriptor is tried with its first value, so unknown ids and
    /// kind mismatches fail here rather than mid-sweep.
    pub fn new(target: T, descriptors: Vec<ParamDescriptor>) -> Result<Self, PermutationError> {
        let mut seen = HashSet::new();
        let mut scratch = target.clone();
        for d in &descriptors {
            d.validate()?;
            if !seen.insert(d.id.as_str()) {
                return Err(PermutationError::DuplicateId(d.id.clone()));
            }
            scratch.set_value(&d.id, d.value_at(0)?)?;
            if d.overshoots() {
                warn!(
                    param = %d.id,
                    max_index = d.max_index(),
                    "grid overshoots max; trailing points of this parameter will fail"
                );
            }
        }

        let max = descriptors.iter().map(ParamDescriptor::max_index).collect();
        Ok(Self {
            target,
            descriptors,
            max,
        })
    }

    /// Grid over the descriptors `target` declares for itself.
    pub fn from_target(target: T) -> Result<Self, PermutationError> {
        let descriptors = target.permutable_descriptors();
        Self::new(target, descriptors)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    pub fn max_indices(&self) -> &[usize] {
        &self.max
    }

    /// Total number of grid points.
    pub fn total(&self) -> u64 {
        grid_size(&self.max)
    }

    pub fn shift(&self, indices: &[usize]) -> Result<Vec<usize>, PermutationError> {
        shift_indices(indices, &self.max)
    }

    /// Values of every descriptor at `indices`, in descriptor order.
    pub fn values_at(&self, indices: &[usize]) -> Result<Vec<(String, ParamValue)>, PermutationError> {
        if indices.len() != self.descriptors.len() {
            return Err(PermutationError::ArityMismatch {
                expected: self.descriptors.len(),
                got: indices.len(),
            });
        }
        self.descriptors
            .iter()
            .zip(indices)
            .zip(&self.max)
            .map(|((d, &index), &max)| {
                if index > max {
                    return Err(PermutationError::IndexOutOfRange {
                        id: d.id.clone(),
                        index,
                        max,
                    });
                }
                Ok((d.id.clone(), d.value_at(index)?))
            })
            .collect()
    }

    /// A copy of the base configuration with every descriptor set to its value at `indices`.
    pub fn value_for(&self, indices: &[usize]) -> Result<T, PermutationError> {
        let mut config = self.target.clone();
        for (id, value) in self.values_at(indices)? {
            config.set_value(&id, value)?;
        }
        Ok(config)
    }

    /// Iterate every index vector once, starting from all-zero.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            max: &self.max,
            next: Some(vec![0; self.max.len()]),
        }
    }
}

/// Iterator over all index vectors of a grid, in odometer order.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    max: &'a [usize],
    next: Option<Vec<usize>>,
}

impl Iterator for GridIter<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        // A grid with no dimensions has exactly one point.
        if let Ok(shifted) = shift_indices(&current, self.max) {
            if shifted.iter().any(|&i| i != 0) {
                self.next = Some(shifted);
            }
        }
        Some(current)
    }
}
