/// Deterministic grid of rotation triples
use std::f64::consts::TAU;

use crate::error::SequenceError;
use crate::transform::Orientation;

/// Every combination of x, y and z rotations on `[0, end)` at a fixed step.
///
/// Triples are ordered with z varying fastest and x slowest, so the same
/// step always produces the same frames in the same order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSequence {
    step: f64,
    end: f64,
    steps: usize,
}

impl RotationSequence {
    /// Full turn on each axis, `[0, 2π)`.
    pub fn new(step: f64) -> Result<Self, SequenceError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(SequenceError::InvalidStep(step));
        }
        Ok(Self {
            step,
            end: TAU,
            steps: steps_for(TAU, step)?,
        })
    }

    /// Use `[0, end)` on each axis instead of a full turn.
    pub fn with_range_end(self, end: f64) -> Result<Self, SequenceError> {
        if !end.is_finite() || end <= 0.0 {
            return Err(SequenceError::InvalidRange(end));
        }
        Ok(Self {
            end,
            steps: steps_for(end, self.step)?,
            ..self
        })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn range_end(&self) -> f64 {
        self.end
    }

    /// Number of distinct angles on each axis.
    pub fn steps_per_axis(&self) -> usize {
        self.steps
    }

    /// `steps_per_axis()³`. Construction guarantees this does not overflow.
    pub fn len(&self) -> usize {
        self.steps * self.steps * self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`th triple, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Orientation> {
        if index >= self.len() {
            return None;
        }
        let n = self.steps;
        let angle = |k: usize| k as f64 * self.step;
        Some(Orientation::new(
            angle(index / (n * n)),
            angle(index / n % n),
            angle(index % n),
        ))
    }

    pub fn iter(&self) -> Iter {
        self.limited(None)
    }

    /// The first `limit` triples, or all of them if there is no limit.
    pub fn limited(&self, limit: Option<usize>) -> Iter {
        let len = self.len();
        Iter {
            sequence: *self,
            next: 0,
            end: limit.map_or(len, |limit| limit.min(len)),
        }
    }
}

/// Number of angles `k * step` below `end`, provided the whole grid can be
/// indexed by `usize`.
fn steps_for(end: f64, step: f64) -> Result<usize, SequenceError> {
    // Saturates for ratios beyond `usize::MAX`, which the cube check rejects.
    let steps = (end / step).ceil() as usize;
    steps
        .checked_mul(steps)
        .and_then(|square| square.checked_mul(steps))
        .map(|_| steps)
        .ok_or(SequenceError::TooLarge { steps })
}

impl<'a> IntoIterator for &'a RotationSequence {
    type Item = Orientation;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Iterator over a [`RotationSequence`].
#[derive(Debug, Clone)]
pub struct Iter {
    sequence: RotationSequence,
    next: usize,
    end: usize,
}

impl Iterator for Iter {
    type Item = Orientation;

    fn next(&mut self) -> Option<Orientation> {
        if self.next >= self.end {
            return None;
        }
        let item = self.sequence.get(self.next);
        self.next += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Orientation> {
        self.next = self.next.saturating_add(n).min(self.end);
        self.next()
    }
}

impl ExactSizeIterator for Iter {}
