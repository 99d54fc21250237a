//! Object Range
//!
//! Generates object names from a `prefix + index + suffix` pattern over a
//! stepped, half-open index interval.

use crate::error::{GroupOpError, Result};
use serde::Serialize;
use std::iter::FusedIterator;
use tracing::debug;

/// Immutable name-range pattern
///
/// Denotes the indices `start, start + step, ...` strictly below `stop`.
/// A range whose `stop` is not above `start` is valid and empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectRange {
    prefix: String,
    start: i64,
    stop: i64,
    step: i64,
    suffix: String,
}

impl ObjectRange {
    /// Create a new range, validating `start >= 0` and `step >= 1`
    pub fn new(
        prefix: impl Into<String>,
        start: i64,
        stop: i64,
        step: i64,
        suffix: impl Into<String>,
    ) -> Result<Self> {
        if start < 0 {
            return Err(GroupOpError::InvalidRange(format!(
                "start must be >= 0, got {}",
                start
            )));
        }
        if step < 1 {
            return Err(GroupOpError::InvalidRange(format!(
                "step must be >= 1, got {}",
                step
            )));
        }
        Ok(ObjectRange {
            prefix: prefix.into(),
            start,
            stop,
            step,
            suffix: suffix.into(),
        })
    }

    /// Range with step 1 and no suffix
    pub fn with_prefix(prefix: impl Into<String>, start: i64, stop: i64) -> Result<Self> {
        ObjectRange::new(prefix, start, stop, 1, "")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Number of names the range generates: `max(0, ceil((stop - start) / step))`
    pub fn len(&self) -> usize {
        if self.stop <= self.start {
            return 0;
        }
        let span = self.stop as i128 - self.start as i128;
        let step = self.step as i128;
        ((span + step - 1) / step) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last generated index, if any
    pub fn last_index(&self) -> Option<i64> {
        match self.len() {
            0 => None,
            n => Some(self.start + (n as i64 - 1) * self.step),
        }
    }

    /// Render the cluster's brace template, `prefix{first..last..step}suffix`
    ///
    /// The upper bound in the template is inclusive, so it is the last
    /// generated index rather than `stop`. Empty ranges have no template.
    pub fn template(&self) -> Option<String> {
        let last = self.last_index()?;
        Some(format!(
            "{}{{{}..{}..{}}}{}",
            self.prefix, self.start, last, self.step, self.suffix
        ))
    }

    /// Iterate the generated names in ascending index order
    ///
    /// Each call starts over from `start`.
    pub fn iter(&self) -> RangeNames<'_> {
        debug!(
            "Generating names for range prefix={} start={} stop={} step={} suffix={}",
            self.prefix, self.start, self.stop, self.step, self.suffix
        );
        RangeNames {
            range: self,
            next: self.start,
            remaining: self.len(),
        }
    }

    /// Collect every generated name
    pub fn names(&self) -> Vec<String> {
        self.iter().collect()
    }

    /// Whether `name` is one of the names this range generates
    pub fn contains(&self, name: &str) -> bool {
        let Some(index) = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
        else {
            return false;
        };
        // Reject forms like "+5" or "05" that parse but are never generated
        let Ok(i) = index.parse::<i64>() else {
            return false;
        };
        if i.to_string() != index {
            return false;
        }
        i >= self.start && i < self.stop && (i - self.start) % self.step == 0
    }
}

impl<'a> IntoIterator for &'a ObjectRange {
    type Item = String;
    type IntoIter = RangeNames<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the names of an [`ObjectRange`]
#[derive(Debug, Clone)]
pub struct RangeNames<'a> {
    range: &'a ObjectRange,
    next: i64,
    remaining: usize,
}

impl Iterator for RangeNames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        let name = format!("{}{}{}", self.range.prefix, self.next, self.range.suffix);
        self.remaining -= 1;
        // The last step may overflow; `remaining` is already 0 by then
        self.next = self.next.saturating_add(self.range.step);
        Some(name)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RangeNames<'_> {}

impl FusedIterator for RangeNames<'_> {}

/// Generate `prefix + i + suffix` for `i` in `[start, stop)` stepped by `step`
pub fn generate(
    prefix: &str,
    start: i64,
    stop: i64,
    step: i64,
    suffix: &str,
) -> Result<Vec<String>> {
    Ok(ObjectRange::new(prefix, start, stop, step, suffix)?.names())
}
