//! Variants: the schedules the explorer walks.
//!
//! A [`Variant`] is the sequence of frontier indices chosen from `init`
//! onwards. Because every run is deterministic, the indices alone are
//! enough to reproduce a run exactly.

use std::str::FromStr;

use tracing::trace;

// ── Variant ───────────────────────────────────────────────────────────

/// One schedule, as frontier indices in invocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Variant(Vec<usize>);

impl Variant {
    /// The empty schedule: just `init`.
    pub fn new() -> Self {
        Variant(Vec::new())
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one choice.
    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    /// This schedule followed by `index`.
    pub fn extended(&self, index: usize) -> Variant {
        let mut next = Vec::with_capacity(self.0.len() + 1);
        next.extend_from_slice(&self.0);
        next.push(index);
        Variant(next)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }
}

impl From<Vec<usize>> for Variant {
    fn from(indices: Vec<usize>) -> Self {
        Variant(indices)
    }
}

impl FromIterator<usize> for Variant {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Variant(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Variant {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Space-separated indices, e.g. `0 3 1`.
impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for index in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}

/// Parses the `Display` form; commas are accepted as separators too.
impl FromStr for Variant {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

// ── Variants ──────────────────────────────────────────────────────────

/// The explorer's worklist of schedules still to run.
///
/// A stack: the most recently added variant is explored next, which keeps
/// the walk depth-first and the worklist short.
#[derive(Debug, Clone, Default)]
pub struct Variants {
    stack: Vec<Variant>,
}

impl Variants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a schedule to explore.
    pub fn add(&mut self, variant: Variant) {
        trace!(variant = %variant, "added variant");
        self.stack.push(variant);
    }

    /// Push `base` followed by `index`.
    pub fn add_extent(&mut self, base: &Variant, index: usize) {
        self.add(base.extended(index));
    }

    /// Remove the next schedule to explore.
    pub fn pop(&mut self) -> Option<Variant> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let v = Variant::from(vec![0, 3, 1]);
        assert_eq!(v.to_string(), "0 3 1");
        assert_eq!("0 3 1".parse::<Variant>().unwrap(), v);
        assert_eq!("0,3,1".parse::<Variant>().unwrap(), v);
        assert_eq!("".parse::<Variant>().unwrap(), Variant::new());
        assert!("0 x".parse::<Variant>().is_err());
    }

    #[test]
    fn test_extended_leaves_base_untouched() {
        let base = Variant::from(vec![1]);
        let next = base.extended(2);
        assert_eq!(base.as_slice(), &[1]);
        assert_eq!(next.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_worklist_is_lifo() {
        let mut work = Variants::new();
        let base = Variant::new();
        work.add_extent(&base, 1);
        work.add_extent(&base, 2);
        assert_eq!(work.len(), 2);
        assert_eq!(work.pop(), Some(Variant::from(vec![2])));
        assert_eq!(work.pop(), Some(Variant::from(vec![1])));
        assert!(work.pop().is_none());
    }
}
