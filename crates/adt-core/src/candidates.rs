//! Sorted candidate sets
//!
//! Posting lists in an [`IndexSet`](crate::IndexSet) hold campaign positions
//! in ascending order, so narrowing is done with linear merges instead of
//! hash sets. Results stay sorted by position, which keeps the pass cheap
//! and its output deterministic.

/// A sorted, duplicate-free set of campaign positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    positions: Vec<u32>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of two ascending posting lists.
    pub fn from_union(a: &[u32], b: &[u32]) -> Self {
        debug_assert!(is_ascending(a) && is_ascending(b));

        let mut positions = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let next = if a[i] < b[j] {
                i += 1;
                a[i - 1]
            } else if b[j] < a[i] {
                j += 1;
                b[j - 1]
            } else {
                i += 1;
                j += 1;
                a[i - 1]
            };
            push_unique(&mut positions, next);
        }
        for &p in &a[i..] {
            push_unique(&mut positions, p);
        }
        for &p in &b[j..] {
            push_unique(&mut positions, p);
        }

        Self { positions }
    }

    /// Keep only positions also present in `other`.
    pub fn intersect(&mut self, other: &CandidateSet) {
        let other = &other.positions;
        let mut j = 0;
        self.positions.retain(|&p| {
            while j < other.len() && other[j] < p {
                j += 1;
            }
            j < other.len() && other[j] == p
        });
    }

    /// Remove every position present in an ascending posting list.
    pub fn subtract(&mut self, sorted: &[u32]) {
        debug_assert!(is_ascending(sorted));
        if sorted.is_empty() {
            return;
        }
        let mut j = 0;
        self.positions.retain(|&p| {
            while j < sorted.len() && sorted[j] < p {
                j += 1;
            }
            !(j < sorted.len() && sorted[j] == p)
        });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.positions.iter().copied()
    }
}

#[inline]
fn push_unique(out: &mut Vec<u32>, p: u32) {
    if out.last() != Some(&p) {
        out.push(p);
    }
}

fn is_ascending(list: &[u32]) -> bool {
    list.windows(2).all(|w| w[0] <= w[1])
}
