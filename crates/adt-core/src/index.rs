//! Immutable inverted index set
//!
//! An [`IndexSet`] is one fully built index generation: the backing campaign
//! array plus, per dimension, inclusion and exclusion posting maps and the
//! list of campaigns that are agnostic on that dimension. Positions in the
//! posting lists refer to the backing array.
//!
//! Index sets are assembled through a [`PostingTable`] and never change once
//! wrapped; publication happens through [`SnapshotStore`](crate::SnapshotStore).

use std::collections::HashMap;

use crate::types::{Campaign, Dimension, Polarity};

/// Canonical value -> ascending campaign positions.
pub type PostingMap = HashMap<String, Vec<u32>>;

// =============================================================================
// Posting Table (build side)
// =============================================================================

/// Mutable posting lists, filled in by the index builder.
///
/// Positions must be inserted in non-decreasing order per list so that every
/// list stays ascending; repeated inserts of the same position are collapsed.
#[derive(Debug, Clone, Default)]
pub struct PostingTable {
    include: [PostingMap; Dimension::COUNT],
    exclude: [PostingMap; Dimension::COUNT],
    agnostic: [Vec<u32>; Dimension::COUNT],
}

impl PostingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` under a canonical value.
    pub fn insert(&mut self, dimension: Dimension, polarity: Polarity, value: &str, position: u32) {
        let map = match polarity {
            Polarity::Include => &mut self.include[dimension.index()],
            Polarity::Exclude => &mut self.exclude[dimension.index()],
        };
        if let Some(list) = map.get_mut(value) {
            push_position(list, position);
        } else {
            map.insert(value.to_owned(), vec![position]);
        }
    }

    /// Record that the campaign at `position` passes `dimension` without a lookup.
    pub fn mark_agnostic(&mut self, dimension: Dimension, position: u32) {
        push_position(&mut self.agnostic[dimension.index()], position);
    }
}

#[inline]
fn push_position(list: &mut Vec<u32>, position: u32) {
    debug_assert!(list.last().map_or(true, |&last| last <= position));
    if list.last() != Some(&position) {
        list.push(position);
    }
}

// =============================================================================
// Index Set (read side)
// =============================================================================

/// One immutable index generation.
#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    build_id: u64,
    campaigns: Vec<Campaign>,
    postings: PostingTable,
}

impl IndexSet {
    /// Wrap a finished posting table around its backing campaigns.
    pub fn new(build_id: u64, campaigns: Vec<Campaign>, postings: PostingTable) -> Self {
        Self {
            build_id,
            campaigns,
            postings,
        }
    }

    /// An index set with no campaigns. Matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn build_id(&self) -> u64 {
        self.build_id
    }

    #[inline]
    pub fn campaigns(&self) -> &[Campaign] {
        &self.campaigns
    }

    #[inline]
    pub fn campaign(&self, position: u32) -> Option<&Campaign> {
        self.campaigns.get(position as usize)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Positions holding an inclusion rule with `value` on `dimension`.
    #[inline]
    pub fn included(&self, dimension: Dimension, value: &str) -> &[u32] {
        lookup(&self.postings.include[dimension.index()], value)
    }

    /// Positions holding an exclusion rule with `value` on `dimension`.
    #[inline]
    pub fn excluded(&self, dimension: Dimension, value: &str) -> &[u32] {
        lookup(&self.postings.exclude[dimension.index()], value)
    }

    /// Positions that pass `dimension` regardless of the request value.
    #[inline]
    pub fn agnostic(&self, dimension: Dimension) -> &[u32] {
        &self.postings.agnostic[dimension.index()]
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            build_id: self.build_id,
            campaigns: self.campaigns.len(),
            active: self.campaigns.iter().filter(|c| c.is_active()).count(),
            rules: self.campaigns.iter().map(|c| c.rules.len()).sum(),
            ..IndexStats::default()
        };
        for dim in Dimension::ALL {
            let i = dim.index();
            stats.include_keys[i] = self.postings.include[i].len();
            stats.exclude_keys[i] = self.postings.exclude[i].len();
            stats.agnostic[i] = self.postings.agnostic[i].len();
        }
        stats
    }
}

#[inline]
fn lookup<'a>(map: &'a PostingMap, value: &str) -> &'a [u32] {
    map.get(value).map(Vec::as_slice).unwrap_or(&[])
}

/// Summary counts for an index set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub build_id: u64,
    pub campaigns: usize,
    pub active: usize,
    pub rules: usize,
    /// Distinct inclusion values per dimension
    pub include_keys: [usize; Dimension::COUNT],
    /// Distinct exclusion values per dimension
    pub exclude_keys: [usize; Dimension::COUNT],
    /// Agnostic campaigns per dimension
    pub agnostic: [usize; Dimension::COUNT],
}
