//! Ad Delivery Targeting Core Library
//!
//! This crate provides the core matching engine for ad delivery: given an app
//! identifier, an operating system and a country, it returns the active
//! campaigns whose targeting rules match.
//!
//! # Architecture
//!
//! The matching engine operates on an immutable, pre-built [`IndexSet`]: a
//! backing array of campaigns plus per-dimension inverted indexes. An index
//! set is built off to the side (see the `adt-compiler` crate) and published
//! through a [`SnapshotStore`], which readers load without taking a lock.
//!
//! Matching narrows candidates through the indexes, then re-verifies every
//! surviving candidate against its complete rule list. The indexes only
//! shrink the verification workload; verification decides the result.
//!
//! # Modules
//!
//! - `types`: Campaign, rule and request type definitions
//! - `canonical`: Canonical forms for rule values and request fields
//! - `index`: Immutable inverted index set
//! - `candidates`: Sorted candidate sets used during narrowing
//! - `snapshot`: Lock-free single-slot snapshot container
//! - `matcher`: Core request matching engine

pub mod candidates;
pub mod canonical;
pub mod index;
pub mod matcher;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use canonical::{canonicalize, canonicalize_request};
pub use index::{IndexSet, IndexStats, PostingTable};
pub use matcher::Matcher;
pub use snapshot::SnapshotStore;
pub use types::{
    AdCampaign, Campaign, CampaignStatus, Dimension, DimensionMask, MatchRequest, ParseTagError,
    Polarity, Rule,
};
