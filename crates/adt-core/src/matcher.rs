//! Core Matching Engine
//!
//! This is the hot path - every delivery request goes through here.
//! Matching reads one immutable index set and never blocks or fails.

use log::trace;

use crate::candidates::CandidateSet;
use crate::canonical::canonicalize_request;
use crate::index::IndexSet;
use crate::types::{AdCampaign, Campaign, Dimension, MatchRequest};

// =============================================================================
// Matcher
// =============================================================================

/// The core matching engine.
pub struct Matcher<'a> {
    index: &'a IndexSet,
}

impl<'a> Matcher<'a> {
    /// Create a new matcher over the given index set.
    pub fn new(index: &'a IndexSet) -> Self {
        Self { index }
    }

    /// Match a request and return the matching campaigns, sorted by id.
    pub fn match_request(&self, request: &MatchRequest) -> Vec<AdCampaign> {
        let request = canonicalize_request(request);
        let candidates = self.narrow(&request);

        let mut out: Vec<AdCampaign> = candidates
            .iter()
            .filter_map(|position| self.index.campaign(position))
            .filter(|campaign| self.verify(campaign, &request))
            .map(Campaign::to_ad)
            .collect();

        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);

        trace!("final matches: {:?}", out.iter().map(|ad| &ad.id).collect::<Vec<_>>());
        out
    }

    /// Narrow the index to plausible candidates for a canonical request.
    ///
    /// Each dimension contributes its inclusion postings for the request
    /// value plus its agnostic campaigns; the first dimension seeds the
    /// running set and later ones intersect with it. Exclusion postings are
    /// subtracted afterwards.
    pub fn narrow(&self, request: &MatchRequest) -> CandidateSet {
        let mut running: Option<CandidateSet> = None;

        for dim in Dimension::ALL {
            let value = request.value(dim);
            let step = CandidateSet::from_union(
                self.index.included(dim, value),
                self.index.agnostic(dim),
            );
            let narrowed = match running {
                None => step,
                Some(mut set) => {
                    set.intersect(&step);
                    set
                }
            };
            trace!("after {}={:?}: {:?}", dim, value, narrowed.as_slice());

            if narrowed.is_empty() {
                return narrowed;
            }
            running = Some(narrowed);
        }

        let mut set = running.unwrap_or_default();
        for dim in Dimension::ALL {
            set.subtract(self.index.excluded(dim, request.value(dim)));
        }
        trace!("after exclusions: {:?}", set.as_slice());
        set
    }

    /// Full re-verification against the campaign's complete rule list.
    #[inline]
    fn verify(&self, campaign: &Campaign, request: &MatchRequest) -> bool {
        campaign.is_active() && campaign.matches(request)
    }
}
