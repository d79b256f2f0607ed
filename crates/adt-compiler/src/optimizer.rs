use std::collections::HashSet;

use adt_core::types::{Campaign, Rule};

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub duplicate_campaigns: usize,
    pub duplicate_rules: usize,
}

/// Deduplicate an ingested catalog in place.
///
/// The first campaign with a given id wins. Within each campaign, rule values
/// are sorted and deduplicated, and rules repeating an earlier rule are
/// dropped. Distinct rules are never merged: rules are conjunctive, so two
/// inclusion rules on one dimension must both pass.
pub fn optimize_campaigns(campaigns: &mut Vec<Campaign>) -> OptimizeStats {
    let before = campaigns.len();

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut duplicate_campaigns = 0usize;
    campaigns.retain(|campaign| {
        if seen_ids.insert(campaign.id.clone()) {
            true
        } else {
            log::warn!("dropping duplicate campaign id {}", campaign.id);
            duplicate_campaigns += 1;
            false
        }
    });

    let mut duplicate_rules = 0usize;
    for campaign in campaigns.iter_mut() {
        for rule in &mut campaign.rules {
            rule.values.sort_unstable();
            rule.values.dedup();
        }

        let mut seen: HashSet<Rule> = HashSet::new();
        let rules_before = campaign.rules.len();
        campaign.rules.retain(|rule| seen.insert(rule.clone()));
        duplicate_rules += rules_before - campaign.rules.len();
    }

    OptimizeStats {
        before,
        after: campaigns.len(),
        duplicate_campaigns,
        duplicate_rules,
    }
}
