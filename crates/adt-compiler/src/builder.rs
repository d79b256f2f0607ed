use adt_core::index::{IndexSet, PostingTable};
use adt_core::types::{Campaign, Dimension};

/// Build an immutable index set over ingested campaigns.
///
/// Every rule value is posted under its dimension and polarity. A campaign
/// without a constraining inclusion rule on a dimension is agnostic there;
/// this covers campaigns with no rule at all on the dimension and campaigns
/// with only exclusions, which are handled by subtraction and verification.
///
/// Pure: only allocates the new structures, never touches a published set.
pub fn build_index(campaigns: Vec<Campaign>, build_id: u64) -> IndexSet {
    let mut table = PostingTable::new();

    for (position, campaign) in campaigns.iter().enumerate() {
        let position = position as u32;

        for rule in &campaign.rules {
            for value in &rule.values {
                table.insert(rule.dimension, rule.polarity, value, position);
            }
        }

        let included = campaign.inclusion_mask();
        for dim in Dimension::ALL {
            if !included.contains(dim.mask()) {
                table.mark_agnostic(dim, position);
            }
        }
    }

    IndexSet::new(build_id, campaigns, table)
}
