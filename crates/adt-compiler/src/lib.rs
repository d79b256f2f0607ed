//! Ad Targeting Catalog Compiler
//!
//! This crate ingests raw campaign catalogs and builds the immutable
//! [`IndexSet`](adt_core::IndexSet) the match engine reads.

pub mod parser;
pub mod optimizer;
pub mod builder;

use adt_core::index::IndexSet;

pub use builder::build_index;
pub use optimizer::{optimize_campaigns, OptimizeStats};
pub use parser::{
    parse_campaign, parse_catalog, parse_catalog_json, parse_rule, CatalogEntry, CatalogParseError,
    ParsedCatalog, RawRule, RuleError,
};

/// Counts gathered while compiling a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub entries: usize,
    pub skipped_rules: usize,
    pub duplicate_campaigns: usize,
    pub duplicate_rules: usize,
    pub campaigns: usize,
}

pub struct CompiledIndex {
    pub index: IndexSet,
    pub stats: CompileStats,
}

/// Ingest, deduplicate and index a catalog in one pass.
pub fn compile_index(entries: &[CatalogEntry], build_id: u64) -> CompiledIndex {
    let parsed = parse_catalog(entries);
    let mut campaigns = parsed.campaigns;
    let optimize_stats = optimize_campaigns(&mut campaigns);

    let stats = CompileStats {
        entries: entries.len(),
        skipped_rules: parsed.skipped_rules.len(),
        duplicate_campaigns: optimize_stats.duplicate_campaigns,
        duplicate_rules: optimize_stats.duplicate_rules,
        campaigns: optimize_stats.after,
    };

    CompiledIndex {
        index: build_index(campaigns, build_id),
        stats,
    }
}
