use serde::{Deserialize, Serialize};

use adt_core::canonical::canonicalize;
use adt_core::types::{Campaign, CampaignStatus, Dimension, Polarity, Rule};

/// A campaign as delivered by the catalog source, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "image_url")]
    pub image: String,
    #[serde(default)]
    pub cta: String,
    /// The source feed only carries active campaigns, so a missing status means active.
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// A targeting rule in wire format: free-form dimension tag and raw values.
///
/// Every field tolerates being absent or `null` so that one incomplete rule
/// is skipped at ingestion instead of failing the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default, alias = "include")]
    pub is_inclusion: Option<bool>,
    /// A `null` list reads as empty and `null` elements as blank values.
    #[serde(default, deserialize_with = "deserialize_values")]
    pub values: Vec<String>,
}

impl RawRule {
    pub fn new(dimension: impl Into<String>, is_inclusion: bool, values: Vec<String>) -> Self {
        Self {
            dimension: Some(dimension.into()),
            is_inclusion: Some(is_inclusion),
            values,
        }
    }
}

fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

fn default_status() -> String {
    "ACTIVE".to_string()
}

/// A rule that was skipped during ingestion. The campaign itself still loads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("campaign {campaign}: rule has no {field}")]
    MissingField {
        campaign: String,
        field: &'static str,
    },
    #[error("campaign {campaign}: unknown dimension {dimension:?}")]
    UnknownDimension { campaign: String, dimension: String },
    #[error("campaign {campaign}: {dimension} rule has only blank values")]
    EmptyValues { campaign: String, dimension: Dimension },
}

/// Error type for decoding a catalog document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogParseError {
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of ingesting a catalog.
#[derive(Debug, Clone, Default)]
pub struct ParsedCatalog {
    pub campaigns: Vec<Campaign>,
    pub skipped_rules: Vec<RuleError>,
}

/// Decode a JSON array of catalog entries.
pub fn parse_catalog_json(text: &str) -> Result<Vec<CatalogEntry>, CatalogParseError> {
    Ok(serde_json::from_str(text)?)
}

/// Ingest catalog entries into canonical campaigns, skipping malformed rules.
pub fn parse_catalog(entries: &[CatalogEntry]) -> ParsedCatalog {
    let mut parsed = ParsedCatalog {
        campaigns: Vec::with_capacity(entries.len()),
        skipped_rules: Vec::new(),
    };

    for entry in entries {
        let (campaign, errors) = parse_campaign(entry);
        for error in &errors {
            log::warn!("skipping rule: {}", error);
        }
        parsed.campaigns.push(campaign);
        parsed.skipped_rules.extend(errors);
    }

    parsed
}

/// Ingest one entry. Rules that fail to parse are returned as errors and left out.
pub fn parse_campaign(entry: &CatalogEntry) -> (Campaign, Vec<RuleError>) {
    let mut rules = Vec::with_capacity(entry.rules.len());
    let mut errors = Vec::new();

    for raw in &entry.rules {
        match parse_rule(&entry.id, raw) {
            Ok(rule) => rules.push(rule),
            Err(error) => errors.push(error),
        }
    }

    let campaign = Campaign {
        id: entry.id.trim().to_string(),
        name: entry.name.clone(),
        image: entry.image.clone(),
        cta: entry.cta.clone(),
        status: CampaignStatus::from_tag(&entry.status),
        rules,
    };

    (campaign, errors)
}

/// Map a raw rule onto the closed dimension set and canonicalize its values.
///
/// Blank values are dropped. A rule that declared values but has none left is
/// malformed; a rule that declared no values at all is kept and always passes.
pub fn parse_rule(campaign_id: &str, raw: &RawRule) -> Result<Rule, RuleError> {
    let missing = |field: &'static str| RuleError::MissingField {
        campaign: campaign_id.to_string(),
        field,
    };
    let tag = raw.dimension.as_deref().ok_or_else(|| missing("dimension"))?;
    let is_inclusion = raw.is_inclusion.ok_or_else(|| missing("is_inclusion"))?;

    let dimension = tag.parse::<Dimension>().map_err(|_| RuleError::UnknownDimension {
        campaign: campaign_id.to_string(),
        dimension: tag.to_string(),
    })?;

    let values: Vec<String> = raw
        .values
        .iter()
        .map(|v| canonicalize(dimension, v))
        .filter(|v| !v.is_empty())
        .collect();

    if values.is_empty() && !raw.values.is_empty() {
        return Err(RuleError::EmptyValues {
            campaign: campaign_id.to_string(),
            dimension,
        });
    }

    Ok(Rule::new(dimension, Polarity::from_inclusion(is_inclusion), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(dimension: &str, is_inclusion: bool, values: &[&str]) -> RawRule {
        RawRule::new(dimension, is_inclusion, values.iter().map(|v| v.to_string()).collect())
    }

    fn entry(id: &str, rules: Vec<RawRule>) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: format!("Campaign {id}"),
            image: format!("https://img/{id}.png"),
            cta: "Install".to_string(),
            status: "ACTIVE".to_string(),
            rules,
        }
    }

    #[test]
    fn canonicalizes_rule_values() {
        let rule = parse_rule("1", &raw("Country", true, &[" us", "Ca "])).unwrap();
        assert_eq!(rule.dimension, Dimension::Country);
        assert_eq!(rule.polarity, Polarity::Include);
        assert_eq!(rule.values, vec!["US", "CA"]);

        let rule = parse_rule("1", &raw("OS", false, &["Android"])).unwrap();
        assert_eq!(rule.polarity, Polarity::Exclude);
        assert_eq!(rule.values, vec!["android"]);
    }

    #[test]
    fn unknown_dimension_skips_rule_not_campaign() {
        let parsed = parse_catalog(&[entry(
            "1",
            vec![raw("region", true, &["emea"]), raw("os", true, &["android"])],
        )]);
        assert_eq!(parsed.campaigns.len(), 1);
        assert_eq!(parsed.campaigns[0].rules.len(), 1);
        assert_eq!(
            parsed.skipped_rules,
            vec![RuleError::UnknownDimension {
                campaign: "1".to_string(),
                dimension: "region".to_string(),
            }]
        );
    }

    #[test]
    fn blank_values_are_dropped() {
        let rule = parse_rule("1", &raw("appid", true, &["com.any", "  "])).unwrap();
        assert_eq!(rule.values, vec!["com.any"]);

        let err = parse_rule("1", &raw("appid", true, &["", " "])).unwrap_err();
        assert_eq!(
            err,
            RuleError::EmptyValues {
                campaign: "1".to_string(),
                dimension: Dimension::AppId,
            }
        );
    }

    #[test]
    fn declared_empty_value_set_is_kept() {
        let rule = parse_rule("1", &raw("country", true, &[])).unwrap();
        assert!(rule.values.is_empty());
        assert!(rule.passes("US"));
    }

    #[test]
    fn parses_catalog_json() {
        let text = r#"[
            {
                "id": "1",
                "name": "Spotify",
                "image_url": "https://img/1.png",
                "cta": "Download",
                "status": "ACTIVE",
                "rules": [
                    {"dimension": "appid", "include": true, "values": ["com.any"]},
                    {"dimension": "country", "is_inclusion": false, "values": ["ca"]}
                ]
            },
            {"id": "2"}
        ]"#;
        let entries = parse_catalog_json(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image, "https://img/1.png");
        assert_eq!(entries[0].rules[0].is_inclusion, Some(true));
        assert_eq!(entries[0].rules[1].is_inclusion, Some(false));
        assert_eq!(entries[1].status, "ACTIVE");
        assert!(entries[1].rules.is_empty());
    }

    #[test]
    fn incomplete_rules_are_skipped_not_fatal() {
        let text = r#"[
            {"id": "1", "rules": [
                {"dimension": "country", "values": ["US"]},
                {"dimension": "os", "is_inclusion": true, "values": ["android"]}
            ]},
            {"id": "2", "rules": [
                {"is_inclusion": true, "values": ["US"]},
                {"dimension": null, "include": false, "values": ["CA"]}
            ]}
        ]"#;
        let entries = parse_catalog_json(text).unwrap();
        let parsed = parse_catalog(&entries);

        assert_eq!(parsed.campaigns.len(), 2);
        assert_eq!(parsed.campaigns[0].rules.len(), 1);
        assert_eq!(parsed.campaigns[0].rules[0].dimension, Dimension::Os);
        assert!(parsed.campaigns[1].rules.is_empty());
        assert_eq!(
            parsed.skipped_rules,
            vec![
                RuleError::MissingField {
                    campaign: "1".to_string(),
                    field: "is_inclusion",
                },
                RuleError::MissingField {
                    campaign: "2".to_string(),
                    field: "dimension",
                },
                RuleError::MissingField {
                    campaign: "2".to_string(),
                    field: "dimension",
                },
            ]
        );
    }

    #[test]
    fn null_values_are_read_as_blank() {
        let text = r#"[{"id": "1", "rules": [
            {"dimension": "os", "is_inclusion": true, "values": null},
            {"dimension": "country", "is_inclusion": true, "values": [null, "us", null]},
            {"dimension": "appid", "is_inclusion": true, "values": [null]}
        ]}]"#;
        let entries = parse_catalog_json(text).unwrap();
        assert!(entries[0].rules[0].values.is_empty());
        assert_eq!(entries[0].rules[1].values, vec!["", "us", ""]);

        let (campaign, errors) = parse_campaign(&entries[0]);
        assert_eq!(
            errors,
            vec![RuleError::EmptyValues {
                campaign: "1".to_string(),
                dimension: Dimension::AppId,
            }]
        );
        assert_eq!(campaign.rules.len(), 2);
        assert!(campaign.rules[0].values.is_empty());
        assert_eq!(campaign.rules[1].values, vec!["US"]);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(parse_catalog_json("{not json").is_err());
        assert!(parse_catalog_json(r#"[{"name": "missing id"}]"#).is_err());
    }

    #[test]
    fn maps_status() {
        let mut e = entry("1", Vec::new());
        e.status = "INACTIVE".to_string();
        let (campaign, errors) = parse_campaign(&e);
        assert!(errors.is_empty());
        assert_eq!(campaign.status, CampaignStatus::Inactive);
    }
}
