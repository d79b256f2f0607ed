//! Core type definitions for ad targeting
//!
//! These types describe the campaign catalog after ingestion and are used
//! throughout the index and matching engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error type for parsing catalog tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTagError {
    #[error("Unknown dimension: {0:?}")]
    UnknownDimension(String),
}

// =============================================================================
// Dimensions
// =============================================================================

/// A targeting axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Dimension {
    /// Requesting application identifier
    AppId = 0,
    /// Device operating system
    Os = 1,
    /// Request country (ISO code)
    Country = 2,
}

impl Dimension {
    /// Number of dimensions; sizes the per-dimension index arrays.
    pub const COUNT: usize = 3;

    /// All dimensions, in narrowing order.
    pub const ALL: [Dimension; Self::COUNT] = [Self::AppId, Self::Os, Self::Country];

    /// Position of this dimension in per-dimension arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppId => "appid",
            Self::Os => "os",
            Self::Country => "country",
        }
    }

    /// Single-bit mask for this dimension.
    #[inline]
    pub const fn mask(self) -> DimensionMask {
        match self {
            Self::AppId => DimensionMask::APP_ID,
            Self::Os => DimensionMask::OS,
            Self::Country => DimensionMask::COUNTRY,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ParseTagError;

    /// Parse a wire-format dimension tag. Matching ignores case and
    /// surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case("appid")
            || tag.eq_ignore_ascii_case("app_id")
            || tag.eq_ignore_ascii_case("app")
        {
            Ok(Self::AppId)
        } else if tag.eq_ignore_ascii_case("os") {
            Ok(Self::Os)
        } else if tag.eq_ignore_ascii_case("country") {
            Ok(Self::Country)
        } else {
            Err(ParseTagError::UnknownDimension(s.to_string()))
        }
    }
}

bitflags::bitflags! {
    /// Set of dimensions, used to track which dimensions a campaign constrains.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DimensionMask: u8 {
        const APP_ID = 1 << 0;
        const OS = 1 << 1;
        const COUNTRY = 1 << 2;
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Whether a rule requires membership in its value set or absence from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Include,
    Exclude,
}

impl Polarity {
    #[inline]
    pub const fn from_inclusion(is_inclusion: bool) -> Self {
        if is_inclusion {
            Self::Include
        } else {
            Self::Exclude
        }
    }

    #[inline]
    pub const fn is_inclusion(self) -> bool {
        matches!(self, Self::Include)
    }
}

/// A single targeting rule. Values are stored in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub dimension: Dimension,
    pub polarity: Polarity,
    pub values: Vec<String>,
}

impl Rule {
    pub fn new(dimension: Dimension, polarity: Polarity, values: Vec<String>) -> Self {
        Self {
            dimension,
            polarity,
            values,
        }
    }

    /// Check a canonical request value against this rule.
    ///
    /// An empty value set imposes no constraint and always passes.
    #[inline]
    pub fn passes(&self, value: &str) -> bool {
        if self.values.is_empty() {
            return true;
        }
        let found = self.values.iter().any(|v| v == value);
        match self.polarity {
            Polarity::Include => found,
            Polarity::Exclude => !found,
        }
    }
}

// =============================================================================
// Campaigns
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CampaignStatus {
    Active,
    #[default]
    Inactive,
}

impl CampaignStatus {
    /// Map a catalog status tag. Anything other than `ACTIVE` is inactive.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("ACTIVE") {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// A campaign together with its complete, ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cta: String,
    pub status: CampaignStatus,
    pub rules: Vec<Rule>,
}

impl Campaign {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// Dimensions on which this campaign has at least one inclusion rule
    /// that actually constrains the value (non-empty value set).
    pub fn inclusion_mask(&self) -> DimensionMask {
        self.rules
            .iter()
            .filter(|rule| rule.polarity.is_inclusion() && !rule.values.is_empty())
            .fold(DimensionMask::empty(), |mask, rule| mask | rule.dimension.mask())
    }

    /// Check every rule against the request. All rules must pass.
    pub fn matches(&self, request: &MatchRequest) -> bool {
        self.rules
            .iter()
            .all(|rule| rule.passes(request.value(rule.dimension)))
    }

    /// The externally visible part of this campaign.
    pub fn to_ad(&self) -> AdCampaign {
        AdCampaign {
            id: self.id.clone(),
            image: self.image.clone(),
            cta: self.cta.clone(),
        }
    }
}

// =============================================================================
// Requests and Results
// =============================================================================

/// A delivery request. Fields are free-form until canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchRequest {
    pub app_id: String,
    pub os: String,
    pub country: String,
}

impl MatchRequest {
    pub fn new(
        app_id: impl Into<String>,
        os: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            os: os.into(),
            country: country.into(),
        }
    }

    /// Request value for a dimension.
    #[inline]
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::AppId => &self.app_id,
            Dimension::Os => &self.os,
            Dimension::Country => &self.country,
        }
    }
}

/// A matched campaign as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCampaign {
    #[serde(rename = "cid")]
    pub id: String,
    #[serde(rename = "img")]
    pub image: String,
    pub cta: String,
}
