//! Forge configuration
//!
//! Loaded from TOML; every section falls back to the defaults below when
//! omitted.

use crate::error::ConfigError;
use crate::types::{SubscriptionTier, DEFAULT_PROJECT_NAME};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Quota limits per subscription tier
    pub tiers: TierTable,
    /// Read-through cache settings
    pub cache: CacheConfig,
    /// Pipeline naming and notification settings
    pub pipeline: PipelineSettings,
}

impl ForgeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// With limits for one tier replaced
    #[inline]
    #[must_use]
    pub fn with_tier_limits(mut self, tier: SubscriptionTier, limits: TierLimits) -> Self {
        *self.tiers.limits_mut(tier) = limits;
        self
    }

    /// With cache settings
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With ready notifications switched on or off
    #[inline]
    #[must_use]
    pub fn with_ready_notifications(mut self, enabled: bool) -> Self {
        self.pipeline.notify_on_ready = enabled;
        self
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in SubscriptionTier::ALL {
            let limits = self.tiers.limits(tier);
            for (name, budget) in [
                ("monthly_token_quota", limits.monthly_token_quota),
                ("daily_generation_limit", limits.daily_generation_limit),
                ("max_projects", limits.max_projects),
            ] {
                if budget == Budget::Limited(0) {
                    return Err(ConfigError::Invalid(format!(
                        "tiers.{}.{name} must be positive or \"unlimited\"",
                        tier.as_str()
                    )));
                }
            }
        }

        if self.cache.project_ttl_secs == 0 || self.cache.list_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache TTLs must be positive".into()));
        }
        if self.cache.max_capacity == 0 {
            return Err(ConfigError::Invalid("cache.max_capacity must be positive".into()));
        }
        if self.cache.first_page_limit == 0 {
            return Err(ConfigError::Invalid("cache.first_page_limit must be positive".into()));
        }
        if self.pipeline.fallback_project_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "pipeline.fallback_project_name must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// A per-period allowance: a finite count or no limit at all
///
/// Serialized as an integer or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Budget {
    Limited(u64),
    Unlimited,
}

impl Budget {
    /// Whether `used` units still leave room under this budget
    #[inline]
    #[must_use]
    pub fn permits(self, used: u64) -> bool {
        match self {
            Self::Limited(max) => used < max,
            Self::Unlimited => true,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limited(max) => write!(f, "{max}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl Serialize for Budget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limited(max) => serializer.serialize_u64(*max),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for Budget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u64),
            Word(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(max) => Ok(Self::Limited(max)),
            Repr::Word(word) if word.eq_ignore_ascii_case("unlimited") => Ok(Self::Unlimited),
            Repr::Word(word) => Err(serde::de::Error::custom(format!(
                "expected a count or \"unlimited\", got \"{word}\""
            ))),
        }
    }
}

/// Limits attached to one subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Tokens per calendar month
    pub monthly_token_quota: Budget,
    /// Generation-invoking actions per day
    pub daily_generation_limit: Budget,
    /// Enforced by the CRUD layer; carried here so one table describes a tier
    pub max_projects: Budget,
}

impl TierLimits {
    #[must_use]
    pub const fn new(
        monthly_tokens: Budget,
        daily_generations: Budget,
        max_projects: Budget,
    ) -> Self {
        Self {
            monthly_token_quota: monthly_tokens,
            daily_generation_limit: daily_generations,
            max_projects,
        }
    }

    /// No limit on anything
    #[must_use]
    pub const fn unlimited() -> Self {
        Self::new(Budget::Unlimited, Budget::Unlimited, Budget::Unlimited)
    }
}

/// Limits for every tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub free: TierLimits,
    pub starter: TierLimits,
    pub pro: TierLimits,
    pub enterprise: TierLimits,
}

impl TierTable {
    #[must_use]
    pub fn limits(&self, tier: SubscriptionTier) -> &TierLimits {
        match tier {
            SubscriptionTier::Free => &self.free,
            SubscriptionTier::Starter => &self.starter,
            SubscriptionTier::Pro => &self.pro,
            SubscriptionTier::Enterprise => &self.enterprise,
        }
    }

    fn limits_mut(&mut self, tier: SubscriptionTier) -> &mut TierLimits {
        match tier {
            SubscriptionTier::Free => &mut self.free,
            SubscriptionTier::Starter => &mut self.starter,
            SubscriptionTier::Pro => &mut self.pro,
            SubscriptionTier::Enterprise => &mut self.enterprise,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        use Budget::Limited;
        Self {
            free: TierLimits::new(Limited(50_000), Limited(10), Limited(3)),
            starter: TierLimits::new(Limited(200_000), Limited(50), Limited(10)),
            pro: TierLimits::new(Limited(1_000_000), Limited(200), Limited(50)),
            enterprise: TierLimits::unlimited(),
        }
    }
}

/// Read-through cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub project_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub max_capacity: u64,
    /// Page size of the list entry evicted on invalidation
    pub first_page_limit: u32,
}

impl CacheConfig {
    #[inline]
    #[must_use]
    pub fn project_ttl(&self) -> Duration {
        Duration::from_secs(self.project_ttl_secs)
    }

    #[inline]
    #[must_use]
    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            project_ttl_secs: 60,
            list_ttl_secs: 30,
            max_capacity: 10_000,
            first_page_limit: 10,
        }
    }
}

/// Naming and notification behavior of pipeline runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Used when analysis suggests no name
    pub fallback_project_name: String,
    /// Project name broadcast with the DRAFT status after a failed analysis
    pub failed_analysis_name: String,
    /// Send the ready notification after a successful analysis
    pub notify_on_ready: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fallback_project_name: DEFAULT_PROJECT_NAME.to_string(),
            failed_analysis_name: "Analysis failed".to_string(),
            notify_on_ready: true,
        }
    }
}
