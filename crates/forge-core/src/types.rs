//! Core types for Forge
//!
//! Defines the entities the pipeline reads and writes:
//! - identifiers (ULID newtypes, opaque tenant ids)
//! - projects, features and screens
//! - the structured analysis artifact produced by generation
//! - tenant principal and subscription tier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Ulid);

        impl $name {
            /// Generate a new id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

ulid_id!(
    /// Unique project identifier (ULID for sortability)
    ProjectId
);
ulid_id!(
    /// Unique feature identifier
    FeatureId
);
ulid_id!(
    /// Unique screen identifier
    ScreenId
);

/// Owning account identity, issued by the auth layer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Subscription tiers; limits per tier live in [`crate::config::TierTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Starter,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    /// All tiers, cheapest first
    pub const ALL: [SubscriptionTier; 4] = [Self::Free, Self::Starter, Self::Pro, Self::Enterprise];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "starter" => Ok(Self::Starter),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown subscription tier: {other}")),
        }
    }
}

/// Authenticated caller of a pipeline trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: TenantId,
    pub tier: SubscriptionTier,
}

impl Tenant {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<TenantId>, tier: SubscriptionTier) -> Self {
        Self { id: id.into(), tier }
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Project lifecycle status
///
/// Only `Draft`, `Analyzing`, `Wireframing` and `Ready` are driven by the
/// pipeline; the rest are reached through the CRUD layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    Analyzing,
    Wireframing,
    Ready,
    InDevelopment,
    Completed,
    Archived,
}

impl ProjectStatus {
    /// Every status, in lifecycle order
    pub const ALL: [ProjectStatus; 7] = [
        Self::Draft,
        Self::Analyzing,
        Self::Wireframing,
        Self::Ready,
        Self::InDevelopment,
        Self::Completed,
        Self::Archived,
    ];

    /// A pipeline run currently owns the project
    #[inline]
    #[must_use]
    pub fn is_pipeline_busy(self) -> bool {
        matches!(self, Self::Analyzing | Self::Wireframing)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Analyzing => "ANALYZING",
            Self::Wireframing => "WIREFRAMING",
            Self::Ready => "READY",
            Self::InDevelopment => "IN_DEVELOPMENT",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product idea and the artifacts generated from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub owner: TenantId,
    /// Free-text idea; never changes after creation
    pub description: String,
    pub name: String,
    pub app_type: Option<String>,
    pub status: ProjectStatus,
    /// Full generated analysis payload, set once per successful analysis
    pub analysis: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Name given to a project that has none yet
pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

/// Input for creating a project (done by the CRUD layer)
#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner: TenantId,
    pub name: Option<String>,
    pub description: String,
}

impl NewProject {
    #[must_use]
    pub fn new(owner: impl Into<TenantId>, description: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Feature priority as produced by analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeaturePriority {
    Mvp,
    High,
    Medium,
    Low,
}

/// Persisted feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub priority: FeaturePriority,
    pub estimated_hours: Option<u32>,
    pub complexity: Option<u8>,
}

/// Persisted screen row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: ScreenId,
    pub project_id: ProjectId,
    pub name: String,
    pub screen_type: String,
    /// 1-based, dense within a project
    pub order: u32,
    /// Opaque layout; an empty object until a wireframe pass fills it
    pub wireframe: serde_json::Value,
    /// Navigation targets, edited outside the pipeline
    pub connections: Vec<ScreenId>,
}

impl Screen {
    /// Whether a wireframe pass has produced content for this screen
    #[must_use]
    pub fn has_wireframe(&self) -> bool {
        match &self.wireframe {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

/// Screen row to be inserted, order already assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewScreen {
    pub name: String,
    pub screen_type: String,
    pub order: u32,
}

/// Structured result of the analysis generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub features: Vec<FeatureDescriptor>,
    #[serde(default)]
    pub screens: Vec<ScreenDescriptor>,
    /// Remaining keys (personas, tech stack, ...) kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One feature as described by analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub priority: FeaturePriority,
    #[serde(default)]
    pub estimated_hours: Option<u32>,
    #[serde(default)]
    pub complexity: Option<u8>,
}

/// One screen as described by analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub screen_type: String,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project with its features and screens (screens in ascending order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithRelations {
    pub project: Project,
    pub features: Vec<Feature>,
    pub screens: Vec<Screen>,
}

/// Row returned by project listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub status: ProjectStatus,
    pub feature_count: usize,
    pub screen_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Sort direction for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Pagination and filtering for project listings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuery {
    /// Unfiltered first page with the given size
    #[must_use]
    pub fn first_page(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            search: None,
            sort_by: None,
            sort_order: None,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ProjectStatus::InDevelopment).unwrap();
        assert_eq!(json, "\"IN_DEVELOPMENT\"");
        assert_eq!(ProjectStatus::Wireframing.to_string(), "WIREFRAMING");
    }

    #[test]
    fn busy_statuses() {
        let busy: Vec<_> = ProjectStatus::ALL
            .into_iter()
            .filter(|s| s.is_pipeline_busy())
            .collect();
        assert_eq!(busy, vec![ProjectStatus::Analyzing, ProjectStatus::Wireframing]);
    }

    #[test]
    fn analysis_result_parses_generated_shape() {
        let payload = serde_json::json!({
            "appName": "Shelf",
            "appType": "WEB_APP",
            "targetAudience": "readers",
            "features": [
                {"name": "Auth", "description": "Sign in", "category": "Authentication",
                 "priority": "MVP", "estimatedHours": 8, "complexity": 3}
            ],
            "screens": [{"name": "Home", "type": "HOME", "order": 1}]
        });

        let parsed: AnalysisResult = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed.app_name.as_deref(), Some("Shelf"));
        assert_eq!(parsed.features[0].priority, FeaturePriority::Mvp);
        assert_eq!(parsed.screens[0].screen_type, "HOME");
        assert!(parsed.extra.contains_key("targetAudience"));
    }

    #[test]
    fn analysis_result_rejects_bad_priority() {
        let payload = serde_json::json!({
            "features": [{"name": "Auth", "priority": "URGENT"}]
        });
        assert!(serde_json::from_value::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn empty_wireframe_is_not_content() {
        let mut screen = Screen {
            id: ScreenId::new(),
            project_id: ProjectId::new(),
            name: "Home".into(),
            screen_type: "HOME".into(),
            order: 1,
            wireframe: serde_json::json!({}),
            connections: vec![],
        };
        assert!(!screen.has_wireframe());

        screen.wireframe = serde_json::json!({"layout": "column"});
        assert!(screen.has_wireframe());
    }

    #[test]
    fn tier_from_str_is_case_insensitive() {
        assert_eq!("PRO".parse::<SubscriptionTier>(), Ok(SubscriptionTier::Pro));
        assert!("gold".parse::<SubscriptionTier>().is_err());
    }
}
