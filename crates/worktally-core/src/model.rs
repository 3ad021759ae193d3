//! Shared record types exchanged with the worktally API.
//!
//! Field names follow the API's camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::count_key::{CategoryKey, CountKey, CountsMap};
use crate::metrics::Rank;

/// A survey template: three ordered lists of countable work items.
///
/// Templates referenced by a counting session are never edited in place;
/// editing produces a new template through the catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyTemplate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<String>,
    #[serde(default)]
    pub real_work: Vec<String>,
    #[serde(default)]
    pub incidental_work: Vec<String>,
    #[serde(default)]
    pub wasteful_work: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SurveyTemplate {
    pub fn items(&self, category: CategoryKey) -> &[String] {
        match category {
            CategoryKey::Real => &self.real_work,
            CategoryKey::Incidental => &self.incidental_work,
            CategoryKey::Wasteful => &self.wasteful_work,
        }
    }

    /// Every count key of the template, in category then list order.
    pub fn keys(&self) -> impl Iterator<Item = CountKey> + '_ {
        CategoryKey::ALL.into_iter().flat_map(move |category| {
            self.items(category)
                .iter()
                .map(move |item| CountKey::new(category, item.as_str()))
        })
    }

    pub fn contains(&self, key: &CountKey) -> bool {
        self.items(key.category()).iter().any(|i| i == key.item())
    }
}

/// A named, reusable trio of item lists used to pre-fill new templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub real_work: Vec<String>,
    #[serde(default)]
    pub incidental_work: Vec<String>,
    #[serde(default)]
    pub wasteful_work: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a template or preset.
///
/// `no` is only meaningful for templates and is omitted for presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkListsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<String>,
    pub name: String,
    pub real_work: Vec<String>,
    pub incidental_work: Vec<String>,
    pub wasteful_work: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    InProgress,
    Completed,
    Discarded,
}

/// A remote record of one counting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInstance {
    pub id: String,
    pub survey_template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_template_name: Option<String>,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// A saved survey result. Immutable once stored.
///
/// `total_count`, `discovery_rate` and `rank` are what the saving client
/// computed at the time; readers recompute them against the template.
/// Count entries that do not parse are dropped so one bad record cannot
/// hide the rest of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub id: String,
    pub instance_id: String,
    pub survey_id: String,
    pub survey_name: String,
    #[serde(deserialize_with = "CountsMap::deserialize_lenient")]
    pub counts: CountsMap,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub discovery_rate: f64,
    #[serde(default)]
    pub rank: Rank,
    pub surveyed_at: DateTime<Utc>,
}

/// A result as submitted by the client. The store assigns `id` and
/// `surveyedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResult {
    pub instance_id: String,
    pub survey_id: String,
    pub survey_name: String,
    pub counts: CountsMap,
    pub total_count: u64,
    pub discovery_rate: f64,
    pub rank: Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Master,
    Super,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub user_id: String,
    pub role: Role,
    #[serde(default)]
    pub company_code: String,
}
