//! Survey metrics: category subtotals, discovery rate, and rank.
//!
//! The discovery rate is the weighted share of non-productive work:
//! incidental counts weigh 0.2, wasteful counts 0.5, real work nothing.
//!
//! | discovery rate | rank |
//! |---|---|
//! | `< 3` | S |
//! | `< 8` | A |
//! | `< 13` | B |
//! | `< 18` | C |
//! | otherwise | D |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::count_key::{CategoryKey, CountKey, CountsMap};
use crate::model::SurveyTemplate;

/// Letter grade derived from the discovery rate. `S` is best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
    /// No template to grade against.
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Rank {
    pub fn from_discovery_rate(rate: f64) -> Self {
        if rate < 3.0 {
            Self::S
        } else if rate < 8.0 {
            Self::A
        } else if rate < 13.0 {
            Self::B
        } else if rate < 18.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub real_subtotal: u64,
    pub incidental_subtotal: u64,
    pub wasteful_subtotal: u64,
    pub total: u64,
    pub discovery_rate: f64,
    pub rank: Rank,
}

impl Metrics {
    /// Result for a record whose template no longer exists.
    pub const NEUTRAL: Metrics = Metrics {
        real_subtotal: 0,
        incidental_subtotal: 0,
        wasteful_subtotal: 0,
        total: 0,
        discovery_rate: 0.0,
        rank: Rank::NotApplicable,
    };
}

/// Sum of the counts of `items` within `category`.
pub fn subtotal(category: CategoryKey, items: &[String], counts: &CountsMap) -> u64 {
    items
        .iter()
        .map(|item| counts.get(&CountKey::new(category, item.as_str())))
        .sum()
}

/// Only keys listed in the template contribute; stray keys in `counts` are
/// ignored.
pub fn compute_metrics(template: Option<&SurveyTemplate>, counts: &CountsMap) -> Metrics {
    let Some(template) = template else {
        return Metrics::NEUTRAL;
    };

    let real_subtotal = subtotal(CategoryKey::Real, &template.real_work, counts);
    let incidental_subtotal = subtotal(CategoryKey::Incidental, &template.incidental_work, counts);
    let wasteful_subtotal = subtotal(CategoryKey::Wasteful, &template.wasteful_work, counts);
    let total = real_subtotal + incidental_subtotal + wasteful_subtotal;

    let discovery_rate = if total > 0 {
        let weighted = real_subtotal as f64 * CategoryKey::Real.waste_weight()
            + incidental_subtotal as f64 * CategoryKey::Incidental.waste_weight()
            + wasteful_subtotal as f64 * CategoryKey::Wasteful.waste_weight();
        weighted / total as f64 * 100.0
    } else {
        0.0
    };

    Metrics {
        real_subtotal,
        incidental_subtotal,
        wasteful_subtotal,
        total,
        discovery_rate,
        rank: Rank::from_discovery_rate(discovery_rate),
    }
}

/// One row of the per-item results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemShare {
    pub category: CategoryKey,
    pub item: String,
    pub count: u64,
    /// Percentage of the session total.
    pub share: f64,
}

/// Per-item counts and their share of the total, in template order.
pub fn breakdown(template: &SurveyTemplate, counts: &CountsMap) -> Vec<ItemShare> {
    let total = compute_metrics(Some(template), counts).total;
    template
        .keys()
        .map(|key| {
            let count = counts.get(&key);
            let share = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            ItemShare {
                category: key.category(),
                item: key.item().to_string(),
                count,
                share,
            }
        })
        .collect()
}
