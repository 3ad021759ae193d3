//! Count keys and the counts map.
//!
//! A count key names one tappable item inside one work category. On the wire
//! it is the string `"<category>-<item>"` (e.g. `"wasteful-Waiting"`). Category
//! names never contain `-`, so splitting at the first separator recovers the
//! pair exactly, even when the item label itself contains hyphens:
//! `"real-Pick-up"` is `(Real, "Pick-up")`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ValidationError;
use crate::model::SurveyTemplate;

const SEPARATOR: char = '-';

/// The three work categories a template splits its items into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    Real,
    Incidental,
    Wasteful,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 3] = [Self::Real, Self::Incidental, Self::Wasteful];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Incidental => "incidental",
            Self::Wasteful => "wasteful",
        }
    }

    /// Weight of one count in this category towards the discovery rate.
    pub fn waste_weight(self) -> f64 {
        match self {
            Self::Real => 0.0,
            Self::Incidental => 0.2,
            Self::Wasteful => 0.5,
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real" => Ok(Self::Real),
            "incidental" => Ok(Self::Incidental),
            "wasteful" => Ok(Self::Wasteful),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}

/// One (category, item) pair.
///
/// Ordering follows the wire form: category name, then label. That puts
/// `incidental-*` before `real-*` before `wasteful-*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountKey {
    category: CategoryKey,
    item: String,
}

impl CountKey {
    pub fn new(category: CategoryKey, item: impl Into<String>) -> Self {
        Self {
            category,
            item: item.into(),
        }
    }

    pub fn category(&self) -> CategoryKey {
        self.category
    }

    pub fn item(&self) -> &str {
        &self.item
    }
}

impl Ord for CountKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // No category name is a prefix of another, so this matches comparing
        // the joined strings.
        (self.category.as_str(), self.item.as_str()).cmp(&(other.category.as_str(), other.item.as_str()))
    }
}

impl PartialOrd for CountKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.category, SEPARATOR, self.item)
    }
}

impl FromStr for CountKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, item) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| ValidationError::MalformedCountKey(s.to_string()))?;
        Ok(Self::new(category.parse()?, item))
    }
}

impl Serialize for CountKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CountKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Tally per count key. Keys that were never recorded read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountsMap {
    counts: BTreeMap<CountKey, u64>,
}

impl CountsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every item of the template, each at zero.
    pub fn zeroed(template: &SurveyTemplate) -> Self {
        let counts = template
            .keys()
            .map(|key| (key, 0))
            .collect::<BTreeMap<_, _>>();
        Self { counts }
    }

    pub fn get(&self, key: &CountKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: CountKey, value: u64) {
        self.counts.insert(key, value);
    }

    /// Add one to `key` and return the new count.
    pub fn increment(&mut self, key: &CountKey) -> u64 {
        let slot = self.counts.entry(key.clone()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Subtract one from `key` unless it is already zero. Returns `true` if
    /// the count changed.
    pub fn decrement(&mut self, key: &CountKey) -> bool {
        match self.counts.get_mut(key) {
            Some(slot) if *slot > 0 => {
                *slot -= 1;
                true
            }
            _ => false,
        }
    }

    /// Sum of every stored count, regardless of template.
    pub fn sum(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CountKey> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountKey, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Like the derived `Deserialize`, but entries whose key does not parse
    /// or whose value is not a count are dropped with a warning instead of
    /// failing the whole map. Used for records written by other clients.
    pub fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, LenientCount>::deserialize(deserializer)?;
        let mut counts = BTreeMap::new();
        for (raw_key, value) in raw {
            let key = match raw_key.parse::<CountKey>() {
                Ok(key) => key,
                Err(err) => {
                    warn!(key = %raw_key, error = %err, "skipping count entry");
                    continue;
                }
            };
            match value {
                LenientCount::Count(n) => {
                    counts.insert(key, n);
                }
                LenientCount::Other(_) => warn!(key = %raw_key, "skipping count entry with a non-count value"),
            }
        }
        Ok(Self { counts })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientCount {
    Count(u64),
    Other(IgnoredAny),
}

impl FromIterator<(CountKey, u64)> for CountsMap {
    fn from_iter<I: IntoIterator<Item = (CountKey, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
