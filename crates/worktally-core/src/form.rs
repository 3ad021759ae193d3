//! Editable work lists for the template and preset registration forms.

use crate::count_key::CategoryKey;
use crate::error::ValidationError;
use crate::model::{Preset, WorkListsPayload};

/// Move the element at `from` so it ends up at index `to`, shifting the
/// elements in between.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), ValidationError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

/// An ordered list of item labels being edited. Always holds at least one
/// (possibly blank) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemList {
    entries: Vec<String>,
}

impl Default for ItemList {
    fn default() -> Self {
        Self {
            entries: vec![String::new()],
        }
    }
}

impl ItemList {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = labels.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            Self::default()
        } else {
            Self { entries }
        }
    }

    pub fn push(&mut self, label: impl Into<String>) {
        self.entries.push(label.into());
    }

    pub fn set(&mut self, index: usize, label: impl Into<String>) -> Result<(), ValidationError> {
        let len = self.entries.len();
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange { index, len })?;
        *slot = label.into();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<String, ValidationError> {
        let len = self.entries.len();
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(ValidationError::LastEntry);
        }
        Ok(self.entries.remove(index))
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        move_item(&mut self.entries, from, to)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Non-blank labels, trimmed, in list order.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Form state for registering a template or preset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkListsDraft {
    pub no: String,
    pub name: String,
    pub real: ItemList,
    pub incidental: ItemList,
    pub wasteful: ItemList,
}

impl WorkListsDraft {
    /// Start a template form pre-filled from a preset.
    pub fn from_preset(preset: &Preset) -> Self {
        Self {
            no: String::new(),
            name: String::new(),
            real: ItemList::from_labels(preset.real_work.iter().cloned()),
            incidental: ItemList::from_labels(preset.incidental_work.iter().cloned()),
            wasteful: ItemList::from_labels(preset.wasteful_work.iter().cloned()),
        }
    }

    pub fn list_mut(&mut self, category: CategoryKey) -> &mut ItemList {
        match category {
            CategoryKey::Real => &mut self.real,
            CategoryKey::Incidental => &mut self.incidental,
            CategoryKey::Wasteful => &mut self.wasteful,
        }
    }

    pub fn to_template_payload(&self) -> Result<WorkListsPayload, ValidationError> {
        let no = self.no.trim();
        let mut payload = self.payload("survey")?;
        payload.no = (!no.is_empty()).then(|| no.to_string());
        Ok(payload)
    }

    pub fn to_preset_payload(&self) -> Result<WorkListsPayload, ValidationError> {
        self.payload("preset")
    }

    fn payload(&self, kind: &'static str) -> Result<WorkListsPayload, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName(kind));
        }
        Ok(WorkListsPayload {
            no: None,
            name: name.to_string(),
            real_work: self.real.labels(),
            incidental_work: self.incidental.labels(),
            wasteful_work: self.wasteful.labels(),
        })
    }
}
