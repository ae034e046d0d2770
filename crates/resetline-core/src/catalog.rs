use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ScheduleError;
use crate::occurrence::{Occurrence, occurrences};
use crate::rule::RecurrenceRule;
use crate::window::Window;

/// One entry of the catalog document, as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub start_day: Option<String>,
    #[serde(default)]
    pub end_day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub category: String,
    pub rule: RecurrenceRule,
}

impl Event {
    pub fn from_record(record: &EventRecord) -> Result<Self, ScheduleError> {
        let rule = RecurrenceRule::from_parts(
            &record.kind,
            &record.start_time,
            record.end_time.as_deref(),
            record.start_day.as_deref(),
            record.end_day.as_deref(),
        )?;
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            category: record.category.clone(),
            rule,
        })
    }

    pub fn occurrences(&self, window: &Window) -> Vec<Occurrence> {
        occurrences(&self.rule, window)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueKind {
    #[error(transparent)]
    Invalid(#[from] ScheduleError),

    #[error("unreadable record: {0}")]
    Unreadable(String),

    #[error("duplicate event id")]
    DuplicateId,
}

/// A catalog record that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogIssue {
    pub index: usize,
    pub event_id: String,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub events: Vec<Event>,
    pub issues: Vec<CatalogIssue>,
}

impl Catalog {
    #[tracing::instrument(skip(path), fields(file = %path.display()))]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&raw)
            .with_context(|| format!("failed parsing catalog {}", path.display()))?;
        info!(
            events = catalog.events.len(),
            skipped = catalog.issues.len(),
            "loaded event catalog"
        );
        Ok(catalog)
    }

    /// Parses the document as a list and decodes each entry on its own, so a
    /// record with a missing or mistyped field is skipped like any other
    /// invalid record.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let entries: Vec<Value> = serde_json::from_str(raw)?;
        let mut catalog = Self::default();
        let mut accepted = BTreeSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let event_id = entry
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match serde_json::from_value::<EventRecord>(entry) {
                Ok(record) => catalog.admit(index, &record, &mut accepted),
                Err(err) => {
                    warn!(index, id = %event_id, error = %err, "unreadable event; skipping");
                    catalog.issues.push(CatalogIssue {
                        index,
                        event_id,
                        kind: IssueKind::Unreadable(err.to_string()),
                    });
                }
            }
        }

        Ok(catalog)
    }

    /// Validates every record independently; a bad record is reported and
    /// skipped while the rest still load.
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut catalog = Self::default();
        let mut accepted = BTreeSet::new();
        for (index, record) in records.iter().enumerate() {
            catalog.admit(index, record, &mut accepted);
        }
        catalog
    }

    /// Ids only count as taken once their record validated.
    fn admit(&mut self, index: usize, record: &EventRecord, accepted: &mut BTreeSet<String>) {
        if accepted.contains(&record.id) {
            warn!(index, id = %record.id, "duplicate event id; skipping");
            self.issues.push(CatalogIssue {
                index,
                event_id: record.id.clone(),
                kind: IssueKind::DuplicateId,
            });
            return;
        }

        match Event::from_record(record) {
            Ok(event) => {
                debug!(index, id = %event.id, rule = %event.rule, "validated event");
                accepted.insert(event.id.clone());
                self.events.push(event);
            }
            Err(err) => {
                warn!(index, id = %record.id, error = %err, "invalid event; skipping");
                self.issues.push(CatalogIssue {
                    index,
                    event_id: record.id.clone(),
                    kind: err.into(),
                });
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }
}
