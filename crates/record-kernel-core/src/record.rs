use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{KernelError, OwnerId, RecordId};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Away,
    Sporadic,
}

impl EventStatus {
    #[must_use]
    pub fn human_text(self) -> &'static str {
        match self {
            Self::Away => "Away",
            Self::Sporadic => "Sporadic",
        }
    }
}

/// One calendar record as handed over by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct RawRecord {
    pub record_id: RecordId,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub start_epoch: i64,
    pub end_epoch: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub invited_owners: BTreeSet<OwnerId>,
}

impl RawRecord {
    /// Check the record can be projected and return its owner.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when the owner is missing or blank, or
    /// when the interval ends before it starts.
    pub fn validate(&self) -> Result<&OwnerId, KernelError> {
        let owner = match &self.owner_id {
            Some(owner) if !owner.as_str().trim().is_empty() => owner,
            _ => {
                return Err(KernelError::Validation(format!(
                    "record {} MUST have an owner",
                    self.record_id
                )));
            }
        };

        if self.end_epoch < self.start_epoch {
            return Err(KernelError::Validation(format!(
                "record {} ends before it starts ({} < {})",
                self.record_id, self.end_epoch, self.start_epoch
            )));
        }

        Ok(owner)
    }

    /// Explicit title when it has visible content.
    #[must_use]
    pub fn explicit_title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|title| !title.is_empty())
    }
}

/// Display names for owners, keyed by owner id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(transparent)]
pub struct OwnerDirectory(pub BTreeMap<OwnerId, String>);

impl OwnerDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, owner: OwnerId, name: impl Into<String>) {
        self.0.insert(owner, name.into());
    }

    /// Falls back to the raw owner id for owners without a registered name.
    #[must_use]
    pub fn display_name<'a>(&'a self, owner: &'a OwnerId) -> &'a str {
        self.0.get(owner).map_or(owner.as_str(), String::as_str)
    }

    /// `"<owner name> (<status>)"`, the line shown for a record that has no title of its own.
    #[must_use]
    pub fn terse_summary(&self, owner: &OwnerId, status: EventStatus) -> String {
        format!("{} ({})", self.display_name(owner), status.human_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: Option<&str>, start: i64, end: i64) -> RawRecord {
        RawRecord {
            record_id: RecordId(7),
            owner_id: owner.map(OwnerId::new),
            start_epoch: start,
            end_epoch: end,
            title: None,
            description: String::new(),
            status: EventStatus::Away,
            is_cancelled: false,
            invited_owners: BTreeSet::new(),
        }
    }

    #[test]
    fn validate_rejects_missing_owner() {
        let raw = record(None, 0, 10);
        assert!(matches!(
            raw.validate(),
            Err(KernelError::Validation(message)) if message.contains("owner")
        ));
    }

    #[test]
    fn validate_rejects_blank_owner() {
        assert!(record(Some("  "), 0, 10).validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_interval() {
        let raw = record(Some("PHID-USER-a"), 10, 9);
        assert!(matches!(
            raw.validate(),
            Err(KernelError::Validation(message)) if message.contains("ends before")
        ));
    }

    #[test]
    fn validate_accepts_zero_length_interval() {
        let owner = OwnerId::new("PHID-USER-a");
        assert_eq!(record(Some("PHID-USER-a"), 10, 10).validate(), Ok(&owner));
    }

    #[test]
    fn blank_title_is_not_explicit() {
        let mut raw = record(Some("PHID-USER-a"), 0, 0);
        raw.title = Some("   ".to_string());
        assert_eq!(raw.explicit_title(), None);
        raw.title = Some(" Standup ".to_string());
        assert_eq!(raw.explicit_title(), Some("Standup"));
    }

    #[test]
    fn directory_falls_back_to_owner_id() {
        let mut directory = OwnerDirectory::new();
        let alice = OwnerId::new("PHID-USER-alice");
        let bob = OwnerId::new("PHID-USER-bob");
        directory.insert(alice.clone(), "alice");

        assert_eq!(directory.display_name(&alice), "alice");
        assert_eq!(directory.display_name(&bob), "PHID-USER-bob");
        assert_eq!(directory.terse_summary(&alice, EventStatus::Sporadic), "alice (Sporadic)");
    }
}
