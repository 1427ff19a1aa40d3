use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::range::{resolve_range, ResolvedRange};
use crate::record::RawRecord;
use crate::{KernelError, Localizer, MonthYear, OwnerId};

pub const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CancellationFilter {
    #[default]
    Active,
    Cancelled,
    Both,
}

impl CancellationFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Both => "both",
        }
    }

    /// Value of the `is_cancelled` clause, `None` when both kinds are wanted.
    #[must_use]
    pub fn is_cancelled_clause(self) -> Option<bool> {
        match self {
            Self::Active => Some(false),
            Self::Cancelled => Some(true),
            Self::Both => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Grid,
    List,
}

impl DisplayMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }
}

/// Decoded search parameters for calendar records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct FilterState {
    pub range_start: Option<i64>,
    pub range_end: Option<i64>,
    pub upcoming_only: bool,
    pub invited_owners: BTreeSet<OwnerId>,
    pub creator_owners: BTreeSet<OwnerId>,
    pub cancellation_filter: CancellationFilter,
    pub display_mode: DisplayMode,
    pub limit: Option<usize>,
}

impl FilterState {
    #[must_use]
    pub fn builtin_names() -> &'static [&'static str] {
        &["month", "upcoming", "all"]
    }

    /// Named preset filters.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] for an unknown preset name.
    pub fn builtin(name: &str) -> Result<Self, KernelError> {
        match name {
            "month" => Ok(Self { display_mode: DisplayMode::Grid, ..Self::default() }),
            "upcoming" => {
                Ok(Self { upcoming_only: true, display_mode: DisplayMode::List, ..Self::default() })
            }
            "all" => Ok(Self { display_mode: DisplayMode::List, ..Self::default() }),
            other => Err(KernelError::Validation(format!(
                "unknown builtin filter `{other}` (expected one of: {})",
                Self::builtin_names().join(", ")
            ))),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Clauses handed to a record store, also usable as an in-memory predicate.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EventQuery {
    pub date_range: Option<ResolvedRange>,
    pub invited_owners: BTreeSet<OwnerId>,
    pub creator_owners: BTreeSet<OwnerId>,
    pub is_cancelled: Option<bool>,
    pub limit: usize,
}

impl EventQuery {
    #[must_use]
    pub fn matches(&self, record: &RawRecord) -> bool {
        if let Some(range) = &self.date_range {
            if !range.overlaps(record.start_epoch, record.end_epoch) {
                return false;
            }
        }

        if !self.creator_owners.is_empty() {
            let Some(owner) = &record.owner_id else {
                return false;
            };
            if !self.creator_owners.contains(owner) {
                return false;
            }
        }

        if !self.invited_owners.is_empty()
            && self.invited_owners.is_disjoint(&record.invited_owners)
        {
            return false;
        }

        if let Some(is_cancelled) = self.is_cancelled {
            if record.is_cancelled != is_cancelled {
                return false;
            }
        }

        true
    }

    /// Matching records in input order, capped at `limit`.
    #[must_use]
    pub fn apply<'a>(&self, records: &'a [RawRecord]) -> Vec<&'a RawRecord> {
        records.iter().filter(|record| self.matches(record)).take(self.limit).collect()
    }
}

/// Translate a filter into store clauses, resolving the effective date range.
///
/// # Errors
/// Returns [`KernelError::Validation`] when the active month or a bound cannot be localized.
pub fn build_event_query<L: Localizer + ?Sized>(
    filter: &FilterState,
    navigation: Option<MonthYear>,
    now: i64,
    localizer: &L,
) -> Result<EventQuery, KernelError> {
    let range = resolve_range(filter, navigation, now, localizer)?;
    let date_range = if range.is_unconstrained() { None } else { Some(range) };

    Ok(EventQuery {
        date_range,
        invited_owners: filter.invited_owners.clone(),
        creator_owners: filter.creator_owners.clone(),
        is_cancelled: filter.cancellation_filter.is_cancelled_clause(),
        limit: filter.page_size(),
    })
}
