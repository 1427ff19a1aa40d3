//! Pure, deterministic kernels for calendar queries and review comments.
//!
//! Nothing in this crate reads a clock or a locale. Callers pass `now` as an
//! epoch and inject the viewer timezone through [`Localizer`].

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub mod comments;
pub mod filter;
pub mod grid;
pub mod list;
pub mod range;
pub mod record;

pub use comments::{
    display_order_by_filename, group_and_order, Comment, CommentGroup, CommentGroups,
    CommentSortKey, Document, FixedState, StrayCommentPolicy,
};
pub use filter::{build_event_query, CancellationFilter, DisplayMode, EventQuery, FilterState};
pub use grid::{
    browse_uri, CalendarColor, CalendarEvent, ColorMode, DayCell, MonthGrid, MonthGridBuilder,
    OwnerColor, Palette,
};
pub use list::{build_event_list, EventListItem};
pub use range::{resolve_range, select_month_year, ResolvedRange};
pub use record::{EventStatus, OwnerDirectory, RawRecord};

/// Maximum number of code points kept when a description stands in for a title.
pub const MAX_SUMMARY_GLYPHS: usize = 64;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum KernelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl Display for CommentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts between epochs and the viewer's wall-clock calendar.
pub trait Localizer {
    /// Wall-clock date and time of `epoch` in the viewer timezone.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when `epoch` cannot be represented.
    fn local_datetime(&self, epoch: i64) -> Result<PrimitiveDateTime, KernelError>;

    /// Epoch of local midnight at the start of `date`.
    fn start_of_day(&self, date: Date) -> i64;

    /// Calendar date of `epoch` in the viewer timezone.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when `epoch` cannot be represented.
    fn local_date(&self, epoch: i64) -> Result<Date, KernelError> {
        Ok(self.local_datetime(epoch)?.date())
    }
}

impl Localizer for UtcOffset {
    fn local_datetime(&self, epoch: i64) -> Result<PrimitiveDateTime, KernelError> {
        let shifted = epoch.checked_add(i64::from(self.whole_seconds())).ok_or_else(|| {
            KernelError::Validation(format!("timestamp {epoch} overflows the viewer offset"))
        })?;
        let utc = OffsetDateTime::from_unix_timestamp(shifted).map_err(|err| {
            KernelError::Validation(format!("timestamp {epoch} is out of range: {err}"))
        })?;
        Ok(PrimitiveDateTime::new(utc.date(), utc.time()))
    }

    fn start_of_day(&self, date: Date) -> i64 {
        date.midnight().assume_utc().unix_timestamp() - i64::from(self.whole_seconds())
    }
}

/// A calendar month in the viewer's calendar.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct MonthYear {
    pub year: i32,
    pub month: Month,
}

impl MonthYear {
    /// Build from a 1-based month number.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when `month` is outside `1..=12`.
    pub fn new(year: i32, month: u8) -> Result<Self, KernelError> {
        let month = Month::try_from(month).map_err(|err| {
            KernelError::Validation(format!("month MUST be in 1..=12 (got {month}): {err}"))
        })?;
        Ok(Self { year, month })
    }

    /// Explicit navigation only applies when both parts are present.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when the month number is invalid.
    pub fn from_navigation(
        month: Option<u8>,
        year: Option<i32>,
    ) -> Result<Option<Self>, KernelError> {
        match (month, year) {
            (Some(month), Some(year)) => Self::new(year, month).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn of_date(date: Date) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    #[must_use]
    pub fn month_number(self) -> u8 {
        u8::from(self.month)
    }

    /// The month after this one; December rolls into January of the next year.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when the next year does not fit in an `i32`.
    pub fn following(self) -> Result<Self, KernelError> {
        if self.month != Month::December {
            return Ok(Self { year: self.year, month: self.month.next() });
        }
        let year = self.year.checked_add(1).ok_or_else(|| {
            KernelError::Validation(format!("no month follows {}-12", self.year))
        })?;
        Ok(Self { year, month: Month::January })
    }

    /// # Errors
    /// Returns [`KernelError::Validation`] when the year is outside the supported range.
    pub fn first_day(self) -> Result<Date, KernelError> {
        Date::from_calendar_date(self.year, self.month, 1).map_err(|err| {
            KernelError::Validation(format!(
                "{}-{:02} is not a representable month: {err}",
                self.year,
                self.month_number()
            ))
        })
    }

    /// # Errors
    /// Returns [`KernelError::Validation`] when this or the following month is not representable.
    pub fn day_count(self) -> Result<u8, KernelError> {
        let first = self.first_day()?;
        let days = (self.following()?.first_day()? - first).whole_days();
        u8::try_from(days)
            .map_err(|err| KernelError::Validation(format!("invalid month length {days}: {err}")))
    }

    /// Local-midnight epochs of the first of this month and the first of the following month.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] when either month is not representable.
    pub fn bounds<L: Localizer + ?Sized>(self, localizer: &L) -> Result<(i64, i64), KernelError> {
        let start = localizer.start_of_day(self.first_day()?);
        let end = localizer.start_of_day(self.following()?.first_day()?);
        Ok((start, end))
    }

    #[must_use]
    pub fn contains(self, date: Date) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl Display for MonthYear {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month_number())
    }
}

/// Truncate to at most `max_glyphs` code points, ending with an ellipsis when cut.
#[must_use]
pub fn truncate_glyphs(text: &str, max_glyphs: usize) -> String {
    if text.chars().count() <= max_glyphs {
        return text.to_string();
    }
    if max_glyphs == 0 {
        return String::new();
    }
    let mut truncated = text.chars().take(max_glyphs - 1).collect::<String>();
    truncated.push('\u{2026}');
    truncated
}
