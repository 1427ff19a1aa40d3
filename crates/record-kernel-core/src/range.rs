use serde::{Deserialize, Serialize};

use crate::filter::{DisplayMode, FilterState};
use crate::{KernelError, Localizer, MonthYear};

/// Effective `[start, end)` search window; a missing bound is open on that side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ResolvedRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl ResolvedRange {
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start >= end)
    }

    /// Whether a record spanning `[start_epoch, end_epoch]` touches this window.
    #[must_use]
    pub fn overlaps(&self, start_epoch: i64, end_epoch: i64) -> bool {
        if self.is_empty() {
            return false;
        }
        let ends_too_early = matches!(self.start, Some(start) if end_epoch < start);
        let starts_too_late = matches!(self.end, Some(end) if start_epoch >= end);
        !ends_too_early && !starts_too_late
    }
}

/// Pick the month a grid shows: explicit navigation, then the filter bounds, then `now`.
///
/// # Errors
/// Returns [`KernelError::Validation`] when the chosen epoch cannot be localized.
pub fn select_month_year<L: Localizer + ?Sized>(
    navigation: Option<MonthYear>,
    filter: &FilterState,
    now: i64,
    localizer: &L,
) -> Result<MonthYear, KernelError> {
    if let Some(navigation) = navigation {
        return Ok(navigation);
    }

    let epoch = filter.range_start.or(filter.range_end).unwrap_or(now);
    Ok(MonthYear::of_date(localizer.local_date(epoch)?))
}

/// Merge explicit bounds, the displayed month, and the upcoming flag into one window.
///
/// Grid bounds only ever tighten the explicit ones. The upcoming flag only ever
/// raises the lower bound. When the result would invert, the upper bound drops
/// onto the lower one and the window is empty.
///
/// # Errors
/// Returns [`KernelError::Validation`] when the displayed month cannot be localized.
pub fn resolve_range<L: Localizer + ?Sized>(
    filter: &FilterState,
    navigation: Option<MonthYear>,
    now: i64,
    localizer: &L,
) -> Result<ResolvedRange, KernelError> {
    let mut min = filter.range_start;
    let mut max = filter.range_end;

    if filter.display_mode == DisplayMode::Grid {
        let month = select_month_year(navigation, filter, now, localizer)?;
        let (grid_start, grid_end) = month.bounds(localizer)?;
        min = Some(min.map_or(grid_start, |value| value.max(grid_start)));
        max = Some(max.map_or(grid_end, |value| value.min(grid_end)));
        tracing::debug!(%month, grid_start, grid_end, "tightened range to displayed month");
    }

    if filter.upcoming_only {
        min = Some(min.map_or(now, |value| value.max(now)));
    }

    if let (Some(start), Some(end)) = (min, max) {
        if start > end {
            tracing::debug!(start, end, "resolved range is empty");
            max = Some(start);
        }
    }

    Ok(ResolvedRange { start: min, end: max })
}
