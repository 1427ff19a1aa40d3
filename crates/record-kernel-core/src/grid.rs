use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::record::{OwnerDirectory, RawRecord};
use crate::{
    truncate_glyphs, KernelError, Localizer, MonthYear, OwnerId, RecordId, MAX_SUMMARY_GLYPHS,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalendarColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Sky,
    Indigo,
    Violet,
    Pink,
    Charcoal,
    Grey,
}

/// Colors handed out to owners, plus the single color used once they run out.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Palette {
    colors: Vec<CalendarColor>,
    fallback: CalendarColor,
}

impl Palette {
    /// # Errors
    /// Returns [`KernelError::Configuration`] when `colors` is empty.
    pub fn new(colors: Vec<CalendarColor>, fallback: CalendarColor) -> Result<Self, KernelError> {
        if colors.is_empty() {
            return Err(KernelError::Configuration(
                "palette MUST contain at least one color".to_string(),
            ));
        }
        Ok(Self { colors, fallback })
    }

    #[must_use]
    pub fn default_colors() -> Vec<CalendarColor> {
        vec![
            CalendarColor::Red,
            CalendarColor::Orange,
            CalendarColor::Yellow,
            CalendarColor::Green,
            CalendarColor::Blue,
            CalendarColor::Indigo,
            CalendarColor::Violet,
            CalendarColor::Pink,
            CalendarColor::Charcoal,
            CalendarColor::Grey,
        ]
    }

    #[must_use]
    pub fn colors(&self) -> &[CalendarColor] {
        &self.colors
    }

    #[must_use]
    pub fn fallback(&self) -> CalendarColor {
        self.fallback
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self { colors: Self::default_colors(), fallback: CalendarColor::Sky }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Every owner got its own palette entry.
    Cycled,
    /// More owners than colors; everyone shares the fallback.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OwnerColor {
    pub owner_id: OwnerId,
    pub color: CalendarColor,
}

/// Assign colors to distinct owners in order of first appearance.
///
/// A partial palette cycle would suggest two owners are related, so when the
/// owners outnumber the palette all of them get the fallback color instead.
#[must_use]
pub fn assign_owner_colors<'a, I>(owners: I, palette: &Palette) -> (ColorMode, Vec<OwnerColor>)
where
    I: IntoIterator<Item = &'a OwnerId>,
{
    let mut seen = BTreeSet::new();
    let mut unique = Vec::new();
    for owner in owners {
        if seen.insert(owner) {
            unique.push(owner);
        }
    }

    let mode = if unique.len() > palette.len() { ColorMode::Fallback } else { ColorMode::Cycled };
    let legend = unique
        .into_iter()
        .enumerate()
        .map(|(index, owner)| OwnerColor {
            owner_id: owner.clone(),
            color: match mode {
                ColorMode::Fallback => palette.fallback(),
                ColorMode::Cycled => palette.colors()[index % palette.len()],
            },
        })
        .collect();

    (mode, legend)
}

#[must_use]
pub fn browse_uri(query_key: &str) -> String {
    format!("/calendar/query/{query_key}/")
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CalendarEvent {
    pub owner_id: OwnerId,
    pub start_epoch: i64,
    pub end_epoch: i64,
    pub title: String,
    pub description: String,
    pub source_record_id: RecordId,
    pub assigned_color: CalendarColor,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DayCell {
    pub day: u8,
    pub start_epoch: i64,
    pub end_epoch: i64,
    pub events: Vec<CalendarEvent>,
}

impl DayCell {
    /// Events occupy `[start, end)`; an instantaneous event sits on the day it happens.
    #[must_use]
    pub fn intersects(&self, start_epoch: i64, end_epoch: i64) -> bool {
        start_epoch < self.end_epoch
            && (end_epoch > self.start_epoch || start_epoch >= self.start_epoch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct MonthGrid {
    pub month: u8,
    pub year: i32,
    pub today_marker: Option<u8>,
    /// Weekday of the 1st, counted from Sunday.
    pub leading_blank_days: u8,
    pub color_mode: ColorMode,
    pub legend: Vec<OwnerColor>,
    pub days: Vec<DayCell>,
    pub browse_uri: Option<String>,
}

impl MonthGrid {
    #[must_use]
    pub fn day(&self, day: u8) -> Option<&DayCell> {
        self.days.iter().find(|cell| cell.day == day)
    }

    /// Rows of seven slots starting on Sunday, padded with `None` outside the month.
    #[must_use]
    pub fn weeks(&self) -> Vec<[Option<&DayCell>; 7]> {
        let mut weeks = Vec::new();
        let mut week: [Option<&DayCell>; 7] = [None; 7];
        let mut slot = usize::from(self.leading_blank_days) % 7;
        for cell in &self.days {
            week[slot] = Some(cell);
            slot += 1;
            if slot == 7 {
                weeks.push(week);
                week = [None; 7];
                slot = 0;
            }
        }
        if slot > 0 {
            weeks.push(week);
        }
        weeks
    }
}

/// Lays calendar records out on one month.
#[derive(Debug, Clone)]
pub struct MonthGridBuilder<'a> {
    month: MonthYear,
    palette: &'a Palette,
    directory: Option<&'a OwnerDirectory>,
    today_epoch: Option<i64>,
    browse_uri: Option<String>,
}

impl<'a> MonthGridBuilder<'a> {
    #[must_use]
    pub fn new(month: MonthYear, palette: &'a Palette) -> Self {
        Self { month, palette, directory: None, today_epoch: None, browse_uri: None }
    }

    #[must_use]
    pub fn with_directory(mut self, directory: &'a OwnerDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub fn with_today(mut self, today_epoch: i64) -> Self {
        self.today_epoch = Some(today_epoch);
        self
    }

    #[must_use]
    pub fn with_browse_uri(mut self, browse_uri: impl Into<String>) -> Self {
        self.browse_uri = Some(browse_uri.into());
        self
    }

    /// Build the grid. Every record is validated before anything is laid out.
    ///
    /// # Errors
    /// Returns [`KernelError::Validation`] for a record without owner or with an
    /// inverted interval, or when the month cannot be localized, and
    /// [`KernelError::Configuration`] for an empty palette.
    pub fn build<'r, I, L>(&self, records: I, localizer: &L) -> Result<MonthGrid, KernelError>
    where
        I: IntoIterator<Item = &'r RawRecord>,
        L: Localizer + ?Sized,
    {
        if self.palette.is_empty() {
            return Err(KernelError::Configuration(
                "palette MUST contain at least one color".to_string(),
            ));
        }

        let records = records.into_iter().collect::<Vec<_>>();
        let owners = records.iter().map(|record| record.validate()).collect::<Result<Vec<_>, _>>()?;

        let today_marker = match self.today_epoch {
            Some(epoch) => {
                let today = localizer.local_date(epoch)?;
                self.month.contains(today).then_some(today.day())
            }
            None => None,
        };

        let (color_mode, legend) = assign_owner_colors(owners.iter().copied(), self.palette);
        let colors = legend
            .iter()
            .map(|entry| (&entry.owner_id, entry.color))
            .collect::<BTreeMap<_, _>>();

        let first = self.month.first_day()?;
        let mut days = Vec::with_capacity(usize::from(self.month.day_count()?));
        let mut date = first;
        while self.month.contains(date) {
            let next = date.next_day().ok_or_else(|| {
                KernelError::Validation(format!("{date} has no following day"))
            })?;
            days.push(DayCell {
                day: date.day(),
                start_epoch: localizer.start_of_day(date),
                end_epoch: localizer.start_of_day(next),
                events: Vec::new(),
            });
            date = next;
        }

        let empty_directory = OwnerDirectory::default();
        let directory = self.directory.unwrap_or(&empty_directory);
        let fallback = self.palette.fallback();
        for (record, owner) in records.iter().zip(owners) {
            let color = colors.get(owner).copied().unwrap_or(fallback);
            let event = project_event(record, owner, color, directory);
            for cell in &mut days {
                if cell.intersects(event.start_epoch, event.end_epoch) {
                    cell.events.push(event.clone());
                }
            }
        }

        tracing::debug!(
            month = %self.month,
            records = records.len(),
            owners = legend.len(),
            ?color_mode,
            "built month grid"
        );

        Ok(MonthGrid {
            month: self.month.month_number(),
            year: self.month.year,
            today_marker,
            leading_blank_days: first.weekday().number_days_from_sunday(),
            color_mode,
            legend,
            days,
            browse_uri: self.browse_uri.clone(),
        })
    }
}

fn project_event(
    record: &RawRecord,
    owner: &OwnerId,
    color: CalendarColor,
    directory: &OwnerDirectory,
) -> CalendarEvent {
    let title = match record.explicit_title() {
        Some(title) => title.to_string(),
        None => {
            let summary = truncate_glyphs(record.description.trim(), MAX_SUMMARY_GLYPHS);
            if summary.is_empty() {
                directory.display_name(owner).to_string()
            } else {
                summary
            }
        }
    };

    CalendarEvent {
        owner_id: owner.clone(),
        start_epoch: record.start_epoch,
        end_epoch: record.end_epoch,
        title,
        description: directory.terse_summary(owner, record.status),
        source_record_id: record.record_id,
        assigned_color: color,
    }
}
