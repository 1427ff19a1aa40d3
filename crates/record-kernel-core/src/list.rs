use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::grid::CalendarColor;
use crate::record::{EventStatus, OwnerDirectory, RawRecord};
use crate::{truncate_glyphs, KernelError, Localizer, RecordId, MAX_SUMMARY_GLYPHS};

/// One row of the list display.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EventListItem {
    pub record_id: RecordId,
    pub href: String,
    pub header: String,
    pub bar_color: CalendarColor,
    pub creator: String,
    pub from: String,
    pub to: String,
    pub summary: String,
}

const LOCAL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

fn format_local(value: PrimitiveDateTime) -> Result<String, KernelError> {
    value
        .format(LOCAL_FORMAT)
        .map_err(|err| KernelError::Validation(format!("invalid local time {value}: {err}")))
}

/// Project records into list rows, keeping their order.
///
/// # Errors
/// Returns [`KernelError::Validation`] for a malformed record or a timestamp
/// that cannot be localized.
pub fn build_event_list<'r, I, L>(
    records: I,
    directory: &OwnerDirectory,
    localizer: &L,
) -> Result<Vec<EventListItem>, KernelError>
where
    I: IntoIterator<Item = &'r RawRecord>,
    L: Localizer + ?Sized,
{
    records
        .into_iter()
        .map(|record| -> Result<EventListItem, KernelError> {
            let owner = record.validate()?;
            let header = match record.explicit_title() {
                Some(title) => title.to_string(),
                None => directory.terse_summary(owner, record.status),
            };
            let bar_color = match record.status {
                EventStatus::Away => CalendarColor::Red,
                EventStatus::Sporadic => CalendarColor::Yellow,
            };

            Ok(EventListItem {
                record_id: record.record_id,
                href: format!("/E{}", record.record_id),
                header,
                bar_color,
                creator: directory.display_name(owner).to_string(),
                from: format_local(localizer.local_datetime(record.start_epoch)?)?,
                to: format_local(localizer.local_datetime(record.end_epoch)?)?,
                summary: truncate_glyphs(&record.description, MAX_SUMMARY_GLYPHS),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::UtcOffset;

    use super::*;
    use crate::OwnerId;

    fn record(id: u64, status: EventStatus) -> RawRecord {
        RawRecord {
            record_id: RecordId(id),
            owner_id: Some(OwnerId::new("PHID-USER-a")),
            // 2024-01-15T09:30:00Z to 2024-01-15T17:00:00Z
            start_epoch: 1_705_311_000,
            end_epoch: 1_705_338_000,
            title: None,
            description: String::new(),
            status,
            is_cancelled: false,
            invited_owners: BTreeSet::new(),
        }
    }

    #[test]
    fn list_items_use_terse_summary_without_title() {
        let mut directory = OwnerDirectory::new();
        directory.insert(OwnerId::new("PHID-USER-a"), "alice");
        let mut titled = record(2, EventStatus::Sporadic);
        titled.title = Some("Conference".to_string());
        titled.description = "y".repeat(80);

        let items = build_event_list(
            &[record(1, EventStatus::Away), titled],
            &directory,
            &UtcOffset::UTC,
        )
        .unwrap_or_else(|err| panic!("list should build: {err}"));

        assert_eq!(items[0].href, "/E1");
        assert_eq!(items[0].header, "alice (Away)");
        assert_eq!(items[0].bar_color, CalendarColor::Red);
        assert_eq!(items[0].creator, "alice");
        assert_eq!(items[0].from, "2024-01-15 09:30");
        assert_eq!(items[0].to, "2024-01-15 17:00");

        assert_eq!(items[1].header, "Conference");
        assert_eq!(items[1].bar_color, CalendarColor::Yellow);
        assert_eq!(items[1].summary.chars().count(), MAX_SUMMARY_GLYPHS);
    }

    #[test]
    fn list_times_are_shown_in_viewer_timezone() {
        let minus_five = UtcOffset::from_hms(-5, 0, 0)
            .unwrap_or_else(|err| panic!("invalid fixture offset: {err}"));
        let items =
            build_event_list(&[record(1, EventStatus::Away)], &OwnerDirectory::new(), &minus_five)
                .unwrap_or_else(|err| panic!("list should build: {err}"));
        assert_eq!(items[0].from, "2024-01-15 04:30");
        assert_eq!(items[0].creator, "PHID-USER-a");
    }

    #[test]
    fn local_times_are_zero_padded() {
        // 2024-03-05T07:04:00Z
        let value = UtcOffset::UTC
            .local_datetime(1_709_622_240)
            .unwrap_or_else(|err| panic!("fixture epoch should localize: {err}"));
        assert_eq!(format_local(value), Ok("2024-03-05 07:04".to_string()));
    }

    #[test]
    fn list_rejects_malformed_records() {
        let mut broken = record(1, EventStatus::Away);
        broken.end_epoch = broken.start_epoch - 1;
        let result = build_event_list(&[broken], &OwnerDirectory::new(), &UtcOffset::UTC);
        assert!(matches!(result, Err(KernelError::Validation(_))));
    }
}
