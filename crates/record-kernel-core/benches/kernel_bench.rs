use std::collections::BTreeSet;

use criterion::{criterion_group, criterion_main, Criterion};
use record_kernel_core::{
    build_event_query, group_and_order, Comment, CommentId, DisplayMode, DocumentId, EventStatus,
    FilterState, MonthGridBuilder, MonthYear, OwnerDirectory, OwnerId, Palette, RawRecord,
    RecordId, StrayCommentPolicy,
};
use time::UtcOffset;

const JAN_01_2024: i64 = 1_704_067_200;
const HOUR: i64 = 3_600;

fn mk_record(index: u64) -> RawRecord {
    let offset = i64::try_from(index).unwrap_or(i64::MAX);
    let start = JAN_01_2024 + (offset * 7 * HOUR) % (31 * 24 * HOUR);
    RawRecord {
        record_id: RecordId(index),
        owner_id: Some(OwnerId::new(format!("PHID-USER-{}", index % 8))),
        start_epoch: start,
        end_epoch: start + (offset % 72) * HOUR,
        title: None,
        description: "Out of office for the quarterly planning offsite and travel".to_string(),
        status: if index % 3 == 0 { EventStatus::Sporadic } else { EventStatus::Away },
        is_cancelled: index % 11 == 0,
        invited_owners: BTreeSet::new(),
    }
}

fn mk_comment(index: u64) -> Comment {
    Comment {
        id: CommentId(10_000 - index),
        document_id: DocumentId(index % 25),
        line_number: u32::try_from(index % 400).unwrap_or(u32::MAX),
        line_length: u32::try_from(index % 5).unwrap_or(u32::MAX),
        is_new_file: index % 2 == 0,
        fixed_state: None,
        has_replies: false,
        reply_to: None,
        content: "nit: rename this binding".to_string(),
    }
}

fn bench_month_grid(c: &mut Criterion) {
    let records = (0..1_000).map(mk_record).collect::<Vec<_>>();
    let palette = Palette::default();
    let directory = OwnerDirectory::new();
    let month = MonthYear::new(2024, 1)
        .unwrap_or_else(|err| panic!("benchmark month should be valid: {err}"));
    let filter = FilterState { display_mode: DisplayMode::Grid, ..FilterState::default() };

    c.bench_function("month_grid_1000_records", |b| {
        b.iter(|| {
            let query = build_event_query(&filter, Some(month), JAN_01_2024, &UtcOffset::UTC)
                .unwrap_or_else(|err| panic!("grid benchmark query failed: {err}"));
            let grid = MonthGridBuilder::new(month, &palette)
                .with_directory(&directory)
                .with_today(JAN_01_2024)
                .build(query.apply(&records), &UtcOffset::UTC);
            if let Err(err) = grid {
                panic!("grid benchmark build failed: {err}");
            }
        });
    });
}

fn bench_comment_groups(c: &mut Criterion) {
    let comments = (0..5_000).map(mk_comment).collect::<Vec<_>>();
    let order = (0..25).rev().map(DocumentId).collect::<Vec<_>>();

    c.bench_function("comment_groups_5000_comments", |b| {
        b.iter(|| {
            let groups = group_and_order(&comments, &order, StrayCommentPolicy::Reject);
            if let Err(err) = groups {
                panic!("comment benchmark grouping failed: {err}");
            }
        });
    });
}

criterion_group!(kernel_benches, bench_month_grid, bench_comment_groups);
criterion_main!(kernel_benches);
