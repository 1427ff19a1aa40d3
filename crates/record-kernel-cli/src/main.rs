use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use record_kernel_core::{
    browse_uri, build_event_list, build_event_query, display_order_by_filename, group_and_order,
    select_month_year, Comment, DisplayMode, Document, FilterState, MonthGridBuilder, MonthYear,
    OwnerDirectory, RawRecord, StrayCommentPolicy,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, UtcOffset};
use tracing_subscriber::EnvFilter;

mod config;

use config::RkConfig;

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const LOG_ENV: &str = "RK_LOG";

#[derive(Debug, Parser)]
#[command(name = "rk")]
#[command(about = "Record Kernel CLI")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a filter into the effective date range and store clauses.
    Range(RangeArgs),
    /// Render records as a month grid or a list, depending on the filter.
    Calendar(CalendarArgs),
    /// Group inline comments by document in display order.
    Comments(CommentsArgs),
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// JSON file holding a filter state.
    #[arg(long, conflicts_with = "builtin")]
    filter: Option<PathBuf>,
    #[arg(long)]
    builtin: Option<String>,
    #[arg(long, requires = "year")]
    month: Option<u8>,
    #[arg(long, requires = "month")]
    year: Option<i32>,
    /// RFC3339 UTC timestamp standing in for the current time.
    #[arg(long)]
    now: Option<String>,
}

#[derive(Debug, Args)]
struct RangeArgs {
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Debug, Args)]
struct CalendarArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long)]
    records: PathBuf,
    /// JSON object mapping owner ids to display names.
    #[arg(long)]
    owners: Option<PathBuf>,
    #[arg(long)]
    query_key: Option<String>,
}

#[derive(Debug, Args)]
struct CommentsArgs {
    #[arg(long)]
    comments: PathBuf,
    #[arg(long)]
    documents: PathBuf,
    #[arg(long, value_enum)]
    stray_policy: Option<StrayPolicyArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrayPolicyArg {
    Reject,
    Drop,
}

impl StrayPolicyArg {
    fn into_policy(self) -> StrayCommentPolicy {
        match self {
            Self::Reject => StrayCommentPolicy::Reject,
            Self::Drop => StrayCommentPolicy::Drop,
        }
    }
}

/// Inputs shared by the calendar commands once flags and config are merged.
struct CalendarContext {
    filter: FilterState,
    navigation: Option<MonthYear>,
    now: i64,
    viewer: UtcOffset,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = RkConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Range(args) => run_range(&args, &config),
        Command::Calendar(args) => run_calendar(&args, &config),
        Command::Comments(args) => run_comments(&args, &config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn calendar_context(args: &FilterArgs, config: &RkConfig) -> Result<CalendarContext> {
    let mut filter = match (&args.filter, &args.builtin) {
        (Some(path), _) => read_json::<FilterState>(path, "filter")?,
        (None, Some(name)) => FilterState::builtin(name)?,
        (None, None) => FilterState::default(),
    };
    filter.limit = filter.limit.or(config.page_size);

    let navigation = MonthYear::from_navigation(args.month, args.year)?;
    let now = parse_optional_rfc3339(args.now.as_deref())?.unix_timestamp();
    let viewer = config.viewer_offset()?;

    tracing::debug!(
        display_mode = filter.display_mode.as_str(),
        upcoming_only = filter.upcoming_only,
        cancellation = filter.cancellation_filter.as_str(),
        now,
        "resolved calendar inputs"
    );

    Ok(CalendarContext { filter, navigation, now, viewer })
}

fn run_range(args: &RangeArgs, config: &RkConfig) -> Result<()> {
    let context = calendar_context(&args.filter, config)?;
    let query =
        build_event_query(&context.filter, context.navigation, context.now, &context.viewer)?;
    let month = match context.filter.display_mode {
        DisplayMode::Grid => Some(
            select_month_year(context.navigation, &context.filter, context.now, &context.viewer)?
                .to_string(),
        ),
        DisplayMode::List => None,
    };
    let range = query.date_range.unwrap_or_default();

    emit_json(serde_json::json!({
        "display_mode": context.filter.display_mode.as_str(),
        "month": month,
        "range": range,
        "is_empty": range.is_empty(),
        "query": query,
    }))
}

fn run_calendar(args: &CalendarArgs, config: &RkConfig) -> Result<()> {
    let context = calendar_context(&args.filter, config)?;
    let records = read_json::<Vec<RawRecord>>(&args.records, "records")?;
    let directory = match &args.owners {
        Some(path) => read_json::<OwnerDirectory>(path, "owner directory")?,
        None => OwnerDirectory::new(),
    };

    for record in &records {
        record.validate().context("invalid calendar record")?;
    }

    let query =
        build_event_query(&context.filter, context.navigation, context.now, &context.viewer)?;
    let matched = query.apply(&records);
    tracing::info!(total = records.len(), matched = matched.len(), "filtered calendar records");

    let result = match context.filter.display_mode {
        DisplayMode::Grid => {
            let month = select_month_year(
                context.navigation,
                &context.filter,
                context.now,
                &context.viewer,
            )?;
            let palette = config.palette()?;
            let mut builder = MonthGridBuilder::new(month, &palette)
                .with_directory(&directory)
                .with_today(context.now);
            if let Some(key) = &args.query_key {
                builder = builder.with_browse_uri(browse_uri(key));
            }
            let grid = builder
                .build(matched.iter().copied(), &context.viewer)
                .with_context(|| format!("failed to build month grid for {month}"))?;
            serde_json::json!({
                "display_mode": DisplayMode::Grid.as_str(),
                "matched": matched.len(),
                "grid": grid,
            })
        }
        DisplayMode::List => {
            let items = build_event_list(matched.iter().copied(), &directory, &context.viewer)
                .context("failed to build event list")?;
            serde_json::json!({
                "display_mode": DisplayMode::List.as_str(),
                "matched": matched.len(),
                "items": items,
            })
        }
    };

    emit_json(with_snapshot_id(result)?)
}

fn run_comments(args: &CommentsArgs, config: &RkConfig) -> Result<()> {
    let comments = read_json::<Vec<Comment>>(&args.comments, "comments")?;
    let documents = read_json::<Vec<Document>>(&args.documents, "documents")?;
    let policy = args.stray_policy.map_or(config.stray_comments, StrayPolicyArg::into_policy);

    let display_order = display_order_by_filename(&documents);
    let groups = group_and_order(&comments, &display_order, policy)
        .context("failed to group inline comments")?;
    tracing::info!(
        comments = comments.len(),
        documents = groups.len(),
        policy = policy.as_str(),
        "grouped inline comments"
    );

    let result = serde_json::json!({
        "stray_policy": policy.as_str(),
        "display_order": display_order,
        "groups": groups,
    });
    emit_json(with_snapshot_id(result)?)
}

fn with_snapshot_id(value: Value) -> Result<Value> {
    let snapshot_id = compute_snapshot_id(&value)?;
    match value {
        Value::Object(mut object) => {
            object.insert("snapshot_id".to_string(), Value::String(snapshot_id));
            Ok(Value::Object(object))
        }
        other => Err(anyhow!("snapshot ids only apply to JSON objects, got {other}")),
    }
}

fn compute_snapshot_id(value: &Value) -> Result<String> {
    let canonical = serde_json::to_vec(value).context("failed to encode result")?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let digest_hex = format!("{:x}", hasher.finalize());
    Ok(digest_hex[..16].to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("failed to parse {what} file {}", path.display()))
}

fn parse_optional_rfc3339(value: Option<&str>) -> Result<OffsetDateTime> {
    match value {
        Some(raw) => parse_rfc3339(raw),
        None => Ok(OffsetDateTime::now_utc()),
    }
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    let parsed = OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .with_context(|| format!("invalid RFC3339 UTC timestamp: {value}"))?;

    if parsed.offset() != UtcOffset::UTC {
        return Err(anyhow!("timestamp MUST use UTC offset Z (received: {value})"));
    }

    Ok(parsed)
}
