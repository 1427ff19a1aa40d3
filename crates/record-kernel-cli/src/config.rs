use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use record_kernel_core::{CalendarColor, Palette, StrayCommentPolicy};
use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::UtcOffset;

const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Settings read from the optional `--config` YAML file.
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RkConfig {
    /// Viewer timezone as a fixed offset, e.g. `"+02:00"`.
    pub viewer_utc_offset: String,
    pub palette: Vec<CalendarColor>,
    pub fallback_color: CalendarColor,
    pub stray_comments: StrayCommentPolicy,
    /// Used when a filter carries no `limit` of its own.
    pub page_size: Option<usize>,
}

impl Default for RkConfig {
    fn default() -> Self {
        Self {
            viewer_utc_offset: "+00:00".to_string(),
            palette: Palette::default_colors(),
            fallback_color: CalendarColor::Sky,
            stray_comments: StrayCommentPolicy::default(),
            page_size: None,
        }
    }
}

impl RkConfig {
    /// Load from `path`, or defaults when no file was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let body = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&body)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn viewer_offset(&self) -> Result<UtcOffset> {
        parse_utc_offset(&self.viewer_utc_offset)
    }

    pub fn palette(&self) -> Result<Palette> {
        Palette::new(self.palette.clone(), self.fallback_color)
            .context("invalid palette in configuration")
    }
}

pub fn parse_utc_offset(value: &str) -> Result<UtcOffset> {
    UtcOffset::parse(value, OFFSET_FORMAT)
        .with_context(|| format!("viewer_utc_offset MUST look like +HH:MM (received: {value})"))
}
