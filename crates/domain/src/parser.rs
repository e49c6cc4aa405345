//! Extraction of quantity changes from free-text audit descriptions.
//!
//! Three fixed grammars are recognized:
//!
//! - color-change lines: `#abc123: quantity: 50 → 30 (-20)`
//! - stock-adjustment lines:
//!   `Stock DECREMENT: RB-204 | 5 units | From: 40 → To: 35`
//! - color-code mentions: `#` followed by 3 or 6 hex digits
//!
//! Every extractor is total: text that matches no grammar yields an empty
//! vector.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::audit::{AuditAction, AuditRecord};

static COLOR_CHANGE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"([^\s:,;|.][^:,;|.\n]*?)\s*:\s*quantity\s*:\s*(-?\d+)\s*(?:→|->)\s*(-?\d+)\s*\(\s*([+-]?\d+)\s*\)",
    )
    .ok()
});

static STOCK_ADJUSTMENT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"Stock\s+(INCREMENT|DECREMENT)\s*:\s*([^|\n]*?)\s*\|\s*(\d+)\s*units?\s*\|\s*From\s*:\s*(-?\d+)\s*(?:→|->)\s*To\s*:\s*(-?\d+)",
    )
    .ok()
});

static COLOR_CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").ok());

/// Quantity change of one shade parsed from a color-change line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorChange {
    color_key: String,
    old_quantity: i64,
    new_quantity: i64,
    delta: i64,
}

impl ColorChange {
    /// Creates a change and derives `delta = new_quantity - old_quantity`.
    ///
    /// Returns `None` when the difference overflows.
    #[must_use]
    pub fn new(color_key: impl Into<String>, old_quantity: i64, new_quantity: i64) -> Option<Self> {
        let delta = new_quantity.checked_sub(old_quantity)?;
        Some(Self {
            color_key: color_key.into(),
            old_quantity,
            new_quantity,
            delta,
        })
    }

    /// Returns the color key as written in the description.
    #[must_use]
    pub fn color_key(&self) -> &str {
        self.color_key.as_str()
    }

    /// Returns the quantity before the change.
    #[must_use]
    pub fn old_quantity(&self) -> i64 {
        self.old_quantity
    }

    /// Returns the quantity after the change.
    #[must_use]
    pub fn new_quantity(&self) -> i64 {
        self.new_quantity
    }

    /// Returns `new_quantity - old_quantity`.
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.delta
    }
}

/// Direction of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentDirection {
    /// Units were added.
    Increment,
    /// Units were removed.
    Decrement,
}

impl AdjustmentDirection {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "INCREMENT" => Some(Self::Increment),
            "DECREMENT" => Some(Self::Decrement),
            _ => None,
        }
    }
}

/// Stock-level adjustment parsed from a stock-adjustment line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    code: String,
    units: i64,
    old_quantity: i64,
    new_quantity: i64,
    direction: AdjustmentDirection,
    delta: i64,
}

impl StockAdjustment {
    /// Creates an adjustment whose delta is derived from `units` and `direction`.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        units: i64,
        old_quantity: i64,
        new_quantity: i64,
        direction: AdjustmentDirection,
    ) -> Self {
        let units = units.saturating_abs();
        let delta = match direction {
            AdjustmentDirection::Increment => units,
            AdjustmentDirection::Decrement => -units,
        };

        Self {
            code: code.into(),
            units,
            old_quantity,
            new_quantity,
            direction,
            delta,
        }
    }

    /// Returns the stock code named in the description.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the unsigned unit count.
    #[must_use]
    pub fn units(&self) -> i64 {
        self.units
    }

    /// Returns the stated quantity before the adjustment.
    #[must_use]
    pub fn old_quantity(&self) -> i64 {
        self.old_quantity
    }

    /// Returns the stated quantity after the adjustment.
    #[must_use]
    pub fn new_quantity(&self) -> i64 {
        self.new_quantity
    }

    /// Returns the adjustment direction.
    #[must_use]
    pub fn direction(&self) -> AdjustmentDirection {
        self.direction
    }

    /// Returns the signed delta taken from the stated unit count.
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.delta
    }

    /// Returns whether the stated delta equals `new_quantity - old_quantity`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.new_quantity.checked_sub(self.old_quantity) == Some(self.delta)
    }
}

/// Color change tied to the audit record it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorChangeEvent {
    /// Parsed change.
    #[serde(flatten)]
    pub change: ColorChange,
    /// Audit record the change was parsed from.
    pub source_record_id: String,
    /// When the source record was performed.
    pub performed_at: DateTime<Utc>,
    /// Subject of the source record.
    pub performed_by: Option<String>,
    /// Action of the source record.
    pub action: AuditAction,
}

impl ColorChangeEvent {
    /// Parses every color change in the record description.
    #[must_use]
    pub fn from_record(record: &AuditRecord) -> Vec<Self> {
        extract_color_changes(record.description.as_str())
            .into_iter()
            .map(|change| Self {
                change,
                source_record_id: record.id.clone(),
                performed_at: record.performed_at,
                performed_by: record.performed_by.clone(),
                action: record.action,
            })
            .collect()
    }
}

/// Stock adjustment tied to the audit record it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentEvent {
    /// Parsed adjustment.
    #[serde(flatten)]
    pub adjustment: StockAdjustment,
    /// Audit record the adjustment was parsed from.
    pub source_record_id: String,
    /// When the source record was performed.
    pub performed_at: DateTime<Utc>,
}

impl StockAdjustmentEvent {
    /// Parses every stock adjustment in the record description.
    #[must_use]
    pub fn from_record(record: &AuditRecord) -> Vec<Self> {
        extract_stock_adjustments(record.description.as_str())
            .into_iter()
            .map(|adjustment| Self {
                adjustment,
                source_record_id: record.id.clone(),
                performed_at: record.performed_at,
            })
            .collect()
    }
}

/// Extracts all color-change lines, in textual order.
#[must_use]
pub fn extract_color_changes(description: &str) -> Vec<ColorChange> {
    let Some(pattern) = COLOR_CHANGE_PATTERN.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(description)
        .filter_map(|captures| {
            let color_key = color_key(captures.get(1)?.as_str());
            let old_quantity = capture_number(&captures, 2)?;
            let new_quantity = capture_number(&captures, 3)?;
            // The parenthesized delta must be present and numeric, but the
            // event delta always comes from the quantities.
            capture_number(&captures, 4)?;

            ColorChange::new(color_key, old_quantity, new_quantity)
        })
        .collect()
}

/// Extracts all stock-adjustment lines, in textual order.
#[must_use]
pub fn extract_stock_adjustments(description: &str) -> Vec<StockAdjustment> {
    let Some(pattern) = STOCK_ADJUSTMENT_PATTERN.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(description)
        .filter_map(|captures| {
            let direction = AdjustmentDirection::from_keyword(captures.get(1)?.as_str())?;
            let code = captures.get(2)?.as_str().trim();
            let units = capture_number(&captures, 3)?;
            let old_quantity = capture_number(&captures, 4)?;
            let new_quantity = capture_number(&captures, 5)?;

            Some(StockAdjustment::new(
                code,
                units,
                old_quantity,
                new_quantity,
                direction,
            ))
        })
        .collect()
}

/// Extracts distinct color codes (`#rgb` or `#rrggbb`) in order of first mention.
#[must_use]
pub fn extract_color_codes(description: &str) -> Vec<String> {
    let Some(pattern) = COLOR_CODE_PATTERN.as_ref() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    pattern
        .find_iter(description)
        .map(|found| found.as_str())
        .filter(|code| seen.insert(code.to_ascii_lowercase()))
        .map(str::to_owned)
        .collect()
}

/// Narrows a captured key to its trailing `#`-hex code, so prose before the
/// code (`Shade #ff0000`) does not hide it. Name keys are returned trimmed.
fn color_key(raw: &str) -> &str {
    let raw = raw.trim();
    COLOR_CODE_PATTERN
        .as_ref()
        .and_then(|pattern| pattern.find_iter(raw).last())
        .map_or(raw, |code| code.as_str())
}

fn capture_number(captures: &Captures<'_>, index: usize) -> Option<i64> {
    captures.get(index)?.as_str().parse::<i64>().ok()
}
