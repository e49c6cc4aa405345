//! Per-shade and per-stock change aggregation over the audit trail.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::{AuditAction, AuditRecord, chronological};
use crate::parser::{extract_color_changes, extract_color_codes, extract_stock_adjustments};
use crate::shade::{Shade, find_shade};

/// Cumulative change statistics for one shade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadeAnalytics {
    /// Shade identifier.
    pub shade_id: String,
    /// Live quantity at computation time.
    pub current_quantity: i64,
    /// Sum of positive deltas.
    pub total_additions: i64,
    /// Sum of absolute negative deltas.
    pub total_reductions: i64,
    /// Number of positive deltas.
    pub addition_count: u32,
    /// Number of negative deltas.
    pub reduction_count: u32,
    /// `total_additions - total_reductions`.
    pub net_change: i64,
    /// `addition_count + reduction_count`.
    pub total_changes: u32,
    /// Timestamp of the last applied change.
    pub last_updated: Option<DateTime<Utc>>,
}

impl ShadeAnalytics {
    /// Creates zeroed statistics for a shade.
    #[must_use]
    pub fn seed(shade: &Shade) -> Self {
        Self {
            shade_id: shade.id.clone(),
            current_quantity: shade.quantity,
            total_additions: 0,
            total_reductions: 0,
            addition_count: 0,
            reduction_count: 0,
            net_change: 0,
            total_changes: 0,
            last_updated: None,
        }
    }

    /// Applies one signed delta observed at `performed_at`.
    ///
    /// A zero delta leaves the statistics untouched.
    pub fn apply(&mut self, delta: i64, performed_at: DateTime<Utc>) {
        match delta {
            0 => return,
            delta if delta > 0 => {
                self.total_additions = self.total_additions.saturating_add(delta);
                self.addition_count = self.addition_count.saturating_add(1);
            }
            delta => {
                self.total_reductions = self.total_reductions.saturating_add(delta.saturating_abs());
                self.reduction_count = self.reduction_count.saturating_add(1);
            }
        }

        self.net_change = self.total_additions.saturating_sub(self.total_reductions);
        self.total_changes = self.addition_count.saturating_add(self.reduction_count);
        self.last_updated = Some(performed_at);
    }
}

/// Cumulative change statistics for one stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockActivitySummary {
    /// Stock identifier.
    pub entity_id: String,
    /// Units added by shade updates and stock increments.
    pub units_added: i64,
    /// Units removed by shade updates and stock decrements.
    pub units_reduced: i64,
    /// `units_added - units_reduced`.
    pub net_change: i64,
    /// Number of positive deltas.
    pub addition_count: u32,
    /// Number of negative deltas.
    pub reduction_count: u32,
    /// Number of audit records for the stock.
    pub record_count: u32,
    /// Earliest record timestamp.
    pub first_activity: DateTime<Utc>,
    /// Latest record timestamp.
    pub last_activity: DateTime<Utc>,
}

impl StockActivitySummary {
    fn start(record: &AuditRecord) -> Self {
        Self {
            entity_id: record.entity_id.clone(),
            units_added: 0,
            units_reduced: 0,
            net_change: 0,
            addition_count: 0,
            reduction_count: 0,
            record_count: 0,
            first_activity: record.performed_at,
            last_activity: record.performed_at,
        }
    }

    fn apply(&mut self, delta: i64) {
        if delta > 0 {
            self.units_added = self.units_added.saturating_add(delta);
            self.addition_count = self.addition_count.saturating_add(1);
        } else if delta < 0 {
            self.units_reduced = self.units_reduced.saturating_add(delta.saturating_abs());
            self.reduction_count = self.reduction_count.saturating_add(1);
        }
        self.net_change = self.units_added.saturating_sub(self.units_reduced);
    }
}

/// Shade-level delta derived from one audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShadeDelta {
    /// Index into the shade slice, when the color key matched a live shade.
    pub(crate) shade_index: Option<usize>,
    pub(crate) delta: i64,
}

/// Derives shade-level deltas from a CREATE or UPDATE record.
///
/// UPDATE records yield one delta per color-change line. CREATE records yield
/// one addition per mentioned color code equal to the matched shade's live
/// quantity; codes without a live shade carry no quantity and are skipped.
pub(crate) fn shade_deltas(record: &AuditRecord, shades: &[Shade]) -> Vec<ShadeDelta> {
    match record.action {
        AuditAction::Update => extract_color_changes(record.description.as_str())
            .into_iter()
            .map(|change| ShadeDelta {
                shade_index: find_shade(shades, change.color_key()).map(|(index, _)| index),
                delta: change.delta(),
            })
            .collect(),
        AuditAction::Create => extract_color_codes(record.description.as_str())
            .into_iter()
            .filter_map(|code| {
                find_shade(shades, code.as_str()).map(|(index, shade)| ShadeDelta {
                    shade_index: Some(index),
                    delta: shade.quantity,
                })
            })
            .collect(),
        AuditAction::Adjust | AuditAction::Delete | AuditAction::ImageUpload => Vec::new(),
    }
}

/// Computes change statistics for every live shade.
///
/// Records are applied in chronological order regardless of input order.
/// Changes for color keys without a live shade are dropped. The result keeps
/// the order of `shades`; use [`rank_by_total_changes`] for ranking views.
#[must_use]
pub fn compute_shade_analytics(shades: &[Shade], records: &[AuditRecord]) -> Vec<ShadeAnalytics> {
    let mut analytics: Vec<ShadeAnalytics> = shades.iter().map(ShadeAnalytics::seed).collect();

    for record in chronological(records) {
        for shade_delta in shade_deltas(record, shades) {
            if let Some(entry) = shade_delta
                .shade_index
                .and_then(|index| analytics.get_mut(index))
            {
                entry.apply(shade_delta.delta, record.performed_at);
            }
        }
    }

    analytics
}

/// Orders analytics by `total_changes` descending, most active first.
///
/// Ties are broken by shade id so the ranking is deterministic.
#[must_use]
pub fn rank_by_total_changes(mut analytics: Vec<ShadeAnalytics>) -> Vec<ShadeAnalytics> {
    analytics.sort_by(|left, right| {
        Reverse(left.total_changes)
            .cmp(&Reverse(right.total_changes))
            .then_with(|| left.shade_id.cmp(&right.shade_id))
    });
    analytics
}

/// Computes per-stock totals from UPDATE color changes and ADJUST lines.
///
/// CREATE, DELETE and IMAGE_UPLOAD records count toward `record_count` and
/// the activity window only. Output is ordered by entity id.
#[must_use]
pub fn compute_stock_activity(records: &[AuditRecord]) -> Vec<StockActivitySummary> {
    let mut summaries: BTreeMap<&str, StockActivitySummary> = BTreeMap::new();

    for record in chronological(records) {
        let summary = summaries
            .entry(record.entity_id.as_str())
            .or_insert_with(|| StockActivitySummary::start(record));
        summary.record_count = summary.record_count.saturating_add(1);
        summary.last_activity = record.performed_at;

        match record.action {
            AuditAction::Update => {
                for change in extract_color_changes(record.description.as_str()) {
                    summary.apply(change.delta());
                }
            }
            AuditAction::Adjust => {
                for adjustment in extract_stock_adjustments(record.description.as_str()) {
                    summary.apply(adjustment.delta());
                }
            }
            AuditAction::Create | AuditAction::Delete | AuditAction::ImageUpload => {}
        }
    }

    summaries.into_values().collect()
}
