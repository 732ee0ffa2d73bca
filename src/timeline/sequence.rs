use std::cmp::Ordering;

use super::labels::format_week;
use super::types::{Phase, PhaseItem, TimelineEntry};

/// Scheduled items by week, then creation order; unscheduled items last in
/// creation order.
fn timeline_order(a: &PhaseItem, b: &PhaseItem) -> Ordering {
    match (a.week, b.week) {
        (Some(wa), Some(wb)) => wa.total_cmp(&wb).then(a.order.cmp(&b.order)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.order.cmp(&b.order),
    }
}

/// Flattens all phase items into one week-sorted list with 1-based sequence
/// numbers. The sort is stable, so equal keys keep their input order.
pub fn build_timeline(phases: &[Phase]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = phases
        .iter()
        .flat_map(|phase| {
            phase.items.iter().map(move |item| TimelineEntry {
                id: format!("{}-{}", phase.id, item.order),
                sequence: 0,
                phase_id: phase.id.clone(),
                phase_title: phase.title.clone(),
                phase_badge: phase.badge.clone(),
                week_label: format_week(item.week),
                item: item.clone(),
            })
        })
        .collect();

    entries.sort_by(|a, b| timeline_order(&a.item, &b.item));
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.sequence = idx + 1;
    }
    entries
}
