use crate::config::LayoutDefaults;

use super::labels::format_span;
use super::types::{Lane, LaneBlock, LaneLayout, LaneTrack, Phase};

fn overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// First-fit row assignment over blocks already sorted by start week.
/// Returns the number of rows opened.
fn pack_rows(blocks: &mut [LaneBlock]) -> usize {
    let mut rows: Vec<Vec<(f64, f64)>> = Vec::new();
    for block in blocks.iter_mut() {
        let interval = (block.start_week, block.end_week);
        let free = rows
            .iter()
            .position(|row| row.iter().all(|placed| !overlaps(*placed, interval)));
        let row = match free {
            Some(row) => row,
            None => {
                rows.push(Vec::new());
                rows.len() - 1
            }
        };
        rows[row].push(interval);
        block.row = row;
    }
    rows.len()
}

/// Groups scheduled items into lanes (first-seen order), turns each into a
/// `[start, end)` block and packs overlapping blocks into separate rows.
///
/// Items without a week are left out. Point events get
/// `min_block_weeks` of width so they stay visible.
pub fn build_lane_tracks(phases: &[Phase], layout: &LayoutDefaults) -> LaneLayout {
    let min = layout.min_block_weeks;
    let mut lanes: Vec<(Lane, Vec<LaneBlock>)> = Vec::new();
    let mut max_week = 0.0_f64;

    for phase in phases {
        for item in &phase.items {
            let Some(start_week) = item.span.map(|s| s.start_week).or(item.week) else {
                continue;
            };
            let end_week = match item.span {
                Some(span) if span.duration() > 0.0 => span.end_week,
                _ => start_week + min,
            };
            max_week = max_week.max(end_week);

            let block = LaneBlock {
                id: format!("{}-{}", phase.id, item.order),
                phase_id: phase.id.clone(),
                phase_title: phase.title.clone(),
                phase_badge: phase.badge.clone(),
                start_week,
                end_week,
                row: 0,
                title: item.title.clone(),
                meta: item.meta.clone(),
                when_label: item.when_label.clone(),
                span_label: item.span.as_ref().map(format_span),
                body: item.body.clone(),
            };
            match lanes.iter_mut().find(|(lane, _)| *lane == phase.lane) {
                Some((_, blocks)) => blocks.push(block),
                None => lanes.push((phase.lane, vec![block])),
            }
        }
    }

    let lanes = lanes
        .into_iter()
        .map(|(lane, mut blocks)| {
            blocks.sort_by(|a, b| a.start_week.total_cmp(&b.start_week));
            let rows = pack_rows(&mut blocks);
            LaneTrack {
                id: lane.id(),
                lane,
                label: lane.label().to_string(),
                rows,
                blocks,
            }
        })
        .collect();

    LaneLayout { lanes, max_week }
}
