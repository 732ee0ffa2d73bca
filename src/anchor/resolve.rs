//! Week and span resolution of when-expressions.

use serde::Serialize;

use crate::protocol::{AnchorKind, AnchorSpec, When};

use super::context::AnchorContext;
use super::parse::parse_week;

/// A window on the week axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekSpan {
    pub start_week: f64,
    pub end_week: f64,
}

impl WeekSpan {
    pub fn new(start_week: f64, end_week: f64) -> Self {
        Self {
            start_week,
            end_week,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_week - self.start_week
    }
}

/// Absolute week of a when-expression, or `None` when it cannot be placed.
///
/// `None` input is "no timing data" and stays `None`; it never means week 0.
pub fn resolve_week(when: Option<&When>, ctx: &AnchorContext) -> Option<f64> {
    match when? {
        When::Week(week) => Some(*week),
        When::Text(text) => parse_week(text),
        When::Chain(items) => items.iter().find_map(|item| resolve_week(Some(item), ctx)),
        When::Anchored(spec) => resolve_anchored(spec, ctx),
    }
}

fn resolve_anchored(spec: &AnchorSpec, ctx: &AnchorContext) -> Option<f64> {
    let offset = spec.offset();
    if let Some(week) = spec.week {
        return Some(week + offset);
    }
    let Some(anchor) = spec.anchor.as_ref() else {
        tracing::debug!("When-expression has neither week nor anchor");
        return None;
    };

    let base = match anchor {
        AnchorKind::TreatmentStart | AnchorKind::AbsoluteWeek | AnchorKind::TreatmentSpan => {
            Some(0.0)
        }
        AnchorKind::RtStart | AnchorKind::RtSpan => ctx.rt.as_ref().map(|rt| rt.start_week),
        AnchorKind::RtEnd => ctx.rt.as_ref().map(|rt| rt.end_week()),
        AnchorKind::InductionCycleIndex => ctx
            .induction
            .map(|i| i.cycle_week(spec.cycle_index.unwrap_or(0.0))),
        AnchorKind::InductionCycleSpan => ctx
            .induction
            .map(|i| i.cycle_week(spec.start_index.unwrap_or(0.0))),
        AnchorKind::MttoStart => ctx.maintenance_start,
        AnchorKind::MttoCycleIndex => ctx.maintenance_start.map(|start| {
            start + ctx.maintenance.weeks_before(spec.cycle_index.unwrap_or(0.0))
        }),
        AnchorKind::TreatmentEnd => ctx.treatment_end,
        AnchorKind::Other(_) => None,
    };

    if base.is_none() {
        tracing::debug!(anchor = %anchor, stratum = %ctx.stratum, "Anchor cannot be resolved");
    }
    base.map(|week| week + offset)
}

/// Window described by a when-expression, for duration-bearing events.
///
/// Chains use the first element whose week resolves. Scalars carry no span.
pub fn resolve_span(when: Option<&When>, ctx: &AnchorContext) -> Option<WeekSpan> {
    match when? {
        When::Week(_) | When::Text(_) => None,
        When::Chain(items) => items
            .iter()
            .find(|item| resolve_week(Some(item), ctx).is_some())
            .and_then(|item| resolve_span(Some(item), ctx)),
        When::Anchored(spec) => resolve_anchored_span(spec, ctx),
    }
}

fn resolve_anchored_span(spec: &AnchorSpec, ctx: &AnchorContext) -> Option<WeekSpan> {
    match spec.anchor.as_ref() {
        // Cycle and RT windows are fixed by the context; `offset_weeks` only
        // moves the point week of these anchors.
        Some(AnchorKind::InductionCycleSpan) => {
            let induction = ctx.induction?;
            let first = spec.start_index.unwrap_or(0.0);
            let last = spec.end_index.unwrap_or(first);
            Some(WeekSpan::new(
                induction.cycle_week(first),
                induction.cycle_week(last + 1.0),
            ))
        }
        Some(AnchorKind::TreatmentSpan) => {
            let end = ctx.treatment_end?;
            let offset = spec.offset();
            Some(WeekSpan::new(offset, end + offset))
        }
        Some(AnchorKind::RtSpan) => {
            let rt = ctx.rt.as_ref()?;
            Some(WeekSpan::new(rt.start_week, rt.end_week()))
        }
        anchor => {
            let weeks = spec.span_weeks?;
            let base = AnchorSpec {
                anchor: Some(
                    anchor
                        .map(AnchorKind::without_span_suffix)
                        .unwrap_or(AnchorKind::TreatmentStart),
                ),
                span_weeks: None,
                ..spec.clone()
            };
            let start = resolve_anchored(&base, ctx)?;
            Some(WeekSpan::new(start, start + weeks))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::context::RtWindow;
    use crate::anchor::schedule::{InductionCadence, MaintenanceSchedule};
    use crate::config::ResolverDefaults;
    use crate::protocol::Chemotherapy;
    use serde_json::json;

    fn when(value: serde_json::Value) -> When {
        When::from_value(&value).unwrap()
    }

    fn context() -> AnchorContext {
        let chemo: Chemotherapy = serde_json::from_value(json!({
            "mantenimiento": {"orden": ["A", "B", "A"], "duraciones": {"A": 6, "B": 3}}
        }))
        .unwrap();
        let defaults = ResolverDefaults::default();
        AnchorContext {
            stratum: "sr".into(),
            induction: Some(InductionCadence {
                start_week: 0.0,
                interval_weeks: 2.0,
                cycles: 4,
            }),
            rt: Some(RtWindow {
                start_week: 4.0,
                duration_weeks: 6.0,
                option_id: Some("sr".into()),
            }),
            maintenance: MaintenanceSchedule::select(Some(&chemo), None, "sr", &defaults),
            maintenance_start: Some(16.0),
            treatment_end: Some(31.0),
        }
    }

    fn week(value: serde_json::Value) -> Option<f64> {
        resolve_week(Some(&when(value)), &context())
    }

    // ── Point resolution ───────────────────────────────────────────────────

    #[test]
    fn test_absent_when_is_unscheduled() {
        assert_eq!(resolve_week(None, &context()), None);
    }

    #[test]
    fn test_number_and_text() {
        assert_eq!(week(json!(7.5)), Some(7.5));
        assert_eq!(week(json!("semana 3")), Some(3.0));
        assert_eq!(week(json!("al diagnóstico")), None);
    }

    #[test]
    fn test_explicit_week_plus_offset() {
        assert_eq!(week(json!({"week": 10, "offset_weeks": 2})), Some(12.0));
        assert_eq!(week(json!({"anchor": "rt_end", "week": 1})), Some(1.0));
    }

    #[test]
    fn test_fallback_chain_first_resolvable_wins() {
        assert_eq!(week(json!([{"anchor": "surgery_day"}, {"anchor": "rt_start"}])), Some(4.0));
        assert_eq!(week(json!(["sin semana", {"anchor": "nope"}])), None);
    }

    #[test]
    fn test_rt_anchors() {
        assert_eq!(week(json!({"anchor": "rt_start", "offset_weeks": 1})), Some(5.0));
        assert_eq!(week(json!({"anchor": "rt_end", "offset_weeks": 6})), Some(16.0));
        assert_eq!(week(json!({"anchor": "rt_span"})), Some(4.0));
    }

    #[test]
    fn test_induction_spacing() {
        for k in 0..5 {
            let w = week(json!({"anchor": "induction_cycle_index", "cycle_index": k}));
            assert_eq!(w, Some(2.0 * k as f64));
        }
        assert_eq!(
            week(json!({"anchor": "induction_cycle_span", "start_index": 1})),
            Some(2.0)
        );
    }

    #[test]
    fn test_maintenance_cumulative_sum() {
        assert_eq!(week(json!({"anchor": "mtto_start"})), Some(16.0));
        assert_eq!(
            week(json!({"anchor": "mtto_cycle_index", "cycle_index": 2})),
            Some(16.0 + 9.0)
        );
    }

    #[test]
    fn test_treatment_anchors() {
        assert_eq!(week(json!({"anchor": "treatment_start", "offset_weeks": 3})), Some(3.0));
        assert_eq!(week(json!({"anchor": "absolute_week"})), Some(0.0));
        assert_eq!(week(json!({"anchor": "treatment_span"})), Some(0.0));
        assert_eq!(week(json!({"anchor": "treatment_end", "offset_weeks": -1})), Some(30.0));
    }

    #[test]
    fn test_unknown_or_missing_anchor_is_unscheduled() {
        assert_eq!(week(json!({"anchor": "surgery_day"})), None);
        assert_eq!(week(json!({"offset_weeks": 3})), None);
    }

    #[test]
    fn test_unavailable_reference_is_unscheduled() {
        let ctx = AnchorContext::bare("", &ResolverDefaults::default());
        let rt_end = when(json!({"anchor": "rt_end"}));
        assert_eq!(resolve_week(Some(&rt_end), &ctx), None);
        let mtto = when(json!({"anchor": "mtto_cycle_index", "cycle_index": 1}));
        assert_eq!(resolve_week(Some(&mtto), &ctx), None);
    }

    // ── Span resolution ────────────────────────────────────────────────────

    fn span(value: serde_json::Value) -> Option<WeekSpan> {
        resolve_span(Some(&when(value)), &context())
    }

    #[test]
    fn test_induction_cycle_span() {
        assert_eq!(
            span(json!({"anchor": "induction_cycle_span", "start_index": 1, "end_index": 3})),
            Some(WeekSpan::new(2.0, 8.0))
        );
        assert_eq!(
            span(json!({"anchor": "induction_cycle_span", "start_index": 2})),
            Some(WeekSpan::new(4.0, 6.0))
        );
    }

    #[test]
    fn test_treatment_and_rt_span() {
        assert_eq!(span(json!({"anchor": "treatment_span"})), Some(WeekSpan::new(0.0, 31.0)));
        assert_eq!(span(json!({"anchor": "rt_span"})), Some(WeekSpan::new(4.0, 10.0)));
    }

    #[test]
    fn test_offset_moves_treatment_span_only() {
        assert_eq!(
            span(json!({"anchor": "treatment_span", "offset_weeks": 2})),
            Some(WeekSpan::new(2.0, 33.0))
        );
        assert_eq!(
            span(json!({"anchor": "rt_span", "offset_weeks": 2})),
            Some(WeekSpan::new(4.0, 10.0))
        );
        assert_eq!(
            span(json!({
                "anchor": "induction_cycle_span",
                "start_index": 0,
                "end_index": 1,
                "offset_weeks": 1
            })),
            Some(WeekSpan::new(0.0, 4.0))
        );
        // The point week still carries the offset.
        assert_eq!(week(json!({"anchor": "rt_span", "offset_weeks": 2})), Some(6.0));
    }

    #[test]
    fn test_span_weeks_on_point_anchor() {
        assert_eq!(
            span(json!({"anchor": "mtto_cycle_index", "cycle_index": 1, "span_weeks": 3})),
            Some(WeekSpan::new(22.0, 25.0))
        );
        assert_eq!(
            span(json!({"anchor": "mtto_start_span", "span_weeks": 4})),
            Some(WeekSpan::new(16.0, 20.0))
        );
        assert_eq!(
            span(json!({"offset_weeks": 2, "span_weeks": 1})),
            Some(WeekSpan::new(2.0, 3.0))
        );
    }

    #[test]
    fn test_point_without_span_has_none() {
        assert_eq!(span(json!({"anchor": "rt_end"})), None);
        assert_eq!(span(json!(5)), None);
        assert_eq!(resolve_span(None, &context()), None);
    }

    #[test]
    fn test_chain_span_uses_first_resolvable() {
        assert_eq!(
            span(json!([{"anchor": "nope"}, {"anchor": "rt_span"}])),
            Some(WeekSpan::new(4.0, 10.0))
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let expr = when(json!([{"anchor": "x"}, {"anchor": "mtto_cycle_index", "cycle_index": 2}]));
        let ctx = context();
        assert_eq!(resolve_week(Some(&expr), &ctx), resolve_week(Some(&expr), &ctx));
        assert_eq!(resolve_span(Some(&expr), &ctx), resolve_span(Some(&expr), &ctx));
    }
}
