pub mod anchor; // Anchor resolution: relative timing to weeks
pub mod checks; // Audiometry / GFR / platinum checks
pub mod config;
pub mod error;
pub mod protocol; // Document model, version fallback, strata
pub mod timeline; // Phases, timeline, lanes, cycle calendar

use tracing_subscriber::EnvFilter;

pub use anchor::AnchorContext;
pub use checks::ProtocolChecks;
pub use config::EngineConfig;
pub use error::ProtocolError;
pub use protocol::{find_protocol, parse_protocol, read_protocol_file, Protocol, VersionView};
pub use timeline::ProtocolView;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`config::default_log_filter`]. A second call is a no-op.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Builds everything the presentation layer shows for one protocol.
///
/// `version_id` falls back to the base version when absent or unknown;
/// `stratum_id` falls back to the version's default stratum. The same
/// [`AnchorContext`] feeds phases, timeline, lanes, calendar and checks.
pub fn build_protocol_view(
    protocol: &Protocol,
    version_id: Option<&str>,
    stratum_id: Option<&str>,
    config: &EngineConfig,
) -> ProtocolView {
    let _span = tracing::info_span!("build_protocol_view", protocol = %protocol.id).entered();

    let view = VersionView::new(protocol, version_id);
    let stratum = view.select_stratum(stratum_id);
    let ctx = AnchorContext::build(&view, &stratum, &config.resolver);

    let phases = timeline::build_phases(&view, &ctx, &config.resolver);
    let entries = timeline::build_timeline(&phases);
    let lanes = timeline::build_lane_tracks(&phases, &config.layout);
    let calendar = timeline::build_cycle_calendar(&view, &ctx);
    let checks = ProtocolChecks::evaluate(&view, &ctx);

    tracing::info!(
        version = view.version_id(),
        stratum = %stratum,
        phases = phases.len(),
        items = entries.len(),
        lanes = lanes.lanes.len(),
        "Protocol view built"
    );

    ProtocolView {
        protocol_id: protocol.id.clone(),
        version_id: view.version_id().to_string(),
        stratum,
        phases,
        timeline: entries,
        lanes,
        calendar,
        checks,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PNET5: &str = include_str!("../data/pnet5.json");

    fn pnet5() -> Protocol {
        parse_protocol(PNET5).unwrap()
    }

    fn build(stratum: Option<&str>) -> ProtocolView {
        build_protocol_view(&pnet5(), None, stratum, &EngineConfig::default())
    }

    #[test]
    fn test_fixture_parses() {
        let protocol = pnet5();
        assert_eq!(protocol.id, "pnet5");
        assert_eq!(protocol.versiones.len(), 2);
    }

    #[test]
    fn test_default_stratum_view() {
        let view = build(None);
        assert_eq!(view.protocol_id, "pnet5");
        assert_eq!(view.version_id, "base");
        assert_eq!(view.stratum, "sr_rt_carbo");

        let ids: Vec<_> = view.phases.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "evaluacion",
                "evaluacion-imagen",
                "cirugia",
                "radioterapia",
                "quimio-mantenimiento",
                "soporte",
                "seguimiento"
            ]
        );

        let rt = &view.phases[3].items[0];
        assert_eq!(rt.week, Some(4.0));
        assert_eq!(rt.span.map(|s| s.end_week), Some(10.0));

        // Maintenance starts six weeks after RT ends and runs A B A B A B A B.
        let maintenance = &view.phases[4].items;
        assert_eq!(maintenance.len(), 8);
        assert_eq!(maintenance[0].week, Some(16.0));
        assert_eq!(maintenance[1].week, Some(22.0));
        assert_eq!(maintenance[7].span.map(|s| s.end_week), Some(52.0));
    }

    #[test]
    fn test_timeline_is_sorted_and_numbered() {
        let view = build(None);
        let weeks: Vec<_> = view.timeline.iter().filter_map(|e| e.item.week).collect();
        assert!(weeks.windows(2).all(|w| w[0] <= w[1]));
        let first_unscheduled = view
            .timeline
            .iter()
            .position(|e| e.item.week.is_none())
            .unwrap_or(view.timeline.len());
        assert!(view.timeline[first_unscheduled..]
            .iter()
            .all(|e| e.item.week.is_none()));
        for (idx, entry) in view.timeline.iter().enumerate() {
            assert_eq!(entry.sequence, idx + 1);
        }
    }

    #[test]
    fn test_treatment_end_anchors_follow_up() {
        let view = build(None);
        let end_of_treatment = view
            .timeline
            .iter()
            .find(|e| e.item.title == "Evaluación fin de tratamiento")
            .unwrap();
        assert_eq!(end_of_treatment.item.week, Some(52.0));
        // Follow-up sits twelve weeks after the end of treatment.
        assert!((view.lanes.max_week - 64.6).abs() < 1e-9);
    }

    #[test]
    fn test_low_risk_arm() {
        let view = build(Some("lr_rt"));
        assert_eq!(view.stratum, "lr_rt");
        let rt = view.phases.iter().find(|p| p.id == "radioterapia").unwrap();
        assert_eq!(rt.items.len(), 1);
        assert_eq!(rt.items[0].week, Some(2.0));
        assert_eq!(rt.items[0].span.map(|s| s.end_week), Some(7.0));

        let maintenance = view
            .phases
            .iter()
            .find(|p| p.id == "quimio-mantenimiento")
            .unwrap();
        assert_eq!(maintenance.items.len(), 6);
        assert_eq!(maintenance.items[0].week, Some(13.0));
        assert!(view.checks.carboplatin_concomitant_weeks.is_empty());
    }

    #[test]
    fn test_checks_for_carboplatin_arm() {
        let view = build(None);
        assert!(view.checks.requires_audiometry);
        assert!(view.checks.requires_gfr);
        assert!(view.checks.platinum.cisplatin);
        assert!(view.checks.platinum.carboplatin);
        assert_eq!(
            view.checks.carboplatin_concomitant_weeks,
            vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_calendar_lists_maintenance_cycles() {
        let view = build(None);
        let titles: Vec<_> = view.calendar.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles.first().copied(), Some("Mantenimiento 1 (A)"));
        assert_eq!(view.calendar.len(), 8);
        assert_eq!(view.calendar[1].week, Some(22.0));
    }

    #[test]
    fn test_named_version_overrides_base() {
        let view = build_protocol_view(&pnet5(), Some("enmienda-2"), None, &EngineConfig::default());
        assert_eq!(view.version_id, "enmienda-2");
        let imaging = view
            .phases
            .iter()
            .find(|p| p.id == "evaluacion-imagen")
            .unwrap();
        assert_eq!(imaging.items.len(), 1);
        // Strata fall back to the base version.
        assert_eq!(view.stratum, "sr_rt_carbo");
    }

    #[test]
    fn test_unknown_version_uses_base() {
        let view = build_protocol_view(&pnet5(), Some("nope"), None, &EngineConfig::default());
        assert_eq!(view.version_id, "base");
    }

    #[test]
    fn test_view_is_deterministic_and_serializable() {
        let a = build(Some("sr_rt_sola"));
        let b = build(Some("sr_rt_sola"));
        assert_eq!(a, b);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["stratum"], "sr_rt_sola");
        assert!(json["lanes"]["lanes"].is_array());
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging();
        init_logging();
    }
}
