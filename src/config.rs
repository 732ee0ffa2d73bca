use serde::{Deserialize, Serialize};

/// Crate-level constants
pub const CRATE_NAME: &str = "protocol-timeline";
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Historical defaults ────────────────────────────────────────────────────
//
// Values the protocol views have always assumed when a document is silent.
// A document field always wins over these.

/// RT start week when an RT block exists but its `when` cannot be placed.
pub const DEFAULT_RT_START_WEEK: f64 = 4.0;

/// RT duration when neither `duracion_semanas` nor a `semanas` range is usable.
pub const DEFAULT_RT_DURATION_WEEKS: f64 = 6.0;

/// Weeks between induction cycles when `induccion_intervalo_semanas` is absent.
pub const DEFAULT_INDUCTION_INTERVAL_WEEKS: f64 = 3.0;

/// Gap between RT end and maintenance start when `inicio_relativo` is absent.
pub const DEFAULT_MAINTENANCE_GAP_WEEKS: f64 = 2.0;

/// Per-symbol maintenance cycle durations used when the document has none.
pub const DEFAULT_CYCLE_A_WEEKS: f64 = 6.0;
pub const DEFAULT_CYCLE_B_WEEKS: f64 = 3.0;
pub const DEFAULT_CYCLE_C_WEEKS: f64 = 4.0;
pub const DEFAULT_CYCLE_OTHER_WEEKS: f64 = 6.0;

/// Point events are drawn as blocks at least this wide.
pub const MIN_BLOCK_DURATION_WEEKS: f64 = 0.6;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "protocol_timeline=info"
}

// ── Engine configuration ───────────────────────────────────────────────────

/// Defaults consulted by the anchor resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverDefaults {
    pub rt_start_week: f64,
    pub rt_duration_weeks: f64,
    pub induction_interval_weeks: f64,
    pub maintenance_gap_weeks: f64,
    pub cycle_a_weeks: f64,
    pub cycle_b_weeks: f64,
    pub cycle_c_weeks: f64,
    pub cycle_other_weeks: f64,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            rt_start_week: DEFAULT_RT_START_WEEK,
            rt_duration_weeks: DEFAULT_RT_DURATION_WEEKS,
            induction_interval_weeks: DEFAULT_INDUCTION_INTERVAL_WEEKS,
            maintenance_gap_weeks: DEFAULT_MAINTENANCE_GAP_WEEKS,
            cycle_a_weeks: DEFAULT_CYCLE_A_WEEKS,
            cycle_b_weeks: DEFAULT_CYCLE_B_WEEKS,
            cycle_c_weeks: DEFAULT_CYCLE_C_WEEKS,
            cycle_other_weeks: DEFAULT_CYCLE_OTHER_WEEKS,
        }
    }
}

impl ResolverDefaults {
    /// Convention-based duration for a cycle symbol the document does not define.
    pub fn symbol_weeks(&self, symbol: &str) -> f64 {
        match symbol.trim().to_uppercase().as_str() {
            "A" => self.cycle_a_weeks,
            "B" => self.cycle_b_weeks,
            "C" => self.cycle_c_weeks,
            _ => self.cycle_other_weeks,
        }
    }
}

/// Defaults consulted by the lane layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutDefaults {
    pub min_block_weeks: f64,
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            min_block_weeks: MIN_BLOCK_DURATION_WEEKS,
        }
    }
}

/// Everything the engine needs besides the document itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resolver: ResolverDefaults,
    pub layout: LayoutDefaults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_name_is_protocol_timeline() {
        assert_eq!(CRATE_NAME, "protocol-timeline");
    }

    #[test]
    fn crate_version_matches_cargo() {
        assert_eq!(CRATE_VERSION, "0.6.0");
    }

    #[test]
    fn defaults_keep_historical_values() {
        let config = EngineConfig::default();
        assert_eq!(config.resolver.rt_start_week, 4.0);
        assert_eq!(config.resolver.rt_duration_weeks, 6.0);
        assert_eq!(config.resolver.maintenance_gap_weeks, 2.0);
        assert!((config.layout.min_block_weeks - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn symbol_weeks_follows_convention() {
        let defaults = ResolverDefaults::default();
        assert_eq!(defaults.symbol_weeks("A"), 6.0);
        assert_eq!(defaults.symbol_weeks("b"), 3.0);
        assert_eq!(defaults.symbol_weeks(" C "), 4.0);
        assert_eq!(defaults.symbol_weeks("D"), 6.0);
    }

    #[test]
    fn partial_config_deserializes_over_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"resolver":{"cycle_b_weeks":2.5}}"#).unwrap();
        assert_eq!(config.resolver.cycle_b_weeks, 2.5);
        assert_eq!(config.resolver.cycle_a_weeks, 6.0);
        assert_eq!(config.layout, LayoutDefaults::default());
    }

    #[test]
    fn default_log_filter_targets_crate() {
        assert!(default_log_filter().starts_with("protocol_timeline"));
    }
}
