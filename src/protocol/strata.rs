//! Risk-arm grouping and per-item stratum filtering.

use serde::Serialize;

use super::types::StrataTags;

/// Prefix family of a stratum id (`lr_...`, `sr_rt_carbo`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StratumGroup {
    Lr,
    Sr,
    Ir,
    Ar,
    T,
}

impl StratumGroup {
    /// Group of a stratum id. Unrecognised prefixes count as standard risk;
    /// an empty id has no group.
    pub fn of(stratum_id: &str) -> Option<Self> {
        let id = stratum_id.trim().to_lowercase();
        if id.is_empty() {
            return None;
        }
        let group = if id.starts_with("lr") {
            Self::Lr
        } else if id.starts_with("sr") {
            Self::Sr
        } else if id.starts_with("ir") {
            Self::Ir
        } else if id.starts_with("ar") {
            Self::Ar
        } else if id.starts_with('t') {
            Self::T
        } else {
            Self::Sr
        };
        Some(group)
    }

    /// Key used in `quimioterapia.planes` and matched inside RT option ids.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Lr => "lr",
            Self::Sr => "sr",
            Self::Ir => "ir",
            Self::Ar => "ar",
            Self::T => "t",
        }
    }

    /// Legacy documents only know `LR` and `SR` branches.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            Self::Lr => "LR",
            _ => "SR",
        }
    }
}

impl StrataTags {
    /// Whether an item tagged with these strata belongs to the selected arm.
    ///
    /// `only_strats` (or its aliases `estratos`, `strats`) is an allow-list,
    /// `exclude_strats` a deny-list. Comparison is case-insensitive. With no
    /// stratum selected every item is shown.
    pub fn admits(&self, selected: &str) -> bool {
        let selected = selected.trim().to_lowercase();
        if selected.is_empty() {
            return true;
        }
        let contains = |list: &[String]| list.iter().any(|s| s.trim().to_lowercase() == selected);

        let only = [&self.only_strats, &self.estratos, &self.strats]
            .into_iter()
            .find(|list| !list.is_empty());
        if let Some(only) = only {
            return contains(only);
        }
        if !self.exclude_strats.is_empty() {
            return !contains(&self.exclude_strats);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(only: &[&str], exclude: &[&str]) -> StrataTags {
        StrataTags {
            only_strats: only.iter().map(|s| s.to_string()).collect(),
            exclude_strats: exclude.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_prefixes() {
        assert_eq!(StratumGroup::of("lr_rt"), Some(StratumGroup::Lr));
        assert_eq!(StratumGroup::of("SR_RT_CARBO"), Some(StratumGroup::Sr));
        assert_eq!(StratumGroup::of("ir"), Some(StratumGroup::Ir));
        assert_eq!(StratumGroup::of("ar_high"), Some(StratumGroup::Ar));
        assert_eq!(StratumGroup::of("t_cell"), Some(StratumGroup::T));
        assert_eq!(StratumGroup::of("estandar"), Some(StratumGroup::Sr));
        assert_eq!(StratumGroup::of(""), None);
    }

    #[test]
    fn test_legacy_key_collapses_to_lr_sr() {
        assert_eq!(StratumGroup::Lr.legacy_key(), "LR");
        assert_eq!(StratumGroup::Ar.legacy_key(), "SR");
    }

    #[test]
    fn test_untagged_item_always_admitted() {
        assert!(StrataTags::default().admits("sr"));
    }

    #[test]
    fn test_only_strats_is_allow_list() {
        let t = tags(&["SR", "ar"], &[]);
        assert!(t.admits("sr"));
        assert!(!t.admits("lr"));
    }

    #[test]
    fn test_exclude_strats_is_deny_list() {
        let t = tags(&[], &["lr"]);
        assert!(!t.admits("LR"));
        assert!(t.admits("sr"));
    }

    #[test]
    fn test_alias_estratos_counts_as_allow_list() {
        let t = StrataTags {
            estratos: vec!["ir".into()],
            ..Default::default()
        };
        assert!(t.admits("ir"));
        assert!(!t.admits("sr"));
    }

    #[test]
    fn test_empty_selection_disables_filter() {
        assert!(tags(&["sr"], &[]).admits(""));
        assert!(tags(&[], &["sr"]).admits("  "));
    }
}
