//! Maintenance cycle order and induction cadence for the active risk arm.

use std::collections::BTreeMap;

use crate::config::ResolverDefaults;
use crate::protocol::{Chemotherapy, CycleDef, CyclePlan, StratumGroup};

/// Which part of the document the maintenance order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// `quimioterapia.planes[key]`.
    Plan,
    /// `quimioterapia.LR` / `quimioterapia.SR`.
    LegacyArm,
    /// `quimioterapia.mantenimiento.orden`.
    Maintenance,
    /// Root-level `mantenimiento.orden`.
    LegacyMaintenance,
    None,
}

/// Ordered maintenance cycle symbols with their durations.
#[derive(Debug, Clone)]
pub struct MaintenanceSchedule {
    order: Vec<String>,
    durations: BTreeMap<String, f64>,
    definitions: Vec<(String, CycleDef)>,
    source: PlanSource,
    defaults: ResolverDefaults,
}

impl Default for MaintenanceSchedule {
    fn default() -> Self {
        Self::empty(&ResolverDefaults::default())
    }
}

fn plan_key_for<'a>(planes: &'a [(String, CyclePlan)], stratum: &str) -> Option<&'a CyclePlan> {
    let find = |key: &str| {
        planes
            .iter()
            .find(|(k, plan)| k.eq_ignore_ascii_case(key) && plan.orden.is_some())
            .map(|(_, plan)| plan)
    };
    let stratum = stratum.trim();
    match StratumGroup::of(stratum) {
        Some(group) => find(stratum).or_else(|| find(group.key())),
        None => find("sr").or_else(|| {
            planes
                .iter()
                .find(|(_, plan)| plan.orden.is_some())
                .map(|(_, plan)| plan)
        }),
    }
}

fn first_nonempty<'a, T>(lists: impl IntoIterator<Item = Option<&'a Vec<T>>>) -> Option<&'a Vec<T>>
where
    T: 'a,
{
    lists.into_iter().flatten().find(|list| !list.is_empty())
}

impl MaintenanceSchedule {
    pub fn empty(defaults: &ResolverDefaults) -> Self {
        Self {
            order: Vec::new(),
            durations: BTreeMap::new(),
            definitions: Vec::new(),
            source: PlanSource::None,
            defaults: defaults.clone(),
        }
    }

    /// Picks the cycle order for `stratum`, in this precedence:
    /// `planes[stratum]`, `planes[group]` (with no stratum: `planes.sr`, then
    /// the first plan), legacy `quimioterapia.LR`/`SR`,
    /// `quimioterapia.mantenimiento.orden`, root `mantenimiento.orden`.
    pub fn select(
        chemo: Option<&Chemotherapy>,
        legacy: Option<&CyclePlan>,
        stratum: &str,
        defaults: &ResolverDefaults,
    ) -> Self {
        let group = StratumGroup::of(stratum);
        let plan = chemo.and_then(|c| plan_key_for(&c.planes, stratum));
        let legacy_arm = chemo.and_then(|c| match group.map(|g| g.legacy_key()) {
            Some("LR") => c.lr.as_ref(),
            Some(_) => c.sr.as_ref(),
            None => c.lr.as_ref().or(c.sr.as_ref()),
        });
        let maintenance = chemo.and_then(Chemotherapy::maintenance_plan);

        let candidates = [
            (plan, PlanSource::Plan),
            (legacy_arm, PlanSource::LegacyArm),
            (maintenance, PlanSource::Maintenance),
            (legacy, PlanSource::LegacyMaintenance),
        ];
        let (order, source) = candidates
            .into_iter()
            .find_map(|(plan, source)| {
                plan.and_then(|p| p.orden.as_ref())
                    .map(|orden| (orden.clone(), source))
            })
            .unwrap_or((Vec::new(), PlanSource::None));

        let durations = [
            plan.map(|p| &p.duraciones),
            maintenance.map(|p| &p.duraciones),
            chemo.map(|c| &c.duraciones),
            legacy.map(|p| &p.duraciones),
        ]
        .into_iter()
        .flatten()
        .find(|map| !map.is_empty())
        .cloned()
        .unwrap_or_default();

        let definitions = first_nonempty([
            plan.map(|p| &p.ciclos),
            maintenance.map(|p| &p.ciclos),
            chemo.map(|c| &c.ciclos),
            legacy.map(|p| &p.ciclos),
        ])
        .cloned()
        .unwrap_or_default();

        Self {
            order,
            durations,
            definitions,
            source,
            defaults: defaults.clone(),
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn source(&self) -> PlanSource {
        self.source
    }

    /// Document duration for `symbol`, else the configured convention.
    pub fn duration_of(&self, symbol: &str) -> f64 {
        self.durations
            .get(symbol.trim())
            .copied()
            .unwrap_or_else(|| self.defaults.symbol_weeks(symbol))
    }

    /// Sum of the durations of cycles `[0, index)`. Fractional indices round
    /// up; the count is clamped to the order length.
    pub fn weeks_before(&self, index: f64) -> f64 {
        let count = if index.is_finite() && index > 0.0 {
            (index.ceil() as usize).min(self.order.len())
        } else {
            0
        };
        self.order[..count]
            .iter()
            .map(|symbol| self.duration_of(symbol))
            .sum()
    }

    pub fn total_weeks(&self) -> f64 {
        self.weeks_before(self.order.len() as f64)
    }

    /// Definition (drugs, toxicities, description) of a cycle symbol.
    pub fn definition(&self, symbol: &str) -> Option<&CycleDef> {
        let symbol = symbol.trim();
        self.definitions
            .iter()
            .find(|(key, _)| key == symbol)
            .map(|(_, def)| def)
    }
}

/// Induction cycles: start week and spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InductionCadence {
    pub start_week: f64,
    pub interval_weeks: f64,
    pub cycles: usize,
}

impl InductionCadence {
    /// Interval from `induccion_intervalo_semanas` when positive, else the
    /// configured default.
    pub fn interval_for(chemo: Option<&Chemotherapy>, defaults: &ResolverDefaults) -> f64 {
        chemo
            .and_then(|c| c.induccion_intervalo_semanas)
            .filter(|weeks| *weeks > 0.0)
            .unwrap_or(defaults.induction_interval_weeks)
    }

    /// Week of cycle `index` (zero-based).
    pub fn cycle_week(&self, index: f64) -> f64 {
        self.start_week + index * self.interval_weeks
    }

    /// End of the last listed induction cycle.
    pub fn end_week(&self) -> Option<f64> {
        (self.cycles > 0).then(|| self.cycle_week(self.cycles as f64))
    }
}
