//! Resolution context built once per (protocol, version, stratum).

use crate::config::ResolverDefaults;
use crate::protocol::{
    Radiotherapy, RtBranch, RtOption, StratumGroup, VersionView, When,
};

use super::parse::parse_week_range;
use super::schedule::{InductionCadence, MaintenanceSchedule};

/// Active radiotherapy window.
#[derive(Debug, Clone, PartialEq)]
pub struct RtWindow {
    pub start_week: f64,
    pub duration_weeks: f64,
    /// Id of the RT option in use; `None` for a legacy `LR`/`SR` branch.
    pub option_id: Option<String>,
}

impl RtWindow {
    pub fn end_week(&self) -> f64 {
        self.start_week + self.duration_weeks
    }
}

/// Reference points every anchor is measured from.
///
/// Built in a fixed order (induction cadence, RT window, maintenance start,
/// maintenance total, treatment end). Each stage resolves its own
/// when-expressions against the stages already built; references to later
/// stages are unavailable and resolve to `None`.
#[derive(Debug, Clone)]
pub struct AnchorContext {
    pub stratum: String,
    pub induction: Option<InductionCadence>,
    pub rt: Option<RtWindow>,
    pub maintenance: MaintenanceSchedule,
    pub maintenance_start: Option<f64>,
    pub treatment_end: Option<f64>,
}

/// RT option for `stratum`: exact id, then the first id containing the
/// stratum's group key, then the first option. No stratum selects the first.
pub fn select_rt_option<'a>(options: &'a [RtOption], stratum: &str) -> Option<&'a RtOption> {
    let stratum = stratum.trim();
    let Some(group) = StratumGroup::of(stratum) else {
        return options.first();
    };
    if let Some(exact) = options.iter().find(|opt| opt.id == stratum) {
        return Some(exact);
    }
    let by_group = options
        .iter()
        .find(|opt| opt.id.to_lowercase().contains(group.key()));
    let chosen = by_group.or_else(|| options.first());
    if let Some(opt) = chosen {
        tracing::debug!(
            stratum,
            option = %opt.id,
            matched_group = by_group.is_some(),
            "No RT option for stratum, using fallback"
        );
    }
    chosen
}

/// Legacy `radioterapia.LR`/`SR` branch for `stratum`. No stratum prefers `LR`.
pub fn select_rt_branch<'a>(rt: &'a Radiotherapy, stratum: &str) -> Option<&'a RtBranch> {
    match StratumGroup::of(stratum).map(|g| g.legacy_key()) {
        Some("LR") => rt.lr.as_ref(),
        Some(_) => rt.sr.as_ref(),
        None => rt.lr.as_ref().or(rt.sr.as_ref()),
    }
}

impl AnchorContext {
    /// Context with no reference points at all. Only absolute timing resolves.
    pub fn bare(stratum: &str, defaults: &ResolverDefaults) -> Self {
        Self {
            stratum: stratum.to_string(),
            induction: None,
            rt: None,
            maintenance: MaintenanceSchedule::empty(defaults),
            maintenance_start: None,
            treatment_end: None,
        }
    }

    pub fn build(view: &VersionView<'_>, stratum: &str, defaults: &ResolverDefaults) -> Self {
        let chemo = view.chemotherapy();
        let mut ctx = Self::bare(stratum, defaults);

        // induction cadence: first cycle's timing, absolute anchors only
        let induction = chemo.map(|c| c.induccion.as_slice()).unwrap_or(&[]);
        let start_week = induction
            .first()
            .and_then(|cycle| ctx.resolve_week(cycle.when.as_ref()))
            .unwrap_or(0.0);
        ctx.induction = Some(InductionCadence {
            start_week,
            interval_weeks: InductionCadence::interval_for(chemo, defaults),
            cycles: induction.len(),
        });

        // RT window
        ctx.rt = view
            .radiotherapy()
            .and_then(|rt| ctx.rt_window(rt, stratum, defaults));

        // maintenance start
        ctx.maintenance = MaintenanceSchedule::select(chemo, view.legacy_maintenance(), stratum, defaults);
        let relative = chemo.and_then(|c| c.inicio_relativo.as_ref());
        ctx.maintenance_start = ctx.resolve_week(relative).or_else(|| {
            ctx.rt
                .as_ref()
                .map(|rt| rt.end_week() + defaults.maintenance_gap_weeks)
        });

        // maintenance total, treatment end
        let maintenance_end = if ctx.maintenance.is_empty() {
            None
        } else {
            ctx.maintenance_start
                .map(|start| start + ctx.maintenance.total_weeks())
        };
        ctx.treatment_end = maintenance_end
            .or_else(|| ctx.rt.as_ref().map(RtWindow::end_week))
            .or_else(|| ctx.induction.and_then(|i| i.end_week()));

        tracing::debug!(
            stratum,
            rt_start = ?ctx.rt.as_ref().map(|rt| rt.start_week),
            maintenance_source = ?ctx.maintenance.source(),
            maintenance_start = ?ctx.maintenance_start,
            treatment_end = ?ctx.treatment_end,
            "Anchor context built"
        );
        ctx
    }

    fn rt_window(&self, rt: &Radiotherapy, stratum: &str, defaults: &ResolverDefaults) -> Option<RtWindow> {
        let option = select_rt_option(&rt.opciones, stratum);
        let branch = select_rt_branch(rt, stratum);
        if option.is_none() && branch.is_none() {
            return None;
        }

        let branch_range = branch
            .and_then(|b| b.semanas.as_deref())
            .and_then(parse_week_range);
        let start_week = option
            .and_then(|o| o.when.as_ref())
            .or_else(|| branch.and_then(|b| b.when.as_ref()))
            .and_then(|when| self.resolve_week(Some(when)))
            .or_else(|| branch_range.map(|r| r.start))
            .unwrap_or(defaults.rt_start_week);
        let duration_weeks = option
            .and_then(|o| o.duracion_semanas.or(o.duracion))
            .or_else(|| branch.and_then(|b| b.duracion_semanas))
            .or_else(|| branch_range.map(|r| r.span()).filter(|span| *span > 0.0))
            .unwrap_or(defaults.rt_duration_weeks);

        Some(RtWindow {
            start_week,
            duration_weeks,
            option_id: option.map(|o| o.id.clone()),
        })
    }

    /// Shorthand for [`super::resolve_week`] against this context.
    pub fn resolve_week(&self, when: Option<&When>) -> Option<f64> {
        super::resolve::resolve_week(when, self)
    }
}
