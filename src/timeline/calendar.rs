//! Chemotherapy cycle calendar: induction, consolidation, immunotherapy and
//! maintenance cycles of the selected arm, each with its week and drug lines.

use std::cmp::Ordering;

use serde::Serialize;

use crate::anchor::{resolve_week, AnchorContext};
use crate::protocol::{AnchorKind, AnchorSpec, ChemoCycle, Drug, VersionView, When};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Induction,
    Consolidation,
    Immunotherapy,
    Maintenance,
}

impl CycleKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Induction => "Inducción",
            Self::Consolidation => "Consolidación",
            Self::Immunotherapy => "Inmunoterapia",
            Self::Maintenance => "Mantenimiento",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEntry {
    pub id: String,
    pub kind: CycleKind,
    pub title: String,
    pub week: Option<f64>,
    pub description: Option<String>,
    pub drugs: Vec<String>,
    /// Conditional administration note ("si respuesta parcial...").
    pub condition: Option<String>,
}

/// "Carboplatino — 560 mg/m² (días 1, 8)".
pub fn drug_schedule_line(drug: &Drug) -> String {
    let mut line = drug.nombre.clone().unwrap_or_default();
    if let Some(dose) = &drug.dosis {
        line.push_str(&format!(" — {dose}"));
    }
    if let Some(days) = &drug.dias {
        line.push_str(&format!(" (días {})", days.join(", ")));
    }
    line
}

fn cycle_entries(
    cycles: &[ChemoCycle],
    kind: CycleKind,
    prefix: &str,
    fallback_title: &str,
    ctx: &AnchorContext,
) -> Vec<CalendarEntry> {
    cycles
        .iter()
        .filter(|c| c.strata.admits(&ctx.stratum))
        .enumerate()
        .map(|(idx, cycle)| CalendarEntry {
            id: cycle.id.clone().unwrap_or_else(|| format!("{prefix}-{idx}")),
            kind,
            title: cycle
                .titulo
                .clone()
                .unwrap_or_else(|| fallback_title.to_string()),
            week: resolve_week(cycle.when.as_ref(), ctx),
            description: cycle.descripcion.clone(),
            drugs: cycle.drogas.iter().map(drug_schedule_line).collect(),
            condition: cycle.cond.clone(),
        })
        .collect()
}

fn calendar_order(a: &CalendarEntry, b: &CalendarEntry) -> Ordering {
    match (a.week, b.week) {
        (Some(wa), Some(wb)) => wa.total_cmp(&wb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cycle calendar for the context's stratum, sorted by week (stable;
/// unscheduled entries last).
pub fn build_cycle_calendar(view: &VersionView<'_>, ctx: &AnchorContext) -> Vec<CalendarEntry> {
    let mut entries = Vec::new();

    if let Some(chemo) = view.chemotherapy() {
        entries.extend(cycle_entries(
            &chemo.induccion,
            CycleKind::Induction,
            "ind",
            "Ciclo",
            ctx,
        ));
        entries.extend(cycle_entries(
            &chemo.consolidacion,
            CycleKind::Consolidation,
            "cons",
            "Consolidación",
            ctx,
        ));
    }

    if let Some(block) = view.immunotherapy() {
        let events = block
            .events()
            .iter()
            .filter(|e| e.strata.admits(&ctx.stratum))
            .enumerate()
            .map(|(idx, ev)| CalendarEntry {
                id: ev.id.clone().unwrap_or_else(|| format!("immuno-{idx}")),
                kind: CycleKind::Immunotherapy,
                title: ev
                    .titulo
                    .clone()
                    .unwrap_or_else(|| "Inmunoterapia".to_string()),
                week: resolve_week(ev.when.as_ref(), ctx),
                description: ev.descripcion.clone(),
                drugs: Vec::new(),
                condition: ev.cond.clone(),
            });
        entries.extend(events);
    }

    let explicit = view
        .chemotherapy()
        .map(|c| c.maintenance_cycles())
        .unwrap_or(&[]);
    if !explicit.is_empty() {
        entries.extend(cycle_entries(
            explicit,
            CycleKind::Maintenance,
            "mtto",
            "Mantenimiento",
            ctx,
        ));
    } else {
        let schedule = &ctx.maintenance;
        for (idx, symbol) in schedule.order().iter().enumerate() {
            let when = When::anchored(
                AnchorSpec::new(AnchorKind::MttoCycleIndex).with_cycle_index(idx),
            );
            let def = schedule.definition(symbol);
            entries.push(CalendarEntry {
                id: format!("mtto-{idx}"),
                kind: CycleKind::Maintenance,
                title: format!("Mantenimiento {} ({symbol})", idx + 1),
                week: resolve_week(Some(&when), ctx),
                description: def.and_then(|d| d.descripcion.clone().or_else(|| d.resumen.clone())),
                drugs: def.map(|d| d.drugs().to_vec()).unwrap_or_default(),
                condition: None,
            });
        }
    }

    entries.sort_by(calendar_order);
    entries
}
