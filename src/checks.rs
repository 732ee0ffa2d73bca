//! Protocol-level clinical checks derived from the document and the active arm.

use serde::Serialize;

use crate::anchor::AnchorContext;
use crate::protocol::{Investigations, VersionView};

/// Platinum agents present in maintenance cycles or RT options.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PlatinumAgents {
    pub cisplatin: bool,
    pub carboplatin: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProtocolChecks {
    pub requires_audiometry: bool,
    pub requires_gfr: bool,
    pub platinum: PlatinumAgents,
    /// Weeks of the active RT window given with concomitant carboplatin.
    pub carboplatin_concomitant_weeks: Vec<f64>,
}

impl ProtocolChecks {
    pub fn evaluate(view: &VersionView<'_>, ctx: &AnchorContext) -> Self {
        Self {
            requires_audiometry: requires_audiometry(view),
            requires_gfr: requires_gfr(view),
            platinum: platinum_agents(view),
            carboplatin_concomitant_weeks: carboplatin_concomitant_weeks(view, ctx),
        }
    }
}

fn pre_course_text(inv: &Investigations) -> String {
    inv.antes_de_cada_curso.join(" ").to_lowercase()
}

/// Audiometry is required when the document asks for it explicitly or lists
/// it among the pre-course investigations.
pub fn requires_audiometry(view: &VersionView<'_>) -> bool {
    view.investigations().is_some_and(|inv| {
        let text = pre_course_text(inv);
        inv.audiometria || text.contains("audiometr") || text.contains("pure-tone")
    })
}

/// GFR measurement is required when thresholds are given or it is listed
/// among the pre-course investigations.
pub fn requires_gfr(view: &VersionView<'_>) -> bool {
    view.investigations().is_some_and(|inv| {
        let text = pre_course_text(inv);
        inv.gfr_thresholds || text.contains("gfr") || text.contains("glomerular")
    })
}

fn mentions_carboplatin(id: &str, note: Option<&str>) -> bool {
    id.to_lowercase().contains("carbo")
        || note.is_some_and(|n| n.to_lowercase().contains("carboplat"))
}

pub fn platinum_agents(view: &VersionView<'_>) -> PlatinumAgents {
    let mut found = PlatinumAgents::default();

    let chemo = view.chemotherapy();
    let definitions = chemo
        .and_then(|c| c.maintenance_plan())
        .map(|p| p.ciclos.as_slice())
        .into_iter()
        .chain(chemo.map(|c| c.ciclos.as_slice()))
        .chain(chemo.into_iter().flat_map(|c| c.planes.iter().map(|(_, p)| p.ciclos.as_slice())))
        .chain(view.legacy_maintenance().map(|p| p.ciclos.as_slice()))
        .flatten();
    for (_, def) in definitions {
        let drugs = def.drugs().join(" ").to_lowercase();
        found.cisplatin |= drugs.contains("cisplat");
        found.carboplatin |= drugs.contains("carboplat");
    }

    if let Some(rt) = view.radiotherapy() {
        if rt
            .opciones
            .iter()
            .any(|opt| mentions_carboplatin(&opt.id, opt.nota.as_deref()))
        {
            found.carboplatin = true;
        }
    }
    found
}

/// Whole weeks of the active RT window when the active option carries
/// concomitant carboplatin. Empty otherwise.
pub fn carboplatin_concomitant_weeks(view: &VersionView<'_>, ctx: &AnchorContext) -> Vec<f64> {
    let Some(rt) = ctx.rt.as_ref() else {
        return Vec::new();
    };
    let Some(option_id) = rt.option_id.as_deref() else {
        return Vec::new();
    };
    let option = view
        .radiotherapy()
        .and_then(|block| block.opciones.iter().find(|opt| opt.id == option_id));
    let concomitant = option.is_some_and(|opt| mentions_carboplatin(&opt.id, opt.nota.as_deref()));
    if !concomitant {
        return Vec::new();
    }

    let weeks = rt.duration_weeks.max(0.0).ceil() as usize;
    (0..weeks).map(|i| rt.start_week + i as f64).collect()
}
