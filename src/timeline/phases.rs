//! One builder per clinical phase. Each maps a typed block to items and
//! resolves every item's timing through the shared [`AnchorContext`].

use crate::anchor::{
    parse_week_range, resolve_span, resolve_week, select_rt_branch, select_rt_option,
    AnchorContext, WeekSpan,
};
use crate::config::ResolverDefaults;
use crate::protocol::{
    AnchorKind, AnchorSpec, ChemoCycle, EventBlock, Radiotherapy, StratumGroup, Support,
    VersionView, When,
};

use super::labels::{count_badge, title_case, when_label};
use super::types::{Lane, Phase, PhaseItem};

/// Item fields before timing is resolved.
#[derive(Debug, Default)]
struct Draft {
    title: String,
    meta: Option<String>,
    body: Option<String>,
    details: Vec<String>,
    when: Option<When>,
    /// Duration for point-timed items that still occupy a window.
    span_weeks: Option<f64>,
    /// Window already placed by the anchor context; wins over `when`.
    window: Option<WeekSpan>,
    /// Free-text timing shown instead of the computed label.
    when_label: Option<String>,
}

struct PhaseSet<'a> {
    ctx: &'a AnchorContext,
    next_order: usize,
    phases: Vec<Phase>,
}

impl<'a> PhaseSet<'a> {
    fn new(ctx: &'a AnchorContext) -> Self {
        Self {
            ctx,
            next_order: 0,
            phases: Vec::new(),
        }
    }

    fn item(&mut self, lane: Lane, draft: Draft) -> PhaseItem {
        let order = self.next_order;
        self.next_order += 1;

        let when = draft.when.as_ref();
        let (week, span) = match draft.window {
            Some(window) => (Some(window.start_week), Some(window)),
            None => {
                let week = resolve_week(when, self.ctx);
                let span = resolve_span(when, self.ctx).or_else(|| {
                    let start = week?;
                    draft
                        .span_weeks
                        .filter(|weeks| *weeks > 0.0)
                        .map(|weeks| WeekSpan::new(start, start + weeks))
                });
                (week, span)
            }
        };
        let label = draft
            .when_label
            .or_else(|| when_label(when, week, span.as_ref()));

        PhaseItem {
            order,
            lane,
            title: draft.title,
            meta: draft.meta,
            body: draft.body,
            details: draft.details,
            anchor: when.and_then(When::anchor).cloned(),
            when: draft.when,
            week,
            span,
            when_label: label,
        }
    }

    /// A phase with no items is dropped unless it carries a note.
    fn push(&mut self, phase: Phase) {
        if phase.items.is_empty() && phase.note.is_none() {
            return;
        }
        self.phases.push(phase);
    }
}

fn first_some(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates.into_iter().flatten().next()
}

// ═══════════════════════════════════════════════════════════
// Evaluations, imaging, surgery
// ═══════════════════════════════════════════════════════════

fn evaluations(set: &mut PhaseSet<'_>, view: &VersionView<'_>) {
    let lane = Lane::Evaluations;
    let stratum = set.ctx.stratum.clone();
    let evaluations: Vec<_> = view
        .evaluations()
        .iter()
        .filter(|ev| ev.strata.admits(&stratum))
        .collect();
    if evaluations.is_empty() {
        return;
    }
    let items = evaluations
        .iter()
        .enumerate()
        .map(|(idx, ev)| {
            let moment = ev.momento.as_deref().map(title_case);
            let fallback = format!(
                "{} {}",
                moment.clone().unwrap_or_else(|| "Evaluación".to_string()),
                idx + 1
            );
            set.item(
                lane,
                Draft {
                    title: ev.titulo.clone().unwrap_or(fallback),
                    meta: moment,
                    body: first_some([ev.descripcion.clone(), ev.objetivo.clone()]),
                    when: ev.when.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();
    set.push(Phase {
        id: "evaluacion".into(),
        lane,
        title: "Evaluaciones clave".into(),
        badge: Some(count_badge(evaluations.len(), "hito", "hitos")),
        note: None,
        items,
    });
}

fn imaging(set: &mut PhaseSet<'_>, view: &VersionView<'_>) {
    let lane = Lane::Evaluations;
    let stratum = set.ctx.stratum.clone();
    let events: Vec<_> = view
        .imaging_events()
        .iter()
        .filter(|ev| ev.strata.admits(&stratum))
        .collect();
    if events.is_empty() {
        return;
    }
    let items = events
        .iter()
        .enumerate()
        .map(|(idx, ev)| {
            let moment = ev
                .momento
                .as_deref()
                .map(|m| m.replace('_', " "))
                .unwrap_or_else(|| (idx + 1).to_string());
            set.item(
                lane,
                Draft {
                    title: format!("Imagen: {moment}"),
                    details: ev.pruebas.iter().map(|p| p.describe()).collect(),
                    when: ev.when.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();
    set.push(Phase {
        id: "evaluacion-imagen".into(),
        lane,
        title: "Imagen".into(),
        badge: Some(count_badge(events.len(), "estudio", "estudios")),
        note: None,
        items,
    });
}

fn surgery(set: &mut PhaseSet<'_>, view: &VersionView<'_>) {
    let Some(surgery) = view.surgery() else {
        return;
    };
    let lane = Lane::Surgery;
    let item = set.item(
        lane,
        Draft {
            title: surgery
                .procedimiento
                .clone()
                .unwrap_or_else(|| "Procedimiento quirúrgico".into()),
            body: first_some([surgery.notas.clone(), surgery.objetivo.clone()]),
            when: surgery.when.clone(),
            ..Default::default()
        },
    );
    set.push(Phase {
        id: "cirugia".into(),
        lane,
        title: "Cirugía".into(),
        badge: Some(
            surgery
                .tipo
                .as_deref()
                .map(title_case)
                .unwrap_or_else(|| "Resección".into()),
        ),
        note: surgery.descripcion.clone(),
        items: vec![item],
    });
}

// ═══════════════════════════════════════════════════════════
// Radiotherapy
// ═══════════════════════════════════════════════════════════

fn radiotherapy(set: &mut PhaseSet<'_>, view: &VersionView<'_>, defaults: &ResolverDefaults) {
    let Some(rt) = view.radiotherapy() else {
        return;
    };
    let lane = Lane::Radiotherapy;
    let items = if rt.opciones.is_empty() {
        rt_branch_items(set, rt)
    } else {
        let stratum = set.ctx.stratum.clone();
        let shown: Vec<_> = if stratum.is_empty() {
            rt.opciones.iter().collect()
        } else {
            select_rt_option(&rt.opciones, &stratum).into_iter().collect()
        };
        shown
            .into_iter()
            .map(|opt| {
                let window = set
                    .ctx
                    .rt
                    .as_ref()
                    .filter(|rt| rt.option_id.as_deref() == Some(opt.id.as_str()))
                    .map(|rt| WeekSpan::new(rt.start_week, rt.end_week()));
                let title = first_some([opt.label.clone(), Some(title_case(&opt.id))])
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Rama".into());
                set.item(
                    lane,
                    Draft {
                        title,
                        meta: first_some([opt.dosis.clone(), opt.dosis_total.clone()]),
                        body: first_some([opt.nota.clone(), opt.descripcion.clone()]),
                        when: opt.when.clone(),
                        span_weeks: Some(
                            opt.duracion_semanas
                                .or(opt.duracion)
                                .unwrap_or(defaults.rt_duration_weeks),
                        ),
                        window,
                        ..Default::default()
                    },
                )
            })
            .collect()
    };
    let count = items.len();
    set.push(Phase {
        id: "radioterapia".into(),
        lane,
        title: "Radioterapia".into(),
        badge: Some(count_badge(count, "escenario", "escenarios")),
        note: rt.descripcion.clone(),
        items,
    });
}

/// Legacy `LR`/`SR` branches: the active one with a stratum, both without.
fn rt_branch_items(set: &mut PhaseSet<'_>, rt: &Radiotherapy) -> Vec<PhaseItem> {
    let stratum = set.ctx.stratum.clone();
    let active = select_rt_branch(rt, &stratum);
    let active_window = set
        .ctx
        .rt
        .as_ref()
        .filter(|window| window.option_id.is_none())
        .map(|window| WeekSpan::new(window.start_week, window.end_week()));
    let branches: Vec<_> = if stratum.is_empty() {
        [("LR", rt.lr.as_ref()), ("SR", rt.sr.as_ref())]
            .into_iter()
            .filter_map(|(key, branch)| branch.map(|b| (key, b)))
            .collect()
    } else {
        let key = StratumGroup::of(&stratum).map_or("LR", |g| g.legacy_key());
        active
            .map(|b| (key, b))
            .into_iter()
            .collect()
    };
    branches
        .into_iter()
        .map(|(key, branch)| {
            let range = branch.semanas.as_deref().and_then(parse_week_range);
            let window = active_window.filter(|_| active.is_some_and(|a| std::ptr::eq(a, branch)));
            set.item(
                Lane::Radiotherapy,
                Draft {
                    title: format!("Rama {key}"),
                    meta: first_some([
                        branch.dosis_total.clone(),
                        branch.dosis.clone(),
                        branch.rama.clone(),
                    ]),
                    body: first_some([branch.nota.clone(), branch.descripcion.clone()]),
                    when: branch
                        .when
                        .clone()
                        .or_else(|| branch.semanas.clone().map(When::Text)),
                    span_weeks: branch
                        .duracion_semanas
                        .or_else(|| range.map(|r| r.span())),
                    window,
                    ..Default::default()
                },
            )
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Chemotherapy
// ═══════════════════════════════════════════════════════════

const CHEMO_STAGES: [(&str, &str); 4] = [
    ("induccion", "Inducción"),
    ("consolidacion", "Consolidación"),
    ("reinduccion", "Reinducción"),
    ("intensificacion", "Intensificación"),
];

fn drug_line(name: Option<&str>, dose: Option<&str>) -> Option<String> {
    let line = match (name, dose) {
        (Some(n), Some(d)) => format!("{n} · {d}"),
        (Some(n), None) => n.to_string(),
        (None, Some(d)) => format!("· {d}"),
        (None, None) => return None,
    };
    Some(line)
}

fn chemo_cycle_phase(
    set: &mut PhaseSet<'_>,
    key: &str,
    label: &str,
    cycles: &[ChemoCycle],
) {
    let lane = Lane::Chemotherapy;
    let stratum = set.ctx.stratum.clone();
    let cycles: Vec<_> = cycles.iter().filter(|c| c.strata.admits(&stratum)).collect();
    if cycles.is_empty() {
        return;
    }
    let items = cycles
        .iter()
        .enumerate()
        .map(|(idx, cycle)| {
            set.item(
                lane,
                Draft {
                    title: cycle
                        .titulo
                        .clone()
                        .unwrap_or_else(|| format!("{label} {}", idx + 1)),
                    meta: cycle
                        .tipo
                        .as_deref()
                        .map(|t| title_case(t.strip_prefix("q_").unwrap_or(t))),
                    body: first_some([cycle.descripcion.clone(), cycle.detalle.clone()]),
                    details: cycle
                        .drogas
                        .iter()
                        .filter_map(|d| drug_line(d.nombre.as_deref(), d.dosis.as_deref()))
                        .collect(),
                    when: cycle.when.clone(),
                    ..Default::default()
                },
            )
        })
        .collect();
    set.push(Phase {
        id: format!("quimio-{key}"),
        lane,
        title: format!("Quimioterapia · {label}"),
        badge: Some(count_badge(cycles.len(), "bloque", "bloques")),
        note: None,
        items,
    });
}

fn chemotherapy(set: &mut PhaseSet<'_>, view: &VersionView<'_>) {
    let chemo = view.chemotherapy();
    if let Some(chemo) = chemo {
        for (key, label) in CHEMO_STAGES {
            let cycles = match key {
                "induccion" => &chemo.induccion,
                "consolidacion" => &chemo.consolidacion,
                "reinduccion" => &chemo.reinduccion,
                _ => &chemo.intensificacion,
            };
            chemo_cycle_phase(set, key, label, cycles);
        }
        if !chemo.maintenance_cycles().is_empty() {
            chemo_cycle_phase(set, "mantenimiento", "Mantenimiento", chemo.maintenance_cycles());
            return;
        }
    }
    maintenance_plan(set);
}

/// One item per scheduled maintenance cycle, each spanning its own duration.
fn maintenance_plan(set: &mut PhaseSet<'_>) {
    let lane = Lane::Chemotherapy;
    let ctx = set.ctx;
    let schedule = &ctx.maintenance;
    if schedule.is_empty() {
        return;
    }
    let items = schedule
        .order()
        .iter()
        .enumerate()
        .map(|(idx, symbol)| {
            let def = schedule.definition(symbol);
            let mut details: Vec<String> = def.map(|d| d.drugs().to_vec()).unwrap_or_default();
            if let Some(toxicities) = def.map(|d| &d.toxicidades).filter(|t| !t.is_empty()) {
                details.push(format!("Toxicidades: {}", toxicities.join("; ")));
            }
            set.item(
                lane,
                Draft {
                    title: format!("Ciclo {} · {symbol}", idx + 1),
                    meta: Some(
                        def.and_then(|d| d.nombre.clone())
                            .unwrap_or_else(|| format!("Subciclo {symbol}")),
                    ),
                    body: def.and_then(|d| {
                        first_some([d.descripcion.clone(), d.resumen.clone(), d.detalle.clone()])
                    }),
                    details,
                    when: Some(When::anchored(
                        AnchorSpec::new(AnchorKind::MttoCycleIndex)
                            .with_cycle_index(idx)
                            .with_span(schedule.duration_of(symbol)),
                    )),
                    ..Default::default()
                },
            )
        })
        .collect();
    set.push(Phase {
        id: "quimio-mantenimiento".into(),
        lane,
        title: "Mantenimiento secuencial".into(),
        badge: Some(count_badge(schedule.order().len(), "ciclo", "ciclos")),
        note: None,
        items,
    });
}

// ═══════════════════════════════════════════════════════════
// Support and event blocks
// ═══════════════════════════════════════════════════════════

fn support(set: &mut PhaseSet<'_>, support: &Support) {
    let lane = Lane::SupportProphylaxis;
    let stratum = set.ctx.stratum.clone();
    let source = if support.medidas.is_empty() {
        &support.items
    } else {
        &support.medidas
    };
    let measures: Vec<_> = source.iter().filter(|m| m.strata.admits(&stratum)).collect();
    let block_note = first_some([support.descripcion.clone(), support.objetivo.clone()]);

    let items: Vec<PhaseItem> = if !measures.is_empty() {
        measures
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                set.item(
                    lane,
                    Draft {
                        title: first_some([m.titulo.clone(), m.nombre.clone()])
                            .unwrap_or_else(|| format!("Medida {}", idx + 1)),
                        meta: m.tipo.clone(),
                        body: first_some([m.descripcion.clone(), m.articulacion.clone()]),
                        when: m.when.clone(),
                        when_label: m.cuando.clone(),
                        ..Default::default()
                    },
                )
            })
            .collect()
    } else if source.is_empty() {
        vec![set.item(
            lane,
            Draft {
                title: support
                    .titulo
                    .clone()
                    .unwrap_or_else(|| "Recomendaciones".into()),
                body: block_note.clone(),
                when: support.when.clone(),
                ..Default::default()
            },
        )]
    } else {
        Vec::new()
    };

    let count = items.len().max(1);
    set.push(Phase {
        id: "soporte".into(),
        lane,
        title: "Soporte integral".into(),
        badge: Some(count_badge(count, "intervención", "intervenciones")),
        note: block_note,
        items,
    });
}

fn event_block(set: &mut PhaseSet<'_>, key: &str, lane: Lane, block: &EventBlock) {
    let title = title_case(key);
    let stratum = set.ctx.stratum.clone();
    let all = block.events();
    let events: Vec<_> = all.iter().filter(|e| e.strata.admits(&stratum)).collect();
    let note = first_some([block.descripcion.clone(), block.objetivo.clone()]);

    let items: Vec<PhaseItem> = if !events.is_empty() {
        events
            .iter()
            .enumerate()
            .map(|(idx, ev)| {
                let details = if ev.componentes.is_empty() {
                    ev.tratamientos.clone()
                } else {
                    ev.componentes.clone()
                };
                set.item(
                    lane,
                    Draft {
                        title: first_some([ev.titulo.clone(), ev.nombre.clone()])
                            .unwrap_or_else(|| format!("{title} {}", idx + 1)),
                        body: first_some([ev.descripcion.clone(), ev.detalle.clone()]),
                        details,
                        when: ev.when.clone(),
                        ..Default::default()
                    },
                )
            })
            .collect()
    } else if all.is_empty() {
        vec![set.item(
            lane,
            Draft {
                title: block.titulo.clone().unwrap_or_else(|| title.clone()),
                body: note.clone(),
                when: block.when.clone(),
                ..Default::default()
            },
        )]
    } else {
        Vec::new()
    };

    let count = items.len().max(1);
    set.push(Phase {
        id: key.to_string(),
        lane,
        title,
        badge: Some(count_badge(count, "paso", "pasos")),
        note,
        items,
    });
}

/// Builds every phase defined for the view, in clinical order: evaluations,
/// imaging, surgery, radiotherapy, chemotherapy stages, support, prophylaxis,
/// immunotherapy, transplant, follow-up. Absent blocks yield no phase.
pub fn build_phases(
    view: &VersionView<'_>,
    ctx: &AnchorContext,
    defaults: &ResolverDefaults,
) -> Vec<Phase> {
    let mut set = PhaseSet::new(ctx);

    evaluations(&mut set, view);
    imaging(&mut set, view);
    surgery(&mut set, view);
    radiotherapy(&mut set, view, defaults);
    chemotherapy(&mut set, view);
    if let Some(block) = view.support() {
        support(&mut set, block);
    }
    let blocks = [
        ("profilaxis", Lane::SupportProphylaxis, view.prophylaxis()),
        ("inmunoterapia", Lane::Immunotherapy, view.immunotherapy()),
        ("trasplante", Lane::Transplant, view.transplant()),
        ("seguimiento", Lane::FollowUp, view.follow_up()),
    ];
    for (key, lane, block) in blocks {
        if let Some(block) = block {
            event_block(&mut set, key, lane, block);
        }
    }

    set.phases
}
