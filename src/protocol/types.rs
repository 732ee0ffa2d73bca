//! Typed protocol document.
//!
//! Every phase block gets its own struct so the builders never probe raw JSON.
//! Fields are read through [`super::lenient`]: a value of the wrong type is
//! "absent", list members that are not objects are dropped. Deserializing a
//! JSON object into these types cannot fail.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::lenient;
use super::when::When;

// ═══════════════════════════════════════════════════════════
// Root
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Protocol {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub area: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub grupo: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub versiones: Vec<Version>,
    /// Legacy documents put phase blocks directly on the root.
    #[serde(flatten)]
    pub blocks: PhaseBlocks,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Version {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::opt_list")]
    pub estratificacion: Option<Vec<Stratum>>,
    #[serde(flatten)]
    pub blocks: PhaseBlocks,
}

/// Risk arm.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Stratum {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient::truthy")]
    pub default: bool,
}

/// The phase blocks a Version (or a legacy root) may carry. `None` means the
/// phase is not defined here; the view then falls back to the base version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhaseBlocks {
    #[serde(deserialize_with = "lenient::opt_list")]
    pub evaluacion: Option<Vec<Evaluation>>,
    #[serde(deserialize_with = "lenient::object")]
    pub cirugia: Option<Surgery>,
    #[serde(deserialize_with = "lenient::object")]
    pub radioterapia: Option<Radiotherapy>,
    #[serde(deserialize_with = "lenient::object")]
    pub quimioterapia: Option<Chemotherapy>,
    /// Legacy maintenance plan kept outside `quimioterapia`.
    #[serde(deserialize_with = "lenient::object")]
    pub mantenimiento: Option<CyclePlan>,
    #[serde(deserialize_with = "lenient::object")]
    pub inmunoterapia: Option<EventBlock>,
    #[serde(deserialize_with = "lenient::object")]
    pub trasplante: Option<EventBlock>,
    #[serde(deserialize_with = "lenient::object")]
    pub profilaxis: Option<EventBlock>,
    #[serde(deserialize_with = "lenient::object")]
    pub soporte: Option<Support>,
    #[serde(deserialize_with = "lenient::object")]
    pub seguimiento: Option<EventBlock>,
    #[serde(deserialize_with = "lenient::object")]
    pub investigaciones: Option<Investigations>,
}

/// Stratum tags any list item may carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrataTags {
    #[serde(deserialize_with = "lenient::strings")]
    pub only_strats: Vec<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub estratos: Vec<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub strats: Vec<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub exclude_strats: Vec<String>,
}

// ═══════════════════════════════════════════════════════════
// Evaluation / surgery
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Evaluation {
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub momento: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub objetivo: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(flatten)]
    pub strata: StrataTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Surgery {
    #[serde(deserialize_with = "lenient::text")]
    pub tipo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub procedimiento: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub notas: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub objetivo: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
}

// ═══════════════════════════════════════════════════════════
// Radiotherapy
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Radiotherapy {
    #[serde(deserialize_with = "lenient::list")]
    pub opciones: Vec<RtOption>,
    #[serde(rename = "LR", deserialize_with = "lenient::object")]
    pub lr: Option<RtBranch>,
    #[serde(rename = "SR", deserialize_with = "lenient::object")]
    pub sr: Option<RtBranch>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
}

/// One RT scenario, usually keyed by the stratum it serves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RtOption {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(deserialize_with = "lenient::number")]
    pub duracion_semanas: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub duracion: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub nota: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dosis: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dosis_total: Option<String>,
}

/// Legacy `radioterapia.LR` / `radioterapia.SR` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RtBranch {
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    /// Week range such as "4-10".
    #[serde(deserialize_with = "lenient::text")]
    pub semanas: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub duracion_semanas: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub nota: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dosis: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dosis_total: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub rama: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Chemotherapy
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Chemotherapy {
    #[serde(deserialize_with = "lenient::list")]
    pub induccion: Vec<ChemoCycle>,
    #[serde(deserialize_with = "lenient::one_or_many")]
    pub consolidacion: Vec<ChemoCycle>,
    #[serde(deserialize_with = "lenient::list")]
    pub reinduccion: Vec<ChemoCycle>,
    #[serde(deserialize_with = "lenient::list")]
    pub intensificacion: Vec<ChemoCycle>,
    pub mantenimiento: Option<MaintenanceBlock>,
    #[serde(deserialize_with = "lenient::number")]
    pub induccion_intervalo_semanas: Option<f64>,
    /// Maintenance start, relative to another anchor.
    #[serde(deserialize_with = "lenient::when")]
    pub inicio_relativo: Option<When>,
    /// Per-arm maintenance plans, in document order.
    #[serde(deserialize_with = "lenient::keyed")]
    pub planes: Vec<(String, CyclePlan)>,
    #[serde(rename = "LR", deserialize_with = "lenient::object")]
    pub lr: Option<CyclePlan>,
    #[serde(rename = "SR", deserialize_with = "lenient::object")]
    pub sr: Option<CyclePlan>,
    #[serde(deserialize_with = "lenient::numbers")]
    pub duraciones: BTreeMap<String, f64>,
    #[serde(deserialize_with = "lenient::keyed")]
    pub ciclos: Vec<(String, CycleDef)>,
}

impl Chemotherapy {
    /// The maintenance block when it is a plan rather than a list of cycles.
    pub fn maintenance_plan(&self) -> Option<&CyclePlan> {
        match &self.mantenimiento {
            Some(MaintenanceBlock::Plan(plan)) => Some(plan),
            _ => None,
        }
    }

    /// Explicit maintenance cycles, when the block is a list.
    pub fn maintenance_cycles(&self) -> &[ChemoCycle] {
        match &self.mantenimiento {
            Some(MaintenanceBlock::Cycles(cycles)) => cycles,
            _ => &[],
        }
    }
}

/// `quimioterapia.mantenimiento` is either a list of cycles or a plan object.
#[derive(Debug, Clone)]
pub enum MaintenanceBlock {
    Cycles(Vec<ChemoCycle>),
    Plan(CyclePlan),
}

impl<'de> Deserialize<'de> for MaintenanceBlock {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        Ok(match &value {
            serde_json::Value::Array(items) => Self::Cycles(lenient::objects_of(items)),
            serde_json::Value::Object(_) => {
                Self::Plan(serde_json::from_value(value).unwrap_or_default())
            }
            _ => Self::Cycles(Vec::new()),
        })
    }
}

/// A chemotherapy cycle listed explicitly (induction, consolidation, ...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChemoCycle {
    #[serde(deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub tipo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub detalle: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(deserialize_with = "lenient::list")]
    pub drogas: Vec<Drug>,
    #[serde(deserialize_with = "lenient::text")]
    pub cond: Option<String>,
    #[serde(flatten)]
    pub strata: StrataTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Drug {
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub dosis: Option<String>,
    /// Day numbers; `None` when the field is not a list.
    #[serde(deserialize_with = "lenient::opt_strings")]
    pub dias: Option<Vec<String>>,
}

/// Maintenance schedule: cycle symbols in order plus their durations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CyclePlan {
    /// `None` when the document has no `orden` array here.
    #[serde(deserialize_with = "lenient::opt_strings")]
    pub orden: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::numbers")]
    pub duraciones: BTreeMap<String, f64>,
    #[serde(deserialize_with = "lenient::keyed")]
    pub ciclos: Vec<(String, CycleDef)>,
}

/// Definition of one maintenance cycle symbol.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleDef {
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::opt_strings")]
    pub farmacos: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::opt_strings")]
    pub drogas: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::strings")]
    pub toxicidades: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub resumen: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub detalle: Option<String>,
}

impl CycleDef {
    /// `farmacos`, or `drogas` when `farmacos` is not a list.
    pub fn drugs(&self) -> &[String] {
        self.farmacos
            .as_deref()
            .or(self.drogas.as_deref())
            .unwrap_or(&[])
    }
}

// ═══════════════════════════════════════════════════════════
// Support, event blocks, investigations
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Support {
    #[serde(deserialize_with = "lenient::list")]
    pub medidas: Vec<SupportMeasure>,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<SupportMeasure>,
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub objetivo: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SupportMeasure {
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub articulacion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub tipo: Option<String>,
    /// Free-text timing shown instead of a computed label.
    #[serde(deserialize_with = "lenient::text")]
    pub cuando: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(flatten)]
    pub strata: StrataTags,
}

/// Immunotherapy, transplant, prophylaxis and follow-up share one shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventBlock {
    #[serde(deserialize_with = "lenient::list")]
    pub eventos: Vec<BlockEvent>,
    #[serde(deserialize_with = "lenient::list")]
    pub ciclos: Vec<BlockEvent>,
    #[serde(deserialize_with = "lenient::list")]
    pub fases: Vec<BlockEvent>,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<BlockEvent>,
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub objetivo: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
}

impl EventBlock {
    /// The first non-empty event list among `eventos`, `ciclos`, `fases`, `items`.
    pub fn events(&self) -> &[BlockEvent] {
        [&self.eventos, &self.ciclos, &self.fases, &self.items]
            .into_iter()
            .find(|list| !list.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockEvent {
    #[serde(deserialize_with = "lenient::text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub titulo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub nombre: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub descripcion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub detalle: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(deserialize_with = "lenient::strings")]
    pub componentes: Vec<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub tratamientos: Vec<String>,
    /// Conditional administration note.
    #[serde(deserialize_with = "lenient::text")]
    pub cond: Option<String>,
    #[serde(flatten)]
    pub strata: StrataTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Investigations {
    #[serde(deserialize_with = "lenient::truthy")]
    pub audiometria: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub gfr_thresholds: bool,
    #[serde(deserialize_with = "lenient::strings")]
    pub antes_de_cada_curso: Vec<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub imagen: Option<Imaging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Imaging {
    #[serde(deserialize_with = "lenient::list")]
    pub eventos: Vec<ImagingEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagingEvent {
    #[serde(deserialize_with = "lenient::text")]
    pub momento: Option<String>,
    #[serde(deserialize_with = "lenient::when")]
    pub when: Option<When>,
    #[serde(deserialize_with = "lenient::list")]
    pub pruebas: Vec<ImagingTest>,
    #[serde(flatten)]
    pub strata: StrataTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagingTest {
    #[serde(deserialize_with = "lenient::text")]
    pub tipo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub subtipo: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub nota: Option<String>,
}

impl ImagingTest {
    /// `tipo · subtipo · region — nota`, skipping absent parts.
    pub fn describe(&self) -> String {
        let head = [&self.tipo, &self.subtipo, &self.region]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" · ");
        match &self.nota {
            Some(nota) => format!("{head} — {nota}"),
            None => head,
        }
    }
}
