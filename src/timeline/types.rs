use serde::Serialize;

use crate::anchor::WeekSpan;
use crate::checks::ProtocolChecks;
use crate::protocol::{AnchorKind, When};

use super::calendar::CalendarEntry;
use super::labels::slugify;

/// Display track a phase is drawn on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Evaluations,
    Surgery,
    Radiotherapy,
    Chemotherapy,
    Immunotherapy,
    SupportProphylaxis,
    Transplant,
    FollowUp,
}

impl Lane {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Evaluations => "Evaluaciones",
            Self::Surgery => "Cirugía",
            Self::Radiotherapy => "Radioterapia",
            Self::Chemotherapy => "Quimioterapia",
            Self::Immunotherapy => "Inmunoterapia",
            Self::SupportProphylaxis => "Soporte / Profilaxis",
            Self::Transplant => "Trasplante / ASCR",
            Self::FollowUp => "Seguimiento",
        }
    }

    /// Stable identifier derived from the label ("soporte-profilaxis").
    pub fn id(&self) -> String {
        slugify(self.label())
    }
}

/// One positioned event inside a phase.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhaseItem {
    /// Creation order across all phases of one build; tie-breaker for sorting.
    pub order: usize,
    pub lane: Lane,
    pub title: String,
    pub meta: Option<String>,
    pub body: Option<String>,
    pub details: Vec<String>,
    pub when: Option<When>,
    pub anchor: Option<AnchorKind>,
    /// `None` means unscheduled, not week 0.
    pub week: Option<f64>,
    pub span: Option<WeekSpan>,
    pub when_label: Option<String>,
}

/// A group of items for one clinical activity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Phase {
    pub id: String,
    pub lane: Lane,
    pub title: String,
    pub badge: Option<String>,
    pub note: Option<String>,
    pub items: Vec<PhaseItem>,
}

/// A phase item placed in the flattened, week-sorted timeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineEntry {
    pub id: String,
    /// 1-based position in the sorted timeline.
    pub sequence: usize,
    pub phase_id: String,
    pub phase_title: String,
    pub phase_badge: Option<String>,
    pub week_label: String,
    #[serde(flatten)]
    pub item: PhaseItem,
}

/// A drawable block on a lane.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LaneBlock {
    pub id: String,
    pub phase_id: String,
    pub phase_title: String,
    pub phase_badge: Option<String>,
    pub start_week: f64,
    pub end_week: f64,
    /// Packing row within the lane; blocks in one row never overlap.
    pub row: usize,
    pub title: String,
    pub meta: Option<String>,
    pub when_label: Option<String>,
    pub span_label: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LaneTrack {
    pub id: String,
    pub lane: Lane,
    pub label: String,
    pub rows: usize,
    pub blocks: Vec<LaneBlock>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LaneLayout {
    pub lanes: Vec<LaneTrack>,
    pub max_week: f64,
}

/// Everything the presentation layer needs for one (protocol, version, stratum).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProtocolView {
    pub protocol_id: String,
    pub version_id: String,
    pub stratum: String,
    pub phases: Vec<Phase>,
    pub timeline: Vec<TimelineEntry>,
    pub lanes: LaneLayout,
    pub calendar: Vec<CalendarEntry>,
    pub checks: ProtocolChecks,
}
