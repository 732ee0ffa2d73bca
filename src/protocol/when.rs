//! When-expressions: the relative-time descriptors attached to clinical events.
//!
//! A document writes timing as a bare week number, a free-text token
//! ("sem 4", "día 21"), an anchored object, or an array of those tried in
//! order. `When` models exactly those four shapes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::lenient::as_number;

/// Named reference point on the treatment timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    TreatmentStart,
    AbsoluteWeek,
    RtStart,
    RtEnd,
    MttoStart,
    MttoCycleIndex,
    InductionCycleIndex,
    InductionCycleSpan,
    TreatmentSpan,
    TreatmentEnd,
    RtSpan,
    /// Anchor name this engine does not know. Resolves to "unscheduled".
    Other(String),
}

impl AnchorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::TreatmentStart => "treatment_start",
            Self::AbsoluteWeek => "absolute_week",
            Self::RtStart => "rt_start",
            Self::RtEnd => "rt_end",
            Self::MttoStart => "mtto_start",
            Self::MttoCycleIndex => "mtto_cycle_index",
            Self::InductionCycleIndex => "induction_cycle_index",
            Self::InductionCycleSpan => "induction_cycle_span",
            Self::TreatmentSpan => "treatment_span",
            Self::TreatmentEnd => "treatment_end",
            Self::RtSpan => "rt_span",
            Self::Other(name) => name,
        }
    }

    /// The point anchor a `*_span` anchor starts from (`rt_span` → `rt`, which
    /// is unknown; `treatment_span` → `treatment`, likewise). Non-span anchors
    /// return themselves.
    pub fn without_span_suffix(&self) -> AnchorKind {
        match self.as_str().strip_suffix("_span") {
            Some(base) => AnchorKind::from(base),
            None => self.clone(),
        }
    }
}

impl From<&str> for AnchorKind {
    fn from(name: &str) -> Self {
        match name {
            "treatment_start" => Self::TreatmentStart,
            "absolute_week" => Self::AbsoluteWeek,
            "rt_start" => Self::RtStart,
            "rt_end" => Self::RtEnd,
            "mtto_start" => Self::MttoStart,
            "mtto_cycle_index" => Self::MttoCycleIndex,
            "induction_cycle_index" => Self::InductionCycleIndex,
            "induction_cycle_span" => Self::InductionCycleSpan,
            "treatment_span" => Self::TreatmentSpan,
            "treatment_end" => Self::TreatmentEnd,
            "rt_span" => Self::RtSpan,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AnchorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Object form of a when-expression. Every field is optional; numeric
/// fields accept numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnchorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_weeks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_weeks: Option<f64>,
}

impl AnchorSpec {
    pub fn new(anchor: AnchorKind) -> Self {
        Self {
            anchor: Some(anchor),
            ..Default::default()
        }
    }

    pub fn with_cycle_index(mut self, index: usize) -> Self {
        self.cycle_index = Some(index as f64);
        self
    }

    pub fn with_span(mut self, weeks: f64) -> Self {
        self.span_weeks = Some(weeks);
        self
    }

    /// `offset_weeks`, treating absent as zero.
    pub fn offset(&self) -> f64 {
        self.offset_weeks.unwrap_or(0.0)
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let num = |key: &str| map.get(key).and_then(as_number);
        Self {
            anchor: map
                .get("anchor")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(AnchorKind::from),
            offset_weeks: num("offset_weeks"),
            week: num("week"),
            cycle_index: num("cycle_index"),
            start_index: num("start_index"),
            end_index: num("end_index"),
            span_weeks: num("span_weeks"),
        }
    }
}

/// A relative-time descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum When {
    /// Absolute week.
    Week(f64),
    /// Free text carrying a week or day token.
    Text(String),
    Anchored(AnchorSpec),
    /// Fallback chain: first resolvable element wins.
    Chain(Vec<When>),
}

impl When {
    /// Reads any JSON value. `null`, booleans and empty strings are "no timing".
    pub fn from_value(value: &Value) -> Option<When> {
        match value {
            Value::Null | Value::Bool(_) => None,
            Value::Number(n) => n.as_f64().map(When::Week),
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(When::Text(s.clone())),
            Value::Array(items) => Some(When::Chain(
                items.iter().filter_map(When::from_value).collect(),
            )),
            Value::Object(map) => Some(When::Anchored(AnchorSpec::from_map(map))),
        }
    }

    pub fn anchored(spec: AnchorSpec) -> Self {
        When::Anchored(spec)
    }

    /// Anchor of an object expression; chains and scalars have none.
    pub fn anchor(&self) -> Option<&AnchorKind> {
        match self {
            When::Anchored(spec) => spec.anchor.as_ref(),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for When {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        When::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("when-expression carries no timing"))
    }
}
