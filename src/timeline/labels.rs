//! Display labels carried on items (Spanish, as in the protocol documents).

use std::sync::LazyLock;

use regex::Regex;

use crate::anchor::WeekSpan;
use crate::protocol::{AnchorKind, When};

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// "post_rt-control" → "Post Rt Control".
pub fn title_case(text: &str) -> String {
    text.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' => 'a',
        'é' | 'è' | 'ë' => 'e',
        'í' | 'ì' | 'ï' => 'i',
        'ó' | 'ò' | 'ö' => 'o',
        'ú' | 'ù' | 'ü' => 'u',
        'ñ' => 'n',
        other => other,
    }
}

/// Lowercase ASCII slug: "Trasplante / ASCR" → "trasplante-ascr".
pub fn slugify(text: &str) -> String {
    let folded: String = text.to_lowercase().chars().map(fold_accent).collect();
    NON_SLUG
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Integer weeks print bare, others with one decimal.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}

/// "Semana 4"; unscheduled items read "Secuencia clínica".
pub fn format_week(week: Option<f64>) -> String {
    match week {
        None => "Secuencia clínica".to_string(),
        Some(w) if w <= 0.1 => "Semana 0".to_string(),
        Some(w) => format!("Semana {}", format_number(w)),
    }
}

/// "Semanas 4 – 10".
pub fn format_span(span: &WeekSpan) -> String {
    format!(
        "Semanas {} – {}",
        format_number(span.start_week),
        format_number(span.end_week)
    )
}

pub fn anchor_label(anchor: &AnchorKind) -> Option<&'static str> {
    match anchor {
        AnchorKind::TreatmentStart => Some("Inicio de tratamiento"),
        AnchorKind::RtStart => Some("Inicio radioterapia"),
        AnchorKind::RtEnd => Some("Fin radioterapia"),
        AnchorKind::MttoStart => Some("Inicio mantenimiento"),
        AnchorKind::TreatmentEnd => Some("Fin de tratamiento"),
        AnchorKind::AbsoluteWeek => Some("Semana específica"),
        AnchorKind::MttoCycleIndex => Some("Ciclo de mantenimiento"),
        AnchorKind::InductionCycleIndex => Some("Ciclo de inducción"),
        _ => None,
    }
}

pub fn span_label(anchor: &AnchorKind) -> Option<&'static str> {
    match anchor {
        AnchorKind::InductionCycleSpan => Some("Ciclos de inducción"),
        AnchorKind::TreatmentSpan => Some("Plan terapéutico completo"),
        AnchorKind::RtSpan => Some("Ventana de radioterapia"),
        _ => None,
    }
}

fn offset_suffix(offset: Option<f64>) -> String {
    match offset {
        Some(o) if o > 0.0 => format!(" + {} sem", format_number(o)),
        Some(o) if o < 0.0 => format!(" - {} sem", format_number(-o)),
        _ => String::new(),
    }
}

/// Human description of an item's timing.
pub fn when_label(when: Option<&When>, week: Option<f64>, span: Option<&WeekSpan>) -> Option<String> {
    if span.is_some() {
        let label = when.and_then(When::anchor).map(|anchor| {
            let base = anchor.without_span_suffix();
            span_label(anchor)
                .or_else(|| anchor_label(&base))
                .map(str::to_string)
                .unwrap_or_else(|| title_case(base.as_str()))
        });
        return Some(label.unwrap_or_else(|| format_week(week)));
    }
    match when {
        None => week.map(|w| format_week(Some(w))),
        Some(When::Text(text)) => Some(text.clone()),
        Some(When::Week(w)) => Some(format_week(Some(*w))),
        Some(When::Chain(items)) => items.first().and_then(|first| when_label(Some(first), week, None)),
        Some(When::Anchored(spec)) => {
            if let Some(w) = spec.week {
                return Some(format!("Semana {}", format_number(w)));
            }
            let anchor = spec.anchor.as_ref()?;
            let name = anchor_label(anchor)
                .map(str::to_string)
                .unwrap_or_else(|| title_case(anchor.as_str()));
            Some(format!("{name}{}", offset_suffix(spec.offset_weeks)))
        }
    }
}

/// "3 bloques", "1 bloque".
pub fn count_badge(count: usize, singular: &str, plural: &str) -> String {
    format!("{count} {}", if count == 1 { singular } else { plural })
}
