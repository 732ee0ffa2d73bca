//! Week tokens embedded in free text.

use std::sync::LazyLock;

use regex::Regex;

static WEEK_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sem(?:\.|ana)?\s*(\d+)").unwrap());

static WEEK_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*[–-]\s*(\d+)").unwrap());

static DAY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)d[ií]as?\s*(\d+)").unwrap());

/// Inclusive week range written as "4-10" or "4–10".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekRange {
    pub start: f64,
    pub end: f64,
}

impl WeekRange {
    /// Length in weeks, never negative.
    pub fn span(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

fn capture_number(caps: &regex::Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse::<f64>().ok()
}

pub fn parse_week_range(text: &str) -> Option<WeekRange> {
    let caps = WEEK_RANGE.captures(text)?;
    Some(WeekRange {
        start: capture_number(&caps, 1)?,
        end: capture_number(&caps, 2)?,
    })
}

/// Extracts a week from text, trying in order: a week token ("sem 4",
/// "semana 4", "Sem. 4"), a range ("4-6", start wins), a day count
/// ("día 21", in weeks).
pub fn parse_week(text: &str) -> Option<f64> {
    if let Some(caps) = WEEK_TOKEN.captures(text) {
        return capture_number(&caps, 1);
    }
    if let Some(range) = parse_week_range(text) {
        return Some(range.start);
    }
    let caps = DAY_TOKEN.captures(text)?;
    capture_number(&caps, 1).map(|days| days / 7.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_tokens() {
        assert_eq!(parse_week("sem 4"), Some(4.0));
        assert_eq!(parse_week("Semana 12 post-RT"), Some(12.0));
        assert_eq!(parse_week("SEM.3"), Some(3.0));
    }

    #[test]
    fn test_range_takes_start() {
        assert_eq!(parse_week("4-6"), Some(4.0));
        assert_eq!(parse_week("semanas 10 – 16"), Some(10.0));
    }

    #[test]
    fn test_day_count_in_weeks() {
        assert_eq!(parse_week("día 21"), Some(3.0));
        assert_eq!(parse_week("Dias 7"), Some(1.0));
        let half = parse_week("dia 3").unwrap();
        assert!((half - 3.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_week_token_wins_over_range() {
        assert_eq!(parse_week("sem 8 (días 1-5)"), Some(8.0));
    }

    #[test]
    fn test_unparseable_text() {
        assert_eq!(parse_week("al diagnóstico"), None);
        assert_eq!(parse_week(""), None);
    }

    #[test]
    fn test_range_span() {
        let range = parse_week_range("4-10").unwrap();
        assert_eq!(range.span(), 6.0);
        assert_eq!(parse_week_range("10-4").unwrap().span(), 0.0);
        assert!(parse_week_range("sin rango").is_none());
    }
}
