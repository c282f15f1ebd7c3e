use std::collections::HashSet;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.+\-]").unwrap());

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const TIME_SUFFIXES: [&str; 2] = [" %H:%M:%S", " %H:%M"];

/// Replaces anything outside `[A-Za-z0-9_]` with `_`. A key that is already
/// taken gets `_2`, `_3`, ... appended.
pub fn sanitize_key(name: &str, existing_keys: &mut HashSet<String>) -> String {
    let base_key = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>();

    let mut key = base_key.clone();
    let mut counter = 2;
    while !existing_keys.insert(key.clone()) {
        key = format!("{}_{}", base_key, counter);
        counter += 1;
    }

    key
}

/// Drops everything except digits, sign and decimal point, then parses.
pub fn parse_loose_number(raw: &str) -> Option<f64> {
    let stripped = NON_NUMERIC.replace_all(raw, "");
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `$` and `,` are ignored; NaN is not a number. The only spelled-out value
/// accepted is `Infinity`, case-sensitive, so `inf` and `nan` are rejected.
pub fn parse_plain_number(raw: &str) -> Option<f64> {
    let stripped: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Some(0.0);
    }

    let unsigned = stripped.trim_start_matches(['+', '-']);
    if unsigned.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return match stripped {
            "Infinity" | "+Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        };
    }
    stripped.parse::<f64>().ok().filter(|n| !n.is_nan())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    for format in DATE_FORMATS.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
        for suffix in TIME_SUFFIXES.iter() {
            let with_time = format!("{}{}", format, suffix);
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, &with_time) {
                return Some(dt.date());
            }
        }
    }
    None
}

pub fn is_date_string(s: &str) -> bool {
    parse_date(s).is_some()
}

/// en-US dollar formatting with thousands separators, rounding half away
/// from zero.
pub fn format_currency(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value.abs() * scale).round() / scale;
    let text = format!("{:.*}", decimals, rounded);
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && rounded != 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}${}.{}", sign, grouped, frac),
        None => format!("{}${}", sign, grouped),
    }
}
