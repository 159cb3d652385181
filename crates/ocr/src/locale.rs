//! Locale-aware parsing of numeric and date substrings.
//!
//! Colombian documents write `1.382.606,70`; international exports of
//! the same banks write `1,382,606.70`. The parsers here never fail:
//! an unparseable or out-of-range value is simply absent.

/// Normalize a matched numeric substring to a canonical decimal string
/// (no thousands separators, `.` as decimal point).
///
/// Disambiguation, in priority order:
/// 1. Both `.` and `,` present: `.` is a thousands separator, `,` the
///    decimal point.
/// 2. Only `,`: decimal point iff at most 2 digits follow the last
///    comma, otherwise thousands.
/// 3. Only `.`: thousands when there are 2+ dots, or a single dot with
///    a 3-digit tail; decimal point otherwise.
/// 4. No separators: integer as-is.
///
/// The normalized integer part must be 0 or in `[100, 100_000_000)`;
/// anything else is rejected as a stray digit run (phone number,
/// timestamp) rather than a currency value.
pub fn parse_amount(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let has_dot = raw.contains('.');
    let has_comma = raw.contains(',');

    let (int_part, decimals) = if has_dot && has_comma {
        let stripped = raw.replace('.', "");
        match stripped.split_once(',') {
            Some((i, d)) => (i.to_string(), d.to_string()),
            None => (stripped, String::new()),
        }
    } else if has_comma {
        let idx = raw.rfind(',').unwrap_or(0);
        let after = &raw[idx + 1..];
        if after.len() <= 2 {
            (raw[..idx].replace(',', ""), after.to_string())
        } else {
            (raw.replace(',', ""), String::new())
        }
    } else if has_dot {
        let dots = raw.matches('.').count();
        let idx = raw.find('.').unwrap_or(0);
        let frac = &raw[idx + 1..];
        if dots >= 2 || frac.len() == 3 {
            (raw.replace('.', ""), String::new())
        } else {
            (raw[..idx].to_string(), frac.to_string())
        }
    } else {
        (raw.to_string(), String::new())
    };

    let numeric: u64 = int_part.parse().ok()?;
    if numeric != 0 && !(100..100_000_000).contains(&numeric) {
        return None;
    }

    if decimals.is_empty() {
        Some(int_part)
    } else {
        Some(format!("{int_part}.{decimals}"))
    }
}

/// Normalize a date substring to `YYYY-MM-DD HH:MM`, zero-padding day
/// and hour. Two shapes are recognized: `D Mon YYYY HH:MM` (English or
/// Spanish month abbreviation) and `YYYY-MM-DD HH:MM`. Anything else
/// passes through unchanged.
pub fn normalize_datetime(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(normalized) = try_abbr_month(trimmed) {
        return normalized;
    }
    if let Some(normalized) = try_iso(trimmed) {
        return normalized;
    }
    trimmed.to_string()
}

fn try_abbr_month(s: &str) -> Option<String> {
    let mut parts = s.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = abbr_month_to_num(parts.next()?.trim_end_matches('.'))?;
    let year: i32 = parts.next()?.parse().ok()?;
    let time = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let (hour, minute) = parse_hhmm(time)?;
    chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    Some(format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}"))
}

fn try_iso(s: &str) -> Option<String> {
    let (date, time) = s.split_once(' ')?;
    let mut ymd = date.split('-');
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;
    if ymd.next().is_some() {
        return None;
    }
    let (hour, minute) = parse_hhmm(time.trim())?;
    chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    Some(format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}"))
}

fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

fn abbr_month_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" | "ene" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" | "abr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" | "ago" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" | "dic" => Some(12),
        _ => None,
    }
}

fn month_num_to_spanish(month: u32) -> Option<&'static str> {
    match month {
        1 => Some("ene"),
        2 => Some("feb"),
        3 => Some("mar"),
        4 => Some("abr"),
        5 => Some("may"),
        6 => Some("jun"),
        7 => Some("jul"),
        8 => Some("ago"),
        9 => Some("sep"),
        10 => Some("oct"),
        11 => Some("nov"),
        12 => Some("dic"),
        _ => None,
    }
}

/// Format a canonical amount for display in the Colombian convention:
/// `1382606.70` → `1.382.606,70`.
pub fn format_display(canonical: &str) -> String {
    let (int_part, decimals) = match canonical.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (canonical, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    match decimals {
        Some(d) => format!("{grouped},{d}"),
        None => grouped,
    }
}

/// Render a canonical `YYYY-MM-DD[ HH:MM]` date as short Spanish text:
/// `2026-02-08` → `8 de feb`. Unrecognized input passes through.
pub fn format_date_spanish(canonical: &str) -> String {
    let (date, time) = match canonical.split_once(' ') {
        Some((d, t)) => (d, Some(t)),
        None => (canonical, None),
    };

    let mut ymd = date.split('-');
    let parsed = (|| {
        let _year: i32 = ymd.next()?.parse().ok()?;
        let month: u32 = ymd.next()?.parse().ok()?;
        let day: u32 = ymd.next()?.parse().ok()?;
        let name = month_num_to_spanish(month)?;
        Some((day, name))
    })();

    match (parsed, time) {
        (Some((day, name)), Some(t)) => format!("{day} de {name} {t}"),
        (Some((day, name)), None) => format!("{day} de {name}"),
        (None, _) => canonical.to_string(),
    }
}
