use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Group the integer part of a non-negative number with commas.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Format an amount in baht: `฿1,234.5`. At most two decimals, trailing
/// zeros dropped.
pub fn format_baht(amount: f64) -> String {
    if !amount.is_finite() {
        return "฿0".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}฿{}", sign, group_thousands(int_part))
    } else {
        format!("{}฿{}.{}", sign, group_thousands(int_part), frac)
    }
}

/// One decimal place, as shown next to review stars.
pub fn format_rating(rating: f64) -> String {
    format!("{:.1}", rating)
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

/// Thai month abbreviations, January first.
const THAI_MONTHS: [&str; 12] = [
    "ม.ค.", "ก.พ.", "มี.ค.", "เม.ย.", "พ.ค.", "มิ.ย.", "ก.ค.", "ส.ค.", "ก.ย.", "ต.ค.", "พ.ย.", "ธ.ค.",
];

/// Years are displayed in the Buddhist era.
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Format a backend timestamp the way Thai customers read dates:
/// `05 มี.ค. 2569 14:07 น.`, or `05 มี.ค. 2569` for a bare date.
/// Unparseable input is returned unchanged.
pub fn format_date(date: &str) -> String {
    let date = date.trim();
    let timestamp = DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S"));

    match timestamp {
        Ok(dt) => format!(
            "{} {:02}:{:02} น.",
            thai_day(dt.date()),
            dt.hour(),
            dt.minute()
        ),
        Err(_) => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(day) => thai_day(day),
            Err(_) => date.to_string(),
        },
    }
}

fn thai_day(day: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        day.day(),
        THAI_MONTHS[day.month0() as usize],
        day.year() + BUDDHIST_ERA_OFFSET
    )
}

/// How long before `now` something happened, rounded to the nearest
/// minute, hour or day. Times in the future read as "just now".
pub fn age_display(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - at).num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        1..=59 => format!("{}m ago", minutes),
        60..=1439 => format!("{}h ago", (minutes + 30) / 60),
        _ => format!("{}d ago", (minutes + 720) / 1440),
    }
}
