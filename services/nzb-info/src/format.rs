//! Text helpers shared by the adapters and the presentation mapper

use chrono::{DateTime, NaiveDate};

const PATH_PREFIXES: [&str; 12] = [
    "/tvshows/",
    "/movies/",
    "/downloads/",
    "/media/",
    "\\tvshows\\",
    "\\movies\\",
    "\\downloads\\",
    "\\media\\",
    "C:\\",
    "D:\\",
    "/home/",
    "/mnt/",
];

/// Reduce a full path to its file name
pub fn clean_file_path(path: &str) -> String {
    if path.is_empty() {
        return "Unknown".to_string();
    }

    let stripped = PATH_PREFIXES
        .iter()
        .find(|prefix| {
            path.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
        .map(|prefix| &path[prefix.len()..])
        .unwrap_or(path);

    stripped
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(stripped)
        .to_string()
}

/// Truncate to `max_len` characters, keeping a short extension visible
pub fn smart_truncate(text: &str, max_len: usize) -> String {
    let len = text.chars().count();
    if len <= max_len {
        return text.to_string();
    }

    if let Some((name, ext)) = text.rsplit_once('.') {
        let ext_len = ext.chars().count();
        if ext_len <= 4 {
            let available = max_len.saturating_sub(ext_len + 4);
            if available > 10 {
                let head: String = name.chars().take(available).collect();
                return format!("{}...{}", head, ext);
            }
        }
    }

    let head: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Format up to two recent items as a single row
pub fn format_recent_files(files: &[String]) -> String {
    if files.is_empty() {
        return "No recent activity".to_string();
    }

    let recent: Vec<String> = files
        .iter()
        .take(2)
        .map(|f| smart_truncate(&clean_file_path(f), 30))
        .collect();

    format!("Recent: {}", recent.join(" | "))
}

/// Render a duration in minutes as `<1m`, `42m` or `3h05m`
pub fn format_eta_minutes(minutes: f64) -> String {
    if minutes < 1.0 {
        "<1m".to_string()
    } else if minutes < 60.0 {
        format!("{:.0}m", minutes)
    } else {
        let hours = (minutes / 60.0).floor() as u64;
        let rest = (minutes % 60.0).floor() as u64;
        format!("{}h{:02}m", hours, rest)
    }
}

/// Parse `"1.5 GB"` or `"2.1 MB/s"` into megabytes
fn parse_megabytes(value: &str) -> Option<f64> {
    let mut parts = value.split_whitespace();
    let number: f64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.to_uppercase();
    if parts.next().is_some() {
        return None;
    }
    let unit = unit.trim_end_matches("/S");

    let mb = if unit.starts_with("GB") || unit == "G" {
        number * 1024.0
    } else if unit.starts_with("KB") || unit == "K" {
        number / 1024.0
    } else if unit.starts_with("MB") || unit == "M" {
        number
    } else if unit == "B" {
        number / 1024.0 / 1024.0
    } else {
        return None;
    };
    Some(mb)
}

/// Estimate remaining time from a size and a transfer speed string
pub fn eta_from_strings(size_left: &str, speed: &str) -> Option<String> {
    let size_mb = parse_megabytes(size_left)?;
    let speed_mb = parse_megabytes(speed)?;
    if size_mb <= 0.0 || speed_mb <= 0.0 {
        return None;
    }
    Some(format_eta_minutes(size_mb / speed_mb / 60.0))
}

/// Label a release date relative to `today`
pub fn format_upcoming_date(date: &str, today: NaiveDate) -> String {
    let parsed = if date.contains('T') {
        DateTime::parse_from_rfc3339(date)
            .map(|dt| dt.date_naive())
            .ok()
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    };

    let Some(day) = parsed else {
        return "Unknown".to_string();
    };

    let days = (day - today).num_days();
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2..=6 => format!("{}d", days),
        _ => day.format("%b %d").to_string(),
    }
}
