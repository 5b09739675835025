use colored::*;
use std::path::Path;

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Binary sizes: whole bytes, one decimal for KB, two above that
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    let precision = if unit == 0 { 1 } else { 2 };
    format!("{:.*} {}", precision, value, UNITS[unit])
}

/// Red past a gigabyte, yellow past 100 MB
pub fn format_size_colored(bytes: u64) -> ColoredString {
    let text = format_size(bytes);
    match bytes {
        b if b >= 1 << 30 => text.red().bold(),
        b if b >= 100 << 20 => text.yellow(),
        _ => text.white(),
    }
}

pub fn format_count(count: usize) -> String {
    let noun = if count == 1 { "item" } else { "items" };
    format!("{} {}", count, noun)
}

/// Show paths under the home directory as `~/...`
pub fn format_path(path: &Path) -> String {
    let relative = dirs::home_dir().and_then(|home| {
        path.strip_prefix(&home)
            .ok()
            .map(|rest| rest.to_path_buf())
    });
    match relative {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

/// Cut to at most `max_len` characters, ending in `...` when shortened
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.char_indices().nth(max_len).is_none() {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }
    let cut = s
        .char_indices()
        .nth(max_len - 3)
        .map_or(s.len(), |(index, _)| index);
    format!("{}...", &s[..cut])
}
