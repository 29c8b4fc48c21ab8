//! Human-readable byte sizes and ages.

#![allow(clippy::cast_precision_loss)]

use chrono::Duration;

const UNIT: u64 = 1024;
const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Format a byte count with binary units and one decimal place.
///
/// Values below 1 KB print as whole bytes (`"512 B"`); everything else is
/// divided by 1024 until it drops below 1024 in the current unit
/// (`"1.5 MB"`).
pub fn format_size(bytes: u64) -> String {
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Coarse age label used in cleanup listings.
pub fn format_age(age: Duration) -> String {
    let days = age.num_days();
    if days <= 0 {
        let hours = age.num_hours();
        if hours <= 0 {
            return "< 1 hour".to_string();
        }
        return format!("{hours} hour(s)");
    }
    if days < 30 {
        return format!("{days} day(s)");
    }
    let months = days / 30;
    if months < 12 {
        return format!("{months} month(s)");
    }
    format!("{} year(s)", days / 365)
}
