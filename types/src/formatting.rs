//! Countdown display formatting.
//!
//! Shared by the overlay and the control CLI so both surfaces render the
//! same digits for the same state.

/// Remaining time at or below which the overlay switches to its warning style.
pub const WARNING_THRESHOLD_SECS: u64 = 300;

/// Format a countdown as `HH:MM:SS`. Hours are not capped at 99.
///
/// # Examples
/// ```
/// use subathon_types::formatting::format_clock;
/// assert_eq!(format_clock(0), "00:00:00");
/// assert_eq!(format_clock(3_725), "01:02:05");
/// assert_eq!(format_clock(360_000), "100:00:00");
/// ```
pub fn format_clock(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format an amount of added time for "+time" labels.
///
/// - Under an hour: `M:SS`
/// - An hour or more: `H:MM:SS`
///
/// # Examples
/// ```
/// use subathon_types::formatting::format_added;
/// assert_eq!(format_added(60), "1:00");
/// assert_eq!(format_added(3_725), "1:02:05");
/// ```
pub fn format_added(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Whether the countdown is low enough to warn viewers. An expired clock is not a warning.
#[inline]
pub fn is_warning(remaining_secs: u64) -> bool {
    remaining_secs > 0 && remaining_secs <= WARNING_THRESHOLD_SECS
}

/// Group digits with `,` (or `.` for European formatting).
///
/// # Examples
/// ```
/// use subathon_types::formatting::format_count;
/// assert_eq!(format_count(950, false), "950");
/// assert_eq!(format_count(12_500, false), "12,500");
/// assert_eq!(format_count(12_500, true), "12.500");
/// ```
pub fn format_count(n: u64, european: bool) -> String {
    let sep = if european { '.' } else { ',' };
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}
