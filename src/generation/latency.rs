//! Simulated latency from the `X-Mock-Latency` header.

use std::time::Duration;
use tracing::warn;

/// Parse `PT` + the upper-cased value as an ISO-8601 time duration
/// (`5S`, `1M30S`, `2H`, `0.25S`). Returns `None` and logs on bad input.
pub fn parse_latency(value: &str) -> Option<Duration> {
    let text = format!("PT{}", value.trim().to_uppercase());
    match parse_iso_time(&text) {
        Some(duration) => Some(duration),
        None => {
            warn!(value, "Ignoring invalid latency header");
            None
        }
    }
}

fn parse_iso_time(text: &str) -> Option<Duration> {
    let mut rest = text.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut total = 0f64;
    let mut last_unit = 0u8;
    while !rest.is_empty() {
        let split = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
        let (number, tail) = rest.split_at(split);
        if number.is_empty() {
            return None;
        }
        let mut chars = tail.chars();
        let unit = chars.next()?;
        rest = chars.as_str();

        // units must appear once each, in H, M, S order
        let (rank, seconds) = match unit {
            'H' => (1, 3600.0),
            'M' => (2, 60.0),
            'S' => (3, 1.0),
            _ => return None,
        };
        if rank <= last_unit || (number.contains('.') && unit != 'S') {
            return None;
        }
        last_unit = rank;
        total += number.parse::<f64>().ok()? * seconds;
    }

    if total.is_finite() {
        Duration::try_from_secs_f64(total).ok()
    } else {
        None
    }
}
