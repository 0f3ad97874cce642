//! Human-friendly durations: `90`, `90s`, `15m`, `2h`, `1h30m`, `500ms`.

use std::time::Duration;

/// Parse a duration. A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return non_zero(input, Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration '{input}': expected a number before '{rest}'"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration '{input}': number too large"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "s" => Some(Duration::from_secs(value)),
            "ms" => Some(Duration::from_millis(value)),
            "" => return Err(format!("invalid duration '{input}': missing unit after {value}")),
            other => return Err(format!("invalid duration '{input}': unknown unit '{other}'")),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("invalid duration '{input}': too large"))?;
    }

    non_zero(input, total)
}

fn non_zero(input: &str, duration: Duration) -> Result<Duration, String> {
    if duration.is_zero() {
        Err(format!("invalid duration '{input}': must be greater than zero"))
    } else {
        Ok(duration)
    }
}

/// Inverse of [`parse_duration`], used when writing the config file
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.subsec_millis();
    let secs = duration.as_secs();
    if secs == 0 {
        return format!("{millis}ms");
    }

    let mut out = String::new();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_seconds() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration(" 5 "), Ok(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("15m"), Ok(Duration::from_secs(900)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("1s500ms"), Ok(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("1h30").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("m5").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_format_is_parseable() {
        for secs in [1, 59, 60, 90, 3600, 5400, 86_399] {
            let d = Duration::from_secs(secs);
            assert_eq!(parse_duration(&format_duration(d)), Ok(d));
        }
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }
}
