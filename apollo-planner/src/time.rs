/// `"H:MM"` / `"HH:MM"` to minutes since midnight. Surrounding whitespace is
/// allowed; hours are not range-checked.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().all(|b| b.is_ascii_digit()) || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(hours.parse::<u32>().ok()? * 60 + minutes.parse::<u32>().ok()?)
}

/// Minutes since midnight to `"HH:MM"`, wrapping past midnight.
pub fn format_hhmm(total: u32) -> String {
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}

/// Movie runtime in minutes. Accepts `"2:15"`, `"2h 15m"`, `"2h"`, `"95m"`
/// and anything starting with a plain number of minutes (`"135"`,
/// `"135 min"`).
pub fn parse_duration(value: &str) -> Option<u32> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Some((hours, minutes)) = s.split_once(':') {
        if (1..=2).contains(&hours.len())
            && minutes.len() == 2
            && hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit())
        {
            return Some(hours.parse::<u32>().ok()? * 60 + minutes.parse::<u32>().ok()?);
        }
    }

    let lower = s.to_ascii_lowercase();
    let (hours, rest) = take_unit(&lower, 'h');
    let (minutes, rest) = take_unit(rest.trim_start(), 'm');
    if rest.is_empty() && (hours.is_some() || minutes.is_some()) {
        // Absurd runtimes count as unreadable.
        return hours.unwrap_or(0).checked_mul(60)?.checked_add(minutes.unwrap_or(0));
    }

    leading_number(s)
}

/// Consume `<digits><ws>*<unit>` from the front of `s`.
fn take_unit(s: &str, unit: char) -> (Option<u32>, &str) {
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, s);
    }
    match s[digits..].trim_start().strip_prefix(unit) {
        Some(rest) => (s[..digits].parse().ok(), rest),
        None => (None, s),
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let s = s.strip_prefix('+').unwrap_or(s);
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    s[..digits].parse().ok()
}
