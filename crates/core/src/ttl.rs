//! Time-to-live parsing.
//!
//! A TTL is written as a sequence of decimal numbers, each with an optional
//! fraction and a mandatory unit suffix, such as `"300ms"`, `"1.5h"` or
//! `"2h45m"`. Valid units are `ns`, `us` (or `µs`/`μs`), `ms`, `s`, `m` and
//! `h`. The bare string `"0"` is accepted without a unit.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ValidationError;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// Largest representable duration, in nanoseconds.
const MAX_NANOS: u64 = i64::MAX as u64;

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn invalid(input: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidTtl {
        input: input.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Consume leading ASCII digits as an integer. Returns `None` on overflow.
fn leading_int(s: &str) -> Option<(u64, &str)> {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    for b in s[..end].bytes() {
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        if value > MAX_NANOS {
            return None;
        }
    }
    Some((value, &s[end..]))
}

/// Consume leading ASCII digits as a fraction, returning the digits and their
/// scale. Digits past the point of overflow are consumed but ignored.
fn leading_fraction(s: &str) -> (u64, f64, &str) {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    let mut value: u64 = 0;
    let mut scale = 1.0_f64;
    let mut overflow = false;
    for b in s[..end].bytes() {
        if overflow {
            continue;
        }
        match value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
        {
            Some(v) if v <= MAX_NANOS => {
                value = v;
                scale *= 10.0;
            }
            _ => overflow = true,
        }
    }
    (value, scale, &s[end..])
}

/// Parse a TTL string into a [`Duration`].
///
/// Negative durations and durations that overflow 64-bit nanoseconds are
/// rejected.
pub fn parse_duration(input: &str) -> Result<Duration, ValidationError> {
    let mut s = input;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid(input, "empty duration"));
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        if !s.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid(input, "expected a number"));
        }

        let before = s.len();
        let (whole, rest) = leading_int(s).ok_or_else(|| invalid(input, "duration overflows"))?;
        let has_whole = rest.len() != before;
        s = rest;

        let mut fraction = 0_u64;
        let mut scale = 1.0_f64;
        let mut has_fraction = false;
        if let Some(rest) = s.strip_prefix('.') {
            let before = rest.len();
            let (f, sc, rest) = leading_fraction(rest);
            has_fraction = rest.len() != before;
            fraction = f;
            scale = sc;
            s = rest;
        }
        if !has_whole && !has_fraction {
            return Err(invalid(input, "expected a number"));
        }

        let unit_len = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_len == 0 {
            return Err(invalid(input, "missing unit"));
        }
        let unit = &s[..unit_len];
        s = &s[unit_len..];
        let nanos = unit_nanos(unit).ok_or_else(|| invalid(input, "unknown unit"))?;

        if whole > MAX_NANOS / nanos {
            return Err(invalid(input, "duration overflows"));
        }
        let mut value = whole * nanos;
        if fraction > 0 {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let extra = (fraction as f64 * (nanos as f64 / scale)) as u64;
            value = value
                .checked_add(extra)
                .filter(|v| *v <= MAX_NANOS)
                .ok_or_else(|| invalid(input, "duration overflows"))?;
        }
        total = total
            .checked_add(value)
            .filter(|v| *v <= MAX_NANOS)
            .ok_or_else(|| invalid(input, "duration overflows"))?;
    }

    if negative && total > 0 {
        return Err(invalid(input, "negative duration"));
    }
    Ok(Duration::from_nanos(total))
}

/// Compute the expiration instant for a record created at `created_at`.
///
/// An empty TTL never expires and yields `None`.
pub fn expiration_for(
    created_at: DateTime<Utc>,
    ttl: &str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    if ttl.is_empty() {
        return Ok(None);
    }
    let duration = parse_duration(ttl)?;
    let delta = TimeDelta::from_std(duration).map_err(|_| invalid(ttl, "duration overflows"))?;
    created_at
        .checked_add_signed(delta)
        .map(Some)
        .ok_or_else(|| invalid(ttl, "expiration is out of range"))
}
