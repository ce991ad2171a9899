//! Encoding/decoding of `grpc-timeout` interval values.

use common::errors::*;

use crate::constants::MAX_INTERVAL_AMOUNT;

regexp!(INTERVAL_PATTERN => "^([0-9]+)(H|M|S|m|u|n)$");

/// Returns whether `value` is a syntactically valid interval string:
/// matches the grammar and the numeric part does not exceed
/// `10^8 - 1`.
pub fn is_valid_interval(value: &str) -> bool {
    parse_interval(value).is_ok()
}

fn parse_interval(value: &str) -> Result<(u64, u8)> {
    let m = INTERVAL_PATTERN
        .exec(value.as_bytes())
        .ok_or_else(|| format_err!("Invalid grpc-timeout interval: {}", value))?;

    if m.index() != 0 || m.last_index() != value.len() {
        return Err(format_err!("Invalid grpc-timeout interval: {}", value));
    }

    let amount_str = m
        .group_str(1)
        .ok_or_else(|| err_msg("Missing interval amount"))??;
    let suffix = m
        .group_str(2)
        .ok_or_else(|| err_msg("Missing interval suffix"))??;

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| format_err!("Invalid interval amount: {}", amount_str))?;

    if amount > MAX_INTERVAL_AMOUNT {
        return Err(format_err!(
            "Interval amount {} exceeds the maximum of {}",
            amount,
            MAX_INTERVAL_AMOUNT
        ));
    }

    let suffix_byte = suffix.as_bytes()[0];
    Ok((amount, suffix_byte))
}

/// Parses an encoded interval string into a microsecond count.
///
/// Nanosecond-suffixed ('n') intervals are decoded by dividing by 1000,
/// which is intentionally lossy: the encoder never produces this suffix,
/// but other implementations of this protocol may send it.
pub fn interval_to_micros(value: &str) -> Result<u64> {
    let (amount, suffix) = parse_interval(value)?;

    Ok(match suffix {
        b'u' => amount,
        b'm' => amount.saturating_mul(1_000),
        b'S' => amount.saturating_mul(1_000_000),
        b'M' => amount.saturating_mul(60 * 1_000_000),
        b'H' => amount.saturating_mul(3600 * 1_000_000),
        b'n' => amount / 1000,
        _ => return Err(err_msg("Unreachable interval suffix")),
    })
}

/// Encodes a microsecond count as the smallest interval string that can
/// represent it, moving one step coarser (dividing, truncating toward
/// zero) whenever the current unit's amount would exceed
/// `10^8 - 1`. The nanosecond suffix is never produced.
///
/// Errors if even the hours representation would overflow the maximum
/// amount.
pub fn micros_to_interval(micros: u64) -> Result<String> {
    if micros <= MAX_INTERVAL_AMOUNT {
        return Ok(format!("{}u", micros));
    }

    let millis = micros / 1_000;
    if millis <= MAX_INTERVAL_AMOUNT {
        return Ok(format!("{}m", millis));
    }

    let secs = millis / 1_000;
    if secs <= MAX_INTERVAL_AMOUNT {
        return Ok(format!("{}S", secs));
    }

    let mins = secs / 60;
    if mins <= MAX_INTERVAL_AMOUNT {
        return Ok(format!("{}M", mins));
    }

    let hours = mins / 60;
    if hours <= MAX_INTERVAL_AMOUNT {
        return Ok(format!("{}H", hours));
    }

    Err(format_err!(
        "Duration of {} microseconds is too large to encode as a grpc-timeout",
        micros
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_smallest_suffix_that_fits() {
        assert_eq!(micros_to_interval(5).unwrap(), "5u");
        assert_eq!(micros_to_interval(300_000).unwrap(), "300m");
    }

    #[test]
    fn round_trips_through_each_suffix() {
        for &micros in &[0u64, 1, 999, 100_000_000 - 1, 100_000_000, 5_000_000_000] {
            let encoded = micros_to_interval(micros).unwrap();
            let decoded = interval_to_micros(&encoded).unwrap();

            // Round-trip is exact as long as no truncation was required to
            // fit the value into the chosen suffix.
            if micros <= MAX_INTERVAL_AMOUNT {
                assert_eq!(decoded, micros);
            } else {
                assert!(decoded <= micros);
            }
        }
    }

    #[test]
    fn nanosecond_suffix_decodes_lossily() {
        assert_eq!(interval_to_micros("1500n").unwrap(), 1);
        assert_eq!(interval_to_micros("999n").unwrap(), 0);
    }

    #[test]
    fn rejects_malformed_and_oversized_values() {
        assert!(interval_to_micros("300").is_err());
        assert!(interval_to_micros("300X").is_err());
        assert!(interval_to_micros("100000000S").is_err());
        assert!(is_valid_interval("300m"));
        assert!(!is_valid_interval("-1m"));
    }

    #[test]
    fn overflow_past_hours_is_rejected() {
        assert!(micros_to_interval(u64::MAX).is_err());
    }
}
