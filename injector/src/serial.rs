//! Single-process fixture schedules

use std::time::Duration;

use shared::FaultCode;

use crate::traits::{FaultInjector, FaultOutcome};

/// Read an argument the way C `atoi` does: optional leading whitespace and
/// sign, then the longest run of digits. No digits reads as 0; values past
/// the `i32` range saturate.
pub fn leading_integer(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for digit in rest.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(digit - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }

    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Sleep duration from a fixture argument; negative values sleep 0
pub fn sleep_seconds_from(text: &str) -> u64 {
    u64::try_from(leading_integer(text)).unwrap_or(0)
}

/// Sleep, then hand the fault code to the injector
pub async fn faulty_serial_sleep<I>(sleep_seconds: u64, code: FaultCode, injector: &I) -> FaultOutcome
where
    I: FaultInjector + ?Sized,
{
    tracing::info!("😴 Sleeping {}s before fault {}", sleep_seconds, code);
    tokio::time::sleep(Duration::from_secs(sleep_seconds)).await;
    injector.inject(code)
}

/// Sleep for the requested number of seconds
pub async fn serial_sleep(sleep_seconds: u64) {
    tracing::info!("😴 Sleeping {}s", sleep_seconds);
    tokio::time::sleep(Duration::from_secs(sleep_seconds)).await;
}
