//! Delay derivation
//!
//! Pure functions from a schedule record to a signed delay and from a delay
//! to a [`Mode`]. The thresholds live in `trainpulse_domain::constants`.

use serde_json::Value;
use trainpulse_domain::constants::{
    DELAYED_MAX_MINUTES, MINOR_DELAY_MAX_MINUTES, ON_TIME_TOLERANCE_MINUTES,
};
use trainpulse_domain::{DelayMinutes, Mode, ServiceRecord};

/// Lateness of `service` at the searched location, in whole minutes
///
/// `None` only when there is no service or it carries no location detail.
/// Public-timetable lateness wins over working-timetable lateness; whichever
/// is chosen, a zero, missing or unparseable value reads as on time (`0`).
pub fn calculate_delay_minutes(service: Option<&ServiceRecord>) -> DelayMinutes {
    let detail = service?.location_detail.as_ref()?;

    let lateness = detail
        .realtime_gbtt_departure_lateness
        .as_ref()
        .or(detail.realtime_wtt_departure_lateness.as_ref());

    let minutes = lateness
        .and_then(lateness_as_f64)
        .filter(|value| value.is_finite())
        .map_or(0, |value| value.round() as i64);

    Some(minutes)
}

fn lateness_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Map a delay onto the five-valued mode
///
/// Trains running early, by any margin, are on time.
pub fn derive_mode_from_delay(delay: DelayMinutes) -> Mode {
    match delay {
        None => Mode::Unknown,
        Some(minutes) if minutes <= ON_TIME_TOLERANCE_MINUTES => Mode::OnTime,
        Some(minutes) if minutes <= MINOR_DELAY_MAX_MINUTES => Mode::MinorDelay,
        Some(minutes) if minutes <= DELAYED_MAX_MINUTES => Mode::Delayed,
        Some(_) => Mode::MajorDelay,
    }
}

/// `true` iff the two delays differ; unknown differs from every number
pub fn has_delay_changed(previous: DelayMinutes, next: DelayMinutes) -> bool {
    previous != next
}
