//! Kin/quark decimal conversions.
//!
//! 1 Kin = 100,000 quarks. Conversions are exact: a value with more than 5
//! fractional digits (or more than 14 integer digits) cannot be represented
//! and is rejected rather than truncated.

use crate::error::KinError;

const QUARKS_PER_KIN: i64 = 100_000;

/// Convert a decimal Kin string (e.g. `"1.5"`) to quarks.
pub fn to_quarks(value: &str) -> Result<i64, KinError> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 2 {
        return Err(KinError::InvalidAmount("invalid kin value".into()));
    }

    if parts[0].len() > 14 {
        return Err(KinError::InvalidAmount(
            "value cannot be represented".into(),
        ));
    }
    let kin: i64 = parts[0]
        .parse()
        .map_err(|e| KinError::InvalidAmount(format!("invalid integer component: {e}")))?;

    let mut quarks: i64 = 0;
    if parts.len() == 2 {
        if parts[1].len() > 5 {
            return Err(KinError::InvalidAmount(
                "value cannot be represented".into(),
            ));
        }

        let padded = format!("{:0<5}", parts[1]);
        quarks = padded
            .parse()
            .map_err(|e| KinError::InvalidAmount(format!("invalid decimal component: {e}")))?;
    }

    kin.checked_mul(QUARKS_PER_KIN)
        .and_then(|q| q.checked_add(quarks))
        .ok_or_else(|| KinError::InvalidAmount("value cannot be represented".into()))
}

/// Convert quarks to the decimal Kin string representation.
pub fn from_quarks(amount: i64) -> String {
    if amount < QUARKS_PER_KIN {
        return format!("0.{:05}", amount);
    }

    format!(
        "{}.{:05}",
        amount / QUARKS_PER_KIN,
        amount % QUARKS_PER_KIN
    )
}
