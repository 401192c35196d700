//! Package codes: `YYYYMMDD-NNNN`, a UTC day prefix plus a per-day serial.

use crate::error::{CoreError, CoreResult};
use chrono::NaiveDate;

/// Longest code accepted on lookup.
pub const MAX_CODE_LEN: usize = 64;

/// Day prefix shared by every code issued on `date`, including the dash.
pub fn day_prefix(date: NaiveDate) -> String {
    format!("{}-", date.format("%Y%m%d"))
}

/// Format the code for the `serial`-th package of `date` (serials start at 1).
pub fn format_code(date: NaiveDate, serial: u32) -> String {
    format!("{}{:04}", day_prefix(date), serial)
}

/// Split a generated code back into its day and serial.
pub fn parse_code(code: &str) -> CoreResult<(NaiveDate, u32)> {
    let (day, serial) = code
        .split_once('-')
        .ok_or_else(|| CoreError::InvalidCode(code.to_string()))?;
    let date = NaiveDate::parse_from_str(day, "%Y%m%d")
        .map_err(|_| CoreError::InvalidCode(code.to_string()))?;
    let serial = serial
        .parse::<u32>()
        .map_err(|_| CoreError::InvalidCode(code.to_string()))?;
    if serial == 0 {
        return Err(CoreError::InvalidCode(code.to_string()));
    }
    Ok((date, serial))
}

/// Validate a code received from a scanner or URL.
///
/// Lookups accept any code made of ASCII alphanumerics, `-` and `_` so that
/// labels printed before the current format stay scannable.
pub fn validate_code(code: &str) -> CoreResult<&str> {
    let code = code.trim();
    let well_formed = !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(code)
    } else {
        Err(CoreError::InvalidCode(code.to_string()))
    }
}
