//! Sequenced entity identifiers.
//!
//! Human-readable ids are minted from named counters and rendered as a prefix
//! followed by the zero-padded sequence value.

use crate::errors::AppError;

/// Prefix for organisation ids.
pub const ORG_ID_PREFIX: &str = "ORG";
/// Prefix for heat network ids.
pub const HEAT_NETWORK_ID_PREFIX: &str = "HN";

/// Counter name backing organisation ids.
pub const ORG_ID_SEQUENCE: &str = "orgId_sequence";
/// Counter name backing heat network ids.
pub const HEAT_NETWORK_ID_SEQUENCE: &str = "heatNetworkId_sequence";

/// Render a sequence value as `{prefix}{value}` with the value zero-padded to
/// 7 digits. Values wider than 7 digits are rendered in full, never truncated.
pub fn sequenced_id(prefix: &str, value: i64) -> Result<String, AppError> {
    if value < 0 {
        return Err(AppError::Internal(format!(
            "Refusing to format negative sequence value {} for prefix {}",
            value, prefix
        )));
    }
    Ok(format!("{}{:07}", prefix, value))
}
