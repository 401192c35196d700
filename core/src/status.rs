//! Package lifecycle status values.
//!
//! The lifecycle is totally ordered: `PENDING < PACKED < DISPATCHED < DELIVERED`.
//! Values read back from storage that fall outside this set are kept verbatim
//! as [`PackageStatus::Other`] instead of being rejected.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PackageStatus {
    #[default]
    Pending,
    Packed,
    Dispatched,
    Delivered,
    /// A status string outside the known lifecycle.
    Other(String),
}

impl PackageStatus {
    /// The known lifecycle, in order.
    pub const LIFECYCLE: [PackageStatus; 4] = [
        PackageStatus::Pending,
        PackageStatus::Packed,
        PackageStatus::Dispatched,
        PackageStatus::Delivered,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PackageStatus::Pending => "PENDING",
            PackageStatus::Packed => "PACKED",
            PackageStatus::Dispatched => "DISPATCHED",
            PackageStatus::Delivered => "DELIVERED",
            PackageStatus::Other(raw) => raw,
        }
    }

    /// Parse a status, case-insensitively for the known values.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "PENDING" => PackageStatus::Pending,
            "PACKED" => PackageStatus::Packed,
            "DISPATCHED" => PackageStatus::Dispatched,
            "DELIVERED" => PackageStatus::Delivered,
            _ => PackageStatus::Other(trimmed.to_string()),
        }
    }

    /// Position in the lifecycle, `None` for unknown values.
    pub fn rank(&self) -> Option<u8> {
        match self {
            PackageStatus::Pending => Some(0),
            PackageStatus::Packed => Some(1),
            PackageStatus::Dispatched => Some(2),
            PackageStatus::Delivered => Some(3),
            PackageStatus::Other(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.rank().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PackageStatus::Delivered)
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PackageStatus::parse(s))
    }
}

impl From<String> for PackageStatus {
    fn from(raw: String) -> Self {
        PackageStatus::parse(&raw)
    }
}

impl From<PackageStatus> for String {
    fn from(status: PackageStatus) -> Self {
        match status {
            PackageStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values_case_insensitively() {
        assert_eq!(PackageStatus::parse("packed"), PackageStatus::Packed);
        assert_eq!(PackageStatus::parse(" Dispatched "), PackageStatus::Dispatched);
        assert_eq!(PackageStatus::parse("DELIVERED"), PackageStatus::Delivered);
    }

    #[test]
    fn test_unknown_values_are_kept_verbatim() {
        let status = PackageStatus::parse("Returned");
        assert_eq!(status, PackageStatus::Other("Returned".to_string()));
        assert_eq!(status.to_string(), "Returned");
        assert!(!status.is_known());
    }

    #[test]
    fn test_lifecycle_is_ordered() {
        let ranks: Vec<u8> = PackageStatus::LIFECYCLE
            .iter()
            .filter_map(PackageStatus::rank)
            .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(PackageStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_serializes_as_upper_case_string() {
        let json = serde_json::to_string(&PackageStatus::Dispatched).unwrap();
        assert_eq!(json, "\"DISPATCHED\"");

        let parsed: PackageStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, PackageStatus::Pending);
    }
}
