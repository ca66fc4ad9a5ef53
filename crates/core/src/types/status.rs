//! Status enums for CRM entities.

use serde::{Deserialize, Serialize};

/// Opportunity status as stored by the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    #[default]
    Open,
    Won,
    Lost,
    Abandoned,
}

impl OpportunityStatus {
    /// Wire value (`open`, `won`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OpportunityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "aberta" => Ok(Self::Open),
            "won" | "ganha" => Ok(Self::Won),
            "lost" | "perdida" => Ok(Self::Lost),
            "abandoned" | "abandonada" => Ok(Self::Abandoned),
            _ => Err(format!("invalid opportunity status: {s}")),
        }
    }
}

/// Message channel for conversation sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessageChannel {
    #[default]
    #[serde(rename = "SMS")]
    Sms,
    #[serde(rename = "Email")]
    Email,
    #[serde(rename = "WhatsApp")]
    WhatsApp,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OpportunityStatus::Open).unwrap(),
            "\"open\""
        );
        assert_eq!(OpportunityStatus::default(), OpportunityStatus::Open);
    }

    #[test]
    fn test_status_from_str_accepts_portuguese() {
        assert_eq!("ganha".parse::<OpportunityStatus>(), Ok(OpportunityStatus::Won));
        assert_eq!("LOST".parse::<OpportunityStatus>(), Ok(OpportunityStatus::Lost));
        assert!("maybe".parse::<OpportunityStatus>().is_err());
    }

    #[test]
    fn test_channel_wire_format() {
        assert_eq!(
            serde_json::to_string(&MessageChannel::Sms).unwrap(),
            "\"SMS\""
        );
    }
}
