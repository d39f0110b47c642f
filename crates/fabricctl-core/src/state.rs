use serde::{Deserialize, Serialize};

/// Desired-state selector for a reconciliation call.
///
/// `Present` converges toward existence (create or update in place), `Absent`
/// converges toward removal (including the paired site overlay), `Query` never
/// mutates anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
    Query,
}

impl DesiredState {
    /// Whether this state may ever lead to a mutating transmission.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::Query)
    }
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
            Self::Query => write!(f, "query"),
        }
    }
}

impl std::str::FromStr for DesiredState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "query" => Ok(Self::Query),
            other => Err(crate::Error::invalid_input(format!(
                "Unknown state '{other}'. Valid states: present, absent, query"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_display_parse() {
        for state in [
            DesiredState::Present,
            DesiredState::Absent,
            DesiredState::Query,
        ] {
            let parsed: DesiredState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn test_unknown_state_rejected() {
        let err = "gone".parse::<DesiredState>().unwrap_err();
        assert!(err.to_string().contains("Valid states"));
    }

    #[test]
    fn test_query_never_mutates() {
        assert!(DesiredState::Present.is_mutating());
        assert!(DesiredState::Absent.is_mutating());
        assert!(!DesiredState::Query.is_mutating());
    }
}
