use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Identifier of a persisted record.
///
/// Sequential backends (relational, document, in-memory) hand out integers;
/// the hosted records service hands out opaque strings. Callers never need to
/// know which: two ids are equal when their textual forms are equal, so a
/// `Key("12")` parsed from a URL matches a `Seq(12)` read from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Seq(i64),
    Key(String),
}

impl RecordId {
    /// Integer form required by the sequential backends.
    pub fn as_seq(&self) -> Result<i64, AppError> {
        match self {
            RecordId::Seq(id) => Ok(*id),
            RecordId::Key(key) => key
                .parse::<i64>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid record id: {key}"))),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Seq(id) => write!(f, "{id}"),
            RecordId::Key(key) => f.write_str(key),
        }
    }
}

impl FromStr for RecordId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput("Record id cannot be empty".into()));
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<i64>()
                .map(RecordId::Seq)
                .map_err(|_| AppError::InvalidInput(format!("Invalid record id: {trimmed}")));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(AppError::InvalidInput(format!("Invalid record id: {trimmed}")));
        }
        Ok(RecordId::Key(trimmed.to_string()))
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Seq(id)
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecordId::Seq(a), RecordId::Seq(b)) => a == b,
            (RecordId::Key(a), RecordId::Key(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_parse_as_sequential_ids() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Seq(42));
        assert!(matches!("42".parse::<RecordId>().unwrap(), RecordId::Seq(42)));
    }

    #[test]
    fn opaque_keys_are_kept_verbatim() {
        let id: RecordId = "a1b2c3d4e5f6g7h".parse().unwrap();
        assert!(matches!(id, RecordId::Key(ref k) if k == "a1b2c3d4e5f6g7h"));
        assert!(id.as_seq().is_err());
    }

    #[test]
    fn malformed_ids_are_invalid_input() {
        assert!(matches!("".parse::<RecordId>(), Err(AppError::InvalidInput(_))));
        assert!(matches!("1; DROP".parse::<RecordId>(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn textual_equality_across_variants() {
        assert_eq!(RecordId::Key("7".into()), RecordId::Seq(7));
        assert_eq!(RecordId::Key("7".into()).as_seq().unwrap(), 7);
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&RecordId::Seq(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&RecordId::Key("abc".into())).unwrap(), "\"abc\"");
        let parsed: RecordId = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, RecordId::Seq(9));
    }
}
