use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

pub const CREDIT_MARKER: &str = "C";
pub const DEBIT_MARKER: &str = "D";

/// Credit/debit marker of a leg. Anything other than `C`/`D` is kept verbatim
/// as `Unknown` so it can be shown back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sign {
    Credit,
    Debit,
    Unknown(String),
}

impl Sign {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            CREDIT_MARKER => Sign::Credit,
            DEBIT_MARKER => Sign::Debit,
            other => Sign::Unknown(other.to_string()),
        }
    }

    pub fn marker(&self) -> &str {
        match self {
            Sign::Credit => CREDIT_MARKER,
            Sign::Debit => DEBIT_MARKER,
            Sign::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Sign::Unknown(_))
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl From<String> for Sign {
    fn from(raw: String) -> Self {
        Sign::parse(&raw)
    }
}

impl From<Sign> for String {
    fn from(sign: Sign) -> Self {
        sign.marker().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLeg {
    pub external_id: String,
    /// `None` when the source value could not be parsed.
    pub value: Option<Money>,
    pub sign: Sign,
    pub document: String,
    pub description: String,
}

impl TransactionLeg {
    pub fn new(
        external_id: &str,
        value: Option<Money>,
        sign: Sign,
        document: &str,
        description: &str,
    ) -> Self {
        TransactionLeg {
            external_id: external_id.trim().to_string(),
            value,
            sign,
            document: document.to_string(),
            description: description.to_string(),
        }
    }

    pub fn credit(external_id: &str, value: Money, description: &str) -> Self {
        Self::new(external_id, Some(value), Sign::Credit, "", description)
    }

    pub fn debit(external_id: &str, value: Money, description: &str) -> Self {
        Self::new(external_id, Some(value), Sign::Debit, "", description)
    }

    pub fn has_malformed_value(&self) -> bool {
        self.value.is_none()
    }
}
