//! Typed secret content.
//!
//! The server stores opaque bytes tagged with a type string. The client
//! knows three shapes: `raw` bytes, `lp` login/password pairs and `card`
//! payment cards, the last two encoded as JSON objects.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const RAW: &str = "raw";
pub const LP: &str = "lp";
pub const CARD: &str = "card";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPassword {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: String,
    pub expires: String,
    pub cvv: String,
    pub holder: String,
}

/// Secret content decoded according to its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Raw(Vec<u8>),
    Lp(LoginPassword),
    Card(Card),
    /// A type this client does not know; printed as-is.
    Unknown { kind: String, content: Vec<u8> },
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("secret content must not be empty")]
    Empty,

    #[error("invalid {kind} content: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Shape {
    pub fn kind(&self) -> &str {
        match self {
            Shape::Raw(_) => RAW,
            Shape::Lp(_) => LP,
            Shape::Card(_) => CARD,
            Shape::Unknown { kind, .. } => kind,
        }
    }

    /// Encode for storage, refusing empty content.
    pub fn encode(&self) -> Result<Vec<u8>, ShapeError> {
        if self.is_empty() {
            return Err(ShapeError::Empty);
        }
        let bytes = match self {
            Shape::Raw(content) | Shape::Unknown { content, .. } => content.clone(),
            Shape::Lp(lp) => json(LP, lp)?,
            Shape::Card(card) => json(CARD, card)?,
        };
        Ok(bytes)
    }

    pub fn decode(kind: &str, content: Vec<u8>) -> Result<Self, ShapeError> {
        match kind {
            RAW => Ok(Shape::Raw(content)),
            LP => serde_json::from_slice(&content)
                .map(Shape::Lp)
                .map_err(|source| ShapeError::Malformed { kind: LP, source }),
            CARD => serde_json::from_slice(&content)
                .map(Shape::Card)
                .map_err(|source| ShapeError::Malformed { kind: CARD, source }),
            other => Ok(Shape::Unknown {
                kind: other.to_string(),
                content,
            }),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Shape::Raw(content) | Shape::Unknown { content, .. } => content.is_empty(),
            Shape::Lp(lp) => lp.login.is_empty() && lp.password.is_empty(),
            Shape::Card(card) => {
                card.number.is_empty()
                    && card.expires.is_empty()
                    && card.cvv.is_empty()
                    && card.holder.is_empty()
            }
        }
    }
}

fn json<T: Serialize>(kind: &'static str, value: &T) -> Result<Vec<u8>, ShapeError> {
    serde_json::to_vec(value).map_err(|source| ShapeError::Malformed { kind, source })
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Raw(content) | Shape::Unknown { content, .. } => {
                write!(f, "{}", String::from_utf8_lossy(content))
            }
            Shape::Lp(lp) => {
                writeln!(f, "login:    {}", lp.login)?;
                write!(f, "password: {}", lp.password)
            }
            Shape::Card(card) => {
                writeln!(f, "number:   {}", card.number)?;
                writeln!(f, "expires:  {}", card.expires)?;
                writeln!(f, "cvv:      {}", card.cvv)?;
                write!(f, "holder:   {}", card.holder)
            }
        }
    }
}
