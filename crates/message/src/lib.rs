//! Typed representation of an EIP-4361 "Sign-In with Ethereum" message.
//!
//! A [`Message`] binds an Ethereum account to a login session with a relying
//! party domain, a single-use nonce and a validity window. The text rendered
//! by [`Message::to_signable_string`] is the exact byte sequence wallets sign;
//! parsing and rendering round-trip byte-identically.

pub mod format;
pub mod nonce;
pub mod parse;
pub mod validation;

use {
    crate::{parse::ParseError, validation::ValidationError},
    chrono::Utc,
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, PickFirst, serde_as},
    std::str::FromStr,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum MessageError {
    #[error(transparent)]
    UnableToParse(#[from] ParseError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A validated sign-in message.
///
/// This is a value object: two messages with identical field values are
/// interchangeable. All field constraints hold from construction onwards;
/// both construction paths ([`Message::new`] and [`Message::parse`]) run
/// [`Message::validate`] unconditionally, and it runs again every time the
/// signable text is rendered.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The relying party requesting the sign-in.
    pub domain: String,
    /// The signing account, in EIP-55 checksum form.
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Resource the sign-in is scoped to, typically the relying party's
    /// sign-in endpoint.
    pub uri: String,
    /// Message format version, currently always `"1"`.
    pub version: String,
    /// Also accepted as a decimal string, the form some wallets submit.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub chain_id: u64,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

/// Field record for constructing a [`Message`] directly.
///
/// The field set is closed at compile time, so there is no "unrecognized
/// key" failure mode on this path. Optional fields left at their defaults
/// are simply absent from the rendered text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageFields {
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    /// Generated when absent.
    pub nonce: Option<String>,
    pub issued_at: Option<String>,
    pub expiration_time: Option<String>,
    pub not_before: Option<String>,
    pub request_id: Option<String>,
    pub resources: Option<Vec<String>>,
}

impl Default for MessageFields {
    fn default() -> Self {
        Self {
            domain: Default::default(),
            address: Default::default(),
            statement: None,
            uri: Default::default(),
            version: "1".to_owned(),
            chain_id: 1,
            nonce: None,
            issued_at: None,
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: None,
        }
    }
}

impl Message {
    /// Constructs a message from its fields, generating a nonce if none was
    /// supplied, and validates it. An invalid message is never returned.
    pub fn new(fields: MessageFields) -> Result<Self, ValidationError> {
        let message = Self {
            domain: fields.domain,
            address: fields.address,
            statement: fields.statement,
            uri: fields.uri,
            version: fields.version,
            chain_id: fields.chain_id,
            nonce: fields.nonce.unwrap_or_else(nonce::generate),
            issued_at: fields.issued_at,
            expiration_time: fields.expiration_time,
            not_before: fields.not_before,
            request_id: fields.request_id,
            resources: fields.resources,
        };
        message.validate()?;
        Ok(message)
    }

    /// Parses a raw signed-message string and validates the result.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let message = parse::parse(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Checks every field constraint, failing with the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Renders the exact text to be signed.
    ///
    /// Backfills `issued_at` with the current time if it was absent. The
    /// backfill is persisted on the message so repeated calls render
    /// identical text. Validation runs before rendering; invalid data is
    /// never silently repaired.
    pub fn to_signable_string(&mut self) -> Result<String, ValidationError> {
        if self.issued_at.is_none() {
            self.issued_at = Some(format::timestamp(Utc::now()));
        }
        self.validate()?;
        Ok(format::render(self))
    }
}

impl FromStr for Message {
    type Err = MessageError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> MessageFields {
        MessageFields {
            domain: "example.com".to_owned(),
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_owned(),
            uri: "https://example.com/login".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn generates_nonce_when_absent() {
        let message = Message::new(fields()).unwrap();
        assert!(message.nonce.len() >= 8);
        assert!(message.nonce.chars().all(|c| c.is_ascii_alphanumeric()));

        let message = Message::new(MessageFields {
            nonce: Some("abcdefgh12".to_owned()),
            ..fields()
        })
        .unwrap();
        assert_eq!(message.nonce, "abcdefgh12");
    }

    #[test]
    fn construction_rejects_invalid_fields() {
        assert!(matches!(
            Message::new(MessageFields {
                nonce: Some("short".to_owned()),
                ..fields()
            }),
            Err(ValidationError::InvalidNonce { .. })
        ));
        assert!(matches!(
            Message::new(MessageFields {
                version: "2".to_owned(),
                ..fields()
            }),
            Err(ValidationError::InvalidMessageVersion { .. })
        ));
    }

    #[test]
    fn construction_rejects_line_injecting_statement() {
        // A statement spanning lines would render protocol-shaped lines
        // into the signable text and break the parse/render round trip.
        let result = Message::new(MessageFields {
            statement: Some("legit\n\nURI: https://evil.example/phish".to_owned()),
            ..fields()
        });
        assert!(matches!(
            result,
            Err(ValidationError::InvalidStatement { .. })
        ));
    }

    #[test]
    fn serde_round_trip_and_chain_id_coercion() {
        let message = Message::new(MessageFields {
            nonce: Some("abcdefgh12".to_owned()),
            issued_at: Some("2024-01-01T00:00:00.000Z".to_owned()),
            ..fields()
        })
        .unwrap();

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["chainId"], serde_json::json!(1));
        assert_eq!(json.get("statement"), None);
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);

        // Some wallets submit the chain id as a decimal string.
        let coerced: Message = serde_json::from_value(serde_json::json!({
            "domain": "example.com",
            "address": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "uri": "https://example.com/login",
            "version": "1",
            "chainId": "137",
            "nonce": "abcdefgh12",
        }))
        .unwrap();
        assert_eq!(coerced.chain_id, 137);
    }
}
