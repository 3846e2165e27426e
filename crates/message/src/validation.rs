//! Field level validation for sign-in messages.

use {crate::Message, alloy::primitives::Address, chrono::DateTime, thiserror::Error, url::Url};

/// A violated field constraint. Every variant carries the offending value
/// and, where one can be computed, the value that would have been accepted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("invalid domain {got:?}: must be non-empty and contain neither '#' nor '?'")]
    InvalidDomain { got: String },
    #[error("invalid address {got:?}: expected the EIP-55 encoded form {expected:?}")]
    InvalidAddress { got: String, expected: String },
    #[error("invalid uri {got:?}")]
    InvalidUri { got: String },
    #[error("invalid message version {got:?}: expected \"1\"")]
    InvalidMessageVersion { got: String },
    #[error("invalid nonce {got:?}: expected at least 8 alphanumeric characters")]
    InvalidNonce { got: String },
    #[error("invalid statement {got:?}: must not contain a line break")]
    InvalidStatement { got: String },
    #[error("{field} timestamp {got:?} is not an RFC 3339 date-time")]
    InvalidTimeFormat { field: &'static str, got: String },
}

/// Checks every field constraint in a fixed order, failing with the first
/// violation instead of collecting all of them.
pub fn validate(message: &Message) -> Result<(), ValidationError> {
    validate_domain(&message.domain)?;
    checksummed(&message.address)?;
    validate_uri(&message.uri)?;
    validate_version(&message.version)?;
    validate_nonce(&message.nonce)?;
    validate_timestamp("Issued At", message.issued_at.as_deref())?;
    validate_timestamp("Expiration Time", message.expiration_time.as_deref())?;
    validate_timestamp("Not Before", message.not_before.as_deref())?;
    validate_statement(message.statement.as_deref())?;
    validate_resources(message.resources.as_deref())?;
    Ok(())
}

/// Parses an address, requiring it to be in EIP-55 checksum form. An address
/// differing from the checksum form only in letter case is rejected, with
/// the corrected form carried in the error.
pub fn checksummed(address: &str) -> Result<Address, ValidationError> {
    let parsed: Address = address
        .parse()
        .map_err(|_| ValidationError::InvalidAddress {
            got: address.to_owned(),
            expected: "a 0x prefixed 20 byte hex address".to_owned(),
        })?;
    let expected = parsed.to_checksum(None);
    if expected != address {
        return Err(ValidationError::InvalidAddress {
            got: address.to_owned(),
            expected,
        });
    }
    Ok(parsed)
}

fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    if domain.is_empty() || domain.contains(['#', '?']) {
        return Err(ValidationError::InvalidDomain {
            got: domain.to_owned(),
        });
    }
    Ok(())
}

fn validate_uri(uri: &str) -> Result<(), ValidationError> {
    // The URL parser silently strips embedded tabs and line breaks, but a
    // URI containing one is not syntactically valid and would inject lines
    // into the signable text.
    if uri.contains(['\n', '\r']) || Url::parse(uri).is_err() {
        return Err(ValidationError::InvalidUri {
            got: uri.to_owned(),
        });
    }
    Ok(())
}

fn validate_version(version: &str) -> Result<(), ValidationError> {
    if version != "1" {
        return Err(ValidationError::InvalidMessageVersion {
            got: version.to_owned(),
        });
    }
    Ok(())
}

fn validate_nonce(nonce: &str) -> Result<(), ValidationError> {
    // The nonce must be entirely alphanumeric: an 8+ character alphanumeric
    // run inside an otherwise invalid string does not count.
    if nonce.len() < 8 || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidNonce {
            got: nonce.to_owned(),
        });
    }
    Ok(())
}

fn validate_statement(statement: Option<&str>) -> Result<(), ValidationError> {
    let Some(statement) = statement else {
        return Ok(());
    };
    // A line break in the statement would smuggle protocol-shaped lines
    // into the signable text, which then no longer round-trips.
    if statement.contains(['\n', '\r']) {
        return Err(ValidationError::InvalidStatement {
            got: statement.to_owned(),
        });
    }
    Ok(())
}

fn validate_resources(resources: Option<&[String]>) -> Result<(), ValidationError> {
    for resource in resources.unwrap_or_default() {
        validate_uri(resource)?;
    }
    Ok(())
}

fn validate_timestamp(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    let Some(value) = value else {
        return Ok(());
    };
    DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidTimeFormat {
            field,
            got: value.to_owned(),
        })
}
