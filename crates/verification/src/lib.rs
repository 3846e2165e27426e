//! Ordered verification pipeline for sign-in messages.
//!
//! Binds a submitted signature (and optionally a domain, nonce and check
//! time) to a [`Message`], then proves the signature cryptographically:
//! first as an EIP-191 personal-message signature by the claimed account,
//! and, when that fails and a chain client is configured, through the
//! account's ERC-1271 `isValidSignature` entry point. Every guard
//! short-circuits; the signature is always checked against the canonical
//! text recomputed from the current field values, never against an
//! externally cached string.

pub mod bytes_hex;
pub mod ecdsa;

use {
    alloy::primitives::utils::eip191_hash_message,
    chrono::{DateTime, FixedOffset, Utc},
    message::{Message, validation, validation::ValidationError},
    serde::Deserialize,
    signature_validator::{SignatureCheck, SignatureValidating, SignatureValidationError},
    std::sync::Arc,
    thiserror::Error,
    tracing::instrument,
};

/// Parameters submitted alongside a message for verification.
///
/// Deserialization is the boundary where loosely typed input enters the
/// pipeline, so unknown keys are rejected there; typed callers construct
/// the struct directly and the field set is closed at compile time.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyParams {
    /// The signature over the message's canonical text.
    #[serde(with = "bytes_hex")]
    pub signature: Vec<u8>,
    /// When set, must equal the message's domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// When set, must equal the message's nonce.
    #[serde(default)]
    pub nonce: Option<String>,
    /// RFC 3339 instant to evaluate the validity window at. Defaults to the
    /// current time.
    #[serde(default)]
    pub time: Option<String>,
}

impl VerifyParams {
    pub fn new(signature: Vec<u8>) -> Self {
        Self {
            signature,
            domain: None,
            nonce: None,
            time: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("message is bound to domain {got:?}, verification expected {expected:?}")]
    DomainMismatch { expected: String, got: String },
    #[error("message is bound to nonce {got:?}, verification expected {expected:?}")]
    NonceMismatch { expected: String, got: String },
    #[error("message expired at {expiration_time}, checked at {checked_at}")]
    ExpiredMessage {
        expiration_time: String,
        checked_at: String,
    },
    #[error("message is not valid before {not_before}, checked at {checked_at}")]
    NotYetValidMessage {
        not_before: String,
        checked_at: String,
    },
    #[error("signature does not match address {expected}, recovered {recovered:?}")]
    InvalidSignature {
        expected: String,
        /// The address implied by the signature, recovered purely for
        /// diagnostics after the verdict was already decided.
        recovered: Option<String>,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("contract signature validation failed: {0}")]
    ChainClient(#[source] anyhow::Error),
}

/// Outcome of a verification call. `data` always carries the message the
/// verdict was produced for, on success and failure alike.
#[derive(Debug)]
pub struct VerificationResult {
    pub success: bool,
    pub data: Message,
    pub error: Option<VerificationError>,
}

/// The verification pipeline and its configuration.
#[derive(Clone, Default)]
pub struct Verifier {
    signature_validator: Option<Arc<dyn SignatureValidating>>,
    suppress_errors: bool,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the ERC-1271 fallback for smart contract accounts. Without a
    /// chain client only EIP-191 signatures can verify.
    pub fn with_signature_validator(mut self, validator: Arc<dyn SignatureValidating>) -> Self {
        self.signature_validator = Some(validator);
        self
    }

    /// Report failures as the `error` field of a failed verdict instead of
    /// returning them as errors.
    pub fn suppress_errors(mut self) -> Self {
        self.suppress_errors = true;
        self
    }

    /// Runs the full guard chain and produces a verdict.
    ///
    /// The message is only mutated to backfill a missing `issued_at` while
    /// recomputing the canonical text; the backfill is idempotent.
    #[instrument(skip_all, fields(domain = %message.domain, address = %message.address))]
    pub async fn verify(
        &self,
        message: &mut Message,
        params: &VerifyParams,
    ) -> Result<VerificationResult, VerificationError> {
        match self.check(message, params).await {
            Ok(()) => Ok(VerificationResult {
                success: true,
                data: message.clone(),
                error: None,
            }),
            Err(err) if self.suppress_errors => {
                tracing::debug!(?err, "verification failed");
                Ok(VerificationResult {
                    success: false,
                    data: message.clone(),
                    error: Some(err),
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn check(
        &self,
        message: &mut Message,
        params: &VerifyParams,
    ) -> Result<(), VerificationError> {
        if let Some(domain) = &params.domain {
            if *domain != message.domain {
                return Err(VerificationError::DomainMismatch {
                    expected: domain.clone(),
                    got: message.domain.clone(),
                });
            }
        }
        if let Some(nonce) = &params.nonce {
            if *nonce != message.nonce {
                return Err(VerificationError::NonceMismatch {
                    expected: nonce.clone(),
                    got: message.nonce.clone(),
                });
            }
        }
        check_time_window(message, params.time.as_deref())?;

        let text = message.to_signable_string()?;
        let signer = validation::checksummed(&message.address)?;

        if ecdsa::verify_eoa(&text, &params.signature, signer) {
            return Ok(());
        }

        if let Some(validator) = &self.signature_validator {
            let check = SignatureCheck {
                signer,
                hash: eip191_hash_message(&text),
                signature: params.signature.clone(),
            };
            match validator.validate_signature(check).await {
                Ok(()) => return Ok(()),
                Err(SignatureValidationError::Invalid) => (),
                Err(SignatureValidationError::Other(err)) => {
                    return Err(VerificationError::ChainClient(err));
                }
            }
        }

        // Diagnostic only: the verdict was already decided above.
        let recovered = ecdsa::recover(&text, &params.signature);
        Err(VerificationError::InvalidSignature {
            expected: message.address.clone(),
            recovered: recovered.map(|address| address.to_checksum(None)),
        })
    }
}

/// Evaluates the validity window at a single effective instant: the supplied
/// check time, or now. The expiration instant itself is already outside the
/// window, while the not-before instant is inside it.
fn check_time_window(message: &Message, time: Option<&str>) -> Result<(), VerificationError> {
    let checked_at = match time {
        Some(time) => parse_timestamp("time", time)?,
        None => Utc::now().fixed_offset(),
    };

    if let Some(expiration_time) = &message.expiration_time {
        if checked_at >= parse_timestamp("Expiration Time", expiration_time)? {
            return Err(VerificationError::ExpiredMessage {
                expiration_time: expiration_time.clone(),
                checked_at: checked_at.to_rfc3339(),
            });
        }
    }
    if let Some(not_before) = &message.not_before {
        if checked_at < parse_timestamp("Not Before", not_before)? {
            return Err(VerificationError::NotYetValidMessage {
                not_before: not_before.clone(),
                checked_at: checked_at.to_rfc3339(),
            });
        }
    }
    Ok(())
}

fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<FixedOffset>, VerificationError> {
    DateTime::parse_from_rfc3339(value).map_err(|_| {
        VerificationError::Invalid(ValidationError::InvalidTimeFormat {
            field,
            got: value.to_owned(),
        })
    })
}
