//! ERC-1271 signature validation for smart contract accounts.
//!
//! Contract accounts cannot produce ECDSA signatures; instead they expose an
//! `isValidSignature(hash, signature)` entry point that returns a fixed magic
//! value when the signature is acceptable to the account.

use {
    alloy::{
        primitives::{Address, B256},
        providers::DynProvider,
        sol,
        transports::RpcError,
    },
    hex_literal::hex,
    thiserror::Error,
};

sol! {
    #[sol(rpc)]
    contract ERC1271SignatureValidator {
        function isValidSignature(
            bytes32 _hash,
            bytes memory _signature
        ) public view returns (bytes4 magicValue);
    }
}

/// The magic value as defined by EIP-1271.
const MAGICAL_VALUE: [u8; 4] = hex!("1626ba7e");

/// A single signature to validate against a contract account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureCheck {
    pub signer: Address,
    pub hash: B256,
    pub signature: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum SignatureValidationError {
    /// The signature is invalid.
    ///
    /// Either the account contract reverted or did not return the magic
    /// value.
    #[error("invalid signature")]
    Invalid,
    /// A node or transport level error occurred.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
/// <https://eips.ethereum.org/EIPS/eip-1271>
pub trait SignatureValidating: Send + Sync {
    async fn validate_signature(
        &self,
        check: SignatureCheck,
    ) -> Result<(), SignatureValidationError>;
}

/// Validates contract signatures with an `isValidSignature` call through an
/// RPC provider.
pub struct RpcSignatureValidator {
    provider: DynProvider,
}

impl RpcSignatureValidator {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl SignatureValidating for RpcSignatureValidator {
    async fn validate_signature(
        &self,
        check: SignatureCheck,
    ) -> Result<(), SignatureValidationError> {
        let instance = ERC1271SignatureValidator::new(check.signer, self.provider.clone());
        let result = instance
            .isValidSignature(check.hash, check.signature.into())
            .call()
            .await;

        match result {
            Ok(value) if value.0 == MAGICAL_VALUE => Ok(()),
            Ok(value) => {
                tracing::debug!(value = ?value.0, "unexpected isValidSignature return value");
                Err(SignatureValidationError::Invalid)
            }
            // Classify contract errors as invalid signatures instead of node
            // errors (which may be temporary). This can happen if there are
            // ABI compatibility issues or when calling an EOA instead of a
            // contract.
            Err(alloy::contract::Error::TransportError(RpcError::ErrorResp(err))) => {
                tracing::debug!(?err, "isValidSignature call failed");
                Err(SignatureValidationError::Invalid)
            }
            Err(err) => Err(SignatureValidationError::Other(err.into())),
        }
    }
}
