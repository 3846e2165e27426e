//! EIP-191 personal-message signature checks for externally owned accounts.

use alloy::primitives::{Address, Signature};

/// Checks that `signature` over `text` was produced by `signer`.
pub fn verify_eoa(text: &str, signature: &[u8], signer: Address) -> bool {
    recover(text, signature).is_some_and(|recovered| recovered == signer)
}

/// Recovers the address implied by `signature` over `text`.
///
/// Returns `None` for byte sequences that are not well-formed 65 byte ECDSA
/// signatures. A successfully recovered address says nothing about validity;
/// only comparison against the expected signer does.
pub fn recover(text: &str, signature: &[u8]) -> Option<Address> {
    let signature = Signature::from_raw(signature).ok()?;
    signature.recover_address_from_msg(text).ok()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::signers::{SignerSync, local::PrivateKeySigner},
    };

    #[test]
    fn verifies_and_recovers_own_signature() {
        let signer = PrivateKeySigner::from_slice(&[0x01; 32]).unwrap();
        let text = "example.com wants you to sign in with your Ethereum account:";
        let signature = signer.sign_message_sync(text.as_bytes()).unwrap();

        assert!(verify_eoa(text, &signature.as_bytes(), signer.address()));
        assert_eq!(recover(text, &signature.as_bytes()), Some(signer.address()));

        let other = PrivateKeySigner::from_slice(&[0x02; 32]).unwrap();
        assert!(!verify_eoa(text, &signature.as_bytes(), other.address()));
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert_eq!(recover("text", &[]), None);
        assert_eq!(recover("text", &[0xab; 20]), None);
        assert!(!verify_eoa("text", &[0xab; 20], Address::ZERO));
    }
}
