//! Interface to the external encryption collaborator.
//!
//! Session key negotiation and the primitives themselves live outside this
//! crate. Confidential kinds keep their substructure header in the clear so
//! the validator can check it; only the body field (chat text, signal body)
//! is run through the peer's session cipher.

use crate::error::CipherError;
use crate::kind::MessageKind;

/// Per-peer payload cipher supplied by the host application.
pub trait SessionCipher: Send + Sync {
    /// Encrypt `plaintext` for `peer_id`.
    fn encrypt(&self, peer_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Decrypt `ciphertext` received from `peer_id`.
    fn decrypt(&self, peer_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// Prepare an outbound body: encrypted for confidential kinds, unchanged otherwise.
pub fn seal_payload(
    cipher: &dyn SessionCipher,
    peer_id: &str,
    kind: MessageKind,
    plaintext: Vec<u8>,
) -> Result<Vec<u8>, CipherError> {
    if kind.is_confidential() {
        cipher.encrypt(peer_id, &plaintext)
    } else {
        Ok(plaintext)
    }
}

/// Recover an inbound body: decrypted for confidential kinds, unchanged otherwise.
pub fn open_payload(
    cipher: &dyn SessionCipher,
    peer_id: &str,
    kind: MessageKind,
    body: Vec<u8>,
) -> Result<Vec<u8>, CipherError> {
    if kind.is_confidential() {
        cipher.decrypt(peer_id, &body)
    } else {
        Ok(body)
    }
}
