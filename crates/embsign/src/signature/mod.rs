//! Signing protocol.
//!
//! The signed message is never the raw buffer: it is the 24-byte
//! [`PayloadHeader`] followed by the buffer. [`sign`] and [`verify`] are
//! generic over the key capability traits, so the same protocol runs on
//! loaded OpenSSH keys and on in-memory keys in tests.

pub mod payload;

pub use payload::{signing_payload, PayloadHeader, HEADER_LEN, PAYLOAD_MAGIC};

use crate::Result;

/// Size of a raw Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Raw signature bytes as produced by the signing capability.
pub type RawSignature = [u8; SIGNATURE_LENGTH];

/// Ability to produce signatures with a private key.
pub trait SigningCapability {
    /// Signs `payload`.
    fn sign(&self, payload: &[u8]) -> Result<RawSignature>;
}

/// Ability to check signatures with a public key.
pub trait VerificationCapability {
    /// Checks `signature` over `payload`.
    ///
    /// Returns [`crate::Error::VerificationFailed`] on any mismatch.
    fn verify(&self, payload: &[u8], signature: &RawSignature) -> Result<()>;
}

/// Signs `message` with the placeholder at `offset`.
pub fn sign<S>(signer: &S, message: &[u8], offset: u64) -> Result<RawSignature>
where
    S: SigningCapability + ?Sized,
{
    signer.sign(&signing_payload(message, offset))
}

/// Verifies `signature` over `message` with the placeholder at `offset`.
///
/// `message` must be the buffer as it was signed, with the placeholder
/// still in place.
pub fn verify<V>(verifier: &V, message: &[u8], offset: u64, signature: &RawSignature) -> Result<()>
where
    V: VerificationCapability + ?Sized,
{
    verifier.verify(&signing_payload(message, offset), signature)
}
