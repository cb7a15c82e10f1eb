//! Signing a prepared buffer in place and verifying a signed one.

use crate::config::PlaceholderConfig;
use crate::placeholder::{locate_unique, occurrences, replace_at};
use crate::signature::{self, SigningCapability, VerificationCapability};
use crate::{Error, Result};
use tracing::{debug, trace};

/// Replaces the placeholder in `buffer` with an encoded signature.
///
/// The buffer must contain the placeholder exactly once. Its length never
/// changes. Returns the offset of the embedded signature.
///
/// # Errors
///
/// Returns a locate error if the placeholder is missing or ambiguous,
/// [`Error::SignatureLength`] if the encoding does not fit, and propagates
/// signing failures. On error the buffer is left untouched.
pub fn sign_buffer<S>(buffer: &mut [u8], signer: &S, config: &PlaceholderConfig) -> Result<usize>
where
    S: SigningCapability + ?Sized,
{
    let offset = locate_unique(buffer, config.placeholder())?;
    debug!(offset, len = buffer.len(), "placeholder located");

    let raw = signature::sign(signer, buffer, offset as u64)?;
    let encoded = config.encode_signature(&raw)?;

    replace_at(buffer, offset, encoded.as_bytes(), config.placeholder())?;
    Ok(offset)
}

/// Verifies the signature embedded in `buffer`.
///
/// Every occurrence of the signature prefix whose placeholder-sized window
/// decodes to a signature is a candidate. For each candidate the original
/// placeholder is restored in a scratch copy and the payload is checked.
/// Returns the offset of the first candidate that verifies.
///
/// # Errors
///
/// - [`Error::SignatureNotFound`] if no candidate decodes
/// - [`Error::VerificationFailed`] if candidates exist but none verifies
pub fn verify_buffer<V>(buffer: &[u8], verifier: &V, config: &PlaceholderConfig) -> Result<usize>
where
    V: VerificationCapability + ?Sized,
{
    let width = config.placeholder().len();
    let mut scratch: Option<Vec<u8>> = None;
    let mut candidates = 0usize;

    for offset in occurrences(buffer, config.prefix()) {
        let Some(window) = buffer.get(offset..offset + width) else {
            break;
        };
        let raw = match config.decode_signature(window) {
            Ok(raw) => raw,
            Err(e) => {
                trace!(offset, error = %e, "skipping prefix occurrence");
                continue;
            }
        };
        candidates += 1;

        let original = scratch.get_or_insert_with(|| buffer.to_vec());
        replace_at(original.as_mut_slice(), offset, config.placeholder(), window)?;

        match signature::verify(verifier, original.as_slice(), offset as u64, &raw) {
            Ok(()) => {
                debug!(offset, "signature verified");
                return Ok(offset);
            }
            Err(Error::VerificationFailed) => {
                replace_at(original.as_mut_slice(), offset, window, config.placeholder())?;
            }
            Err(e) => return Err(e),
        }
    }

    if candidates == 0 {
        Err(Error::SignatureNotFound)
    } else {
        Err(Error::VerificationFailed)
    }
}
