//! Placeholder and signature-prefix configuration.
//!
//! Signer and verifier must agree on the placeholder literal and on the
//! prefix written in front of the base64-encoded signature. Both travel
//! together in a [`PlaceholderConfig`], which checks at construction that an
//! encoded signature exactly fills the placeholder.

use crate::signature::{RawSignature, SIGNATURE_LENGTH};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as base64_engine, Engine};

/// Prefix written in front of every encoded signature.
pub const DEFAULT_PREFIX: &str = "us1-";

/// Placeholder reserved in prepared files.
///
/// 92 bytes: a 64-byte Ed25519 signature is 88 base64 characters with
/// padding, plus the 4-byte prefix.
pub const DEFAULT_PLACEHOLDER: &str =
    "us1-B64XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX===";

/// [`DEFAULT_PLACEHOLDER`] as a fixed-size array, for use in statics.
pub const DEFAULT_PLACEHOLDER_BYTES: [u8; DEFAULT_PLACEHOLDER.len()] = {
    let src = DEFAULT_PLACEHOLDER.as_bytes();
    let mut out = [0u8; DEFAULT_PLACEHOLDER.len()];
    let mut i = 0;
    while i < src.len() {
        out[i] = src[i];
        i += 1;
    }
    out
};

/// Maximum placeholder length accepted by any container.
pub const MAX_PLACEHOLDER_LEN: usize = u16::MAX as usize;

/// The placeholder literal and signature prefix shared by signer and verifier.
///
/// # Examples
///
/// ```
/// use embsign::PlaceholderConfig;
///
/// let config = PlaceholderConfig::default();
/// assert_eq!(config.placeholder().len(), 92);
/// assert_eq!(config.prefix(), b"us1-");
///
/// // Lengths that cannot hold an encoded signature are rejected up front.
/// assert!(PlaceholderConfig::new("us1-TOO-SHORT", "us1-").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderConfig {
    placeholder: String,
    prefix: String,
}

impl PlaceholderConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either value is empty or not ASCII, or
    /// if `prefix.len() + base64_len(64)` differs from `placeholder.len()`.
    pub fn new(placeholder: impl Into<String>, prefix: impl Into<String>) -> Result<Self> {
        let placeholder = placeholder.into();
        let prefix = prefix.into();

        if placeholder.is_empty() || prefix.is_empty() {
            return Err(Error::Config("placeholder and prefix must be non-empty".into()));
        }
        if !placeholder.is_ascii() || !prefix.is_ascii() {
            return Err(Error::Config("placeholder and prefix must be ASCII".into()));
        }

        let encoded = prefix.len() + encoded_signature_len();
        if encoded != placeholder.len() {
            return Err(Error::Config(format!(
                "prefix ({}) plus encoded signature ({}) is {} bytes, placeholder is {} bytes",
                prefix.len(),
                encoded_signature_len(),
                encoded,
                placeholder.len()
            )));
        }

        Ok(Self { placeholder, prefix })
    }

    /// Placeholder bytes.
    pub fn placeholder(&self) -> &[u8] {
        self.placeholder.as_bytes()
    }

    /// Placeholder as text.
    pub fn placeholder_str(&self) -> &str {
        &self.placeholder
    }

    /// Signature prefix bytes.
    pub fn prefix(&self) -> &[u8] {
        self.prefix.as_bytes()
    }

    /// Encodes a raw signature as prefix + standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureLength`] if the encoding would not exactly
    /// fill the placeholder. Writing it anyway would corrupt the container.
    pub fn encode_signature(&self, signature: &RawSignature) -> Result<String> {
        let mut encoded = String::with_capacity(self.placeholder.len());
        encoded.push_str(&self.prefix);
        base64_engine.encode_string(signature, &mut encoded);

        if encoded.len() != self.placeholder.len() {
            return Err(Error::SignatureLength {
                encoded: encoded.len(),
                placeholder: self.placeholder.len(),
            });
        }
        Ok(encoded)
    }

    /// Decodes a placeholder-sized window holding an encoded signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignatureEncoding`] if the window has the wrong
    /// length, lacks the prefix, is not base64, or does not decode to
    /// exactly 64 bytes.
    pub fn decode_signature(&self, window: &[u8]) -> Result<RawSignature> {
        if window.len() != self.placeholder.len() {
            return Err(Error::SignatureEncoding(format!(
                "expected {} bytes, got {}",
                self.placeholder.len(),
                window.len()
            )));
        }

        let body = window
            .strip_prefix(self.prefix())
            .ok_or_else(|| Error::SignatureEncoding("missing signature prefix".into()))?;

        let decoded = base64_engine
            .decode(body)
            .map_err(|e| Error::SignatureEncoding(format!("decoding signature: {e}")))?;

        RawSignature::try_from(decoded.as_slice()).map_err(|_| {
            Error::SignatureEncoding(format!(
                "decoded signature is {} bytes, expected {}",
                decoded.len(),
                SIGNATURE_LENGTH
            ))
        })
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Length of a padded base64 encoding of a raw signature.
fn encoded_signature_len() -> usize {
    SIGNATURE_LENGTH.div_ceil(3) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pair_satisfies_length_invariant() {
        let config = PlaceholderConfig::default();
        assert_eq!(DEFAULT_PLACEHOLDER.len(), 92);
        assert_eq!(encoded_signature_len(), 88);
        assert_eq!(DEFAULT_PREFIX.len() + encoded_signature_len(), 92);
        assert_eq!(
            PlaceholderConfig::new(DEFAULT_PLACEHOLDER, DEFAULT_PREFIX).unwrap(),
            config
        );
    }

    #[test]
    fn test_encode_fills_placeholder_exactly() {
        let config = PlaceholderConfig::default();
        for fill in [0x00u8, 0x7f, 0xff] {
            let encoded = config.encode_signature(&[fill; SIGNATURE_LENGTH]).unwrap();
            assert_eq!(encoded.len(), config.placeholder().len());
            assert!(encoded.starts_with(DEFAULT_PREFIX));
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        let config = PlaceholderConfig::default();
        let mut raw = [0u8; SIGNATURE_LENGTH];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let encoded = config.encode_signature(&raw).unwrap();
        assert_eq!(config.decode_signature(encoded.as_bytes()).unwrap(), raw);
    }

    #[test]
    fn test_placeholder_itself_does_not_decode() {
        let config = PlaceholderConfig::default();
        let result = config.decode_signature(config.placeholder());
        assert!(matches!(result, Err(Error::SignatureEncoding(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        let config = PlaceholderConfig::default();
        let mut encoded = config
            .encode_signature(&[1u8; SIGNATURE_LENGTH])
            .unwrap()
            .into_bytes();
        encoded[0] = b'x';
        assert!(matches!(
            config.decode_signature(&encoded),
            Err(Error::SignatureEncoding(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_lengths() {
        assert!(matches!(
            PlaceholderConfig::new(DEFAULT_PLACEHOLDER, "us-11"),
            Err(Error::Config(_))
        ));
        assert!(matches!(PlaceholderConfig::new("", ""), Err(Error::Config(_))));
    }

    #[test]
    fn test_new_accepts_other_prefix_of_same_length() {
        let placeholder = format!("sig:{}", "A".repeat(88));
        let config = PlaceholderConfig::new(placeholder, "sig:").unwrap();
        assert_eq!(config.prefix(), b"sig:");
        assert!(config.placeholder_str().starts_with("sig:AAA"));
    }

    #[test]
    fn test_new_rejects_non_ascii() {
        let placeholder = format!("é{}", "A".repeat(90));
        assert!(matches!(
            PlaceholderConfig::new(placeholder, "é-A"),
            Err(Error::Config(_))
        ));
    }
}
