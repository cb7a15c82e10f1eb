//! Error types for embsign operations.
//!
//! This module defines the [`enum@Error`] enum covering every failure in
//! placeholder injection, signing, and verification, plus [`KeyError`] for
//! key loading. Every variant maps to a [`Stage`] so callers can tell
//! "this file is not a supported container" apart from "this file's
//! signature was tampered with".
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for embsign operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Match on variants to handle specific failure cases, or call [`Error::stage`]
/// to group them.
///
/// # Examples
///
/// ```no_run
/// use embsign::{EmbSign, Error, Stage};
///
/// let result = EmbSign::new().public_key("id_ed25519.pub").verify_file("app.signed");
/// match result {
///     Ok(offset) => println!("Signature at offset {offset}"),
///     Err(Error::VerificationFailed) => eprintln!("Tampered!"),
///     Err(e) if e.stage() == Stage::Parse => eprintln!("Unsupported input: {e}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O operation on a specific file failed.
    #[error("{}: {source}", path.display())]
    File {
        /// File being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Input does not carry the ELF magic or cannot be parsed as ELF.
    #[error("Not an ELF binary: {0}")]
    NotElf(String),

    /// ELF class byte is neither ELFCLASS32 nor ELFCLASS64.
    #[error("Unsupported ELF class {0}")]
    ElfUnsupported(u8),

    /// ELF image has no section header table or no section name table.
    #[error("ELF file has no section headers")]
    NoSectionHeaders,

    /// ELF tables are truncated or inconsistent.
    #[error("Malformed ELF: {0}")]
    ElfMalformed(String),

    /// A section with the requested name is already present.
    ///
    /// Guards against injecting twice into the same binary.
    #[error("Section {0} already exists in ELF binary")]
    SectionExists(String),

    /// Input already carries the placeholder, so injecting would leave two.
    #[error("Placeholder already present at offset {offset}")]
    PlaceholderExists {
        /// Offset of the existing occurrence
        offset: usize,
    },

    /// Input does not start with `%PDF-`.
    #[error("File is not a valid PDF")]
    NotPdf,

    /// Cross-reference or trailer information could not be read.
    #[error("Unable to parse PDF structure: {0}")]
    PdfStructure(String),

    /// ZIP archive could not be opened or read.
    #[error("ZIP archive is corrupted or invalid: {0}")]
    ZipCorrupted(#[source] zip::result::ZipError),

    /// ZIP archive could not be written.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Placeholder does not fit in the ZIP comment field.
    #[error("Comment of {len} bytes is too large for ZIP format (max 65535 bytes)")]
    CommentTooLarge {
        /// Requested comment length
        len: usize,
    },

    /// Input format could not be identified.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Placeholder is not present in the buffer.
    #[error("Placeholder not found in buffer")]
    PlaceholderNotFound,

    /// Placeholder is present more than once, so the signing offset is ambiguous.
    #[error("Placeholder found more than once (offsets {first} and {second})")]
    MultiplePlaceholders {
        /// Offset of the first occurrence
        first: usize,
        /// Offset of the next occurrence after it
        second: usize,
    },

    /// Replacement value and expected old value differ in length.
    #[error("Replacement length {actual} does not match expected length {expected}")]
    LengthMismatch {
        /// Length of the value being replaced
        expected: usize,
        /// Length of the replacement
        actual: usize,
    },

    /// Replacement range falls outside the buffer.
    #[error("Offset {offset} with length {len} is out of range for a buffer of {buffer_len} bytes")]
    InvalidOffset {
        /// Requested offset
        offset: usize,
        /// Length of the replaced range
        len: usize,
        /// Length of the buffer
        buffer_len: usize,
    },

    /// Bytes at the offset are not the expected old value.
    #[error("Bytes at offset {offset} do not match the expected value")]
    Mismatch {
        /// Offset that was checked
        offset: usize,
    },

    /// Encoded signature length differs from the placeholder length.
    #[error("Encoded signature length ({encoded}) doesn't match placeholder length ({placeholder})")]
    SignatureLength {
        /// Prefix plus base64 length
        encoded: usize,
        /// Placeholder length
        placeholder: usize,
    },

    /// The signing capability failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Key material could not be loaded.
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// No embedded signature could be found.
    #[error("File does not contain a signature")]
    SignatureNotFound,

    /// Embedded signature is not valid prefix + base64 of the expected size.
    #[error("Malformed signature: {0}")]
    SignatureEncoding(String),

    /// Signature does not match the file contents.
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading signing or verification keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key material is not a parsable OpenSSH key.
    #[error("failed to parse key: {0}")]
    Parse(String),

    /// Key is encrypted and no passphrase was supplied.
    #[error("key is encrypted; a passphrase is required")]
    PassphraseRequired,

    /// Passphrase did not decrypt the key.
    #[error("wrong passphrase")]
    WrongPassphrase,

    /// Key uses an algorithm other than Ed25519.
    #[error("key is not an ed25519 key (got {0})")]
    UnsupportedAlgorithm(String),

    /// Stored public half does not belong to the private key.
    #[error("public key does not match private key")]
    KeyMismatch,
}

/// Stage of an operation at which an [`enum@Error`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading or writing files
    Io,
    /// Recognising or parsing a container format
    Parse,
    /// Preparing a container with a placeholder
    Inject,
    /// Locating the placeholder or an embedded signature
    Locate,
    /// Substituting bytes in place
    Replace,
    /// Producing or encoding a signature
    Sign,
    /// Checking a signature
    Verify,
    /// Loading key material
    Key,
    /// Validating configuration
    Config,
}

impl Error {
    /// Returns the stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Error::Io(_) | Error::File { .. } => Stage::Io,
            Error::NotElf(_)
            | Error::ElfUnsupported(_)
            | Error::NoSectionHeaders
            | Error::ElfMalformed(_)
            | Error::NotPdf
            | Error::PdfStructure(_)
            | Error::ZipCorrupted(_)
            | Error::UnsupportedFormat(_) => Stage::Parse,
            Error::SectionExists(_)
            | Error::PlaceholderExists { .. }
            | Error::CommentTooLarge { .. }
            | Error::Zip(_) => Stage::Inject,
            Error::PlaceholderNotFound
            | Error::MultiplePlaceholders { .. }
            | Error::SignatureNotFound => Stage::Locate,
            Error::LengthMismatch { .. } | Error::InvalidOffset { .. } | Error::Mismatch { .. } => {
                Stage::Replace
            }
            Error::SignatureLength { .. } | Error::Signing(_) => Stage::Sign,
            Error::SignatureEncoding(_) | Error::VerificationFailed => Stage::Verify,
            Error::Key(_) => Stage::Key,
            Error::Config(_) => Stage::Config,
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Io => "io",
            Stage::Parse => "format-parse",
            Stage::Inject => "inject",
            Stage::Locate => "locate",
            Stage::Replace => "replace",
            Stage::Sign => "sign",
            Stage::Verify => "verify",
            Stage::Key => "key",
            Stage::Config => "config",
        };
        f.write_str(name)
    }
}
