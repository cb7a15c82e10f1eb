//! Embedded signatures for ELF binaries, PDF documents, and ZIP/JAR archives.
//!
//! A file is first prepared so that it contains exactly one placeholder
//! string in a location its format ignores. Signing replaces that placeholder
//! with an equal-length encoded Ed25519 signature, so the file stays valid in
//! its original format and carries its own signature.
//!
//! ```no_run
//! use embsign::EmbSign;
//!
//! let embsign = EmbSign::new()
//!     .private_key("id_ed25519")
//!     .public_key("id_ed25519.pub");
//!
//! embsign.inject_placeholder("app", "app.placeholder")?;
//! embsign.sign_file("app.placeholder", "app.signed")?;
//! embsign.verify_file("app.signed")?;
//! # Ok::<(), embsign::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod container;
pub mod embed;
pub mod error;
pub mod keys;
mod macros;
pub mod placeholder;
pub mod signature;

pub use builder::EmbSign;
pub use config::PlaceholderConfig;
pub use container::ContainerFormat;
pub use embed::{sign_buffer, verify_buffer};
pub use error::{Error, KeyError, Stage};
pub use keys::{load_signer, load_verifier, Ed25519Signer, Ed25519Verifier};
pub use signature::{RawSignature, SigningCapability, VerificationCapability};

pub type Result<T> = std::result::Result<T, Error>;
