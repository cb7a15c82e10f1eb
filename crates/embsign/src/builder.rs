//! EmbSign builder API
//!
//! Provides a builder pattern interface over placeholder injection, signing,
//! and verification of files on disk.

use crate::config::PlaceholderConfig;
use crate::container::elf::DEFAULT_SECTION_NAME;
use crate::container::ContainerFormat;
use crate::embed::{sign_buffer, verify_buffer};
use crate::keys::{load_signer, load_verifier};
use crate::{Error, Result};
use secrecy::SecretString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Embedded-signature tool with builder pattern API.
///
/// # Example
///
/// ```no_run
/// use embsign::EmbSign;
///
/// EmbSign::new()
///     .private_key("id_ed25519")
///     .passphrase("secret")
///     .sign_file("report.pdf.placeholder", "report.pdf")?;
/// # Ok::<(), embsign::Error>(())
/// ```
#[derive(Clone)]
pub struct EmbSign {
    private_key: Option<PathBuf>,
    public_key: Option<PathBuf>,
    passphrase: Option<SecretString>,
    placeholder: PlaceholderConfig,
    section_name: String,
}

impl EmbSign {
    /// Create a new EmbSign builder with the default placeholder.
    pub fn new() -> Self {
        Self {
            private_key: None,
            public_key: None,
            passphrase: None,
            placeholder: PlaceholderConfig::default(),
            section_name: DEFAULT_SECTION_NAME.to_string(),
        }
    }

    /// Set the OpenSSH private key used for signing.
    pub fn private_key(mut self, path: impl AsRef<Path>) -> Self {
        self.private_key = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the OpenSSH public key used for verification.
    pub fn public_key(mut self, path: impl AsRef<Path>) -> Self {
        self.public_key = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the passphrase for an encrypted private key.
    ///
    /// The passphrase is stored securely and will be zeroized when dropped.
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::new(passphrase.into()));
        self
    }

    /// Set the placeholder and signature prefix.
    pub fn placeholder(mut self, config: PlaceholderConfig) -> Self {
        self.placeholder = config;
        self
    }

    /// Set the ELF section name used by [`inject_placeholder`](Self::inject_placeholder).
    pub fn section_name(mut self, name: impl Into<String>) -> Self {
        self.section_name = name.into();
        self
    }

    /// Placeholder configuration in use.
    pub fn placeholder_config(&self) -> &PlaceholderConfig {
        &self.placeholder
    }

    /// Check that a private key is configured.
    pub fn validate_for_signing(&self) -> Result<()> {
        if self.private_key.is_none() {
            return Err(Error::Config("Must specify a private key for signing".into()));
        }
        Ok(())
    }

    /// Check that a public key is configured.
    pub fn validate_for_verifying(&self) -> Result<()> {
        if self.public_key.is_none() {
            return Err(Error::Config("Must specify a public key for verification".into()));
        }
        Ok(())
    }

    /// Sign a prepared buffer in place. Returns the signature offset.
    pub fn sign_bytes(&self, buffer: &mut [u8]) -> Result<usize> {
        self.validate_for_signing()?;
        let key = self
            .private_key
            .as_ref()
            .ok_or_else(|| Error::Config("No private key configured".into()))?;
        let signer = load_signer(key, self.passphrase.as_ref())?;
        sign_buffer(buffer, &signer, &self.placeholder)
    }

    /// Verify a signed buffer. Returns the signature offset.
    pub fn verify_bytes(&self, buffer: &[u8]) -> Result<usize> {
        self.validate_for_verifying()?;
        let key = self
            .public_key
            .as_ref()
            .ok_or_else(|| Error::Config("No public key configured".into()))?;
        let verifier = load_verifier(key)?;
        verify_buffer(buffer, &verifier, &self.placeholder)
    }

    /// Sign a prepared file.
    ///
    /// Reads `input`, replaces its single placeholder with the signature, and
    /// atomically writes the result to `output`. The input is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No private key is configured or it cannot be loaded
    /// - The input does not contain exactly one placeholder
    /// - `output` is the same file as `input`, or cannot be written
    pub fn sign_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<usize> {
        let (input, output) = (input.as_ref(), output.as_ref());
        ensure_distinct(input, output)?;

        let mut data = read(input)?;
        let offset = self.sign_bytes(&mut data)?;
        write_output(input, output, &data)?;

        info!(input = %input.display(), output = %output.display(), offset, "signed");
        Ok(offset)
    }

    /// Verify a signed file. Returns the signature offset.
    pub fn verify_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let data = read(path)?;
        let offset = self.verify_bytes(&data)?;

        info!(path = %path.display(), offset, "signature verified");
        Ok(offset)
    }

    /// Inject the placeholder into a file, detecting its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the format cannot be
    /// detected, or the injector's error.
    pub fn inject_placeholder(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<ContainerFormat> {
        let (input, output) = (input.as_ref(), output.as_ref());
        ensure_distinct(input, output)?;

        let data = read(input)?;
        let format = ContainerFormat::detect(&data, input)
            .ok_or_else(|| Error::UnsupportedFormat(input.display().to_string()))?;
        debug!(input = %input.display(), %format, "detected format");

        let prepared = format.inject(&data, &self.placeholder, &self.section_name)?;
        write_output(input, output, &prepared)?;

        info!(input = %input.display(), output = %output.display(), %format, "placeholder injected");
        Ok(format)
    }
}

impl Default for EmbSign {
    fn default() -> Self {
        Self::new()
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::file(path, e))
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(Error::Config(format!(
            "output path {} must differ from the input",
            output.display()
        )));
    }
    Ok(())
}

/// Writes `data` next to `output` and renames it into place.
///
/// The new file takes the permissions of `input`.
fn write_output(input: &Path, output: &Path, data: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::file(dir, e))?;
    tmp.write_all(data).map_err(|e| Error::file(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::file(tmp.path(), e))?;

    let permissions = fs::metadata(input)
        .map_err(|e| Error::file(input, e))?
        .permissions();
    fs::set_permissions(tmp.path(), permissions).map_err(|e| Error::file(tmp.path(), e))?;

    tmp.persist(output).map_err(|e| Error::file(output, e.error))?;
    Ok(())
}
