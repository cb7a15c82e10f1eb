//! Container-aware placeholder injection.
//!
//! Each injector turns a clean file into one holding exactly one placeholder
//! occurrence in a location its format treats as inert:
//!
//! - [`elf`] - a new non-loadable section
//! - [`pdf`] - a string object appended via incremental update
//! - [`zip`] - the archive comment field

pub mod elf;
pub mod pdf;
pub mod zip;

use crate::config::PlaceholderConfig;
use crate::placeholder::locate_unique;
use crate::{Error, Result};
use std::fmt;
use std::path::Path;

/// Container formats supported for placeholder injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// ELF32/ELF64 executable or shared object
    Elf,
    /// PDF document
    Pdf,
    /// ZIP archive, including JAR
    Zip,
}

impl ContainerFormat {
    /// Identifies the format of `data`.
    ///
    /// ELF and PDF are recognised by their magic bytes. Otherwise `path` is
    /// checked for a `.zip` or `.jar` extension, optionally followed by
    /// `.placeholder`.
    pub fn detect(data: &[u8], path: &Path) -> Option<Self> {
        if elf::is_elf(data) {
            return Some(ContainerFormat::Elf);
        }
        if pdf::is_pdf(data) {
            return Some(ContainerFormat::Pdf);
        }

        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let name = name.strip_suffix(".placeholder").unwrap_or(&name);
        if name.ends_with(".zip") || name.ends_with(".jar") {
            return Some(ContainerFormat::Zip);
        }
        None
    }

    /// Injects the configured placeholder into `data`.
    ///
    /// `section_name` is only used for ELF.
    pub fn inject(
        self,
        data: &[u8],
        config: &PlaceholderConfig,
        section_name: &str,
    ) -> Result<Vec<u8>> {
        match self {
            ContainerFormat::Elf => elf::inject(data, config.placeholder(), section_name),
            ContainerFormat::Pdf => pdf::inject(data, config.placeholder()),
            ContainerFormat::Zip => zip::inject(data, config.placeholder_str()),
        }
    }
}

/// Checks that an injector's output holds `placeholder` exactly once.
///
/// A second occurrence can only come from the input, and it always precedes
/// the injected one.
pub(crate) fn ensure_single(out: &[u8], placeholder: &[u8]) -> Result<()> {
    match locate_unique(out, placeholder) {
        Ok(_) => Ok(()),
        Err(Error::MultiplePlaceholders { first, .. }) => {
            Err(Error::PlaceholderExists { offset: first })
        }
        Err(e) => Err(e),
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerFormat::Elf => "ELF binary",
            ContainerFormat::Pdf => "PDF document",
            ContainerFormat::Zip => "ZIP file",
        };
        f.write_str(name)
    }
}
