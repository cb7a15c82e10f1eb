//! ZIP/JAR placeholder injection through the archive comment.
//!
//! Members are copied raw, so compressed data, CRCs and local headers are
//! carried over byte for byte. Only the end-of-central-directory comment
//! changes. An existing comment is replaced.

use super::ensure_single;
use crate::config::MAX_PLACEHOLDER_LEN;
use crate::{Error, Result};
use std::io::Cursor;
use tracing::debug;
use zip::{ZipArchive, ZipWriter};

/// Returns a copy of the archive in `data` with `placeholder` as its comment.
///
/// # Errors
///
/// - [`Error::CommentTooLarge`] if the placeholder exceeds 65535 bytes
/// - [`Error::ZipCorrupted`] if the archive cannot be read
/// - [`Error::PlaceholderExists`] if a member already contains `placeholder`
/// - [`Error::Zip`] if writing the new archive fails
pub fn inject(data: &[u8], placeholder: &str) -> Result<Vec<u8>> {
    if placeholder.len() > MAX_PLACEHOLDER_LEN {
        return Err(Error::CommentTooLarge {
            len: placeholder.len(),
        });
    }

    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(Error::ZipCorrupted)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(data.len() + placeholder.len())));

    for i in 0..archive.len() {
        let file = archive.by_index_raw(i).map_err(Error::ZipCorrupted)?;
        writer.raw_copy_file(file)?;
    }

    writer.set_comment(placeholder);
    let out = writer.finish()?.into_inner();
    ensure_single(&out, placeholder.as_bytes())?;

    debug!(entries = archive.len(), comment_len = placeholder.len(), "rewrote ZIP archive");
    Ok(out)
}

/// Returns the archive comment.
pub fn read_comment(data: &[u8]) -> Result<Vec<u8>> {
    let archive = ZipArchive::new(Cursor::new(data)).map_err(Error::ZipCorrupted)?;
    Ok(archive.comment().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PLACEHOLDER;
    use crate::placeholder::locate_unique;
    use std::io::{Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    fn sample_archive() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("META-INF/MANIFEST.MF", stored).unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();

        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file("com/example/Main.class", deflated).unwrap();
        writer.write_all(&[0xCA, 0xFE, 0xBA, 0xBE].repeat(64)).unwrap();

        writer.set_comment("built by hand");
        writer.finish().unwrap().into_inner()
    }

    fn entries(data: &[u8]) -> Vec<(String, CompressionMethod, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut contents = Vec::new();
                file.read_to_end(&mut contents).unwrap();
                (file.name().to_string(), file.compression(), contents)
            })
            .collect()
    }

    #[test]
    fn test_inject_sets_comment_and_keeps_entries() {
        let data = sample_archive();
        assert_eq!(read_comment(&data).unwrap(), b"built by hand");

        let out = inject(&data, DEFAULT_PLACEHOLDER).unwrap();
        assert_eq!(read_comment(&out).unwrap(), DEFAULT_PLACEHOLDER.as_bytes());
        assert_eq!(entries(&out), entries(&data));
        assert!(locate_unique(&out, DEFAULT_PLACEHOLDER.as_bytes()).is_ok());
    }

    #[test]
    fn test_reinjection_replaces_comment() {
        let once = inject(&sample_archive(), "first").unwrap();
        let twice = inject(&once, DEFAULT_PLACEHOLDER).unwrap();
        assert_eq!(read_comment(&twice).unwrap(), DEFAULT_PLACEHOLDER.as_bytes());
        assert!(locate_unique(&twice, b"first").is_err());

        // The old comment is dropped, so the same placeholder can be set again.
        let again = inject(&twice, DEFAULT_PLACEHOLDER).unwrap();
        assert_eq!(read_comment(&again).unwrap(), DEFAULT_PLACEHOLDER.as_bytes());
        assert!(locate_unique(&again, DEFAULT_PLACEHOLDER.as_bytes()).is_ok());
    }

    #[test]
    fn test_rejects_member_holding_placeholder() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("signature.txt", stored).unwrap();
        writer.write_all(DEFAULT_PLACEHOLDER.as_bytes()).unwrap();
        let data = writer.finish().unwrap().into_inner();
        let existing = locate_unique(&data, DEFAULT_PLACEHOLDER.as_bytes()).unwrap();

        let result = inject(&data, DEFAULT_PLACEHOLDER);
        assert!(matches!(result, Err(Error::PlaceholderExists { offset }) if offset == existing));
    }

    #[test]
    fn test_comment_too_large() {
        let placeholder = "X".repeat(MAX_PLACEHOLDER_LEN + 1);
        let result = inject(&sample_archive(), &placeholder);
        assert!(matches!(result, Err(Error::CommentTooLarge { len }) if len == 65536));
    }

    #[test]
    fn test_corrupted_archive() {
        assert!(matches!(inject(b"PK\x03\x04 not really", "x"), Err(Error::ZipCorrupted(_))));
        assert!(matches!(read_comment(b""), Err(Error::ZipCorrupted(_))));
    }
}
