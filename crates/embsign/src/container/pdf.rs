//! PDF placeholder injection via incremental update.
//!
//! The original bytes are kept as-is. A new indirect object holding the
//! placeholder as a literal string is appended, followed by a one-entry
//! cross-reference section and a trailer chaining back to the previous one
//! through `/Prev`.

use super::ensure_single;
use crate::{Error, Result};
use std::fmt;
use std::io::Write;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";
const STARTXREF: &[u8] = b"startxref";

/// Returns true if `data` starts with `%PDF-`.
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// Indirect object reference, `N G R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    pub number: u64,
    pub generation: u64,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// The trailer entries an incremental update needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// `/Size`: one past the highest object number
    pub size: u64,
    /// `/Root`: the document catalog
    pub root: ObjectRef,
}

impl Trailer {
    /// Reads the trailer for the cross-reference section at `offset`.
    ///
    /// A classic `xref` table has its dictionary after the `trailer`
    /// keyword. Anything else is taken to be a cross-reference stream, whose
    /// dictionary is read up to the `stream` keyword.
    pub fn at(data: &[u8], offset: usize) -> Result<Self> {
        let area = dictionary_area(data, offset)?;

        let size = value_of(area, b"/Size")
            .and_then(parse_uint)
            .map(|(size, _)| size)
            .ok_or_else(|| structure("missing or malformed /Size"))?;
        let root = value_of(area, b"/Root")
            .and_then(parse_ref)
            .ok_or_else(|| structure("missing or malformed /Root"))?;

        Ok(Self { size, root })
    }
}

/// Returns the offset recorded after the last `startxref` keyword.
pub fn find_last_startxref(data: &[u8]) -> Result<usize> {
    let at = rfind(data, STARTXREF).ok_or_else(|| structure("startxref not found"))?;
    let (offset, _) = parse_uint(&data[at + STARTXREF.len()..])
        .ok_or_else(|| structure("startxref is not followed by an offset"))?;
    usize::try_from(offset).map_err(|_| structure("startxref offset out of range"))
}

/// Returns a copy of `data` with an incremental update holding `placeholder`.
///
/// # Errors
///
/// - [`Error::NotPdf`] if the header is missing
/// - [`Error::PdfStructure`] if the trailer cannot be located or parsed
/// - [`Error::Config`] if the placeholder contains `(`, `)` or `\`
/// - [`Error::PlaceholderExists`] if `data` already contains `placeholder`
pub fn inject(data: &[u8], placeholder: &[u8]) -> Result<Vec<u8>> {
    if !is_pdf(data) {
        return Err(Error::NotPdf);
    }
    if let Some(&byte) = placeholder.iter().find(|&&b| matches!(b, b'(' | b')' | b'\\')) {
        return Err(Error::Config(format!(
            "placeholder contains {:?}, which cannot appear unescaped in a PDF string",
            byte as char
        )));
    }

    let prev = find_last_startxref(data)?;
    let trailer = Trailer::at(data, prev)?;
    let object = trailer.size;

    let mut out = Vec::with_capacity(data.len() + placeholder.len() + 256);
    out.extend_from_slice(data);
    out.push(b'\n');

    let object_offset = out.len();
    write!(out, "{object} 0 obj\n(")?;
    out.extend_from_slice(placeholder);
    out.extend_from_slice(b")\nendobj\n");

    let xref_offset = out.len();
    write!(out, "xref\n{object} 1\n{object_offset:010} 00000 n \n")?;
    write!(
        out,
        "trailer\n<< /Size {} /Prev {prev} /Root {} >>\n",
        object + 1,
        trailer.root
    )?;
    write!(out, "startxref\n{xref_offset}\n%%EOF\n")?;
    ensure_single(&out, placeholder)?;

    debug!(object, object_offset, xref_offset, prev, "appended PDF incremental update");
    Ok(out)
}

fn structure(message: &str) -> Error {
    Error::PdfStructure(message.to_string())
}

fn dictionary_area(data: &[u8], offset: usize) -> Result<&[u8]> {
    let chunk = data
        .get(offset..)
        .filter(|chunk| !chunk.is_empty())
        .ok_or_else(|| structure("cross-reference offset out of range"))?;
    let chunk = skip_whitespace(chunk);

    if chunk.starts_with(b"xref") {
        let start = find(chunk, b"trailer").ok_or_else(|| structure("trailer keyword not found"))?;
        let area = &chunk[start..];
        let end = find(area, STARTXREF).unwrap_or(area.len());
        Ok(&area[..end])
    } else {
        let end = find(chunk, b"stream").unwrap_or(chunk.len());
        Ok(&chunk[..end])
    }
}

/// Bytes following the first `key` that is a complete name token.
fn value_of<'a>(area: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let mut from = 0;
    while let Some(pos) = find(&area[from..], key) {
        let end = from + pos + key.len();
        match area.get(end) {
            Some(&b) if is_regular(b) => from = end,
            _ => return Some(&area[end..]),
        }
    }
    None
}

fn parse_ref(input: &[u8]) -> Option<ObjectRef> {
    let (number, rest) = parse_uint(input)?;
    if !rest.first()?.is_ascii_whitespace() {
        return None;
    }
    let (generation, rest) = parse_uint(rest)?;
    let rest = skip_whitespace(rest);
    if rest.first() != Some(&b'R') || rest.get(1).is_some_and(|&b| is_regular(b)) {
        return None;
    }
    Some(ObjectRef { number, generation })
}

/// Skips whitespace, then reads a non-negative decimal integer.
fn parse_uint(input: &[u8]) -> Option<(u64, &[u8])> {
    let input = skip_whitespace(input);
    let len = input.iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let value = std::str::from_utf8(&input[..len]).ok()?.parse().ok()?;
    Some((value, &input[len..]))
}

fn skip_whitespace(input: &[u8]) -> &[u8] {
    let start = input
        .iter()
        .position(|b| !(b.is_ascii_whitespace() || *b == 0))
        .unwrap_or(input.len());
    &input[start..]
}

fn is_regular(b: u8) -> bool {
    !(b.is_ascii_whitespace() || b == 0 || b"()<>[]{}/%".contains(&b))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PLACEHOLDER;
    use crate::placeholder::locate_unique;

    /// Catalog, empty page tree, classic xref table.
    fn classic_pdf() -> (Vec<u8>, usize) {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let obj1 = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let obj2 = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref = pdf.len();
        write!(
            pdf,
            "xref\n0 3\n0000000000 65535 f \n{obj1:010} 00000 n \n{obj2:010} 00000 n \n\
             trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .unwrap();
        (pdf, xref)
    }

    fn xref_stream_pdf(dictionary: &str) -> Vec<u8> {
        let mut pdf = b"%PDF-1.5\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_vec();
        let xref = pdf.len();
        write!(
            pdf,
            "3 0 obj\n{dictionary}\nstream\n/Size 99 /Root 9 0 R\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n"
        )
        .unwrap();
        pdf
    }

    #[test]
    fn test_inject_classic_xref() {
        let (pdf, xref) = classic_pdf();
        let placeholder = DEFAULT_PLACEHOLDER.as_bytes();
        let out = inject(&pdf, placeholder).unwrap();

        assert_eq!(&out[..pdf.len()], &pdf[..]);
        assert!(locate_unique(&out, placeholder).is_ok());

        let object = format!("3 0 obj\n({DEFAULT_PLACEHOLDER})\nendobj\n");
        let object_offset = find(&out, object.as_bytes()).unwrap();
        let update_xref = find_last_startxref(&out).unwrap();

        let expected = format!(
            "xref\n3 1\n{object_offset:010} 00000 n \ntrailer\n<< /Size 4 /Prev {xref} /Root 1 0 R >>\n"
        );
        assert_eq!(&out[update_xref..update_xref + expected.len()], expected.as_bytes());
        assert!(out.ends_with(format!("startxref\n{update_xref}\n%%EOF\n").as_bytes()));

        assert_eq!(
            Trailer::at(&out, update_xref).unwrap(),
            Trailer {
                size: 4,
                root: ObjectRef { number: 1, generation: 0 },
            }
        );
    }

    #[test]
    fn test_inject_chains_updates() {
        let (pdf, _) = classic_pdf();
        let first = inject(&pdf, b"first").unwrap();
        let first_xref = find_last_startxref(&first).unwrap();

        let second = inject(&first, b"second").unwrap();
        let second_xref = find_last_startxref(&second).unwrap();
        assert!(second_xref > first_xref);

        let trailer = format!("<< /Size 5 /Prev {first_xref} /Root 1 0 R >>");
        assert!(find(&second[second_xref..], trailer.as_bytes()).is_some());
        assert!(find(&second, b"4 0 obj\n(second)\nendobj\n").is_some());
    }

    #[test]
    fn test_same_placeholder_is_refused() {
        let (pdf, _) = classic_pdf();
        let placeholder = DEFAULT_PLACEHOLDER.as_bytes();
        let once = inject(&pdf, placeholder).unwrap();
        let existing = locate_unique(&once, placeholder).unwrap();

        let result = inject(&once, placeholder);
        assert!(matches!(result, Err(Error::PlaceholderExists { offset }) if offset == existing));
    }

    #[test]
    fn test_startxref_before_leading_whitespace() {
        let (pdf, xref) = classic_pdf();
        // Points at the newline ending the last object.
        assert_eq!(pdf[xref - 1], b'\n');
        assert_eq!(
            Trailer::at(&pdf, xref - 1).unwrap(),
            Trailer {
                size: 3,
                root: ObjectRef { number: 1, generation: 0 },
            }
        );

        // Keys past the table's startxref do not belong to its trailer.
        let text = String::from_utf8(pdf).unwrap().replace("/Size 3 ", "");
        let mut tricky = text.into_bytes();
        tricky.extend_from_slice(b"4 0 obj\n<< /Size 99 /Length 0 >>\nstream\nendstream\nendobj\n");
        assert!(matches!(Trailer::at(&tricky, xref - 1), Err(Error::PdfStructure(_))));
    }

    #[test]
    fn test_inject_xref_stream() {
        let pdf = xref_stream_pdf("<< /Type /XRef /Size 4 /Root 1 0 R /W [1 2 1] /Length 20 >>");
        let out = inject(&pdf, b"marker").unwrap();
        assert!(find(&out, b"4 0 obj\n(marker)\nendobj\n").is_some());
        assert!(find(&out, b"/Size 5 /Prev 58 /Root 1 0 R").is_some());
    }

    #[test]
    fn test_xref_stream_keys_come_from_dictionary_only() {
        let pdf = xref_stream_pdf("<< /Type /XRef /Size 4 /W [1 2 1] /Length 20 >>");
        assert!(matches!(inject(&pdf, b"marker"), Err(Error::PdfStructure(_))));
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(inject(b"%!PS-Adobe", b"x"), Err(Error::NotPdf)));
        assert!(matches!(inject(b"", b"x"), Err(Error::NotPdf)));
    }

    #[test]
    fn test_missing_structure() {
        assert!(matches!(
            inject(b"%PDF-1.4\nno cross reference here", b"x"),
            Err(Error::PdfStructure(_))
        ));
        assert!(matches!(
            inject(b"%PDF-1.4\nstartxref\n99999\n%%EOF\n", b"x"),
            Err(Error::PdfStructure(_))
        ));
        assert!(matches!(
            inject(b"%PDF-1.4\nstartxref\n%%EOF\n", b"x"),
            Err(Error::PdfStructure(_))
        ));

        let (pdf, _) = classic_pdf();
        let text = String::from_utf8(pdf).unwrap();
        let broken = text.replace("/Root 1 0 R", "/Root 1 0");
        assert!(matches!(inject(broken.as_bytes(), b"x"), Err(Error::PdfStructure(_))));
        let broken = text.replace("/Size 3", "/SizeX 3");
        assert!(matches!(inject(broken.as_bytes(), b"x"), Err(Error::PdfStructure(_))));
    }

    #[test]
    fn test_rejects_string_delimiters_in_placeholder() {
        let (pdf, _) = classic_pdf();
        for placeholder in [&b"a(b"[..], b"a)b", b"a\\b"] {
            assert!(matches!(inject(&pdf, placeholder), Err(Error::Config(_))));
        }
    }

    #[test]
    fn test_parse_ref() {
        assert_eq!(
            parse_ref(b" 12 0 R >>"),
            Some(ObjectRef { number: 12, generation: 0 })
        );
        assert_eq!(parse_ref(b"12 0 R/Info 3 0 R").map(|r| r.number), Some(12));
        assert_eq!(parse_ref(b"12 0 Rx"), None);
        assert_eq!(parse_ref(b"120 R"), None);
        assert_eq!(ObjectRef { number: 7, generation: 2 }.to_string(), "7 2 R");
    }
}
