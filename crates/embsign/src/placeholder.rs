//! Placeholder location and same-length replacement.
//!
//! Signing depends on one invariant: the signature can only be dropped into
//! a buffer by exact, same-length substitution at a known offset. The
//! locator guarantees the offset is unambiguous and the replacer guarantees
//! the substitution is well-defined.

use crate::{Error, Result};

/// Returns the offset of the first occurrence of `placeholder` in `buffer`.
///
/// This is a primitive only. Signing must go through [`locate_unique`],
/// since a buffer with several candidates would let an attacker choose
/// which one receives a valid signature.
///
/// # Errors
///
/// Returns [`Error::PlaceholderNotFound`] if `placeholder` is empty, longer
/// than `buffer`, or absent.
pub fn locate_first(buffer: &[u8], placeholder: &[u8]) -> Result<usize> {
    find(buffer, placeholder).ok_or(Error::PlaceholderNotFound)
}

/// Returns the offset of the only occurrence of `placeholder` in `buffer`.
///
/// After the first match, the remainder of the buffer starting right after
/// that match is searched for another occurrence.
///
/// # Errors
///
/// - [`Error::PlaceholderNotFound`] if there is no occurrence
/// - [`Error::MultiplePlaceholders`] if there is more than one, including
///   directly adjacent occurrences
pub fn locate_unique(buffer: &[u8], placeholder: &[u8]) -> Result<usize> {
    let first = locate_first(buffer, placeholder)?;
    let rest = first + placeholder.len();

    match find(&buffer[rest..], placeholder) {
        Some(next) => Err(Error::MultiplePlaceholders {
            first,
            second: rest + next,
        }),
        None => Ok(first),
    }
}

/// Overwrites `expected_old` at `offset` with `new_value`.
///
/// # Errors
///
/// - [`Error::LengthMismatch`] if the two values differ in length
/// - [`Error::InvalidOffset`] if the range does not fit in `buffer`
/// - [`Error::Mismatch`] if the bytes at `offset` are not `expected_old`,
///   which means the buffer is stale or was already modified
pub fn replace_at(
    buffer: &mut [u8],
    offset: usize,
    new_value: &[u8],
    expected_old: &[u8],
) -> Result<()> {
    if new_value.len() != expected_old.len() {
        return Err(Error::LengthMismatch {
            expected: expected_old.len(),
            actual: new_value.len(),
        });
    }

    let len = expected_old.len();
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= buffer.len())
        .ok_or(Error::InvalidOffset {
            offset,
            len,
            buffer_len: buffer.len(),
        })?;

    let target = &mut buffer[offset..end];
    if target != expected_old {
        return Err(Error::Mismatch { offset });
    }

    target.copy_from_slice(new_value);
    Ok(())
}

/// Iterates over every occurrence of `needle` in `buffer`, overlapping ones
/// included.
pub fn occurrences<'a>(buffer: &'a [u8], needle: &'a [u8]) -> Occurrences<'a> {
    Occurrences {
        buffer,
        needle,
        pos: 0,
    }
}

/// Iterator returned by [`occurrences`].
pub struct Occurrences<'a> {
    buffer: &'a [u8],
    needle: &'a [u8],
    pos: usize,
}

impl Iterator for Occurrences<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.pos + find(self.buffer.get(self.pos..)?, self.needle)?;
        self.pos = found + 1;
        Some(found)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
