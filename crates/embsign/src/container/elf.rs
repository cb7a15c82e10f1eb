//! ELF placeholder injection.
//!
//! The placeholder goes into a new `SHT_PROGBITS` section that no program
//! header maps, so the loader never sees it and the binary runs as before.
//! Nothing already in the file moves:
//!
//! 1. The placeholder and a grown copy of `.shstrtab` are appended
//! 2. A copy of the section header table, plus one new entry, is appended
//! 3. `e_shoff` and `e_shnum` are patched to point at the new table

use super::ensure_single;
use crate::{Error, Result};
use goblin::elf::section_header::SHT_PROGBITS;
use goblin::elf::Elf;
use tracing::debug;

/// Section name used when none is configured.
pub const DEFAULT_SECTION_NAME: &str = ".note.embsign";

const ELFMAG: &[u8; 4] = b"\x7fELF";
const EI_CLASS: usize = 4;
const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const SHN_LORESERVE: u16 = 0xff00;

/// Field positions that differ between ELF32 and ELF64.
struct Layout {
    /// Alignment of appended regions
    align: usize,
    /// Width of address-sized fields
    word: usize,
    e_shoff: usize,
    e_shnum: usize,
    /// Minimum `e_shentsize`
    entry_size: usize,
    sh_offset: usize,
    sh_size: usize,
    sh_addralign: usize,
}

const ELF64: Layout = Layout {
    align: 8,
    word: 8,
    e_shoff: 0x28,
    e_shnum: 0x3C,
    entry_size: 64,
    sh_offset: 24,
    sh_size: 32,
    sh_addralign: 48,
};

const ELF32: Layout = Layout {
    align: 4,
    word: 4,
    e_shoff: 0x20,
    e_shnum: 0x30,
    entry_size: 40,
    sh_offset: 16,
    sh_size: 20,
    sh_addralign: 32,
};

/// Returns true if `data` starts with the ELF magic.
pub fn is_elf(data: &[u8]) -> bool {
    data.starts_with(ELFMAG)
}

/// Returns a copy of `data` with `placeholder` stored in a new section.
///
/// # Errors
///
/// - [`Error::NotElf`] / [`Error::ElfUnsupported`] if the image is not a
///   32- or 64-bit ELF file
/// - [`Error::NoSectionHeaders`] if there is no usable section header table
/// - [`Error::SectionExists`] if `section_name` is already present
/// - [`Error::PlaceholderExists`] if `data` already contains `placeholder`
/// - [`Error::ElfMalformed`] if the tables are truncated or inconsistent
pub fn inject(data: &[u8], placeholder: &[u8], section_name: &str) -> Result<Vec<u8>> {
    if !is_elf(data) {
        return Err(Error::NotElf("missing ELF magic".into()));
    }
    let layout = match data.get(EI_CLASS).copied() {
        Some(ELFCLASS64) => &ELF64,
        Some(ELFCLASS32) => &ELF32,
        Some(class) => return Err(Error::ElfUnsupported(class)),
        None => return Err(Error::NotElf("truncated identification".into())),
    };
    if section_name.is_empty() || section_name.contains('\0') {
        return Err(Error::Config(format!("invalid ELF section name {section_name:?}")));
    }

    let elf = Elf::parse(data).map_err(|e| Error::NotElf(e.to_string()))?;
    let endian = Endian {
        little: elf.little_endian,
    };

    let shoff = to_usize(elf.header.e_shoff)?;
    let shentsize = usize::from(elf.header.e_shentsize);
    let shnum = elf.header.e_shnum;
    let shstrndx = elf.header.e_shstrndx;

    if shoff == 0 || shnum == 0 || shstrndx >= shnum {
        return Err(Error::NoSectionHeaders);
    }
    if shentsize < layout.entry_size {
        return Err(Error::ElfMalformed(format!(
            "section header entry size {shentsize} is below {}",
            layout.entry_size
        )));
    }
    if shnum >= SHN_LORESERVE - 1 {
        return Err(Error::ElfMalformed(format!("too many sections ({shnum})")));
    }

    let exists = elf
        .section_headers
        .iter()
        .any(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(section_name));
    if exists {
        return Err(Error::SectionExists(section_name.to_string()));
    }

    let table = shoff
        .checked_add(usize::from(shnum) * shentsize)
        .and_then(|end| data.get(shoff..end))
        .ok_or_else(|| Error::ElfMalformed("section header table is truncated".into()))?;

    let strtab_header = elf
        .section_headers
        .get(usize::from(shstrndx))
        .ok_or(Error::NoSectionHeaders)?;
    let strtab_start = to_usize(strtab_header.sh_offset)?;
    let strtab = to_usize(strtab_header.sh_size)
        .ok()
        .and_then(|size| strtab_start.checked_add(size))
        .and_then(|end| data.get(strtab_start..end))
        .ok_or_else(|| Error::ElfMalformed("section name table is truncated".into()))?;

    let name_offset = u32::try_from(strtab.len())
        .map_err(|_| Error::ElfMalformed("section name table is too large".into()))?;
    let mut new_strtab = Vec::with_capacity(strtab.len() + section_name.len() + 1);
    new_strtab.extend_from_slice(strtab);
    new_strtab.extend_from_slice(section_name.as_bytes());
    new_strtab.push(0);

    let grown = placeholder.len() + new_strtab.len() + table.len() + shentsize + 3 * layout.align;
    let mut out = Vec::with_capacity(data.len() + grown);
    out.extend_from_slice(data);

    pad_to(&mut out, layout.align);
    let placeholder_offset = out.len();
    out.extend_from_slice(placeholder);
    pad_to(&mut out, layout.align);

    let strtab_offset = out.len();
    out.extend_from_slice(&new_strtab);
    pad_to(&mut out, layout.align);

    let table_offset = out.len();
    out.extend_from_slice(table);

    let entry = table_offset + usize::from(shstrndx) * shentsize;
    endian.put_word(&mut out[entry + layout.sh_offset..], layout, strtab_offset)?;
    endian.put_word(&mut out[entry + layout.sh_size..], layout, new_strtab.len())?;

    let entry = out.len();
    out.resize(entry + shentsize, 0);
    endian.put_u32(&mut out[entry..], name_offset);
    endian.put_u32(&mut out[entry + 4..], SHT_PROGBITS);
    endian.put_word(&mut out[entry + layout.sh_offset..], layout, placeholder_offset)?;
    endian.put_word(&mut out[entry + layout.sh_size..], layout, placeholder.len())?;
    endian.put_word(&mut out[entry + layout.sh_addralign..], layout, 1)?;

    endian.put_word(&mut out[layout.e_shoff..], layout, table_offset)?;
    endian.put_u16(&mut out[layout.e_shnum..], shnum + 1);
    ensure_single(&out, placeholder)?;

    debug!(
        section = section_name,
        placeholder_offset,
        table_offset,
        sections = shnum + 1,
        "added ELF section"
    );
    Ok(out)
}

struct Endian {
    little: bool,
}

impl Endian {
    fn put_u16(&self, dst: &mut [u8], value: u16) {
        let bytes = if self.little { value.to_le_bytes() } else { value.to_be_bytes() };
        dst[..2].copy_from_slice(&bytes);
    }

    fn put_u32(&self, dst: &mut [u8], value: u32) {
        let bytes = if self.little { value.to_le_bytes() } else { value.to_be_bytes() };
        dst[..4].copy_from_slice(&bytes);
    }

    fn put_u64(&self, dst: &mut [u8], value: u64) {
        let bytes = if self.little { value.to_le_bytes() } else { value.to_be_bytes() };
        dst[..8].copy_from_slice(&bytes);
    }

    /// Writes an address-sized field for the image class.
    fn put_word(&self, dst: &mut [u8], layout: &Layout, value: usize) -> Result<()> {
        if layout.word == 8 {
            self.put_u64(dst, value as u64);
        } else {
            let value = u32::try_from(value)
                .map_err(|_| Error::ElfMalformed(format!("offset {value:#x} does not fit ELF32")))?;
            self.put_u32(dst, value);
        }
        Ok(())
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::ElfMalformed(format!("offset {value:#x} out of range")))
}

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let rem = buf.len() % align;
    if rem != 0 {
        buf.resize(buf.len() + align - rem, 0);
    }
}
