//! Path handling and directory entry parsing.

use alloc::vec::Vec;

use crate::error::Error;
use crate::message::{read_bytes, read_qid, read_u64, read_u8};

/// Split a path into the elements sent on the wire.
///
/// Leading, trailing and repeated slashes contribute nothing; every other
/// segment, `.` and `..` included, is passed to the server verbatim.
pub(crate) fn path_parts(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Identity of a cached file, derived from its wire path elements.
///
/// Two spellings of the same path (`/a/b`, `a//b/`) map to the same id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u64);

impl FileId {
    pub fn from_path(path: &str) -> Self {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = FNV_OFFSET;
        for part in path_parts(path) {
            for byte in b"/".iter().chain(part.as_bytes()) {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        FileId(hash)
    }
}

/// Outcome of copying one Rreaddir payload into a caller buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DirPage {
    pub(crate) count: u32,
    pub(crate) written: usize,
    /// Cookie of the last record copied out.
    pub(crate) last_offset: Option<u64>,
}

/// Parse 9P2000.L readdir records into `count[4]` followed by NUL-terminated names.
///
/// Records are `qid[13] offset[8] type[1] name[s]`. Copying stops at the
/// first name that would overflow `out`; that record is left for the next page.
pub(crate) fn write_dir_names(data: &[u8], out: &mut [u8]) -> Result<DirPage, Error> {
    if out.len() < 4 {
        return Err(Error::BufferTooSmall);
    }
    let mut page = DirPage {
        written: 4,
        ..DirPage::default()
    };
    let mut offset = 0usize;
    while offset < data.len() {
        let _qid = read_qid(data, &mut offset)?;
        let entry_offset = read_u64(data, &mut offset)?;
        let _entry_type = read_u8(data, &mut offset)?;
        let name = read_bytes(data, &mut offset)?;

        let end = page.written + name.len() + 1;
        if end > out.len() {
            break;
        }
        out[page.written..end - 1].copy_from_slice(name);
        out[end - 1] = 0;
        page.written = end;
        page.count += 1;
        page.last_offset = Some(entry_offset);
    }
    out[..4].copy_from_slice(&page.count.to_le_bytes());
    Ok(page)
}
