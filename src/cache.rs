//! Open-file cache: whole-file contents shared by every opener of a path.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::parse::FileId;

#[derive(Debug)]
struct CachedFile {
    data: Vec<u8>,
    /// Server fid the contents were read through.
    fid: u32,
    references: u32,
}

/// Reference-counted file contents keyed by [`FileId`].
#[derive(Debug, Default)]
pub struct FileCache {
    entries: BTreeMap<FileId, CachedFile>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store freshly fetched contents for `id` and take a reference.
    ///
    /// An existing slot keeps its count; its old buffer is dropped and the
    /// fid it was read through is returned so the caller can release it.
    pub fn insert(&mut self, id: FileId, fid: u32, data: Vec<u8>) -> Option<u32> {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.data = data;
                entry.references += 1;
                let old = core::mem::replace(&mut entry.fid, fid);
                (old != fid).then_some(old)
            }
            None => {
                self.entries.insert(
                    id,
                    CachedFile {
                        data,
                        fid,
                        references: 1,
                    },
                );
                None
            }
        }
    }

    /// Copy from the cached contents of `id` starting at `cursor`.
    ///
    /// Returns the number of bytes copied: `dst.len()` clamped to what is
    /// left after `cursor`, or 0 when the slot is gone or the cursor is at
    /// or past the end.
    pub fn read(&self, id: FileId, cursor: u64, dst: &mut [u8]) -> usize {
        let Some(entry) = self.entries.get(&id) else {
            return 0;
        };
        let Ok(cursor) = usize::try_from(cursor) else {
            return 0;
        };
        let Some(remaining) = entry.data.get(cursor..) else {
            return 0;
        };
        let len = dst.len().min(remaining.len());
        dst[..len].copy_from_slice(&remaining[..len]);
        len
    }

    /// Drop one reference to `id`. When the last one goes, the slot is
    /// removed and the fid it owned is returned.
    pub fn release(&mut self, id: FileId) -> Option<u32> {
        let entry = self.entries.get_mut(&id)?;
        entry.references = entry.references.saturating_sub(1);
        if entry.references > 0 {
            return None;
        }
        self.entries.remove(&id).map(|entry| entry.fid)
    }

    pub fn references(&self, id: FileId) -> u32 {
        self.entries.get(&id).map_or(0, |entry| entry.references)
    }

    pub fn contains(&self, id: FileId) -> bool {
        self.entries.contains_key(&id)
    }
}
