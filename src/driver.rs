//! Filesystem-facing driver: path operations on top of a [`P9Session`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use log::{error, warn};

use crate::cache::FileCache;
use crate::config::SessionConfig;
use crate::error::{Error, FsError};
use crate::parse::FileId;
use crate::session::P9Session;
use crate::transport::Transport;

/// Per-open state handed back to the dispatch layer.
///
/// The dispatch layer owns `cursor`; reads never move it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: FileId,
    pub cursor: u64,
    pub size: u64,
}

/// Operations the virtual filesystem routes to a mounted driver.
pub trait FileSystemDriver {
    /// Resolve `path` and make its contents readable through the returned descriptor.
    fn open(&mut self, path: &str) -> Result<FileDescriptor, FsError>;

    /// Copy up to `buf.len()` bytes from the descriptor's cursor; 0 at end of file.
    fn read(&mut self, descriptor: &FileDescriptor, buf: &mut [u8]) -> usize;

    fn close(&mut self, descriptor: &FileDescriptor);

    /// Write one page of the directory at `path` into `buf` and return the
    /// bytes used. `offset` carries the continuation cookie between calls.
    fn list_contents(
        &mut self,
        path: &str,
        buf: &mut [u8],
        offset: &mut u64,
    ) -> Result<usize, FsError>;
}

/// Read-only 9P2000.L volume driver.
///
/// Callers must serialize access; the driver takes no locks of its own.
pub struct Virtio9pDriver {
    session: P9Session,
    cache: FileCache,
    root: u32,
}

impl Virtio9pDriver {
    /// Negotiate the protocol, attach to the exported root and open it.
    pub fn init(transport: Box<dyn Transport>, config: SessionConfig) -> Result<Self, Error> {
        let mut session = P9Session::new(transport, config);
        session.negotiate_version()?;
        let root = session.attach_root().inspect_err(|err| {
            error!("[virtio-9p] failed to attach: {}", err);
        })?;
        session.open_handle(root).inspect_err(|err| {
            error!("[virtio-9p] failed to open root directory: {}", err);
        })?;
        Ok(Self {
            session,
            cache: FileCache::new(),
            root,
        })
    }

    pub fn session(&self) -> &P9Session {
        &self.session
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn root_fid(&self) -> u32 {
        self.root
    }

    fn open_file(&mut self, path: &str) -> Result<FileDescriptor, Error> {
        let fid = self.session.walk(self.root, path).inspect_err(|_| {
            error!("[virtio-9p] failed to navigate to {}", path);
        })?;
        let data = match self.fetch(fid) {
            Ok(data) => data,
            Err(err) => {
                error!("[virtio-9p] failed to read {}: {}", path, err);
                self.forget(fid);
                return Err(err);
            }
        };

        let id = FileId::from_path(path);
        let size = data.len() as u64;
        if let Some(stale) = self.cache.insert(id, fid, data) {
            self.forget(stale);
        }
        Ok(FileDescriptor {
            id,
            cursor: 0,
            size,
        })
    }

    /// Read the whole file behind `fid` into a buffer of its reported size.
    fn fetch(&mut self, fid: u32) -> Result<Vec<u8>, Error> {
        let size = self.session.get_size(fid)?;
        let len = usize::try_from(size).map_err(|_| Error::FileTooLarge(size))?;
        self.session.open_handle(fid)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::FileTooLarge(size))?;
        data.resize(len, 0);
        let got = self.session.read_into(fid, &mut data)?;
        if got != len {
            return Err(Error::SizeMismatch {
                expected: size,
                got: got as u64,
            });
        }
        Ok(data)
    }

    fn list_dir(&mut self, path: &str, buf: &mut [u8], offset: &mut u64) -> Result<usize, Error> {
        let fid = self.session.walk(self.root, path).inspect_err(|_| {
            error!("[virtio-9p] failed to navigate to directory {}", path);
        })?;
        let result = self
            .session
            .open_handle(fid)
            .and_then(|fid| self.session.list_directory(fid, buf, offset));
        if let Err(err) = &result {
            error!("[virtio-9p] failed to list {}: {}", path, err);
        }
        self.forget(fid);
        result
    }

    fn forget(&mut self, fid: u32) {
        if let Err(err) = self.session.clunk(fid) {
            warn!("[virtio-9p] clunk of fid {} failed: {}", fid, err);
        }
    }
}

impl FileSystemDriver for Virtio9pDriver {
    fn open(&mut self, path: &str) -> Result<FileDescriptor, FsError> {
        Ok(self.open_file(path)?)
    }

    fn read(&mut self, descriptor: &FileDescriptor, buf: &mut [u8]) -> usize {
        self.cache.read(descriptor.id, descriptor.cursor, buf)
    }

    fn close(&mut self, descriptor: &FileDescriptor) {
        if let Some(fid) = self.cache.release(descriptor.id) {
            self.forget(fid);
        }
    }

    fn list_contents(
        &mut self,
        path: &str,
        buf: &mut [u8],
        offset: &mut u64,
    ) -> Result<usize, FsError> {
        Ok(self.list_dir(path, buf, offset)?)
    }
}
