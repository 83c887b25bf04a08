//! 9P session state and the round trips built on it.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::Error;
use crate::message::{check_response, read_attr, read_qid, read_str, read_u16, read_u32, read_header};
use crate::parse::{path_parts, write_dir_names};
use crate::protocol::*;
use crate::request;
use crate::transport::Transport;

/// A single 9P connection over one device.
///
/// The session owns the tag and fid counters. Every call performs its
/// exchanges to completion before returning; there is never more than one
/// request in flight.
pub struct P9Session {
    config: SessionConfig,
    msize: u32,
    next_tag: u16,
    next_fid: u32,
    live_fids: BTreeSet<u32>,
    transport: Box<dyn Transport>,
}

impl P9Session {
    /// Create a new session with the given transport. No traffic is sent yet.
    pub fn new(transport: Box<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            msize: MIN_MSIZE,
            config,
            next_tag: 1,
            next_fid: 0,
            live_fids: BTreeSet::new(),
            transport,
        }
    }

    /// Negotiated maximum message size.
    pub fn msize(&self) -> u32 {
        self.msize
    }

    /// Number of fids currently bound on the server.
    pub fn live_fids(&self) -> usize {
        self.live_fids.len()
    }

    /// Exchange Tversion/Rversion and return the message size both sides accept.
    pub fn negotiate_version(&mut self) -> Result<u32, Error> {
        let req = request::version(self.config.msize, &self.config.version)?;
        let resp = self.send_recv(req, RVERSION, NO_TAG, PAGE_SIZE)?;

        let mut offset = 0;
        let msize = read_u32(&resp, &mut offset)?;
        let version = read_str(&resp, &mut offset)?;
        if !version.eq_ignore_ascii_case(&self.config.version) {
            warn!(
                "RVERSION not accepted (req={}, resp={})",
                self.config.version, version
            );
            return Err(Error::UnsupportedVersion(version));
        }

        let msize = msize.min(self.config.msize);
        if msize < MIN_MSIZE {
            warn!("RVERSION msize {} below {}", msize, MIN_MSIZE);
            return Err(Error::MsizeTooSmall(msize));
        }
        self.msize = msize;
        info!("9p session speaks {} with msize {}", version, msize);
        Ok(msize)
    }

    /// Attach a fresh fid to the root of the exported tree.
    pub fn attach_root(&mut self) -> Result<u32, Error> {
        let fid = self.alloc_fid()?;
        let result = request::attach(
            fid,
            &self.config.uname,
            &self.config.aname,
            self.config.n_uname,
        )
        .and_then(|req| self.send_recv(req, RATTACH, NO_TAG, self.small_reply()));
        match result {
            Ok(_) => Ok(fid),
            Err(err) => {
                self.release_fid(fid);
                Err(err)
            }
        }
    }

    /// Open `fid` read-only. The fid itself is the open identity.
    pub fn open_handle(&mut self, fid: u32) -> Result<u32, Error> {
        let tag = self.alloc_tag();
        let req = request::lopen(tag, fid);
        self.send_recv(req, RLOPEN, tag, self.small_reply())?;
        Ok(fid)
    }

    /// Resolve `path` from `fid` in a single Twalk and return the new fid.
    pub fn walk(&mut self, fid: u32, path: &str) -> Result<u32, Error> {
        let new_fid = self.alloc_fid()?;
        match self.send_walk(fid, new_fid, path) {
            Ok(()) => Ok(new_fid),
            Err(err) => {
                self.release_fid(new_fid);
                Err(err)
            }
        }
    }

    fn send_walk(&mut self, fid: u32, new_fid: u32, path: &str) -> Result<(), Error> {
        let tag = self.alloc_tag();
        let req = request::walk(tag, fid, new_fid, path)?;
        let resp = match self.send_recv(req, RWALK, tag, self.small_reply()) {
            Err(Error::Remote { .. }) => return Err(Error::NotFound),
            other => other?,
        };

        let wanted = path_parts(path).len();
        let mut offset = 0;
        let nwqid = read_u16(&resp, &mut offset)? as usize;
        if nwqid < wanted {
            warn!("walk stopped after {} of {} elements", nwqid, wanted);
            return Err(Error::NotFound);
        }
        for _ in 0..nwqid {
            read_qid(&resp, &mut offset)?;
        }
        Ok(())
    }

    /// Fetch the attributes selected by `mask`.
    pub fn get_attr(&mut self, fid: u32, mask: u64) -> Result<FileAttr, Error> {
        let tag = self.alloc_tag();
        let req = request::getattr(tag, fid, mask);
        let resp = self.send_recv(req, RGETATTR, tag, self.small_reply())?;
        let mut offset = 0;
        read_attr(&resp, &mut offset)
    }

    pub fn get_size(&mut self, fid: u32) -> Result<u64, Error> {
        Ok(self.get_attr(fid, P9_GETATTR_SIZE)?.size)
    }

    /// Read one page of directory entries from the opened directory `fid`.
    ///
    /// `buf` receives `count[4]` followed by NUL-terminated names. `offset`
    /// is the server cookie to resume from (0 for the start) and is advanced
    /// to the last entry written. A page with a count of zero marks the end;
    /// a name too long for `buf` is `BufferTooSmall` rather than an empty page.
    pub fn list_directory(
        &mut self,
        fid: u32,
        buf: &mut [u8],
        offset: &mut u64,
    ) -> Result<usize, Error> {
        if buf.len() < 4 {
            return Err(Error::BufferTooSmall);
        }
        let count = self.msize as usize - IO_HEADER_SIZE;

        let tag = self.alloc_tag();
        let req = request::readdir(tag, fid, count as u32, *offset);
        let resp = self.send_recv(req, RREADDIR, tag, IO_HEADER_SIZE + count)?;

        let mut pos = 0;
        let data_len = read_u32(&resp, &mut pos)? as usize;
        let data = resp.get(pos..pos + data_len).ok_or(Error::ShortBuffer)?;

        let page = write_dir_names(data, buf)?;
        if page.count == 0 && !data.is_empty() {
            return Err(Error::BufferTooSmall);
        }
        if let Some(last) = page.last_offset {
            *offset = last;
        }
        debug!("readdir fid={} returned {} entries", fid, page.count);
        Ok(page.written)
    }

    /// One Tread at `offset`, filling the front of `dst`.
    ///
    /// The request never asks for more than `dst` holds nor more than one
    /// read chunk. Returns the number of bytes the server delivered.
    pub fn read_chunk(&mut self, fid: u32, offset: u64, dst: &mut [u8]) -> Result<usize, Error> {
        let buffer = self.chunk_size().min(dst.len() + IO_HEADER_SIZE);

        let tag = self.alloc_tag();
        let req = request::read(tag, fid, offset, buffer as u32);
        let resp = self.send_recv(req, RREAD, tag, buffer)?;

        let mut pos = 0;
        let data_len = read_u32(&resp, &mut pos)? as usize;
        let data = resp.get(pos..pos + data_len).ok_or(Error::ShortBuffer)?;
        let dst = dst.get_mut(..data_len).ok_or(Error::ShortBuffer)?;
        dst.copy_from_slice(data);
        Ok(data_len)
    }

    /// Fill `buf` from the start of the file with consecutive chunks.
    ///
    /// Stops when `buf` is full or the server returns an empty chunk, and
    /// returns the number of bytes read.
    pub fn read_into(&mut self, fid: u32, buf: &mut [u8]) -> Result<usize, Error> {
        let mut filled = 0;
        while filled < buf.len() {
            let got = self.read_chunk(fid, filled as u64, &mut buf[filled..])?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        Ok(filled)
    }

    /// Release `fid` on the server. The fid is free for reuse afterwards even
    /// if the server reports an error.
    pub fn clunk(&mut self, fid: u32) -> Result<(), Error> {
        self.release_fid(fid);
        let tag = self.alloc_tag();
        let req = request::clunk(tag, fid);
        self.send_recv(req, RCLUNK, tag, self.small_reply())?;
        Ok(())
    }

    fn chunk_size(&self) -> usize {
        self.config.read_chunk.min(self.msize) as usize
    }

    fn small_reply(&self) -> usize {
        PAGE_SIZE.min(self.msize as usize)
    }

    fn send_recv(
        &mut self,
        req: Vec<u8>,
        expect: u8,
        tag: u16,
        resp_len: usize,
    ) -> Result<Vec<u8>, Error> {
        if req.len() > self.msize as usize {
            warn!(
                "9p request type={} of {} bytes exceeds msize {}",
                expect - 1,
                req.len(),
                self.msize
            );
            return Err(Error::RequestTooLarge {
                size: req.len(),
                msize: self.msize,
            });
        }
        if let Ok(header) = read_header(&req) {
            debug!(
                "9p send type={} tag={} size={} reply_buf={}",
                header.msg_type, header.tag, header.size, resp_len
            );
        }
        let mut resp = vec![0u8; resp_len];
        let used = self.transport.send_paired(&req, &mut resp)?;
        let resp = &resp[..used.min(resp_len)];
        match check_response(resp, expect, tag) {
            Ok(body) => Ok(body.to_vec()),
            Err(err) => {
                warn!("9p request type={} failed: {}", expect - 1, err);
                Err(err)
            }
        }
    }

    fn alloc_tag(&mut self) -> u16 {
        let mut tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        if tag == NO_TAG {
            tag = self.next_tag;
            self.next_tag = self.next_tag.wrapping_add(1);
        }
        tag
    }

    fn alloc_fid(&mut self) -> Result<u32, Error> {
        if self.live_fids.len() >= NO_FID as usize {
            return Err(Error::FidExhausted);
        }
        loop {
            let fid = self.next_fid;
            self.next_fid = self.next_fid.wrapping_add(1);
            if fid != NO_FID && self.live_fids.insert(fid) {
                return Ok(fid);
            }
        }
    }

    fn release_fid(&mut self, fid: u32) {
        self.live_fids.remove(&fid);
    }
}
