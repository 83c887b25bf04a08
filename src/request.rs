//! Encoders for the requests this client sends.

use alloc::vec::Vec;

use crate::error::Error;
use crate::message::Message;
use crate::parse::path_parts;
use crate::protocol::*;

pub(crate) fn version(msize: u32, version: &str) -> Result<Vec<u8>, Error> {
    let mut msg = Message::new(TVERSION, NO_TAG);
    msg.push_u32(msize);
    msg.push_str(version)?;
    Ok(msg.finish())
}

/// Tattach for `fid`, without an auth fid.
pub(crate) fn attach(fid: u32, uname: &str, aname: &str, n_uname: u32) -> Result<Vec<u8>, Error> {
    let mut msg = Message::new(TATTACH, NO_TAG);
    msg.push_u32(fid);
    msg.push_u32(NO_FID);
    msg.push_str(uname)?;
    msg.push_str(aname)?;
    msg.push_u32(n_uname);
    Ok(msg.finish())
}

pub(crate) fn lopen(tag: u16, fid: u32) -> Vec<u8> {
    let mut msg = Message::new(TLOPEN, tag);
    msg.push_u32(fid);
    msg.push_u32(P9_DOTL_RDONLY);
    msg.finish()
}

/// Twalk carrying every element of `path` in one request.
///
/// The element count and the packet size are only known once the path has
/// been scanned, so both are written back after the elements.
pub(crate) fn walk(tag: u16, fid: u32, new_fid: u32, path: &str) -> Result<Vec<u8>, Error> {
    let mut msg = Message::new(TWALK, tag);
    msg.push_u32(fid);
    msg.push_u32(new_fid);
    let count_at = msg.len();
    msg.push_u16(0);

    let mut count = 0u16;
    for part in path_parts(path) {
        msg.push_str(part)?;
        count = count
            .checked_add(1)
            .ok_or(Error::NameTooLong(path.len()))?;
    }
    msg.patch_u16(count_at, count);
    Ok(msg.finish())
}

pub(crate) fn getattr(tag: u16, fid: u32, mask: u64) -> Vec<u8> {
    let mut msg = Message::new(TGETATTR, tag);
    msg.push_u32(fid);
    msg.push_u64(mask);
    msg.finish()
}

pub(crate) fn readdir(tag: u16, fid: u32, count: u32, offset: u64) -> Vec<u8> {
    let mut msg = Message::new(TREADDIR, tag);
    msg.push_u32(fid);
    msg.push_u64(offset);
    msg.push_u32(count);
    msg.finish()
}

/// Tread whose reply fits exactly in a `buffer_size` reply buffer.
pub(crate) fn read(tag: u16, fid: u32, offset: u64, buffer_size: u32) -> Vec<u8> {
    let mut msg = Message::new(TREAD, tag);
    msg.push_u32(fid);
    msg.push_u64(offset);
    msg.push_u32(buffer_size.saturating_sub(IO_HEADER_SIZE as u32));
    msg.finish()
}

pub(crate) fn clunk(tag: u16, fid: u32) -> Vec<u8> {
    let mut msg = Message::new(TCLUNK, tag);
    msg.push_u32(fid);
    msg.finish()
}
