//! Message builder and decoding helpers for 9P packets.
//!
//! All multi-byte fields are little-endian and carry no alignment; they are
//! written and read through byte slices only.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::Error;
use crate::protocol::{FileAttr, HEADER_SIZE, Qid, RERROR, RLERROR};

/// 9P message encoder with size prefix.
pub(crate) struct Message {
    buf: Vec<u8>,
}

impl Message {
    pub(crate) fn new(msg_type: u8, tag: u16) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.push(msg_type);
        buf.extend_from_slice(&tag.to_le_bytes());
        Self { buf }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    pub(crate) fn push_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn push_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn push_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn push_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn push_str(&mut self, value: &str) -> Result<(), Error> {
        let bytes = value.as_bytes();
        let len = u16::try_from(bytes.len()).map_err(|_| Error::NameTooLong(bytes.len()))?;
        self.push_u16(len);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Overwrite a previously pushed u16 at `pos`.
    pub(crate) fn patch_u16(&mut self, pos: usize, value: u16) {
        self.buf[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        let size = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&size.to_le_bytes());
        self.buf
    }
}

/// Decoded common header of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) size: u32,
    pub(crate) msg_type: u8,
    pub(crate) tag: u16,
}

pub(crate) fn read_header(buf: &[u8]) -> Result<Header, Error> {
    let mut offset = 0;
    let size = read_u32(buf, &mut offset)?;
    let msg_type = read_u8(buf, &mut offset)?;
    let tag = read_u16(buf, &mut offset)?;
    Ok(Header { size, msg_type, tag })
}

/// Validate a reply against the request it answers and return its body.
pub(crate) fn check_response(resp: &[u8], expect: u8, tag: u16) -> Result<&[u8], Error> {
    let header = read_header(resp)?;
    let size = header.size as usize;
    if size < HEADER_SIZE || size > resp.len() {
        return Err(Error::ShortBuffer);
    }
    if header.msg_type == RLERROR || header.msg_type == RERROR {
        return Err(Error::Remote {
            msg_type: header.msg_type,
        });
    }
    if header.msg_type != expect {
        return Err(Error::UnexpectedResponse {
            expected: expect,
            got: header.msg_type,
        });
    }
    if header.tag != tag {
        return Err(Error::TagMismatch {
            expected: tag,
            got: header.tag,
        });
    }
    Ok(&resp[HEADER_SIZE..size])
}

pub(crate) fn read_u8(buf: &[u8], offset: &mut usize) -> Result<u8, Error> {
    let value = *buf.get(*offset).ok_or(Error::ShortBuffer)?;
    *offset += 1;
    Ok(value)
}

fn read_array<const N: usize>(buf: &[u8], offset: &mut usize) -> Result<[u8; N], Error> {
    let bytes = buf
        .get(*offset..*offset + N)
        .ok_or(Error::ShortBuffer)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    *offset += N;
    Ok(out)
}

pub(crate) fn read_u16(buf: &[u8], offset: &mut usize) -> Result<u16, Error> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

pub(crate) fn read_u32(buf: &[u8], offset: &mut usize) -> Result<u32, Error> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

pub(crate) fn read_u64(buf: &[u8], offset: &mut usize) -> Result<u64, Error> {
    read_array(buf, offset).map(u64::from_le_bytes)
}

/// Read a `len[2] bytes[len]` field without interpreting the bytes.
pub(crate) fn read_bytes<'a>(buf: &'a [u8], offset: &mut usize) -> Result<&'a [u8], Error> {
    let len = read_u16(buf, offset)? as usize;
    let value = buf
        .get(*offset..*offset + len)
        .ok_or(Error::ShortBuffer)?;
    *offset += len;
    Ok(value)
}

pub(crate) fn read_str(buf: &[u8], offset: &mut usize) -> Result<String, Error> {
    let bytes = read_bytes(buf, offset)?;
    let value = core::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
    Ok(value.to_string())
}

pub(crate) fn read_qid(buf: &[u8], offset: &mut usize) -> Result<Qid, Error> {
    let type_ = read_u8(buf, offset)?;
    let version = read_u32(buf, offset)?;
    let path = read_u64(buf, offset)?;
    Ok(Qid {
        type_,
        version,
        path,
    })
}

/// Decode an Rgetattr body.
pub(crate) fn read_attr(buf: &[u8], offset: &mut usize) -> Result<FileAttr, Error> {
    let valid = read_u64(buf, offset)?;
    let qid = read_qid(buf, offset)?;
    let mode = read_u32(buf, offset)?;
    let uid = read_u32(buf, offset)?;
    let gid = read_u32(buf, offset)?;
    let nlink = read_u64(buf, offset)?;
    let rdev = read_u64(buf, offset)?;
    let size = read_u64(buf, offset)?;
    let blksize = read_u64(buf, offset)?;
    let blocks = read_u64(buf, offset)?;
    let mut times = [(0u64, 0u64); 4];
    for time in times.iter_mut() {
        *time = (read_u64(buf, offset)?, read_u64(buf, offset)?);
    }
    let generation = read_u64(buf, offset)?;
    let data_version = read_u64(buf, offset)?;
    Ok(FileAttr {
        valid,
        qid,
        mode,
        uid,
        gid,
        nlink,
        rdev,
        size,
        blksize,
        blocks,
        atime: times[0],
        mtime: times[1],
        ctime: times[2],
        btime: times[3],
        generation,
        data_version,
    })
}
