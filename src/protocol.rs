//! 9P2000.L protocol constants and data types.

/// Special values used by the protocol.
pub const NO_FID: u32 = 0xFFFF_FFFF;
pub const NO_TAG: u16 = 0xFFFF;

pub const RLERROR: u8 = 7;
pub const TLOPEN: u8 = 12;
pub const RLOPEN: u8 = 13;
pub const TGETATTR: u8 = 24;
pub const RGETATTR: u8 = 25;
pub const TREADDIR: u8 = 40;
pub const RREADDIR: u8 = 41;
pub const TVERSION: u8 = 100;
pub const RVERSION: u8 = 101;
pub const TATTACH: u8 = 104;
pub const RATTACH: u8 = 105;
pub const RERROR: u8 = 107;
pub const TWALK: u8 = 110;
pub const RWALK: u8 = 111;
pub const TREAD: u8 = 116;
pub const RREAD: u8 = 117;
pub const TCLUNK: u8 = 120;
pub const RCLUNK: u8 = 121;

pub const P9_DOTL_RDONLY: u32 = 0;

pub const P9_GETATTR_SIZE: u64 = 0x0000_0200;
pub const P9_GETATTR_BASIC: u64 = 0x0000_07ff;

/// `size[4] type[1] tag[2]`
pub const HEADER_SIZE: usize = 7;
/// Header plus the `count[4]` prefix of Rread/Rreaddir.
pub const IO_HEADER_SIZE: usize = HEADER_SIZE + 4;

pub const DEFAULT_VERSION: &str = "9P2000.L";
pub const DEFAULT_MSIZE: u32 = 0x0100_0000;
pub const MIN_MSIZE: u32 = 4096;
pub const DEFAULT_READ_CHUNK: u32 = 0x10000;
/// Reply buffer for the fixed-size exchanges.
pub const PAGE_SIZE: usize = 4096;

/// Qid identifies a file within a 9P server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Qid {
    pub type_: u8,
    pub version: u32,
    pub path: u64,
}

/// Attributes returned by Tgetattr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileAttr {
    pub valid: u64,
    pub qid: Qid,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u64,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    pub atime: (u64, u64),
    pub mtime: (u64, u64),
    pub ctime: (u64, u64),
    pub btime: (u64, u64),
    pub generation: u64,
    pub data_version: u64,
}
