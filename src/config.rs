//! Session parameters.

use alloc::string::String;

use crate::protocol::{DEFAULT_MSIZE, DEFAULT_READ_CHUNK, DEFAULT_VERSION};

/// Parameters of a 9P session, fixed at attach time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Protocol version proposed in Tversion.
    pub version: String,
    /// Maximum message size proposed to the server.
    pub msize: u32,
    /// Reply buffer size for each Tread, before clamping to the negotiated msize.
    pub read_chunk: u32,
    /// User name sent in Tattach. No authentication is performed.
    pub uname: String,
    /// Attach name (mount tag) selecting the exported tree.
    pub aname: String,
    /// Numeric user id sent in Tattach.
    pub n_uname: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: String::from(DEFAULT_VERSION),
            msize: DEFAULT_MSIZE,
            read_chunk: DEFAULT_READ_CHUNK,
            uname: String::from("readonly"),
            aname: String::new(),
            n_uname: 12345,
        }
    }
}

impl SessionConfig {
    pub fn with_msize(mut self, msize: u32) -> Self {
        self.msize = msize;
        self
    }

    pub fn with_read_chunk(mut self, read_chunk: u32) -> Self {
        self.read_chunk = read_chunk;
        self
    }

    pub fn with_aname(mut self, aname: impl Into<String>) -> Self {
        self.aname = aname.into();
        self
    }
}
