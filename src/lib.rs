#![cfg_attr(not(test), no_std)]

//! Read-only 9P2000.L client driver for virtio-9p volumes on no_std kernels.
//!
//! Requests travel over a [`Transport`] that moves one request and one reply
//! buffer per exchange. [`Virtio9pDriver`] exposes whole-file reads through a
//! reference-counted cache and paged directory listings to the filesystem
//! dispatch layer.

extern crate alloc;

mod cache;
mod config;
mod driver;
mod error;
mod message;
mod parse;
mod protocol;
mod request;
mod session;
mod transport;

pub use cache::FileCache;
pub use config::SessionConfig;
pub use driver::{FileDescriptor, FileSystemDriver, Virtio9pDriver};
pub use error::{Error, FsError};
pub use parse::FileId;
pub use protocol::{FileAttr, P9_GETATTR_BASIC, P9_GETATTR_SIZE, Qid};
pub use session::P9Session as Session;
pub use transport::Transport;
