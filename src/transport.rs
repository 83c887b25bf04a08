//! Transport abstraction for 9P request/response traffic.

use crate::error::Error;

/// A device queue that moves one request and one reply per exchange.
///
/// Implementations block until the device has written its reply. Both
/// buffers are contiguous; `resp` is sized by the caller to the largest reply
/// it accepts for that request.
pub trait Transport: Send + Sync {
    /// Send `req` and write the response into `resp`, returning the used length.
    fn send_paired(&self, req: &[u8], resp: &mut [u8]) -> Result<usize, Error>;
}
