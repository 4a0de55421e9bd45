use std::io;

use bytes::BytesMut;
use strum::IntoStaticStr;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::infrastructure::server_impl::matcher::{find, HEADER_TERMINATOR};
use crate::infrastructure::server_impl::request::RawRequest;

/// Size of the per-connection accumulation buffer. At most `capacity - 1` bytes are kept.
pub const REQUEST_BUFFER_CAPACITY: usize = 2048;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Complete,
    Partial(PartialReason),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum PartialReason {
    #[strum(serialize = "peer closed")]
    PeerClosed,
    #[strum(serialize = "buffer full")]
    BufferFull,
}

/// Reads from `conn` until the header terminator arrives, the peer closes, or
/// `capacity - 1` bytes are buffered.
///
/// Partial requests are returned as data, not errors. A failed read discards
/// whatever was accumulated.
pub async fn read_request<R>(conn: &mut R, capacity: usize) -> io::Result<(RawRequest, ReadStatus)>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let limit = capacity.saturating_sub(1);
    let mut buf = BytesMut::zeroed(limit);
    let mut filled = 0;

    let status = loop {
        if filled == limit {
            break ReadStatus::Partial(PartialReason::BufferFull);
        }

        let read = conn.read(&mut buf[filled..]).await?;
        if read == 0 {
            break ReadStatus::Partial(PartialReason::PeerClosed);
        }

        // the terminator may straddle two reads
        let scan_from = filled.saturating_sub(HEADER_TERMINATOR.len() - 1);
        filled += read;

        if find(&buf[scan_from..filled], HEADER_TERMINATOR).is_some() {
            break ReadStatus::Complete;
        }
    };

    buf.truncate(filled);
    Ok((RawRequest::from(buf.freeze()), status))
}
