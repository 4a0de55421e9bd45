use std::time::Duration;

use eyre::WrapErr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::api::hello_route;
use crate::infrastructure::server_impl::reader::{read_request, ReadStatus, REQUEST_BUFFER_CAPACITY};
use crate::infrastructure::server_impl::request::Request;
use crate::AnyResult;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Serves one connection start to finish: read, parse, render, reply, close.
///
/// Malformed or incomplete requests still get a page. Only I/O failures are errors.
pub async fn process_connection<S>(stream: &mut S) -> AnyResult<Request>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (raw, status) = read_request(stream, REQUEST_BUFFER_CAPACITY)
        .await
        .wrap_err("failed to read request")?;

    if let ReadStatus::Partial(reason) = status {
        let reason: &str = reason.into();
        warn!(reason, bytes = raw.len(), "request head incomplete");
    }
    debug!(request = %String::from_utf8_lossy(&raw), "received request");

    let request = Request::parse(raw, status);
    let reply = hello_route(&request).into_http();
    debug!(bytes = reply.len(), "formatted reply");

    stream
        .write_all(&reply)
        .await
        .wrap_err("failed to send reply")?;
    stream.shutdown().await.wrap_err("failed to close connection")?;

    let runtime_class: &str = request.runtime_class.into();
    info!(
        host = request.host.as_deref().unwrap_or("-"),
        runtime_class,
        headers = request.headers.len(),
        "sent a reply"
    );

    Ok(request)
}

/// One connection at a time, forever.
pub async fn serve(listener: TcpListener) {
    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(%err, "failed to accept incoming connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        if let Err(err) = process_connection(&mut socket).await {
            error!(%peer, error = ?err, "connection failed");
        }
    }
}
