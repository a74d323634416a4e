use crate::config::{DaemonConfig, Timing};
use crate::error::DaemonError;
use crate::protocol::{Request, Response};
use crate::session::WidgetSession;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{error, info, warn};

/// Longest request line accepted from a client, in bytes.
pub const MAX_REQUEST_LINE: usize = 64 * 1024;

/// Accept clients forever, one widget session per connection.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("primerd listening on {}", listener.local_addr()?);

    let timing = config.timing();
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Client connected: {}", addr);

        tokio::spawn(async move {
            match serve_connection(stream, timing).await {
                Ok(()) => info!("Client disconnected: {}", addr),
                Err(e) => error!("Client handler error ({}): {}", addr, e),
            }
        });
    }
}

/// Drive one client until it hangs up. The session (and with it every
/// pending timer) is dropped on return.
pub async fn serve_connection<S>(stream: S, timing: Timing) -> Result<(), DaemonError>
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_REQUEST_LINE));
    let mut out = FramedWrite::new(writer, LinesCodec::new());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut session = WidgetSession::new(timing, events_tx)?;

    loop {
        tokio::select! {
            line = lines.next() => {
                let line = match line {
                    None => break,
                    Some(Ok(line)) => line,
                    // A framed stream ends after its first decode error.
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!("Closing client: request longer than {} bytes", MAX_REQUEST_LINE);
                        let reply = Response::Error {
                            message: format!("Request exceeds {} bytes", MAX_REQUEST_LINE),
                        };
                        write_response(&mut out, &reply).await?;
                        break;
                    }
                    Some(Err(e)) => return Err(e.into()),
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => session.handle(request).await,
                    Err(e) => Response::Error {
                        message: format!("Invalid request: {}", e),
                    },
                };
                write_response(&mut out, &response).await?;
            }
            Some(pushed) = events_rx.recv() => {
                write_response(&mut out, &pushed).await?;
            }
        }
    }

    session.cancel_timers().await;
    Ok(())
}

async fn write_response<W>(
    out: &mut FramedWrite<W, LinesCodec>,
    response: &Response,
) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
{
    out.send(serde_json::to_string(response)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    async fn next_response<R>(lines: &mut tokio::io::Lines<R>) -> Response
    where
        R: tokio::io::AsyncBufRead + Unpin,
    {
        let line = lines.next_line().await.unwrap().expect("connection open");
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn serves_requests_and_pushes_over_one_connection() {
        let (client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(serve_connection(server, Timing::default()));

        let (rd, mut wr) = tokio::io::split(client);
        let mut lines = BufReader::new(rd).lines();

        wr.write_all(b"not json\n").await.unwrap();
        match next_response(&mut lines).await {
            Response::Error { message } => assert!(message.starts_with("Invalid request")),
            other => panic!("unexpected: {:?}", other),
        }

        wr.write_all(b"{\"type\":\"GridAction\",\"action\":\"down\"}\n")
            .await
            .unwrap();
        match next_response(&mut lines).await {
            Response::Grid(g) => assert_eq!(g.cumulative_reward, -1),
            other => panic!("unexpected: {:?}", other),
        }

        wr.write_all(b"{\"type\":\"RevealStart\"}\n").await.unwrap();
        assert!(matches!(
            next_response(&mut lines).await,
            Response::Success { .. }
        ));

        let mut progress = 0;
        loop {
            match next_response(&mut lines).await {
                Response::RevealProgress { .. } => progress += 1,
                Response::RevealConsensus { summary, .. } => {
                    assert_eq!(summary, "42 (3/5 votes)");
                    break;
                }
                other => panic!("unexpected: {:?}", other),
            }
        }
        assert_eq!(progress, 5);

        drop(wr);
        drop(lines);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn oversized_line_gets_an_error_then_the_connection_closes() {
        let (client, server) = duplex(16 * 1024);
        let handle = tokio::spawn(serve_connection(server, Timing::default()));

        let (rd, mut wr) = tokio::io::split(client);
        let mut lines = BufReader::new(rd).lines();

        // No newline ever arrives; the server hangs up mid-write.
        let writer = tokio::spawn(async move {
            let flood = vec![b'x'; MAX_REQUEST_LINE * 2];
            let _ = wr.write_all(&flood).await;
        });

        match next_response(&mut lines).await {
            Response::Error { message } => assert!(message.contains("exceeds")),
            other => panic!("unexpected: {:?}", other),
        }
        handle.await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
        writer.await.unwrap();
    }
}
