// WebSocket server for feed clients.

use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::protocol::{parse_client_message, ServerMessage};
use crate::service::FeedHandler;

/// Bind the feed listener on `127.0.0.1:{port}`. Port 0 picks a free port.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, serving each one on its own task.
pub async fn serve<H>(listener: TcpListener, handler: Arc<H>) -> anyhow::Result<()>
where
    H: FeedHandler + 'static,
{
    loop {
        let (stream, addr) = listener.accept().await?;
        let addr = addr.to_string();
        info!("Accepted TCP connection from {addr}");
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handle_connection(stream, addr, handler).await;
        });
    }
}

async fn handle_connection<H>(stream: TcpStream, addr: String, handler: Arc<H>)
where
    H: FeedHandler + 'static,
{
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {addr}: {e}");
            return;
        }
    };

    let (mut write, read) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(32);

    let writer_addr = addr.clone();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                warn!("failed to write to {writer_addr}: {e}");
                break;
            }
        }
    });

    let _ = process_message_stream(read, handler.as_ref(), &tx, &addr).await;
    drop(tx);
    let _ = writer.await;
    info!("Client {addr} disconnected");
}

/// Answer one raw text frame. Malformed requests get an error reply.
pub async fn respond<H>(handler: &H, text: &str) -> ServerMessage
where
    H: FeedHandler + ?Sized,
{
    match parse_client_message(text) {
        Ok(request) => handler.handle(request).await,
        Err(e) => {
            debug!("rejecting request: {e}");
            ServerMessage::error(e.to_string())
        }
    }
}

/// Read messages from any [`Stream`] of WebSocket frames, answering every
/// text frame with one reply on `tx`. Returns `Err(())` if the reply channel
/// is closed, signalling the caller to stop.
///
/// Needs no I/O, so it is the primary unit-test target.
pub async fn process_message_stream<St, H>(
    mut stream: St,
    handler: &H,
    tx: &mpsc::Sender<Message>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    H: FeedHandler + ?Sized,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let reply = respond(handler, text.as_str()).await;
                if tx.send(Message::text(reply.to_json())).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Binary, Ping, Pong, Frame: nothing to answer.
            }
        }
    }
    Ok(())
}
