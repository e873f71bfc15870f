//! TCP debug server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::DebugError;
use crate::protocol::{DebugCommand, DebugResponse};

/// Trait that the application implements to handle debug commands
pub trait DebugHandler: Send + Sync + 'static {
    fn handle_command(&mut self, cmd: DebugCommand) -> DebugResponse;
}

/// Handler shared between connections
pub type SharedHandler = Arc<Mutex<dyn DebugHandler>>;

/// Bound debug listener on 127.0.0.1
pub struct DebugServer {
    listener: TcpListener,
}

impl DebugServer {
    /// Bind to `port` on the loopback interface; port 0 picks a free port
    pub async fn bind(port: u16) -> Result<Self, DebugError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| DebugError::Bind { addr, source })?;
        log::info!("Debug server listening on {}", addr);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DebugError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn serve(self, handler: SharedHandler) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    log::info!("Debug client connected from {}", peer);
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handler).await {
                            log::error!("Debug connection {} failed: {}", peer, e);
                        }
                        log::info!("Debug client disconnected: {}", peer);
                    });
                }
                Err(e) => {
                    log::error!("Debug server accept error: {}", e);
                }
            }
        }
    }

    /// Run `serve` on the current tokio runtime
    pub fn spawn(self, handler: SharedHandler) -> JoinHandle<()> {
        tokio::spawn(self.serve(handler))
    }
}

/// Decode one request line and produce the JSON reply (without newline)
pub async fn respond(handler: &SharedHandler, line: &str) -> String {
    let response = match serde_json::from_str::<DebugCommand>(line) {
        Ok(cmd) => {
            log::debug!("Debug command: {:?}", cmd);
            let mut h = handler.lock().await;
            h.handle_command(cmd)
        }
        Err(e) => DebugResponse::error(format!("Invalid command JSON: {}", e)),
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!("{{\"status\":\"error\",\"message\":\"Serialize error: {}\"}}", e)
    })
}

async fn handle_connection(stream: TcpStream, handler: SharedHandler) -> Result<(), DebugError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut reply = respond(&handler, trimmed).await;
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }
}
