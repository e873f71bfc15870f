//! Debug tools for mathterrain - TCP server for remote inspection and control
//!
//! Start the debug server inside a tokio runtime:
//! ```ignore
//! let handler: SharedHandler = Arc::new(Mutex::new(MyHandler::new()));
//! let server = DebugServer::bind(DEFAULT_PORT).await?;
//! server.spawn(handler);
//! ```

pub mod protocol;
pub mod server;

pub use protocol::*;
pub use server::{DebugHandler, DebugServer, SharedHandler, respond};

use std::net::SocketAddr;

/// Default debug server port
pub const DEFAULT_PORT: u16 = 9742;

/// Debug server errors
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    #[error("failed to bind debug server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
