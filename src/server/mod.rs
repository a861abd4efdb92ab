// src/server/mod.rs

//! Development HTTP server.
//!
//! - [`site`] maps requests to files and builds replies.
//! - [`reload`] is the generation counter the dispatcher bumps after a
//!   rebuild and the injected client long-polls.
//!
//! The server runs on plain threads: one accept loop, plus one thread per
//! pending reload poll so a waiting browser never blocks file requests.

pub mod reload;
pub mod site;

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::errors::{FrontpipeError, Result};

pub use reload::ReloadSignal;
pub use site::{inject_reload_snippet, Reply, Resolution, SiteHandler, RELOAD_ENDPOINT};

/// A bound, not yet running server.
pub struct DevServer {
    server: Arc<Server>,
    handler: Arc<SiteHandler>,
    addr: String,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer").field("addr", &self.addr).finish_non_exhaustive()
    }
}

impl DevServer {
    pub fn bind(addr: &str, handler: SiteHandler) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| FrontpipeError::Server(format!("failed to bind {addr}: {e}")))?;
        Ok(Self {
            server: Arc::new(server),
            handler: Arc::new(handler),
            addr: addr.to_string(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The bound socket; differs from [`DevServer::addr`] when port 0 was
    /// requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Start the accept loop on its own thread.
    pub fn spawn(self) -> ServerHandle {
        info!(addr = %self.addr, "dev server listening on http://{}", self.addr);
        let server = Arc::clone(&self.server);
        let handler = Arc::clone(&self.handler);

        let thread = thread::spawn(move || {
            for request in server.incoming_requests() {
                if SiteHandler::is_long_poll(request.url()) {
                    let handler = Arc::clone(&handler);
                    thread::spawn(move || respond(&handler, request));
                } else {
                    respond(&handler, request);
                }
            }
            debug!("dev server accept loop finished");
        });

        ServerHandle {
            server: self.server,
            thread: Some(thread),
        }
    }
}

/// Keeps the server running; [`ServerHandle::shutdown`] stops it.
pub struct ServerHandle {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.local_addr())
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("dev server thread panicked");
            }
        }
        info!("dev server stopped");
    }
}

fn respond(handler: &SiteHandler, request: Request) {
    let reply = handler.handle(request.method(), request.url());
    debug!(
        method = %request.method(),
        url = %request.url(),
        status = reply.status,
        "served request"
    );
    if let Err(err) = request.respond(to_response(reply)) {
        debug!(error = %err, "client went away before the response was sent");
    }
}

fn to_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response = response.with_header(header);
    }
    if let Ok(header) = Header::from_bytes("Cache-Control", "no-store") {
        response = response.with_header(header);
    }
    response
}
