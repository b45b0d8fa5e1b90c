//! Server lifecycle: binding and shutdown.

use anyhow::Result;
use crossbeam::channel::Receiver;
use std::{net::SocketAddr, time::Duration};
use tiny_http::Server;

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Grace period for in-flight island pipelines after the loop stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, trying the next ports when taken.
pub fn bind_with_retry(interface: std::net::IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Stop the async runtime once the request loop has returned.
pub fn shutdown(runtime: tokio::runtime::Runtime, shutdown_rx: &Receiver<()>) {
    if shutdown_rx.try_recv().is_ok() {
        log!("serve"; "stopped");
    } else {
        log!("serve"; "request loop ended unexpectedly");
    }
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}
