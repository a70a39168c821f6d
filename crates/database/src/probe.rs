//! Raw TCP reachability check, independent of the pool.

use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;

/// How long the probe waits for the socket to open.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct ProbeSuccess {
    pub target: String,
    pub elapsed_ms: u128,
}

#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("connection to {target} timed out after {timeout:?}")]
    TimedOut { target: String, timeout: Duration },

    #[error("connection to {target} failed: {source}")]
    Unreachable {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeFailure {
    pub fn target(&self) -> &str {
        match self {
            Self::TimedOut { target, .. } | Self::Unreachable { target, .. } => target,
        }
    }

    /// Operator-facing suggestions for what to check next.
    pub fn hints(&self) -> Vec<&'static str> {
        match self {
            Self::TimedOut { .. } => vec![
                "Check that DB_HOST resolves to the database server",
                "A firewall or security group may be dropping packets",
                "Confirm the server accepts remote connections",
            ],
            Self::Unreachable { .. } => vec![
                "Verify DB_HOST and DB_PORT",
                "Make sure the database server is running",
                "Check that the port is open to this host",
            ],
        }
    }
}

/// Opens and immediately drops a TCP connection to `host:port`.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> Result<ProbeSuccess, ProbeFailure> {
    let target = format!("{host}:{port}");
    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            let elapsed_ms = started.elapsed().as_millis();
            tracing::debug!(%target, elapsed_ms, "TCP probe succeeded");
            Ok(ProbeSuccess { target, elapsed_ms })
        }
        Ok(Err(source)) => {
            tracing::warn!(%target, error = %source, "TCP probe failed");
            Err(ProbeFailure::Unreachable { target, source })
        }
        Err(_) => {
            tracing::warn!(%target, ?timeout, "TCP probe timed out");
            Err(ProbeFailure::TimedOut { target, timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reaches_a_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let success = probe("127.0.0.1", port, PROBE_TIMEOUT).await.unwrap();
        assert_eq!(success.target, format!("127.0.0.1:{port}"));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let failure = probe("127.0.0.1", port, PROBE_TIMEOUT).await.unwrap_err();
        assert!(matches!(failure, ProbeFailure::Unreachable { .. }));
        assert_eq!(failure.target(), format!("127.0.0.1:{port}"));
        assert!(!failure.hints().is_empty());
    }
}
