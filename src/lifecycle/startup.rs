//! Dev server startup.
//!
//! # Responsibilities
//! - Bind the dev listener from `[server]` options
//! - Walk to the next free port unless `strict_port` is set
//!
//! # Design Decisions
//! - Fail fast: a bind error other than "address in use" is fatal
//! - Listeners start last, after composition succeeded

use std::io;

use tokio::net::TcpListener;

use crate::config::schema::DevServerOptions;

/// Ports tried after the configured one when it is taken.
const PORT_ATTEMPTS: u16 = 10;

/// Bind the dev server listener.
pub async fn bind_listener(options: &DevServerOptions) -> io::Result<TcpListener> {
    let attempts = if options.strict_port || options.port == 0 {
        1
    } else {
        PORT_ATTEMPTS
    };

    let mut last_err = None;
    for offset in 0..attempts {
        let Some(port) = options.port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((options.host.as_str(), port)).await {
            Ok(listener) => {
                if offset > 0 {
                    tracing::warn!(requested = options.port, port, "Port in use, using next free port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "no free port")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(port: u16, strict_port: bool) -> DevServerOptions {
        DevServerOptions {
            host: "127.0.0.1".into(),
            port,
            strict_port,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_next_port_when_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        match bind_listener(&options(port, false)).await {
            Ok(listener) => assert_ne!(listener.local_addr().unwrap().port(), port),
            // The following ports may be taken by other processes.
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::AddrInUse),
        }
    }

    #[tokio::test]
    async fn test_strict_port_fails_when_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = bind_listener(&options(port, true)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_ephemeral_port() {
        let listener = bind_listener(&options(0, false)).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
