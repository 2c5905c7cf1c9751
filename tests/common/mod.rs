//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;
use tokio::net::TcpListener;

use viaduct::{BuildConfiguration, DevServer, Shutdown};

/// Start a backend that answers every request with a JSON echo of the
/// request line and the headers the dev server rewrites.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(echo))
                    .await;
            });
        }
    });

    addr
}

async fn echo(request: Request<Incoming>) -> Result<Response<String>, Infallible> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let body = serde_json::json!({
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "query": request.uri().query(),
        "host": header("host"),
        "origin": header("origin"),
        "forwarded_host": header("x-forwarded-host"),
        "request_id": header("x-request-id"),
    });
    Ok(Response::new(body.to_string()))
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Serve a composed configuration on an ephemeral port.
pub async fn start_dev_server(config: Arc<BuildConfiguration>) -> (SocketAddr, Shutdown) {
    serve(DevServer::new(config)).await
}

/// Run a dev server on an ephemeral port.
pub async fn serve(server: DevServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    (addr, shutdown)
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// A repository with two entry points sharing one fragment:
///
/// ```text
/// repo/
///   viaduct.shared.toml      proxy rules + output dir
///   viaduct.toml             root = "src/Client"
///   src/Client/viaduct.toml  root = "."
///   src/Client/index.html
///   src/Client/App.fs
///   src/Client/styles.css
///   src/Client/notes.txt
/// ```
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new(backend: SocketAddr) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(
            root,
            "viaduct.shared.toml",
            &format!(
                r#"
                [[proxy]]
                prefix = "/api"
                target = "http://{backend}"
                rewrite_origin = true

                [[proxy]]
                prefix = "/api/v2"
                target = "http://{backend}/v2"

                [output]
                dir = "../../deploy/public"
                clean = true
                "#
            ),
        );

        let plugins = r#"
            [[plugins]]
            id = "fable"
            extension = "fs.js"

            [[plugins]]
            id = "react"
            runtime = "automatic"

            [[plugins]]
            id = "tailwind"
            content = ["./index.html", "./**/*.fs"]
        "#;

        write(
            root,
            "viaduct.toml",
            &format!("root = \"src/Client\"\ninclude = \"viaduct.shared.toml\"\n{plugins}"),
        );
        write(
            root,
            "src/Client/viaduct.toml",
            &format!("root = \".\"\ninclude = \"../../viaduct.shared.toml\"\n{plugins}"),
        );
        write(root, "src/Client/index.html", "<!doctype html><div id=\"root\"></div>");
        write(root, "src/Client/App.fs", "module App\n");
        write(root, "src/Client/styles.css", "@import \"tailwindcss\";\n");
        write(root, "src/Client/notes.txt", "not claimed\n");

        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn top_entry(&self) -> PathBuf {
        self.root().join("viaduct.toml")
    }

    pub fn client_entry(&self) -> PathBuf {
        self.root().join("src/Client/viaduct.toml")
    }

    pub fn deploy_dir(&self) -> PathBuf {
        self.root().join("deploy/public")
    }
}
