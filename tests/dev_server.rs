//! Dev server forwarding, transformed assets and static serving.

mod common;

use std::sync::Arc;

use arc_swap::ArcSwap;
use reqwest::StatusCode;
use serde_json::Value;

use viaduct::build::{emitted_path, Emitted, SourceFile, TransformError, Transformer};
use viaduct::compose::compose_file;
use viaduct::plugins::ResolvedPlugin;
use viaduct::http::SharedConfig;
use viaduct::{DevServer, Mode, Shutdown};

use common::{serve, start_dev_server, start_echo_backend, unused_addr, write, Fixture};

#[tokio::test]
async fn test_forwards_with_origin_rewrite() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let config = compose_file(&fixture.top_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = start_dev_server(config).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("http://{addr}/api/users?page=2"))
        .header("origin", format!("http://{addr}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/api/users");
    assert_eq!(body["query"], "page=2");
    assert_eq!(body["host"], backend.to_string());
    assert_eq!(body["origin"], format!("http://{backend}"));
    assert_eq!(body["forwarded_host"], addr.to_string());
    assert!(body["request_id"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn test_longest_prefix_forwards_without_rewrite() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let config = compose_file(&fixture.top_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = start_dev_server(config).await;

    let res = reqwest::get(format!("http://{addr}/api/v2/items")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/v2/api/v2/items");
    assert_eq!(body["host"], addr.to_string());
    assert!(body["forwarded_host"].is_null());

    shutdown.trigger();
}

#[tokio::test]
async fn test_serves_project_files() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let config = compose_file(&fixture.client_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = start_dev_server(config).await;

    let res = reqwest::get(format!("http://{addr}/index.html")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("id=\"root\""));

    let res = reqwest::get(format!("http://{addr}/missing.js")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = reqwest::get(format!("http://{addr}/assets/x.js")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

/// Prefixes every claimed file with a banner naming its plugin.
struct Banner;

impl Transformer for Banner {
    fn transform(&self, plugin: &ResolvedPlugin, file: SourceFile<'_>) -> Result<Vec<Emitted>, TransformError> {
        let mut contents = format!("/* {} */\n", plugin.id).into_bytes();
        contents.extend_from_slice(file.contents);
        Ok(vec![Emitted {
            path: emitted_path(plugin, file.path),
            contents,
        }])
    }
}

#[tokio::test]
async fn test_claimed_files_are_transformed() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let config = compose_file(&fixture.client_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = serve(DevServer::new(config).with_transformer(Banner)).await;

    let res = reqwest::get(format!("http://{addr}/App.fs")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/javascript; charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "/* fable */\nmodule App\n");

    let res = reqwest::get(format!("http://{addr}/styles.css")).await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/css; charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "/* tailwind */\n@import \"tailwindcss\";\n");

    // Unclaimed files are served as they are.
    let res = reqwest::get(format!("http://{addr}/notes.txt")).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "not claimed\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_default_transformer_serves_claimed_file() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let config = compose_file(&fixture.client_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = start_dev_server(config).await;

    let res = reqwest::get(format!("http://{addr}/App.fs")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/javascript; charset=utf-8");
    assert_eq!(res.text().await.unwrap(), "module App\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    let down = unused_addr().await;
    let fixture = Fixture::new(down);
    let config = compose_file(&fixture.top_entry(), Mode::Dev).unwrap();
    let (addr, shutdown) = start_dev_server(config).await;

    let res = reqwest::get(format!("http://{addr}/api/users")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_swapped_config_takes_effect() {
    let backend = start_echo_backend().await;
    let fixture = Fixture::new(backend);
    let initial = compose_file(&fixture.top_entry(), Mode::Dev).unwrap();

    let shared: SharedConfig = Arc::new(ArcSwap::new(initial));
    let server = DevServer::with_shared(shared.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    let res = reqwest::get(format!("http://{addr}/graphql")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let reloaded = write(
        fixture.root(),
        "viaduct.toml",
        &format!(
            r#"
            root = "src/Client"
            include = "viaduct.shared.toml"

            [[proxy]]
            prefix = "/graphql"
            target = "http://{backend}"
            "#
        ),
    );
    shared.store(compose_file(&reloaded, Mode::Dev).unwrap());

    let res = reqwest::get(format!("http://{addr}/graphql")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/graphql");

    shutdown.trigger();
}
