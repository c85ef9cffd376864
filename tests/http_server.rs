//! End-to-end tests: real sockets, the axum host and the dispatch bridge.

use std::time::Duration;

use tokio::net::TcpListener;

use dispatch_bridge::config::BridgeConfig;
use dispatch_bridge::http::HttpServer;
use dispatch_bridge::lifecycle::Shutdown;
use dispatch_bridge::server::{DispatchService, RequestAdapter, ResponseAdapter, WorkerPool};
use dispatch_bridge::BoxError;

fn greeting(request: &mut RequestAdapter, response: &mut ResponseAdapter) -> Result<(), BoxError> {
    let path = request.uri().path();
    let Some(name) = path.strip_prefix("/greeting/") else {
        response.send_error_with_message(404, "No such greeting")?;
        return Ok(());
    };
    if name == "fail" {
        return Err("greeting failed".into());
    }

    let salutation = if request.method() == http::Method::POST {
        request
            .decoded_form_parameters()?
            .get_first("salutation")
            .unwrap_or("Hello")
            .to_string()
    } else {
        "Hello".to_string()
    };

    response.output_headers().put_single("Content-Type", "application/json")?;
    let body = serde_json::json!({ "greeting": format!("{salutation}, {name}!") });
    serde_json::to_writer(response.output_stream(), &body)?;
    Ok(())
}

async fn start_server(shutdown: &Shutdown) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = DispatchService::new(greeting, std::sync::Arc::new(WorkerPool::new(4).unwrap()));
    let server = HttpServer::new(BridgeConfig::default(), service);
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_greeting_end_to_end() {
    let shutdown = Shutdown::new();
    let (base, handle) = start_server(&shutdown).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/greeting/world")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["greeting"], "Hello, world!");

    let res = client
        .post(format!("{base}/greeting/bridge"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("salutation=Good+morning")
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["greeting"], "Good morning, bridge!");

    let res = client.get(format!("{base}/elsewhere")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 404);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops after shutdown")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatch_failure_end_to_end() {
    let shutdown = Shutdown::new();
    let (base, _handle) = start_server(&shutdown).await;

    let res = reqwest::get(format!("{base}/greeting/fail")).await.unwrap();
    assert_eq!(res.status().as_u16(), 500);
    assert_eq!(res.text().await.unwrap(), "greeting failed");

    shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() {
    let shutdown = Shutdown::new();
    let (base, _handle) = start_server(&shutdown).await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = format!("{base}/greeting/user{i}");
        tasks.push(tokio::spawn(async move {
            let res = client.get(url).send().await.unwrap();
            assert_eq!(res.status().as_u16(), 200);
            res.json::<serde_json::Value>().await.unwrap()
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let json = task.await.unwrap();
        assert_eq!(json["greeting"], format!("Hello, user{i}!"));
    }

    shutdown.trigger();
}
