use super::*;
use crate::config::{HeaderConfig, WeightConfig};
use crate::error::{AppError, ConfigError};
use crate::events::EventBus;
use crate::runner::TaskFn;
use std::future::Future;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn definition(url: &str) -> TestDefinition {
    TestDefinition {
        url: url.to_owned(),
        method: "get".to_owned(),
        headers: Vec::new(),
        body: 0,
        weight: WeightConfig::default(),
        name: None,
    }
}

fn client() -> Result<reqwest::Client, String> {
    build_client(Duration::from_secs(5), Some(4)).map_err(|err| err.to_string())
}

/// Consumes one request, headers and `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        if let Some(header_end) = request
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
        {
            let head = String::from_utf8_lossy(request.get(..header_end).unwrap_or_default())
                .to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end.saturating_add(4).saturating_add(body_len) {
                return;
            }
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => request.extend_from_slice(chunk.get(..read).unwrap_or_default()),
        }
    }
}

/// Answers every connection with `status` and a five byte body.
async fn serve_status(status: &'static str) -> Result<String, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| format!("bind failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("local_addr failed: {}", err))?;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
                status
            );
            if socket.write_all(response.as_bytes()).await.is_err() {
                continue;
            }
            if socket.shutdown().await.is_err() {
                // Client already gone.
            }
        }
    });
    Ok(format!("http://{}/probe", addr))
}

#[test]
fn wave_weight_follows_cosine_and_clamps_at_zero() -> Result<(), String> {
    let wave = WaveWeight::from(WeightConfig {
        magnitude: 10,
        frequency: 60,
        constant: 5,
        phase: 0,
    });
    if wave.at(0) != 15 {
        return Err(format!("peak expected 15, got {}", wave.at(0)));
    }
    if wave.at(60) != 15 {
        return Err(format!("period should repeat, got {}", wave.at(60)));
    }
    if wave.at(15) != 5 {
        return Err(format!("zero crossing expected 5, got {}", wave.at(15)));
    }
    if wave.at(30) != 0 {
        return Err(format!("trough should clamp to 0, got {}", wave.at(30)));
    }

    let flat = WaveWeight::from(WeightConfig {
        magnitude: 100,
        frequency: 0,
        constant: 7,
        phase: 3,
    });
    if flat.at(12_345) != 7 {
        return Err(format!("zero frequency should be constant, got {}", flat.at(12_345)));
    }
    let negative = WaveWeight::from(WeightConfig {
        constant: -4,
        ..WeightConfig::default()
    });
    if negative.at(0) != 0 {
        return Err("negative weights clamp to zero".to_owned());
    }
    Ok(())
}

#[test]
fn invalid_definitions_are_rejected() -> Result<(), String> {
    let client = client()?;

    let mut bad_method = definition("http://localhost/a");
    bad_method.method = "GE T".to_owned();
    match HttpTask::from_definition(client.clone(), &bad_method) {
        Err(AppError::Config(ConfigError::InvalidMethod { .. })) => {}
        other => return Err(format!("expected method error, got {:?}", other.map(|_task| ()))),
    }

    let mut bad_header = definition("http://localhost/a");
    bad_header.headers.push(HeaderConfig {
        name: "bad header".to_owned(),
        value: "x".to_owned(),
    });
    match HttpTask::from_definition(client.clone(), &bad_header) {
        Err(AppError::Config(ConfigError::InvalidHeader { name, .. })) if name == "bad header" => {}
        other => return Err(format!("expected header error, got {:?}", other.map(|_task| ()))),
    }

    let mut huge = definition("http://localhost/a");
    huge.body = MAX_BODY_BYTES.saturating_add(1);
    match HttpTask::from_definition(client.clone(), &huge) {
        Err(AppError::Config(ConfigError::BodyTooLarge { .. })) => {}
        other => return Err(format!("expected body error, got {:?}", other.map(|_task| ()))),
    }

    match HttpTask::from_definition(client, &definition("not a url")) {
        Err(AppError::Config(ConfigError::InvalidUrl { .. })) => Ok(()),
        other => Err(format!("expected url error, got {:?}", other.map(|_task| ()))),
    }
}

#[test]
fn build_tasks_names_tasks_after_definitions() -> Result<(), String> {
    let client = client()?;
    let mut named = definition("http://localhost/b");
    named.name = Some("checkout".to_owned());
    named.body = 128;
    let tasks = build_tasks(&[definition("http://localhost/a"), named], &client)
        .map_err(|err| err.to_string())?;
    let names: Vec<&str> = tasks.iter().map(|task| task.name()).collect();
    if names != ["http://localhost/a", "checkout"] {
        return Err(format!("unexpected names {:?}", names));
    }
    Ok(())
}

#[test]
fn successful_response_publishes_success() -> Result<(), String> {
    run_async_test(async {
        let url = serve_status("200 OK").await?;
        let mut with_body = definition(&url);
        with_body.method = "post".to_owned();
        with_body.body = 64;
        let task = HttpTask::from_definition(client()?, &with_body).map_err(|err| err.to_string())?;

        let events = EventBus::new();
        let mut successes = events.subscribe_success(4);
        let mut failures = events.subscribe_failure(4);
        task.call(&events).await;

        let success = successes.try_recv().map_err(|err| format!("no success: {}", err))?;
        if success.method != "POST" || success.name != url || success.content_length != 5 {
            return Err(format!("unexpected success {:?}", success));
        }
        if failures.try_recv().is_ok() {
            return Err("unexpected failure".to_owned());
        }
        Ok(())
    })
}

#[test]
fn error_status_publishes_failure_with_code() -> Result<(), String> {
    run_async_test(async {
        let url = serve_status("503 Service Unavailable").await?;
        let task = HttpTask::from_definition(client()?, &definition(&url))
            .map_err(|err| err.to_string())?;
        let events = EventBus::new();
        let mut failures = events.subscribe_failure(4);
        task.call(&events).await;

        let failure = failures.try_recv().map_err(|err| format!("no failure: {}", err))?;
        if failure.error != "503" || failure.method != "GET" {
            return Err(format!("unexpected failure {:?}", failure));
        }
        Ok(())
    })
}

#[test]
fn connection_error_publishes_failure_with_message() -> Result<(), String> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|err| format!("bind failed: {}", err))?;
        let addr = listener
            .local_addr()
            .map_err(|err| format!("local_addr failed: {}", err))?;
        drop(listener);

        let url = format!("http://{}/gone", addr);
        let task = HttpTask::from_definition(client()?, &definition(&url))
            .map_err(|err| err.to_string())?;
        let events = EventBus::new();
        let mut failures = events.subscribe_failure(4);
        task.call(&events).await;

        let failure = failures.try_recv().map_err(|err| format!("no failure: {}", err))?;
        if failure.error.is_empty() || failure.name != url {
            return Err(format!("unexpected failure {:?}", failure));
        }
        Ok(())
    })
}
