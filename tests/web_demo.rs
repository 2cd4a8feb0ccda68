use anyhow::Result;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use lotwatch::{DemoConfig, DemoHandle, DemoServer};

fn stub_config(video_path: &str) -> DemoConfig {
    DemoConfig {
        video_path: video_path.to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        ..DemoConfig::default()
    }
}

struct TestServer {
    handle: Option<DemoHandle>,
}

impl TestServer {
    fn new(video_path: &str) -> Result<Self> {
        let handle = DemoServer::new(stub_config(video_path)).spawn()?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    fn handle(&self) -> &DemoHandle {
        self.handle
            .as_ref()
            .expect("test server handle should be initialized")
    }

    fn request(&self, method: &str, path: &str) -> Result<(String, Vec<u8>)> {
        let mut stream = TcpStream::connect(self.handle().addr)?;
        let request = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes())?;
        read_response(&mut stream)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().expect("failed to stop demo server");
        }
    }
}

fn read_response(stream: &mut TcpStream) -> Result<(String, Vec<u8>)> {
    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap_or(response.len());
    let headers = String::from_utf8_lossy(&response[..split]).to_string();
    let body = response.get(split + 4..).unwrap_or(&[]).to_vec();
    Ok((headers, body))
}

fn wait_for_done(server: &TestServer) -> Result<Value> {
    for _ in 0..200 {
        let (headers, body) = server.request("GET", "/status")?;
        assert!(headers.contains("200 OK"));
        let status: Value = serde_json::from_slice(&body)?;
        match status["phase"].as_str() {
            Some("done") => return Ok(status),
            Some("failed") => panic!("run failed: {:?}", status["error"]),
            _ => std::thread::sleep(Duration::from_millis(25)),
        }
    }
    panic!("run did not finish in time");
}

#[test]
fn page_carries_demo_sections() -> Result<()> {
    let server = TestServer::new("stub://6")?;

    let (headers, body) = server.request("GET", "/")?;
    let html = String::from_utf8_lossy(&body);
    assert!(headers.contains("200 OK"));
    assert!(headers.contains("text/html"));
    assert!(html.contains("Parking Spot Detection on Video"));
    assert!(html.contains("Original Video"));
    assert!(html.contains("Run Parking Spot Detection"));

    Ok(())
}

#[test]
fn missing_video_shows_error_page_and_refuses_runs() -> Result<()> {
    let server = TestServer::new("no-such-video.mp4")?;

    let (headers, body) = server.request("GET", "/")?;
    let html = String::from_utf8_lossy(&body);
    assert!(headers.contains("200 OK"));
    assert!(html.contains("Video file no-such-video.mp4 not found in working directory."));
    assert!(!html.contains("Run Parking Spot Detection"));

    let (headers, body) = server.request("POST", "/run")?;
    assert!(headers.contains("409 Conflict"));
    assert!(String::from_utf8_lossy(&body).contains(r#""error":"video_not_found""#));

    Ok(())
}

#[test]
fn health_endpoint_is_available() -> Result<()> {
    let server = TestServer::new("stub://6")?;

    let (headers, body) = server.request("GET", "/health")?;
    assert!(headers.contains("200 OK"));
    assert!(String::from_utf8_lossy(&body).contains(r#""status":"ok""#));

    Ok(())
}

#[test]
fn status_starts_idle_without_frame_or_output() -> Result<()> {
    let server = TestServer::new("stub://6")?;

    let (headers, body) = server.request("GET", "/status")?;
    assert!(headers.contains("200 OK"));
    let status: Value = serde_json::from_slice(&body)?;
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["output_ready"], false);

    let (headers, _body) = server.request("GET", "/frame")?;
    assert!(headers.contains("404 Not Found"));
    let (headers, _body) = server.request("GET", "/video/processed")?;
    assert!(headers.contains("404 Not Found"));
    let (headers, _body) = server.request("GET", "/download")?;
    assert!(headers.contains("404 Not Found"));

    Ok(())
}

#[test]
fn run_processes_stub_video_end_to_end() -> Result<()> {
    let server = TestServer::new("stub://6")?;

    let (headers, body) = server.request("POST", "/run")?;
    assert!(headers.contains("200 OK"));
    assert!(String::from_utf8_lossy(&body).contains(r#""status":"started""#));

    let status = wait_for_done(&server)?;
    assert_eq!(status["frames_done"], 6);
    assert_eq!(status["total_frames"], 6);
    assert_eq!(status["output_ready"], true);

    let (headers, body) = server.request("GET", "/frame")?;
    assert!(headers.contains("200 OK"));
    assert!(headers.contains("image/jpeg"));
    assert_eq!(&body[..2], &[0xFF, 0xD8]);

    let (headers, body) = server.request("GET", "/download")?;
    assert!(headers.contains("200 OK"));
    assert!(headers.contains("Content-Type: video/mp4"));
    assert!(headers.contains("Content-Disposition: attachment; filename=\"processed_video.mp4\""));
    assert!(!body.is_empty());

    Ok(())
}

#[test]
fn unknown_routes_and_methods_are_rejected() -> Result<()> {
    let server = TestServer::new("stub://6")?;

    let (headers, _body) = server.request("GET", "/nope")?;
    assert!(headers.contains("404 Not Found"));
    let (headers, _body) = server.request("POST", "/")?;
    assert!(headers.contains("405 Method Not Allowed"));

    Ok(())
}
