//! Demo web page and its HTTP plumbing.
//!
//! Responsibilities:
//! - serve the single-page UI and the original/processed video bytes
//! - accept `POST /run` to kick off a processing run
//! - report run progress as JSON for the page to poll
//!
//! The server is a plain `TcpListener` loop on a background thread; no
//! HTTP framework, requests are parsed by hand and answered with
//! explicit `Content-Length` responses.

mod page;
mod state;

pub use state::{RunPhase, SharedState, StartOutcome};

use crate::config::DemoConfig;
use crate::video;
use anyhow::{anyhow, Result};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_REQUEST_BYTES: usize = 8192;

pub struct DemoServer {
    config: DemoConfig,
}

#[derive(Debug)]
pub struct DemoHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl DemoHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("demo server thread panicked"))?;
        }
        Ok(())
    }
}

impl DemoServer {
    pub fn new(config: DemoConfig) -> Self {
        Self { config }
    }

    pub fn spawn(self) -> Result<DemoHandle> {
        let configured_addr: SocketAddr = self.config.listen_addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let config = self.config;
        let state = SharedState::new();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_server(listener, config, state, shutdown_thread) {
                log::error!("demo server stopped: {}", err);
            }
        });

        Ok(DemoHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_server(
    listener: TcpListener,
    config: DemoConfig,
    state: SharedState,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &config, &state) {
                    log::warn!("demo request failed: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    config: &DemoConfig,
    state: &SharedState,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => {
            let available = video::source_available(&config.video_path);
            let body = page::render(&config.video_path, available);
            write_response(
                &mut stream,
                200,
                "text/html; charset=utf-8",
                &[],
                body.as_bytes(),
            )
        }
        ("POST", "/run") => match state.start_run(config) {
            StartOutcome::Started => {
                write_json_response(&mut stream, 200, r#"{"status":"started"}"#)
            }
            StartOutcome::AlreadyRunning => {
                write_json_response(&mut stream, 409, r#"{"error":"already_running"}"#)
            }
            StartOutcome::VideoMissing => {
                write_json_response(&mut stream, 409, r#"{"error":"video_not_found"}"#)
            }
        },
        ("GET", "/status") => {
            let body = state.status_json()?;
            write_response(&mut stream, 200, "application/json", &[], &body)
        }
        ("GET", "/frame") => match state.live_jpeg() {
            Some(jpeg) => write_response(&mut stream, 200, "image/jpeg", &[], &jpeg),
            None => write_json_response(&mut stream, 404, r#"{"error":"no_frame"}"#),
        },
        ("GET", "/video/original") => serve_video_file(&mut stream, &config.video_path, &[]),
        ("GET", "/video/processed") => match state.output_path() {
            Some(path) => serve_video_file(&mut stream, &path.to_string_lossy(), &[]),
            None => write_json_response(&mut stream, 404, r#"{"error":"not_processed"}"#),
        },
        ("GET", "/download") => match state.output_path() {
            Some(path) => serve_video_file(
                &mut stream,
                &path.to_string_lossy(),
                &[(
                    "Content-Disposition",
                    "attachment; filename=\"processed_video.mp4\"",
                )],
            ),
            None => write_json_response(&mut stream, 404, r#"{"error":"not_processed"}"#),
        },
        ("GET", "/health") => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        ("GET", _) => write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#),
        _ => write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#),
    }
}

fn serve_video_file(
    stream: &mut TcpStream,
    path: &str,
    extra_headers: &[(&str, &str)],
) -> Result<()> {
    if path.starts_with(video::STUB_SCHEME) {
        return write_json_response(stream, 404, r#"{"error":"no_file"}"#);
    }
    match std::fs::read(path) {
        Ok(bytes) => write_response(stream, 200, "video/mp4", extra_headers, &bytes),
        Err(err) => {
            log::warn!("failed to read video {}: {}", path, err);
            write_json_response(stream, 404, r#"{"error":"no_file"}"#)
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let request_line = text
        .split("\r\n")
        .next()
        .ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", &[], body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    extra_headers: &[(&str, &str)],
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        409 => "HTTP/1.1 409 Conflict",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let mut header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    for (name, value) in extra_headers {
        header.push_str(&format!("{name}: {value}\r\n"));
    }
    header.push_str("\r\n");
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}
