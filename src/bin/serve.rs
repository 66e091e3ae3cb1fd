//! Dashboard server
//!
//! Re-runs the whole page pipeline on every request, so reloading the
//! browser picks up a changed CSV.
//! Run with: cargo run --bin serve

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

use anyhow::{Context, Result};
use kantin::config::Config;
use kantin::logging::{log, obj, v_str, Domain, Level};
use kantin::page;
use serde_json::json;

fn main() -> Result<()> {
    let config = Config::from_env();
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = TcpListener::bind(&addr).with_context(|| format!("binding {}", addr))?;

    println!("Dashboard running at http://localhost:{}", config.port);
    println!();
    println!("Endpoints:");
    println!("  GET /             - Dashboard page");
    println!("  GET /api/summary  - Page summary as JSON");
    println!("  GET /api/health   - Health check");
    println!();

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(_) => continue,
        };

        let request = match BufReader::new(&stream).lines().next() {
            Some(Ok(line)) => line,
            _ => continue,
        };
        let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

        let (status, content_type, body) = if !request.starts_with("GET ") {
            ("405 METHOD NOT ALLOWED", "text/plain", "Method Not Allowed".to_string())
        } else if path == "/" || path == "/index.html" {
            let page = page::render(&config);
            ("200 OK", "text/html; charset=utf-8", page.html)
        } else if path == "/api/summary" {
            let page = page::render(&config);
            let body = serde_json::to_string(&page.summary)
                .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
            ("200 OK", "application/json", body)
        } else if path == "/api/health" {
            ("200 OK", "application/json", r#"{"status":"ok"}"#.to_string())
        } else {
            ("404 NOT FOUND", "text/plain", "Not Found".to_string())
        };

        log(
            Level::Info,
            Domain::Server,
            "request",
            obj(&[
                ("path", v_str(&path)),
                ("status", v_str(status)),
                ("bytes", json!(body.len())),
            ]),
        );

        let response = format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );

        let _ = stream.write_all(response.as_bytes());
    }
    Ok(())
}
