#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use feesd::config::StoreConfig;
use feesd::pool::Pool;
use feesd::report::{PdfOptions, PdfRenderer};
use feesd::{build_router, AppState};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% fake report\n";

/// Seeded fee schedule: ids 1, 2, 3.
pub fn seed_classes() -> Vec<(String, i64)> {
    vec![
        ("JSS1".to_string(), 50_000),
        ("JSS2".to_string(), 60_000),
        ("SS1".to_string(), 70_000),
    ]
}

/// Records the last HTML it was asked to render.
#[derive(Default)]
pub struct FakeRenderer {
    pub last_html: Mutex<Option<String>>,
    pub last_opts: Mutex<Option<PdfOptions>>,
}

#[async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(&self, html: &str, opts: &PdfOptions) -> anyhow::Result<Vec<u8>> {
        *self.last_html.lock().expect("lock") = Some(html.to_string());
        *self.last_opts.lock().expect("lock") = Some(*opts);
        Ok(FAKE_PDF.to_vec())
    }
}

pub struct FailingRenderer;

#[async_trait]
impl PdfRenderer for FailingRenderer {
    async fn render(&self, _html: &str, _opts: &PdfOptions) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("browser crashed")
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: Pool,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(FakeRenderer::default())).await
}

pub async fn spawn_app_with(renderer: Arc<dyn PdfRenderer>) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = Pool::open(&StoreConfig {
        path: dir.path().join("fees.sqlite3"),
        max_connections: 4,
        busy_timeout: Duration::from_secs(2),
        seed_classes: seed_classes(),
    })
    .await
    .expect("open pool");

    let app = build_router(AppState::new(pool.clone(), renderer));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestApp {
        addr,
        pool,
        _dir: dir,
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn location(&self) -> &str {
        self.header("location").unwrap_or("")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<(&str, String)>,
) -> HttpResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    if let Some((content_type, payload)) = &body {
        req.push_str(&format!("Content-Type: {content_type}\r\n"));
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    }
    req.push_str("\r\n");
    if let Some((_, payload)) = &body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read response");
    parse_response(&raw)
}

fn parse_response(raw: &[u8]) -> HttpResponse {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header terminator");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status line");
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    HttpResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> HttpResponse {
    send(addr, "GET", path, &[], None).await
}

pub async fn get_with_headers(
    addr: SocketAddr,
    path: &str,
    headers: &[(&str, &str)],
) -> HttpResponse {
    send(addr, "GET", path, headers, None).await
}

pub async fn post_form(addr: SocketAddr, path: &str, fields: &[(&str, &str)]) -> HttpResponse {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    send(
        addr,
        "POST",
        path,
        &[],
        Some(("application/x-www-form-urlencoded", body)),
    )
    .await
}

pub async fn add_student(app: &TestApp, name: &str, class_id: i64) -> i64 {
    let name = name.to_string();
    app.pool
        .run(move |conn| feesd::ledger::create_student(conn, &name, class_id))
        .await
        .expect("create student")
}

pub async fn pay(app: &TestApp, student_id: i64, amount: &str, reference: &str) -> HttpResponse {
    post_form(
        app.addr,
        &format!("/students/{student_id}/pay"),
        &[
            ("amount_paid", amount),
            ("payment_method", "Cash"),
            ("term", "First Term"),
            ("session", "2025/2026"),
            ("reference_code", reference),
            ("note", ""),
        ],
    )
    .await
}

pub async fn scalar_i64(app: &TestApp, sql: &'static str, id: i64) -> i64 {
    app.pool
        .run(move |conn| Ok(conn.query_row(sql, [id], |r| r.get::<_, i64>(0))?))
        .await
        .expect("scalar query")
}

pub async fn scalar_f64(app: &TestApp, sql: &'static str, id: i64) -> f64 {
    app.pool
        .run(move |conn| Ok(conn.query_row(sql, [id], |r| r.get::<_, f64>(0))?))
        .await
        .expect("scalar query")
}

pub async fn count(app: &TestApp, table: &'static str) -> i64 {
    app.pool
        .run(move |conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
                r.get::<_, i64>(0)
            })?)
        })
        .await
        .expect("count")
}
