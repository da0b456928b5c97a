use anyhow::{anyhow, bail};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "data/fees.sqlite3";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub max_connections: usize,
    pub busy_timeout: Duration,
    /// Classes inserted on first start when the table is empty.
    pub seed_classes: Vec<(String, i64)>,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub browser_bin: PathBuf,
    /// Arguments placed before the browser's own flags, e.g. a wrapper script.
    pub extra_args: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub store: StoreConfig,
    pub render: RenderConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source, so tests don't
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let host = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow!("invalid BIND_ADDR/PORT {host}:{port}: {e}"))?;

        let path = match lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => store_path_from_url(&url)?,
            None => lookup("FEES_DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        };
        let seed_classes = match lookup("FEES_SEED_CLASSES") {
            Some(raw) => parse_seed_classes(&raw)?,
            None => Vec::new(),
        };

        let store = StoreConfig {
            path,
            max_connections: parse_or(&lookup, "FEES_DB_MAX_CONNECTIONS", 8usize),
            busy_timeout: Duration::from_millis(parse_or(&lookup, "FEES_DB_BUSY_TIMEOUT_MS", 5_000u64)),
            seed_classes,
        };

        let browser_bin = lookup("FEES_BROWSER_BIN")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_browser_bin(lookup("PATH").as_deref()));
        let render = RenderConfig {
            browser_bin,
            extra_args: lookup("FEES_BROWSER_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            timeout: Duration::from_millis(parse_or(&lookup, "FEES_RENDER_TIMEOUT_MS", 60_000u64)),
        };

        let log_format = match lookup("FEES_LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            bind,
            store,
            render,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Accepts `sqlite://path`, `sqlite:path`, `file:path` or a bare path.
///
/// TLS query options such as `sslmode=` have no meaning for an embedded
/// store and are refused instead of being silently dropped.
pub fn store_path_from_url(url: &str) -> anyhow::Result<PathBuf> {
    let url = url.trim();
    let (base, query) = match url.split_once('?') {
        Some((b, q)) => (b, Some(q)),
        None => (url, None),
    };
    if let Some(q) = query {
        for pair in q.split('&') {
            let key = pair.split('=').next().unwrap_or("").to_ascii_lowercase();
            if key == "sslmode" || key == "ssl" || key == "sslrootcert" {
                bail!(
                    "DATABASE_URL option `{key}` is not supported: the fee store is an embedded SQLite file with no network channel"
                );
            }
        }
    }
    if base.starts_with("postgres://") || base.starts_with("postgresql://") {
        bail!("DATABASE_URL must point at a SQLite file, got a postgres URL");
    }
    let path = base
        .strip_prefix("sqlite://")
        .or_else(|| base.strip_prefix("sqlite:"))
        .or_else(|| base.strip_prefix("file:"))
        .unwrap_or(base);
    if path.is_empty() {
        bail!("DATABASE_URL has an empty path");
    }
    Ok(PathBuf::from(path))
}

/// `"JSS1=50000, JSS2=60000"` -> `[("JSS1", 50000), ("JSS2", 60000)]`
pub fn parse_seed_classes(raw: &str) -> anyhow::Result<Vec<(String, i64)>> {
    let mut out = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (name, fee) = item
            .rsplit_once('=')
            .ok_or_else(|| anyhow!("invalid FEES_SEED_CLASSES entry: {item}"))?;
        let name = name.trim();
        let fee: i64 = fee
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid fee in FEES_SEED_CLASSES entry: {item}"))?;
        if name.is_empty() || fee < 0 {
            bail!("invalid FEES_SEED_CLASSES entry: {item}");
        }
        out.push((name.to_string(), fee));
    }
    Ok(out)
}

fn default_browser_bin(path_var: Option<&str>) -> PathBuf {
    const CANDIDATES: [&str; 4] = ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];
    if let Some(path_var) = path_var {
        for name in CANDIDATES {
            for dir in std::env::split_paths(path_var) {
                let candidate = dir.join(name);
                if is_file(&candidate) {
                    return candidate;
                }
            }
        }
    }
    PathBuf::from(CANDIDATES[0])
}

fn is_file(p: &Path) -> bool {
    p.metadata().map(|m| m.is_file()).unwrap_or(false)
}
