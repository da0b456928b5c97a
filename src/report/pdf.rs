use anyhow::{bail, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RenderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
    Letter,
}

impl PageFormat {
    fn css_size(self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
            PageFormat::Letter => "letter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfOptions {
    pub format: PageFormat,
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            print_background: true,
        }
    }
}

/// Turns an HTML document into PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, opts: &PdfOptions) -> anyhow::Result<Vec<u8>>;
}

/// Renders through a headless Chromium, one process per call.
///
/// The child is spawned with `kill_on_drop`, so a timeout or any early return
/// tears it down. Scratch files live in a temp dir removed on drop.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    bin: PathBuf,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(cfg: &RenderConfig) -> Self {
        Self {
            bin: cfg.browser_bin.clone(),
            extra_args: cfg.extra_args.clone(),
            timeout: cfg.timeout,
        }
    }

    fn command(&self, workdir: &Path, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.extra_args)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg(format!("--user-data-dir={}", workdir.join("profile").display()))
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(format!("file://{}", input.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, html: &str, opts: &PdfOptions) -> anyhow::Result<Vec<u8>> {
        let workdir = tempfile::Builder::new()
            .prefix("feesd-report-")
            .tempdir()
            .context("create render scratch dir")?;
        let input = workdir.path().join("report.html");
        let output = workdir.path().join("report.pdf");
        tokio::fs::write(&input, with_print_style(html, opts))
            .await
            .context("write report html")?;

        let child = self
            .command(workdir.path(), &input, &output)
            .spawn()
            .with_context(|| format!("spawn browser {}", self.bin.display()))?;
        debug!(browser = %self.bin.display(), pid = ?child.id(), "browser started");

        let out = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.context("wait for browser")?,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "browser render timed out");
                bail!("browser did not finish within {:?}", self.timeout);
            }
        };
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            bail!("browser exited with {}: {}", out.status, tail);
        }

        let bytes = tokio::fs::read(&output)
            .await
            .context("read rendered pdf")?;
        if !bytes.starts_with(b"%PDF") {
            bail!("browser output is not a PDF ({} bytes)", bytes.len());
        }
        Ok(bytes)
    }
}

/// Injects the page size and background printing rules into the document.
pub fn with_print_style(html: &str, opts: &PdfOptions) -> String {
    let mut css = format!("@page {{ size: {}; margin: 12mm; }}", opts.format.css_size());
    if opts.print_background {
        css.push_str(" html, body, * { -webkit-print-color-adjust: exact; print-color-adjust: exact; }");
    }
    let style = format!("<style>{css}</style>");
    match html.find("</head>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + style.len());
            out.push_str(&html[..idx]);
            out.push_str(&style);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{style}{html}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_style_goes_into_head() {
        let html = "<html><head><title>x</title></head><body></body></html>";
        let styled = with_print_style(html, &PdfOptions::default());
        let style_at = styled.find("size: A4").expect("page size");
        assert!(style_at < styled.find("</head>").expect("head"));
        assert!(styled.contains("print-color-adjust: exact"));

        let letter = with_print_style(
            "<p>bare</p>",
            &PdfOptions {
                format: PageFormat::Letter,
                print_background: false,
            },
        );
        assert!(letter.starts_with("<style>@page { size: letter;"));
        assert!(!letter.contains("print-color-adjust"));
    }

    #[cfg(unix)]
    mod fake_browser {
        use super::*;

        fn renderer(dir: &Path, script: &str, timeout: Duration) -> ChromiumRenderer {
            let path = dir.join("browser.sh");
            std::fs::write(&path, script).expect("write script");
            ChromiumRenderer::new(&RenderConfig {
                browser_bin: PathBuf::from("/bin/sh"),
                extra_args: vec![path.display().to_string()],
                timeout,
            })
        }

        const WRITES_PDF: &str = r#"for a in "$@"; do
  case "$a" in
    --print-to-pdf=*) printf '%%PDF-1.4 fake' > "${a#--print-to-pdf=}" ;;
  esac
done
"#;

        #[tokio::test]
        async fn reads_back_the_pdf_the_browser_wrote() {
            let dir = tempfile::tempdir().expect("tempdir");
            let r = renderer(dir.path(), WRITES_PDF, Duration::from_secs(10));
            let bytes = r
                .render("<html><head></head><body>hi</body></html>", &PdfOptions::default())
                .await
                .expect("render");
            assert!(bytes.starts_with(b"%PDF-1.4"));
        }

        #[tokio::test]
        async fn non_zero_exit_is_an_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            let r = renderer(dir.path(), "echo boom >&2\nexit 3\n", Duration::from_secs(10));
            let err = r
                .render("<p>x</p>", &PdfOptions::default())
                .await
                .expect_err("must fail");
            assert!(err.to_string().contains("boom"));
        }

        #[tokio::test]
        async fn slow_browser_hits_the_timeout() {
            let dir = tempfile::tempdir().expect("tempdir");
            let r = renderer(dir.path(), "sleep 5\n", Duration::from_millis(200));
            let started = std::time::Instant::now();
            let err = r
                .render("<p>x</p>", &PdfOptions::default())
                .await
                .expect_err("must time out");
            assert!(err.to_string().contains("did not finish"));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[tokio::test]
        async fn missing_binary_fails_to_spawn() {
            let r = ChromiumRenderer::new(&RenderConfig {
                browser_bin: PathBuf::from("/nonexistent/chromium"),
                extra_args: Vec::new(),
                timeout: Duration::from_secs(1),
            });
            assert!(r.render("<p>x</p>", &PdfOptions::default()).await.is_err());
        }
    }
}
