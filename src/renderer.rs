//! Paged-Media Renderer Adapter.
//!
//! The primary renderer is modeled as an external headless process: probe
//! a short list of binary names, shell out via `std::process::Command`,
//! and treat a nonzero exit or timeout as a renderer failure. This core
//! never constructs PDF structure itself — see DESIGN.md on why `lopdf`
//! was dropped.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::compose::GeneratedTemplate;
use crate::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    A4,
    Letter,
    A3,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarginsMm {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for MarginsMm {
    fn default() -> Self {
        MarginsMm { top: 15.0, right: 15.0, bottom: 20.0, left: 15.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    pub page_format: PageFormat,
    pub margins_mm: MarginsMm,
    pub scale: f32,
    pub landscape: bool,
    pub prefer_css_page_size: bool,
    pub print_background: bool,
    pub bleed_mm: f32,
    pub crop_marks: bool,
    pub timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            page_format: PageFormat::A4,
            margins_mm: MarginsMm::default(),
            scale: 1.0,
            landscape: false,
            prefer_css_page_size: true,
            print_background: true,
            bleed_mm: 3.0,
            crop_marks: true,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub warnings: Vec<String>,
    pub render_ms: u64,
}

/// Uniform interface over the external paged-media renderer.
pub trait PagedMediaRenderer {
    fn initialize(&mut self) -> Result<()>;
    fn validate(&self, template: &GeneratedTemplate) -> Result<ValidationReport>;
    fn render(&mut self, template: &GeneratedTemplate, options: &RenderOptions) -> Result<RenderOutput>;
    fn close(&mut self) -> Result<()>;
}

/// Probes for, and shells out to, an external headless paged-media binary.
pub struct ExternalPagedRenderer {
    binary_path: Option<String>,
    auto_detect: bool,
    initialized: bool,
}

const CANDIDATE_BINARIES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "weasyprint", "prince"];

impl ExternalPagedRenderer {
    pub fn new(binary_path: Option<String>, auto_detect: bool) -> Self {
        ExternalPagedRenderer { binary_path, auto_detect, initialized: false }
    }

    /// Checks whether `binary` exists and is executable by asking it for
    /// its version.
    pub fn check_binary(binary: &str) -> bool {
        Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Probes `CANDIDATE_BINARIES` in order, returning the first one found.
    pub fn auto_detect() -> Option<String> {
        CANDIDATE_BINARIES.iter().find(|name| Self::check_binary(name)).map(|s| s.to_string())
    }
}

impl PagedMediaRenderer for ExternalPagedRenderer {
    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if self.binary_path.is_none() && self.auto_detect {
            self.binary_path = Self::auto_detect();
        }
        match &self.binary_path {
            Some(binary) if Self::check_binary(binary) => {
                self.initialized = true;
                Ok(())
            }
            Some(binary) => Err(AppError::RenderInternal(format!("renderer binary `{binary}` not usable"))),
            None => Err(AppError::RenderInternal("no paged-media renderer binary available".into())),
        }
    }

    fn validate(&self, template: &GeneratedTemplate) -> Result<ValidationReport> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if template.html.contains("src=\"\"") {
            errors.push("document contains an image with an empty src".to_string());
        }
        let open_braces = template.css.matches('{').count();
        let close_braces = template.css.matches('}').count();
        if open_braces != close_braces {
            errors.push("master/article CSS has unbalanced braces".to_string());
        }
        if template.metadata.page_count == 0 {
            warnings.push("estimated page count is zero".to_string());
        }

        Ok(ValidationReport { ok: errors.is_empty(), errors, warnings })
    }

    fn render(&mut self, template: &GeneratedTemplate, options: &RenderOptions) -> Result<RenderOutput> {
        if !self.initialized {
            self.initialize()?;
        }
        let validation = self.validate(template)?;
        if !validation.ok {
            return Err(AppError::TemplateValidation(validation.errors.join("; ")));
        }

        let binary = self.binary_path.as_ref().ok_or_else(|| AppError::RenderInternal("renderer not initialized".into()))?;

        let input_file = tempfile_path("magcast-render-input", "html");
        std::fs::write(&input_file, &template.html)?;
        let output_file = tempfile_path("magcast-render-output", "pdf");

        let started = Instant::now();
        let mut child = Command::new(binary)
            .arg(format!("--print-to-pdf={}", output_file.display()))
            .arg(page_format_arg(options.page_format))
            .arg(input_file.display().to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::RenderInternal(format!("failed to spawn renderer: {e}")))?;

        let exit_status = wait_with_timeout(&mut child, options.timeout)?;
        let _ = std::fs::remove_file(&input_file);

        match exit_status {
            None => {
                let _ = child.kill();
                Err(AppError::RenderTimeout(format!("render exceeded {}s", options.timeout.as_secs())))
            }
            Some(status) if !status.success() => {
                Err(AppError::RenderInternal(format!("renderer exited with status {status}")))
            }
            Some(_) => {
                let bytes = std::fs::read(&output_file).map_err(|e| AppError::RenderInternal(format!("renderer produced no output: {e}")))?;
                let _ = std::fs::remove_file(&output_file);
                Ok(RenderOutput {
                    bytes,
                    page_count: template.metadata.page_count,
                    warnings: Vec::new(),
                    render_ms: started.elapsed().as_millis() as u64,
                })
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }
}

fn page_format_arg(format: PageFormat) -> &'static str {
    match format {
        PageFormat::A4 => "--paper-size=A4",
        PageFormat::Letter => "--paper-size=Letter",
        PageFormat::A3 => "--paper-size=A3",
    }
}

fn tempfile_path(prefix: &str, extension: &str) -> PathBuf {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("{prefix}-{pid}-{nanos}.{extension}"))
}

/// Polls `child` until it exits or `timeout` elapses, returning `None` on
/// timeout without blocking indefinitely.
fn wait_with_timeout(child: &mut std::process::Child, timeout: Duration) -> Result<Option<std::process::ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(|e| AppError::RenderInternal(e.to_string()))? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// The deterministic HTML artifact emitted when the primary renderer is
/// unavailable or fails. Always succeeds given a well-formed
/// `GeneratedTemplate` — it performs no external I/O.
pub struct HtmlFallbackRenderer;

impl HtmlFallbackRenderer {
    /// Inlines `template.css`, prepends a diagnostic banner listing each
    /// decision, and splices `template.html`'s body content into a single
    /// standalone document.
    pub fn render(template: &GeneratedTemplate) -> String {
        let banner = Self::diagnostic_banner(template);
        let body = Self::strip_document_wrappers(&template.html);

        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html lang=\"de\"><head><meta charset=\"utf-8\">\n<style>\n");
        out.push_str(&template.css);
        out.push_str("\n</style>\n</head><body>\n");
        out.push_str(&banner);
        out.push_str(&body);
        out.push_str("\n</body></html>\n");
        out
    }

    fn diagnostic_banner(template: &GeneratedTemplate) -> String {
        let mut banner = String::from("<div class=\"fallback-diagnostics\">\n<p>PDF rendering unavailable in this environment, generated HTML preview instead.</p>\n<ul>\n");
        for decision in &template.metadata.decisions {
            banner.push_str(&format!(
                "<li>{} — score {:.0}, font {}pt, {} columns{}</li>\n",
                crate::html::escape(&decision.variant.variant_id),
                decision.score,
                decision.font_size,
                decision.column_count,
                if decision.warnings.is_empty() {
                    String::new()
                } else {
                    format!(" — {}", decision.warnings.iter().map(|w| crate::html::escape(w)).collect::<Vec<_>>().join("; "))
                }
            ));
        }
        banner.push_str("</ul>\n</div>\n");
        banner
    }

    /// Strips the `<!DOCTYPE>`/`<html>`/`<head>…</head>`/`<body>` wrappers
    /// from a full document, leaving only the body's inner content.
    fn strip_document_wrappers(document: &str) -> String {
        let without_head = match (document.find("<head"), document.find("</head>")) {
            (Some(start), Some(end)) => {
                let after_head = end + "</head>".len();
                format!("{}{}", &document[..start], &document[after_head..])
            }
            _ => document.to_string(),
        };

        let body_start = without_head.find("<body").and_then(|i| without_head[i..].find('>').map(|j| i + j + 1));
        let body_end = without_head.find("</body>");
        match (body_start, body_end) {
            (Some(start), Some(end)) if start <= end => without_head[start..end].to_string(),
            _ => without_head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{TemplateMetadata, GeneratedTemplate};

    fn sample_template() -> GeneratedTemplate {
        GeneratedTemplate {
            html: "<!DOCTYPE html><html lang=\"de\"><head><style>h1{}</style></head><body><article>Hello</article></body></html>".into(),
            css: "h1 { color: black; }".into(),
            metadata: TemplateMetadata { page_count: 3, decisions: vec![], warnings: vec![] },
        }
    }

    #[test]
    fn check_binary_rejects_nonexistent_binary() {
        assert!(!ExternalPagedRenderer::check_binary("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn html_fallback_strips_wrappers_and_inlines_css() {
        let template = sample_template();
        let out = HtmlFallbackRenderer::render(&template);
        assert!(out.contains("<article>Hello</article>"));
        assert!(!out.contains("<head>"));
        assert!(out.contains("h1 { color: black; }"));
        assert!(out.contains("generated HTML preview instead"));
    }

    #[test]
    fn validate_flags_unbalanced_css_braces() {
        let mut template = sample_template();
        template.css = "h1 { color: black;".into();
        let renderer = ExternalPagedRenderer::new(None, false);
        let report = renderer.validate(&template).unwrap();
        assert!(!report.ok);
    }

    #[test]
    fn validate_flags_empty_image_src() {
        let mut template = sample_template();
        template.html.push_str("<img src=\"\">");
        let renderer = ExternalPagedRenderer::new(None, false);
        let report = renderer.validate(&template).unwrap();
        assert!(!report.ok);
    }
}
