//! Render Job Supervisor. Drives one `RenderJob` through
//! load → analyze → decide → compose → validate → render → persist,
//! the same shape as `AnalysisEngine::run_scenario` (`core/src/analysis.rs`):
//! a single driver method that loads its inputs, threads them through the
//! pure stages, and reports a structured outcome rather than a bag of
//! side effects.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::analyzer;
use crate::compose::{self, ArticleInput};
use crate::decision;
use crate::model::{JobStatus, RendererSelector, RenderJob, DecisionSummary};
use crate::renderer::{HtmlFallbackRenderer, PagedMediaRenderer, RenderOptions};
use crate::repository::{ensure_not_terminal, Repository};
use crate::{AppError, Result};

/// The progress percentages reported at each stage boundary, in order.
pub const PROGRESS_SCHEDULE: [u8; 7] = [10, 25, 50, 70, 85, 95, 100];

/// Cooperative cancellation flag shared between the caller and a running
/// job. Checked at each stage boundary; never interrupts work mid-stage.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives per-stage progress updates as a job runs. Replaces ad-hoc
/// progress callbacks with a single named seam a caller can substitute —
/// a no-op for the CLI, a recording sink for tests.
pub trait ProgressSink {
    fn on_progress(&self, job_id: &str, percent: u8);
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _job_id: &str, _percent: u8) {}
}

/// Records every reported percentage in arrival order, for assertions in
/// tests that the schedule is monotonic and complete.
#[derive(Default)]
pub struct RecordingProgressSink {
    pub recorded: std::sync::Mutex<Vec<u8>>,
}

impl ProgressSink for RecordingProgressSink {
    fn on_progress(&self, _job_id: &str, percent: u8) {
        self.recorded.lock().expect("recording sink mutex poisoned").push(percent);
    }
}

/// Drives `job` end to end against `repository`, reporting progress to
/// `progress` and honoring `cancel` at stage boundaries. `output_dir` is
/// where the rendered artifact (PDF or HTML fallback) is written.
pub struct Supervisor<'a> {
    repository: &'a dyn Repository,
    renderer: &'a mut dyn PagedMediaRenderer,
    progress: &'a dyn ProgressSink,
    output_dir: PathBuf,
}

impl<'a> Supervisor<'a> {
    pub fn new(repository: &'a dyn Repository, renderer: &'a mut dyn PagedMediaRenderer, progress: &'a dyn ProgressSink, output_dir: impl Into<PathBuf>) -> Self {
        Supervisor { repository, renderer, progress, output_dir: output_dir.into() }
    }

    pub fn run(&mut self, job: &mut RenderJob, cancel: &CancellationToken, render_options: &RenderOptions) -> Result<()> {
        ensure_not_terminal(job)?;

        job.status = JobStatus::Processing;
        job.started_at = Some(now_ms());
        self.report(job, PROGRESS_SCHEDULE[0])?;

        match self.run_inner(job, cancel, render_options) {
            Ok(()) => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(now_ms());
                self.report(job, PROGRESS_SCHEDULE[6])?;
                Ok(())
            }
            Err(err) => {
                job.status = JobStatus::Failed;
                job.error_message = Some(err.to_string());
                job.completed_at = Some(now_ms());
                self.persist(job)?;
                Err(err)
            }
        }
    }

    fn run_inner(&mut self, job: &mut RenderJob, cancel: &CancellationToken, render_options: &RenderOptions) -> Result<()> {
        let issue = self.repository.load_issue(&job.issue_id)?;
        let articles = self.repository.load_articles(&job.issue_id)?;
        let pack = self.repository.load_template_pack(&job.template_pack_id)?;
        self.check_cancel(cancel)?;
        self.report(job, PROGRESS_SCHEDULE[1])?;

        let mut images_by_article = Vec::with_capacity(articles.len());
        let mut metrics_by_article = Vec::with_capacity(articles.len());
        let mut decisions_by_article = Vec::with_capacity(articles.len());

        for article in &articles {
            let images = self.repository.load_images(&article.article_id)?;
            let metrics = analyzer::analyze(article, &images);
            if !issue.sections.iter().any(|s| *s == article.section) {
                job.warnings.push(format!("article `{}` section `{}` not in issue sections", article.article_id, article.section));
            }
            let layout_decision = decision::decide(&metrics, &pack.variants, &pack.rules);
            job.decisions.push(DecisionSummary {
                font_size: layout_decision.font_size,
                columns: layout_decision.column_count,
                score: layout_decision.score,
                warnings: layout_decision.warnings.clone(),
            });
            images_by_article.push(images);
            metrics_by_article.push(metrics);
            decisions_by_article.push(layout_decision);
        }
        self.check_cancel(cancel)?;
        self.report(job, PROGRESS_SCHEDULE[2])?;

        let inputs: Vec<ArticleInput> = articles
            .iter()
            .zip(images_by_article.iter())
            .zip(metrics_by_article.iter())
            .zip(decisions_by_article.iter())
            .map(|(((article, images), metrics), layout_decision)| ArticleInput {
                article,
                images,
                metrics,
                decision: layout_decision,
            })
            .collect();
        let generated = compose::compose(&issue, &pack, &inputs);
        job.warnings.extend(generated.metadata.warnings.iter().cloned());
        self.check_cancel(cancel)?;
        self.report(job, PROGRESS_SCHEDULE[3])?;

        self.check_cancel(cancel)?;
        self.report(job, PROGRESS_SCHEDULE[4])?;

        // A TemplateValidation failure (whether raised by `validate()` itself
        // or reported via `ValidationReport::ok == false`) triggers the HTML
        // fallback path just like a render failure — it never fails the job
        // outright.
        let primary_attempt = match self.renderer.validate(&generated) {
            Ok(validation) if validation.ok => {
                job.warnings.extend(validation.warnings);
                self.renderer.initialize().and_then(|()| self.renderer.render(&generated, render_options))
            }
            Ok(validation) => Err(AppError::TemplateValidation(validation.errors.join("; "))),
            Err(err) => Err(err),
        };

        let (bytes, renderer_used, extension) = match primary_attempt {
            Ok(output) => {
                job.warnings.extend(output.warnings);
                (output.bytes, RendererSelector::PagedPrimary, "pdf")
            }
            Err(primary_err) => {
                job.warnings.push(format!("primary renderer failed, falling back to HTML: {primary_err}"));
                let html = HtmlFallbackRenderer::render(&generated);
                (html.into_bytes(), RendererSelector::HtmlFallback, "html")
            }
        };
        job.renderer = renderer_used;
        self.check_cancel(cancel)?;
        self.report(job, PROGRESS_SCHEDULE[5])?;

        let artifact_name = format!("{}-{}-{}.{}", job.issue_id, pack.slug(), now_ms(), extension);
        let artifact_path = self.output_dir.join(&artifact_name);
        if let Some(parent) = artifact_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::FallbackWriteFailure(e.to_string()))?;
        }
        std::fs::write(&artifact_path, &bytes).map_err(|e| AppError::FallbackWriteFailure(e.to_string()))?;
        job.artifact_url = Some(artifact_path.display().to_string());

        Ok(())
    }

    fn check_cancel(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Notifies the progress sink and persists the job row in the same
    /// step, so a repository read between any two stage boundaries always
    /// observes the percentage just reported, not a stale start-of-job
    /// value.
    fn report(&self, job: &mut RenderJob, percent: u8) -> Result<()> {
        job.progress = percent;
        self.progress.on_progress(&job.job_id, percent);
        self.repository.update_job(job)
    }

    fn persist(&self, job: &mut RenderJob) -> Result<()> {
        job.progress = current_progress(job);
        self.repository.update_job(job)
    }
}

fn current_progress(job: &RenderJob) -> u8 {
    match job.status {
        JobStatus::Queued => 0,
        JobStatus::Processing => job.progress.max(10),
        JobStatus::Completed => 100,
        JobStatus::Failed => job.progress,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArticleType, Issue, IssueStatus, Article, RuleSet, TypographyRules, LayoutRules, ImageRules, TemplatePack, Variant};
    use crate::renderer::{RenderOutput, ValidationReport};
    use crate::repository::InMemoryRepository;

    struct StubFailingRenderer;

    impl PagedMediaRenderer for StubFailingRenderer {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn validate(&self, _template: &compose::GeneratedTemplate) -> Result<ValidationReport> {
            Ok(ValidationReport { ok: true, errors: vec![], warnings: vec![] })
        }
        fn render(&mut self, _template: &compose::GeneratedTemplate, _options: &RenderOptions) -> Result<RenderOutput> {
            Err(AppError::RenderInternal("no primary renderer available in tests".to_string()))
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct StubInvalidRenderer;

    impl PagedMediaRenderer for StubInvalidRenderer {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn validate(&self, _template: &compose::GeneratedTemplate) -> Result<ValidationReport> {
            Ok(ValidationReport { ok: false, errors: vec!["unsupported @page rule".to_string()], warnings: vec![] })
        }
        fn render(&mut self, _template: &compose::GeneratedTemplate, _options: &RenderOptions) -> Result<RenderOutput> {
            panic!("render must not be attempted once validation has failed");
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn setup(repo: &InMemoryRepository) {
        repo.put_issue(Issue {
            issue_id: "i1".into(),
            title: "Issue".into(),
            date: "2026-01-01".into(),
            sections: vec!["News".into()],
            status: IssueStatus::Draft,
        });
        repo.put_articles(
            "i1",
            vec![Article {
                article_id: "a1".into(),
                issue_id: "i1".into(),
                section: "News".into(),
                article_type: ArticleType::Feature,
                title: "Title".into(),
                dek: None,
                author: "Author".into(),
                body_html: "<p>Hello world today.</p>".into(),
            }],
        );
        repo.put_images("a1", vec![]);
        repo.put_template_pack(TemplatePack {
            pack_id: "p1".into(),
            name: "Pack".into(),
            version: "1".into(),
            is_active: true,
            variants: vec![Variant { variant_id: "v1".into(), columns: 1, hero: None, body: None, pullquote: None }],
            rules: RuleSet {
                typography: TypographyRules { font_min: 9.0, font_max: 18.0, line_height_min: 1.2, line_height_max: 1.6 },
                layout: LayoutRules { max_columns: 3, min_text_length: 0, max_text_length: 100_000 },
                images: ImageRules { hero_required_words: 400, max_images_per_column: 2 },
            },
        });
    }

    #[test]
    fn falls_back_to_html_when_primary_renderer_fails() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubFailingRenderer;
        let sink = RecordingProgressSink::default();
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms()));
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &sink, dir.clone());

        let mut job = RenderJob::new("j1".into(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());

        assert!(result.is_ok());
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.renderer, RendererSelector::HtmlFallback);
        assert!(job.artifact_url.as_ref().unwrap().ends_with(".html"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn progress_schedule_is_monotonic() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubFailingRenderer;
        let sink = RecordingProgressSink::default();
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms() + 1));
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &sink, dir.clone());

        let mut job = RenderJob::new("j1".into(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default()).unwrap();

        let recorded = sink.recorded.lock().unwrap();
        let mut sorted = recorded.clone();
        sorted.sort_unstable();
        assert_eq!(*recorded, sorted, "progress must never decrease");
        assert_eq!(*recorded.last().unwrap(), 100);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn template_validation_failure_triggers_html_fallback_instead_of_failing_the_job() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubInvalidRenderer;
        let sink = RecordingProgressSink::default();
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms() + 4));
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &sink, dir.clone());

        let mut job = RenderJob::new("j1".into(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());

        assert!(result.is_ok());
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.renderer, RendererSelector::HtmlFallback);
        assert!(job.warnings.iter().any(|w| w.contains("unsupported @page rule")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn repository_row_carries_progress_at_each_stage_boundary_not_just_start_and_end() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubFailingRenderer;
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms() + 5));

        let job_id = "j1".to_string();
        let mut job = RenderJob::new(job_id.clone(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        repo.put_job(job.clone());

        // A `ProgressSink` that snapshots the repository's persisted row every
        // time it is notified, proving a reader going through the repository
        // (not the in-memory `job` the caller holds) observes the same
        // monotonic stage-boundary sequence.
        struct SnapshottingSink<'a> {
            repo: &'a InMemoryRepository,
            job_id: String,
            seen: std::sync::Mutex<Vec<u8>>,
        }
        impl<'a> ProgressSink for SnapshottingSink<'a> {
            fn on_progress(&self, _job_id: &str, _percent: u8) {
                let persisted = self.repo.get_job(&self.job_id).expect("job row must exist");
                self.seen.lock().unwrap().push(persisted.progress);
            }
        }
        let snapshotting = SnapshottingSink { repo: &repo, job_id: job_id.clone(), seen: std::sync::Mutex::new(Vec::new()) };
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &snapshotting, dir.clone());
        supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default()).unwrap();

        let seen = snapshotting.seen.lock().unwrap();
        assert_eq!(*seen, PROGRESS_SCHEDULE.to_vec(), "repository row must carry the exact reported percent at every boundary");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_running_a_terminal_job_again() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubFailingRenderer;
        let sink = NoopProgressSink;
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms() + 2));
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &sink, dir.clone());

        let mut job = RenderJob::new("j1".into(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        job.status = JobStatus::Completed;
        let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cancellation_before_run_short_circuits_with_cancelled_error() {
        let repo = InMemoryRepository::new();
        setup(&repo);
        let mut renderer = StubFailingRenderer;
        let sink = NoopProgressSink;
        let dir = std::env::temp_dir().join(format!("magcast-test-{}", now_ms() + 3));
        let mut supervisor = Supervisor::new(&repo, &mut renderer, &sink, dir.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut job = RenderJob::new("j1".into(), "i1".into(), "p1".into(), RendererSelector::PagedPrimary, now_ms());
        let result = supervisor.run(&mut job, &cancel, &RenderOptions::default());
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(job.status, JobStatus::Failed);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
