//! The small repository interface the core depends on as an external
//! collaborator. The core only depends on this trait; a real deployment
//! backs it with a database. `InMemoryRepository` is the stub this crate
//! ships for the CLI `demo` command and for tests, following the same
//! trait + Real/Stub pairing as `PdfMutator` / `RealPdfMutator` /
//! `StubPdfMutator` in `core/src/pdf.rs`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{Article, Image, Issue, JobStatus, RenderJob, TemplatePack};
use crate::{AppError, Result};

/// Everything the Render Job Supervisor needs to load and persist, kept
/// behind a trait so the core never depends on a concrete storage engine.
pub trait Repository: Send + Sync {
    fn load_issue(&self, issue_id: &str) -> Result<Issue>;
    fn load_articles(&self, issue_id: &str) -> Result<Vec<Article>>;
    fn load_images(&self, article_id: &str) -> Result<Vec<Image>>;
    fn load_template_pack(&self, pack_id: &str) -> Result<TemplatePack>;

    /// Serializes a status/progress/warnings/artifact update onto a job.
    /// Implementations must serialize writes to any one job row.
    fn update_job(&self, job: &RenderJob) -> Result<()>;
}

/// A repository backed entirely by in-process maps. Linearizes writes
/// with a single mutex per collection, matching the "must serialize
/// writes to any one row" requirement without needing a real database.
pub struct InMemoryRepository {
    issues: Mutex<HashMap<String, Issue>>,
    articles: Mutex<HashMap<String, Vec<Article>>>,
    images: Mutex<HashMap<String, Vec<Image>>>,
    packs: Mutex<HashMap<String, TemplatePack>>,
    jobs: Mutex<HashMap<String, RenderJob>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        InMemoryRepository {
            issues: Mutex::new(HashMap::new()),
            articles: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            packs: Mutex::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn put_issue(&self, issue: Issue) {
        self.issues.lock().expect("issues mutex poisoned").insert(issue.issue_id.clone(), issue);
    }

    pub fn put_articles(&self, issue_id: &str, articles: Vec<Article>) {
        self.articles.lock().expect("articles mutex poisoned").insert(issue_id.to_string(), articles);
    }

    pub fn put_images(&self, article_id: &str, images: Vec<Image>) {
        self.images.lock().expect("images mutex poisoned").insert(article_id.to_string(), images);
    }

    pub fn put_template_pack(&self, pack: TemplatePack) {
        self.packs.lock().expect("packs mutex poisoned").insert(pack.pack_id.clone(), pack);
    }

    pub fn get_job(&self, job_id: &str) -> Option<RenderJob> {
        self.jobs.lock().expect("jobs mutex poisoned").get(job_id).cloned()
    }

    pub fn put_job(&self, job: RenderJob) {
        self.jobs.lock().expect("jobs mutex poisoned").insert(job.job_id.clone(), job);
    }
}

impl Repository for InMemoryRepository {
    fn load_issue(&self, issue_id: &str) -> Result<Issue> {
        self.issues
            .lock()
            .expect("issues mutex poisoned")
            .get(issue_id)
            .cloned()
            .ok_or_else(|| AppError::InputNotFound(format!("issue `{issue_id}`")))
    }

    fn load_articles(&self, issue_id: &str) -> Result<Vec<Article>> {
        Ok(self.articles.lock().expect("articles mutex poisoned").get(issue_id).cloned().unwrap_or_default())
    }

    fn load_images(&self, article_id: &str) -> Result<Vec<Image>> {
        Ok(self.images.lock().expect("images mutex poisoned").get(article_id).cloned().unwrap_or_default())
    }

    fn load_template_pack(&self, pack_id: &str) -> Result<TemplatePack> {
        self.packs
            .lock()
            .expect("packs mutex poisoned")
            .get(pack_id)
            .cloned()
            .ok_or_else(|| AppError::InputNotFound(format!("template pack `{pack_id}`")))
    }

    fn update_job(&self, job: &RenderJob) -> Result<()> {
        self.jobs.lock().expect("jobs mutex poisoned").insert(job.job_id.clone(), job.clone());
        Ok(())
    }
}

/// Rejects mutation once a job is in a terminal state.
pub fn ensure_not_terminal(job: &RenderJob) -> Result<()> {
    match job.status {
        JobStatus::Completed | JobStatus::Failed => {
            Err(AppError::InvalidTransition(format!("job `{}` is already terminal", job.job_id)))
        }
        _ => Ok(()),
    }
}
