use std::path::PathBuf;

use magcast::model::{
    Article, ArticleType, BodyBounds, HeroBounds, Image, ImageRole, ImageRules, Issue, IssueStatus,
    LayoutRules, PullquotePolicy, RenderJob, RendererSelector, RuleSet, TemplatePack,
    TypographyRules, Variant,
};
use magcast::renderer::{PagedMediaRenderer, RenderOptions, RenderOutput, ValidationReport};
use magcast::repository::InMemoryRepository;
use magcast::supervisor::{CancellationToken, RecordingProgressSink, Supervisor};

struct StubRenderer {
    should_succeed: bool,
}

impl PagedMediaRenderer for StubRenderer {
    fn initialize(&mut self) -> magcast::Result<()> {
        if self.should_succeed {
            Ok(())
        } else {
            Err(magcast::AppError::RenderInternal("stub renderer unavailable".to_string()))
        }
    }

    fn validate(&self, _template: &magcast::compose::GeneratedTemplate) -> magcast::Result<ValidationReport> {
        Ok(ValidationReport { ok: true, errors: vec![], warnings: vec![] })
    }

    fn render(&mut self, _template: &magcast::compose::GeneratedTemplate, _options: &RenderOptions) -> magcast::Result<RenderOutput> {
        Ok(RenderOutput { bytes: b"%PDF-1.4 stub".to_vec(), page_count: 3, warnings: vec![], render_ms: 1 })
    }

    fn close(&mut self) -> magcast::Result<()> {
        Ok(())
    }
}

fn rule_set() -> RuleSet {
    RuleSet {
        typography: TypographyRules { font_min: 9.0, font_max: 13.0, line_height_min: 1.2, line_height_max: 1.5 },
        layout: LayoutRules { max_columns: 3, min_text_length: 0, max_text_length: 200_000 },
        images: ImageRules { hero_required_words: 400, max_images_per_column: 2 },
    }
}

fn two_article_issue() -> (Issue, TemplatePack, Vec<Article>, Vec<Image>) {
    let issue = Issue {
        issue_id: "issue-1".to_string(),
        title: "Autumn Edition".to_string(),
        date: "2026-09-01".to_string(),
        sections: vec!["News".to_string(), "Feature".to_string()],
        status: IssueStatus::Draft,
    };

    let pack = TemplatePack {
        pack_id: "pack-1".to_string(),
        name: "Broadsheet".to_string(),
        version: "2.1".to_string(),
        is_active: true,
        variants: vec![
            Variant {
                variant_id: "two-col".to_string(),
                columns: 2,
                hero: Some(HeroBounds { min_vh: 30.0, max_vh: 50.0 }),
                body: Some(BodyBounds { font_min: 9.5, font_max: 12.0, leading: [1.3, 1.5] }),
                pullquote: Some(PullquotePolicy { allow: true, min_paragraph: 2 }),
            },
            Variant { variant_id: "one-col".to_string(), columns: 1, hero: None, body: None, pullquote: None },
        ],
        rules: rule_set(),
    };

    let article_a = Article {
        article_id: "a1".to_string(),
        issue_id: "issue-1".to_string(),
        section: "News".to_string(),
        article_type: ArticleType::News,
        title: "City Council Approves New Budget".to_string(),
        dek: Some("A long night of debate ends in a narrow vote.".to_string()),
        author: "R. Alvarez".to_string(),
        body_html: "<p>The city council voted four to three last night to approve next year's operating budget.</p><p>Debate stretched past midnight as members argued over transit funding.</p><p>The final version restores most of the proposed cuts to the library system.</p>".to_string(),
    };
    let article_b = Article {
        article_id: "a2".to_string(),
        issue_id: "issue-1".to_string(),
        section: "Feature".to_string(),
        article_type: ArticleType::Feature,
        title: "The Slow Return of the Corner Bookstore".to_string(),
        dek: None,
        author: "J. Okafor".to_string(),
        body_html: "<p>Independent bookstores are opening again in neighborhoods that lost theirs a decade ago.</p><p>Owners describe a different kind of store this time, smaller and more specialized.</p>".to_string(),
    };

    let hero = Image {
        image_id: "a1-hero".to_string(),
        article_id: "a1".to_string(),
        src: "https://example.invalid/council.jpg".to_string(),
        role: ImageRole::Hero,
        caption: Some("Council chambers during the vote.".to_string()),
        credit: Some("Staff Photo".to_string()),
        focal_point: Some((0.5, 0.5)),
        intrinsic_width: Some(1200),
        intrinsic_height: Some(800),
        dpi: Some(150),
    };

    (issue, pack, vec![article_a, article_b], vec![hero])
}

fn seeded_repository() -> (InMemoryRepository, String, String) {
    let (issue, pack, articles, images) = two_article_issue();
    let repo = InMemoryRepository::new();
    let issue_id = issue.issue_id.clone();
    let pack_id = pack.pack_id.clone();
    repo.put_issue(issue);
    for article in &articles {
        let owned: Vec<Image> = images.iter().filter(|i| i.article_id == article.article_id).cloned().collect();
        repo.put_images(&article.article_id, owned);
    }
    repo.put_articles(&issue_id, articles);
    repo.put_template_pack(pack);
    (repo, issue_id, pack_id)
}

#[test]
fn end_to_end_job_succeeds_with_the_primary_renderer() {
    let (repo, issue_id, pack_id) = seeded_repository();
    let mut renderer = StubRenderer { should_succeed: true };
    let progress = RecordingProgressSink::default();
    let dir = std::env::temp_dir().join("magcast-integration-primary");
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, dir.clone());

    let mut job = RenderJob::new("job-primary".to_string(), issue_id, pack_id, RendererSelector::PagedPrimary, 1_700_000_000_000);
    let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());

    assert!(result.is_ok());
    assert_eq!(job.renderer, RendererSelector::PagedPrimary);
    assert_eq!(job.decisions.len(), 2);
    assert!(job.artifact_url.as_ref().unwrap().ends_with(".pdf"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn end_to_end_job_falls_back_to_html_when_primary_renderer_is_unavailable() {
    let (repo, issue_id, pack_id) = seeded_repository();
    let mut renderer = StubRenderer { should_succeed: false };
    let progress = RecordingProgressSink::default();
    let dir = std::env::temp_dir().join("magcast-integration-fallback");
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, dir.clone());

    let mut job = RenderJob::new("job-fallback".to_string(), issue_id, pack_id, RendererSelector::PagedPrimary, 1_700_000_000_000);
    let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());

    assert!(result.is_ok());
    assert_eq!(job.renderer, RendererSelector::HtmlFallback);
    assert!(job.warnings.iter().any(|w| w.contains("primary renderer failed")));
    let artifact = job.artifact_url.unwrap();
    assert!(artifact.ends_with(".html"));
    assert!(PathBuf::from(&artifact).exists());
    let contents = std::fs::read_to_string(&artifact).unwrap();
    assert!(contents.contains("City Council Approves New Budget"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_issue_fails_the_job_without_writing_an_artifact() {
    let repo = InMemoryRepository::new();
    let pack = two_article_issue().1;
    repo.put_template_pack(pack);
    let mut renderer = StubRenderer { should_succeed: true };
    let progress = RecordingProgressSink::default();
    let dir = std::env::temp_dir().join("magcast-integration-missing");
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, dir.clone());

    let mut job = RenderJob::new("job-missing".to_string(), "does-not-exist".to_string(), "pack-1".to_string(), RendererSelector::PagedPrimary, 1_700_000_000_000);
    let result = supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default());

    assert!(matches!(result, Err(magcast::AppError::InputNotFound(_))));
    assert!(job.artifact_url.is_none());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn progress_reaches_one_hundred_exactly_once_and_never_regresses() {
    let (repo, issue_id, pack_id) = seeded_repository();
    let mut renderer = StubRenderer { should_succeed: true };
    let progress = RecordingProgressSink::default();
    let dir = std::env::temp_dir().join("magcast-integration-progress");
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, dir.clone());

    let mut job = RenderJob::new("job-progress".to_string(), issue_id, pack_id, RendererSelector::PagedPrimary, 1_700_000_000_000);
    supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default()).unwrap();

    let recorded = progress.recorded.lock().unwrap();
    assert_eq!(recorded.iter().filter(|&&p| p == 100).count(), 1);
    for window in recorded.windows(2) {
        assert!(window[0] <= window[1]);
    }
    let _ = std::fs::remove_dir_all(&dir);
}
