use std::path::PathBuf;

use clap::{Parser, Subcommand};

use magcast::config::AppConfig;
use magcast::intake;
use magcast::model::{Image, Issue, RenderJob, RendererSelector, TemplatePack};
use magcast::renderer::{ExternalPagedRenderer, RenderOptions};
use magcast::repository::InMemoryRepository;
use magcast::supervisor::{CancellationToken, NoopProgressSink, Supervisor};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "magcast")]
#[command(about = "Magazine issue layout and paged-media rendering core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (yaml, json, toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one issue from an intake JSON document and a template pack
    Render {
        /// Path to the intake JSON document
        #[arg(short, long)]
        intake: PathBuf,
        /// Path to the template pack JSON document
        #[arg(short, long)]
        pack: PathBuf,
    },
    /// Run the built-in demo issue against the HTML fallback renderer
    Demo,
    /// Validate an intake document and template pack against the schema,
    /// without running a render job
    Validate {
        /// Path to the intake JSON document
        #[arg(long)]
        issue: PathBuf,
        /// Path to the template pack JSON document
        #[arg(long)]
        pack: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Render { intake, pack }) => run_render(intake, pack, cli.config.as_deref()),
        Some(Commands::Demo) => run_demo(),
        Some(Commands::Validate { issue, pack }) => validate_intake(issue, pack),
        None => {
            eprintln!("No command given. Try `magcast demo`, `magcast render`, or `magcast validate`.");
        }
    }
}

fn run_render(intake_path: &PathBuf, pack_path: &PathBuf, config_path: Option<&std::path::Path>) {
    let config = match AppConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return;
        }
    };

    let intake_raw = match std::fs::read_to_string(intake_path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Failed to read intake document: {e}");
            return;
        }
    };
    let (issue, articles, images) = match intake::parse_issue_json(&intake_raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Failed to parse intake document: {e}");
            return;
        }
    };

    let pack_raw = match std::fs::read_to_string(pack_path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Failed to read template pack: {e}");
            return;
        }
    };
    let pack = match intake::parse_template_pack_json(&pack_raw) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to parse template pack: {e}");
            return;
        }
    };

    let repo = InMemoryRepository::new();
    let issue_id = issue.issue_id.clone();
    let pack_id = pack.pack_id.clone();
    repo.put_issue(issue);
    repo.put_articles(&issue_id, articles_by_article(&articles, &images, &repo));
    repo.put_template_pack(pack);

    let mut renderer = ExternalPagedRenderer::new(config.renderer.binary_path.clone(), config.renderer.auto_detect);
    let progress = NoopProgressSink;
    let job_id = format!("job-{}", Uuid::new_v4());
    let mut job = RenderJob::new(job_id, issue_id, pack_id, RendererSelector::PagedPrimary, epoch_ms());

    let options = RenderOptions {
        page_format: config.renderer.page_format,
        margins_mm: config.renderer.margins_mm,
        scale: 1.0,
        landscape: false,
        prefer_css_page_size: true,
        print_background: true,
        bleed_mm: config.renderer.bleed_mm,
        crop_marks: config.renderer.crop_marks,
        timeout: std::time::Duration::from_secs(config.renderer.timeout_secs),
    };
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, config.output.directory.clone());

    match supervisor.run(&mut job, &CancellationToken::new(), &options) {
        Ok(()) => print_job(&job),
        Err(e) => eprintln!("Render job failed: {e}"),
    }
}

/// Groups `articles`/`images` back into the repository's per-issue layout;
/// images are keyed per article since that is how `Repository::load_images`
/// is queried.
fn articles_by_article(articles: &[magcast::model::Article], images: &[Image], repo: &InMemoryRepository) -> Vec<magcast::model::Article> {
    for article in articles {
        let owned: Vec<Image> = images.iter().filter(|i| i.article_id == article.article_id).cloned().collect();
        repo.put_images(&article.article_id, owned);
    }
    articles.to_vec()
}

/// Validates an intake document and a template pack against the schema
/// without loading a repository or running a job.
fn validate_intake(issue_path: &PathBuf, pack_path: &PathBuf) {
    let mut ok = true;

    match std::fs::read_to_string(issue_path) {
        Ok(raw) => match intake::parse_issue_json(&raw) {
            Ok((issue, articles, images)) => {
                println!("Issue `{}` is valid: {} article(s), {} image(s).", issue.issue_id, articles.len(), images.len());
            }
            Err(e) => {
                eprintln!("Intake document is invalid: {e}");
                ok = false;
            }
        },
        Err(e) => {
            eprintln!("Failed to read intake document: {e}");
            ok = false;
        }
    }

    match std::fs::read_to_string(pack_path) {
        Ok(raw) => match intake::parse_template_pack_json(&raw) {
            Ok(pack) => {
                println!("Template pack `{}` is valid: {} variant(s).", pack.pack_id, pack.variants.len());
            }
            Err(e) => {
                eprintln!("Template pack is invalid: {e}");
                ok = false;
            }
        },
        Err(e) => {
            eprintln!("Failed to read template pack: {e}");
            ok = false;
        }
    }

    if !ok {
        std::process::exit(1);
    }
}

fn run_demo() {
    let (issue, pack, articles, images) = demo_issue();
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

    // The demo always uses the HTML fallback path: it never assumes a
    // headless browser/PDF binary is installed on the machine running it.
    struct AlwaysFallback;
    impl magcast::renderer::PagedMediaRenderer for AlwaysFallback {
        fn initialize(&mut self) -> magcast::Result<()> {
            Err(magcast::AppError::RenderInternal("demo runs HTML-fallback only".to_string()))
        }
        fn validate(&self, _template: &magcast::compose::GeneratedTemplate) -> magcast::Result<magcast::renderer::ValidationReport> {
            Ok(magcast::renderer::ValidationReport { ok: true, errors: vec![], warnings: vec![] })
        }
        fn render(&mut self, _template: &magcast::compose::GeneratedTemplate, _options: &RenderOptions) -> magcast::Result<magcast::renderer::RenderOutput> {
            unreachable!("initialize always fails first")
        }
        fn close(&mut self) -> magcast::Result<()> {
            Ok(())
        }
    }

    let mut renderer = AlwaysFallback;
    let progress = NoopProgressSink;
    let mut job = RenderJob::new("demo-job".to_string(), issue_id, pack_id, RendererSelector::PagedPrimary, epoch_ms());
    let mut supervisor = Supervisor::new(&repo, &mut renderer, &progress, "output");

    println!("Starting demo render job: {}", job.job_id);
    match supervisor.run(&mut job, &CancellationToken::new(), &RenderOptions::default()) {
        Ok(()) => print_job(&job),
        Err(e) => eprintln!("Demo job failed: {e}"),
    }
}

fn print_job(job: &RenderJob) {
    println!("Job {} completed with status {:?}", job.job_id, job.status);
    println!("Renderer used: {:?}", job.renderer);
    if let Some(artifact) = &job.artifact_url {
        println!("Artifact: {artifact}");
    }
    for warning in &job.warnings {
        println!("Warning: {warning}");
    }
    for decision in &job.decisions {
        println!(" - {} columns, {}pt, score {:.1}", decision.columns, decision.font_size, decision.score);
    }
}

fn demo_issue() -> (Issue, TemplatePack, Vec<magcast::model::Article>, Vec<Image>) {
    use magcast::model::{ArticleType, BodyBounds, HeroBounds, ImageRole, ImageRules, IssueStatus, LayoutRules, PullquotePolicy, RuleSet, TypographyRules, Variant};

    let issue = Issue {
        issue_id: "demo-issue".to_string(),
        title: "The Demo Quarterly".to_string(),
        date: "2026-07-01".to_string(),
        sections: vec!["Feature".to_string()],
        status: IssueStatus::Draft,
    };

    let pack = TemplatePack {
        pack_id: "demo-pack".to_string(),
        name: "Editorial Classic".to_string(),
        version: "1.0".to_string(),
        is_active: true,
        variants: vec![
            Variant {
                variant_id: "two-column".to_string(),
                columns: 2,
                hero: Some(HeroBounds { min_vh: 30.0, max_vh: 50.0 }),
                body: Some(BodyBounds { font_min: 9.5, font_max: 12.0, leading: [1.3, 1.5] }),
                pullquote: Some(PullquotePolicy { allow: true, min_paragraph: 2 }),
            },
            Variant {
                variant_id: "three-column".to_string(),
                columns: 3,
                hero: Some(HeroBounds { min_vh: 25.0, max_vh: 40.0 }),
                body: Some(BodyBounds { font_min: 9.0, font_max: 11.0, leading: [1.2, 1.4] }),
                pullquote: Some(PullquotePolicy { allow: true, min_paragraph: 3 }),
            },
        ],
        rules: RuleSet {
            typography: TypographyRules { font_min: 9.0, font_max: 12.0, line_height_min: 1.2, line_height_max: 1.5 },
            layout: LayoutRules { max_columns: 3, min_text_length: 0, max_text_length: 100_000 },
            images: ImageRules { hero_required_words: 400, max_images_per_column: 2 },
        },
    };

    let article = magcast::model::Article {
        article_id: "demo-article".to_string(),
        issue_id: "demo-issue".to_string(),
        section: "Feature".to_string(),
        article_type: ArticleType::Feature,
        title: "Notes From the Editorial Floor".to_string(),
        dek: Some("How this core decides where a story lands on the page.".to_string()),
        author: "Staff Writer".to_string(),
        body_html: "<p>This is the first paragraph of the demo article, long enough to give the analyzer something to count.</p><p>A second paragraph follows, continuing the story and adding more words for the layout engine to weigh against the rule set.</p><p>A third and final paragraph closes things out, giving the composer a middle point to consider for a pullquote.</p>".to_string(),
    };

    let hero = Image {
        image_id: "demo-hero".to_string(),
        article_id: "demo-article".to_string(),
        src: "https://example.invalid/demo-hero.jpg".to_string(),
        role: ImageRole::Hero,
        caption: Some("A demo hero image.".to_string()),
        credit: Some("Demo Studio".to_string()),
        focal_point: Some((0.5, 0.4)),
        intrinsic_width: Some(1600),
        intrinsic_height: Some(900),
        dpi: Some(150),
    };

    (issue, pack, vec![article], vec![hero])
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
