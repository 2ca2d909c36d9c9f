//! The data model shared by every stage of the layout core.
//!
//! These types are closed records: intake-facing ones derive
//! `deny_unknown_fields` so that an unrecognized key in a variant or rule
//! set is rejected at parse time rather than silently ignored.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an `Issue`. Mutated only by intake (metadata) and
/// the Supervisor (status transitions).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Draft,
    Processing,
    Completed,
    Failed,
}

/// A magazine issue: identity, title, date, and the ordered section names
/// every article's `section` must resolve against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub issue_id: String,
    pub title: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub sections: Vec<String>,
    pub status: IssueStatus,
}

/// Editorial classification of an article, affecting nothing in the
/// decision engine directly but carried through to composition/metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArticleType {
    Feature,
    Article,
    Reportage,
    News,
    Editorial,
}

/// One article within an issue. `section` must be one of `Issue::sections`;
/// a mismatch is a non-fatal warning raised during composition, never a
/// parse error, so it is not validated by this type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub issue_id: String,
    pub section: String,
    #[serde(rename = "type")]
    pub article_type: ArticleType,
    pub title: String,
    pub dek: Option<String>,
    pub author: String,
    /// Constrained HTML fragment. Interpolated verbatim by the
    /// Composer — this core is not a sanitizer; that is intake's job.
    pub body_html: String,
}

/// Placement semantics for an `Image`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    Hero,
    Inline,
    Gallery,
}

/// An image attached to an article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub image_id: String,
    pub article_id: String,
    pub src: String,
    pub role: ImageRole,
    pub caption: Option<String>,
    pub credit: Option<String>,
    /// Parsed once at intake from `"x,y"`, each in `[0,1]`.
    pub focal_point: Option<(f32, f32)>,
    pub intrinsic_width: Option<u32>,
    pub intrinsic_height: Option<u32>,
    pub dpi: Option<u32>,
}

/// Body typography bounds for a `Variant`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BodyBounds {
    pub font_min: f32,
    pub font_max: f32,
    pub leading: [f32; 2],
}

/// Hero-image height bounds (vertical percentages) for a `Variant`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeroBounds {
    pub min_vh: f32,
    pub max_vh: f32,
}

/// Pullquote eligibility policy for a `Variant`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PullquotePolicy {
    pub allow: bool,
    pub min_paragraph: u32,
}

/// A named layout recipe within a `TemplatePack`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    pub variant_id: String,
    pub columns: u8,
    pub hero: Option<HeroBounds>,
    pub body: Option<BodyBounds>,
    pub pullquote: Option<PullquotePolicy>,
}

/// Pack-wide clamps used whenever a `Variant` omits a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub typography: TypographyRules,
    pub layout: LayoutRules,
    pub images: ImageRules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TypographyRules {
    pub font_min: f32,
    pub font_max: f32,
    pub line_height_min: f32,
    pub line_height_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LayoutRules {
    pub max_columns: u8,
    pub min_text_length: u32,
    pub max_text_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImageRules {
    pub hero_required_words: u32,
    pub max_images_per_column: u32,
}

/// The bundle of variants and rules that defines one visual identity. The
/// pack owns its variants and rules; they have no independent identity
/// outside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplatePack {
    pub pack_id: String,
    pub name: String,
    pub version: String,
    pub is_active: bool,
    pub variants: Vec<Variant>,
    pub rules: RuleSet,
}

impl TemplatePack {
    /// Lowercase, whitespace-collapsed-to-`-` form of the pack name, used
    /// to build artifact filenames.
    pub fn slug(&self) -> String {
        crate::html::slugify(&self.name)
    }
}

/// Which renderer a job should use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RendererSelector {
    PagedPrimary,
    HtmlFallback,
}

/// Lifecycle status of a `RenderJob`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// A compact summary of one article's decision, embedded on the job the
/// way a dashboard would want to show it without re-running composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub font_size: f32,
    pub columns: u8,
    pub score: f64,
    pub warnings: Vec<String>,
}

/// One render request driven through load → decide → compose → render →
/// persist by the Supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub job_id: String,
    pub issue_id: String,
    pub template_pack_id: String,
    pub renderer: RendererSelector,
    pub status: JobStatus,
    pub progress: u8,
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub decisions: Vec<DecisionSummary>,
}

impl RenderJob {
    pub fn new(job_id: String, issue_id: String, template_pack_id: String, renderer: RendererSelector, created_at: u64) -> Self {
        RenderJob {
            job_id,
            issue_id,
            template_pack_id,
            renderer,
            status: JobStatus::Queued,
            progress: 0,
            artifact_url: None,
            error_message: None,
            warnings: Vec::new(),
            created_at,
            started_at: None,
            completed_at: None,
            decisions: Vec::new(),
        }
    }
}

/// Derived, non-persisted metrics for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleMetrics {
    pub word_count: u32,
    pub paragraph_count: u32,
    pub char_count: u32,
    pub hero_image: Option<Image>,
    pub inline_images: Vec<Image>,
    pub has_long_paragraphs: bool,
    pub estimated_lines: u32,
}

/// Derived layout decision for one `(article, render_job)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutDecision {
    pub variant: Variant,
    /// Points, one decimal.
    pub font_size: f32,
    /// Unitless, two decimals.
    pub line_height: f32,
    pub hero_height_vh: Option<f32>,
    pub column_count: u8,
    /// Clamped at 0; deliberately **not** capped above 100 — see
    /// DESIGN.md. Additive bonuses can push this above 100; that is
    /// intentional, observed behavior.
    pub score: f64,
    pub warnings: Vec<String>,
}
