//! Template Composer. Pure: assembles one `(Issue, articles, pack,
//! decisions)` tuple into a single standalone HTML document plus its
//! master CSS, hand-assembled with `format!`/`push_str` rather than a
//! templating engine.

use crate::analyzer;
use crate::css;
use crate::html;
use crate::model::{Article, ArticleMetrics, Image, Issue, LayoutDecision, TemplatePack};

/// Everything the Composer needs for one article: the record itself, its
/// attached images, the metrics the Analyzer derived, and the decision the
/// Layout Decision Engine made.
pub struct ArticleInput<'a> {
    pub article: &'a Article,
    pub images: &'a [Image],
    pub metrics: &'a ArticleMetrics,
    pub decision: &'a LayoutDecision,
}

#[derive(Debug, Clone)]
pub struct TemplateMetadata {
    pub page_count: u32,
    pub decisions: Vec<LayoutDecision>,
    pub warnings: Vec<String>,
}

/// The composer's entire output: a standalone HTML document, its CSS
/// (already inlined into `<style>` within `html`, duplicated here for
/// renderers/validators that want it separately), and composition metadata.
#[derive(Debug, Clone)]
pub struct GeneratedTemplate {
    pub html: String,
    pub css: String,
    pub metadata: TemplateMetadata,
}

const PULLQUOTE_MIN_CHARS: usize = 40;
const PULLQUOTE_MAX_CHARS: usize = 120;

/// Composes the full issue document from `issue`, `pack`, and one
/// `ArticleInput` per article, in the order they should appear.
pub fn compose(issue: &Issue, pack: &TemplatePack, inputs: &[ArticleInput]) -> GeneratedTemplate {
    let master_css = emit_master_css(issue, pack);
    let mut article_css = String::new();
    let mut warnings = Vec::new();

    let mut html_out = String::new();
    html_out.push_str("<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">\n");
    html_out.push_str(&format!("<title>{}</title>\n", html::escape(&issue.title)));
    html_out.push_str("<style>\n");
    html_out.push_str(&master_css);

    for input in inputs {
        let scoped = scope_css(&css::emit_article_css(input.decision), &input.article.article_id);
        article_css.push_str(&scoped);
        html_out.push_str(&scoped);
        warnings.extend(input.decision.warnings.iter().cloned());
    }
    html_out.push_str("</style>\n</head>\n<body>\n");

    html_out.push_str(&emit_cover(issue, pack));
    html_out.push_str(&emit_toc(issue, inputs));

    for input in inputs {
        html_out.push_str(&emit_article(input));
    }

    html_out.push_str(&emit_imprint(issue, pack));
    html_out.push_str("</body>\n</html>\n");

    let page_count = 2 + div_ceil(inputs.len() as u32, 2) + inputs.len() as u32;

    GeneratedTemplate {
        html: html_out,
        css: format!("{master_css}{article_css}"),
        metadata: TemplateMetadata {
            page_count,
            decisions: inputs.iter().map(|i| i.decision.clone()).collect(),
            warnings,
        },
    }
}

fn emit_cover(issue: &Issue, pack: &TemplatePack) -> String {
    format!(
        "<section class=\"cover\">\n<h1>{}</h1>\n<p class=\"issue-date\">{}</p>\n<p class=\"pack-name\">{}</p>\n</section>\n",
        html::escape(&issue.title),
        html::escape(&issue.date),
        html::escape(&pack.name)
    )
}

/// Lists every article, grouped by section in `Issue::sections` order,
/// with an approximate running page number; `3 + n` is a deliberate
/// estimate, not a promise of the article's true starting page. Articles
/// whose section doesn't match any of `Issue::sections` (a non-fatal
/// `SectionMismatch`) are still listed, grouped under their own section
/// name after the issue's declared sections.
fn emit_toc(issue: &Issue, inputs: &[ArticleInput]) -> String {
    let mut toc = String::from("<section class=\"toc\">\n<h2>Inhalt</h2>\n");
    let mut page: u32 = 3;
    let mut seen = vec![false; inputs.len()];

    for section in &issue.sections {
        let indices: Vec<usize> = inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| &input.article.section == section)
            .map(|(idx, _)| idx)
            .collect();
        if indices.is_empty() {
            continue;
        }
        toc.push_str(&toc_section_group(section, &indices, inputs, &mut page));
        for idx in &indices {
            seen[*idx] = true;
        }
    }

    let remaining: Vec<usize> = (0..inputs.len()).filter(|&i| !seen[i]).collect();
    let mut stray_sections: Vec<&str> = Vec::new();
    for &idx in &remaining {
        let name = inputs[idx].article.section.as_str();
        if !stray_sections.contains(&name) {
            stray_sections.push(name);
        }
    }
    for name in stray_sections {
        let indices: Vec<usize> = remaining.iter().copied().filter(|&idx| inputs[idx].article.section == name).collect();
        toc.push_str(&toc_section_group(name, &indices, inputs, &mut page));
    }

    toc.push_str("</section>\n");
    toc
}

fn toc_section_group(section: &str, indices: &[usize], inputs: &[ArticleInput], page: &mut u32) -> String {
    let mut group = format!("<h3 class=\"toc-section\">{}</h3>\n<ol>\n", html::escape(section));
    for &idx in indices {
        let input = &inputs[idx];
        group.push_str(&format!(
            "<li><span class=\"toc-title\">{}</span><span class=\"toc-author\">{}</span><span class=\"toc-page\">{}</span></li>\n",
            html::escape(&input.article.title),
            html::escape(&input.article.author),
            page
        ));
        *page += 1;
    }
    group.push_str("</ol>\n");
    group
}

fn emit_article(input: &ArticleInput) -> String {
    let article = input.article;
    let paragraphs = analyzer::paragraphs(&article.body_html);
    let pullquote_text = selected_pullquote_text(input, article);

    let mut body = String::new();
    let middle = paragraphs.len() / 2;
    let inline_count = input.metrics.inline_images.len();

    for (index, paragraph) in paragraphs.iter().enumerate() {
        body.push_str(&format!("<p>{paragraph}</p>\n"));

        if let Some(pullquote) = &pullquote_text {
            if index == middle {
                body.push_str(&format!(
                    "<aside class=\"pullquote\">&ldquo;{}&rdquo;</aside>\n",
                    html::escape(pullquote)
                ));
            }
        }

        for (image_index, image) in input.metrics.inline_images.iter().enumerate() {
            let slot = (paragraphs.len() * (image_index + 1)) / (inline_count + 1);
            if slot == index {
                body.push_str(&emit_figure(image));
            }
        }
    }

    let hero_block = input
        .metrics
        .hero_image
        .as_ref()
        .map(|hero| format!("<figure class=\"hero-image\">{}</figure>\n", emit_figure_inner(hero)))
        .unwrap_or_default();

    format!(
        "<section class=\"article\" id=\"article-{id}\">\n<header>\n<h1 class=\"title\">{title}</h1>\n{dek}<p class=\"byline\">{author}</p>\n</header>\n{hero_block}<div class=\"body\">\n{body}</div>\n</section>\n",
        id = html::escape(&article.article_id),
        title = html::escape(&article.title),
        dek = article.dek.as_deref().map(|d| format!("<p class=\"dek\">{}</p>\n", html::escape(d))).unwrap_or_default(),
        author = html::escape(&article.author),
        hero_block = hero_block,
        body = body,
    )
}

/// Scans the article's plaintext for the first sentence whose length
/// falls in `[40,120]` characters, omitting the pullquote entirely if
/// none qualifies.
fn selected_pullquote_text(input: &ArticleInput, article: &Article) -> Option<String> {
    let policy = input.decision.variant.pullquote.as_ref()?;
    if !policy.allow || input.metrics.paragraph_count < policy.min_paragraph {
        return None;
    }
    let plain = html::strip_tags(&article.body_html);
    split_into_sentences(&plain)
        .into_iter()
        .find(|sentence| (PULLQUOTE_MIN_CHARS..=PULLQUOTE_MAX_CHARS).contains(&sentence.chars().count()))
}

/// Splits `text` into sentences on runs of `.`, `!`, or `?`, dropping the
/// delimiters and any resulting empty sentences.
fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            while matches!(chars.peek(), Some('.') | Some('!') | Some('?')) {
                chars.next();
            }
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        } else {
            current.push(ch);
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}

fn emit_figure(image: &Image) -> String {
    format!("<figure class=\"inline-image\">{}</figure>\n", emit_figure_inner(image))
}

fn emit_figure_inner(image: &Image) -> String {
    let mut out = format!("<img src=\"{}\" alt=\"\">", html::escape(&image.src));
    if image.caption.is_some() || image.credit.is_some() {
        out.push_str("<figcaption>");
        if let Some(caption) = &image.caption {
            out.push_str(&format!("<span class=\"caption\">{}</span>", html::escape(caption)));
        }
        if let Some(credit) = &image.credit {
            out.push_str(&format!("<span class=\"credit\">{}</span>", html::escape(credit)));
        }
        out.push_str("</figcaption>");
    }
    out
}

fn emit_imprint(issue: &Issue, pack: &TemplatePack) -> String {
    format!(
        "<section class=\"imprint\">\n<h2>Impressum</h2>\n<p>{} &mdash; {}</p>\n<p>Template: {} v{}</p>\n</section>\n",
        html::escape(&issue.title),
        html::escape(&issue.date),
        html::escape(&pack.name),
        html::escape(&pack.version)
    )
}

/// Document-wide rules: page geometry for the paged-media renderer plus an
/// additive screen preview block so the HTML fallback is legible in a
/// browser. The `@media screen` rules are a pure supplement — nothing here
/// overrides the print rules paged renderers consume.
fn emit_master_css(issue: &Issue, pack: &TemplatePack) -> String {
    let mut css = String::new();
    css.push_str("@page {\n");
    css.push_str("  size: A4;\n");
    css.push_str("  margin: 15mm 15mm 20mm 15mm;\n");
    css.push_str("  marks: crop cross;\n");
    css.push_str("  bleed: 3mm;\n");
    css.push_str(&format!("  @top-center {{ content: \"{}\"; }}\n", css_string_escape(&pack.name)));
    css.push_str("  @bottom-center { content: counter(page); }\n");
    css.push_str(&format!("  @bottom-left {{ content: \"{}\"; }}\n", css_string_escape(&issue.date)));
    css.push_str("}\n");
    css.push_str("@page :first {\n");
    css.push_str("  @top-center { content: none; }\n");
    css.push_str("  @bottom-center { content: none; }\n");
    css.push_str("  @bottom-left { content: none; }\n");
    css.push_str("}\n");
    css.push_str("body { font-family: Georgia, 'Times New Roman', serif; color: #111; margin: 0; }\n");
    css.push_str("section { page-break-before: always; padding: 20mm; }\n");
    css.push_str(".cover { text-align: center; padding-top: 30vh; }\n");
    css.push_str(".toc ol { list-style: none; padding: 0; }\n");
    css.push_str(".toc li { display: flex; justify-content: space-between; border-bottom: 1px dotted #999; }\n");
    css.push_str(".pullquote { font-style: italic; text-align: center; margin: 1em 0; }\n");
    css.push_str(".imprint { font-size: 9pt; color: #555; }\n");
    css.push_str("@media screen {\n  body { background: #e5e5e5; }\n  section { background: white; max-width: 900px; margin: 20px auto; box-shadow: 0 0 8px rgba(0,0,0,0.2); }\n}\n");
    css
}

/// Escapes `"` and `\` for safe interpolation into a CSS string literal.
fn css_string_escape(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Rewrites every selector the article CSS emitter produces (always
/// prefixed with a bare `article ` token) to scope it to one article's id,
/// since more than one `<section class="article">` can share a page.
fn scope_css(css: &str, article_id: &str) -> String {
    let scope = format!("#article-{} ", html::escape(article_id));
    css.lines()
        .map(|line| {
            if let Some(rest) = line.strip_prefix("article ") {
                format!("{scope}{rest}\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect()
}

fn div_ceil(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { (a + b - 1) / b }
}
