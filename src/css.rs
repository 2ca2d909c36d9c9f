//! Per-Article CSS Emitter. Pure: a `LayoutDecision` plus its originating
//! `Variant` always produce the same CSS fragment, hand assembled with
//! `format!`/`push_str` rather than a templating engine.

use crate::model::LayoutDecision;

/// Emits the article-scoped CSS fragment for `decision`, intended to be
/// wrapped in a `<style>` element scoped to a single `<article>` container.
pub fn emit_article_css(decision: &LayoutDecision) -> String {
    let f = decision.font_size;
    let mut css = String::new();

    css.push_str(&format!(
        "article h1.title {{ font-size: {}pt; line-height: 1.2; column-span: all; break-after: avoid; }}\n",
        round_pt(f * 2.8)
    ));
    css.push_str(&format!(
        "article p.dek {{ font-size: {}pt; line-height: 1.4; column-span: all; }}\n",
        round_pt(f * 1.2)
    ));
    css.push_str(&format!(
        "article .byline {{ font-size: {}pt; text-transform: uppercase; letter-spacing: 0.5px; }}\n",
        round_pt(f * 0.9)
    ));
    css.push_str(&format!(
        "article .body {{ font-size: {}pt; line-height: {}; column-count: {}; column-gap: 24px; column-fill: balance; hyphens: auto; orphans: 2; widows: 2; }}\n",
        f, decision.line_height, decision.column_count
    ));
    css.push_str(&format!(
        "article .body p:first-of-type::first-letter {{ font-size: {}pt; float: left; }}\n",
        round_pt(f * 3.5)
    ));
    css.push_str(&format!(
        "article .body p {{ margin-bottom: {}pt; break-inside: avoid-column; }}\n",
        round_pt(f * 0.8)
    ));

    if let Some(vh) = decision.hero_height_vh {
        css.push_str(&format!(
            "article .hero-image {{ height: {}vh; column-span: all; break-after: avoid; }}\n",
            vh
        ));
    }

    if let Some(pullquote) = &decision.variant.pullquote {
        if pullquote.allow {
            let span = if decision.column_count > 2 { "2" } else { "all" };
            css.push_str(&format!(
                "article .pullquote {{ font-size: {}pt; column-span: {}; break-inside: avoid; }}\n",
                round_pt(f * 1.4),
                span
            ));
        }
    }

    css.push_str(&format!("article figcaption .caption {{ font-size: {}pt; font-style: italic; }}\n", round_pt(f * 0.85)));
    css.push_str(&format!("article figcaption .credit {{ font-size: {}pt; text-transform: uppercase; }}\n", round_pt(f * 0.75)));

    css
}

/// Whole-point CSS sizes are rounded to the nearest integer; only
/// `font_size`/`line_height` themselves carry decimals.
fn round_pt(value: f32) -> i32 {
    value.round() as i32
}
