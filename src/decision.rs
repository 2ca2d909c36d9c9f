//! Layout Decision Engine. Pure: `decide` never fails.
//!
//! Candidate evaluation here has no fallible step (it is arithmetic
//! over plain numbers), so an empty variant list is the only condition
//! that forces a fallback decision; there is no other failure path to
//! model for a degenerate variant set.

use crate::model::{ArticleMetrics, LayoutDecision, RuleSet, Variant};

const OVERFLOW_COLUMN_HEIGHT_UNITS: f32 = 1000.0;

/// Picks the highest-scoring variant for one article, ties going to the
/// earlier entry in `variants`. Falls back to a synthetic single-column
/// decision when `variants` is empty.
pub fn decide(metrics: &ArticleMetrics, variants: &[Variant], rules: &RuleSet) -> LayoutDecision {
    if variants.is_empty() {
        return fallback_decision(rules);
    }

    let mut best: Option<LayoutDecision> = None;
    for variant in variants {
        let candidate = score_variant(metrics, variant, rules);
        match &best {
            Some(current) if current.score >= candidate.score => {}
            _ => best = Some(candidate),
        }
    }
    best.expect("variants is non-empty, so a candidate was always scored")
}

fn optimal_columns(metrics: &ArticleMetrics) -> u8 {
    if metrics.word_count < 200 {
        1
    } else if metrics.word_count < 500 {
        2
    } else {
        3
    }
}

fn score_variant(metrics: &ArticleMetrics, variant: &Variant, rules: &RuleSet) -> LayoutDecision {
    let mut score: f64 = 100.0;
    let mut warnings = Vec::new();

    let w = metrics.word_count;
    let columns = variant.columns;
    let optimal = optimal_columns(metrics);

    if columns > optimal {
        score -= 15.0;
        warnings.push(format!("{} columns may be too many for {} words", columns, w));
    }

    let hero_required_words = rules.images.hero_required_words;
    if variant.hero.is_some() {
        if metrics.hero_image.is_some() {
            if w >= hero_required_words {
                score += 10.0;
            } else {
                score -= 5.0;
            }
        } else if w > hero_required_words {
            score -= 20.0;
            warnings.push("Long article would benefit from hero image".to_string());
        }
    }

    let (lo, hi) = match &variant.body {
        Some(body) => (body.font_min, body.font_max),
        None => (rules.typography.font_min, rules.typography.font_max),
    };
    let mut font = if w < 300 {
        lo + 0.5
    } else if w > 800 {
        hi - 0.3
    } else {
        lo + 0.2
    };
    if columns > 2 {
        font = (font - 0.2).max(lo);
    }
    let font = round_to(font, 1);

    let t = if hi == lo { 0.0 } else { (font - lo) / (hi - lo) };
    let (lh_lo, lh_hi) = match &variant.body {
        Some(body) => (body.leading[0], body.leading[1]),
        None => (rules.typography.line_height_min, rules.typography.line_height_max),
    };
    let leading = round_to(lh_lo + t * (lh_hi - lh_lo), 2);

    if font <= rules.typography.font_min {
        score -= 25.0;
        warnings.push("Font size at minimum limit".to_string());
    } else if font >= rules.typography.font_max {
        score -= 10.0;
        warnings.push("Font size at maximum limit".to_string());
    }

    let lines_per_column = div_ceil(metrics.estimated_lines, columns as u32);
    let column_height = font * leading * 1.33 * lines_per_column as f32;
    if column_height > OVERFLOW_COLUMN_HEIGHT_UNITS {
        score -= 30.0;
        warnings.push("Text may overflow page boundaries".to_string());
    }

    if metrics.inline_images.len() as u32 > columns as u32 * rules.images.max_images_per_column {
        score -= 15.0;
        warnings.push("Too many images for column layout".to_string());
    }

    if metrics.has_long_paragraphs && columns > 2 {
        score -= 10.0;
        warnings.push("Long paragraphs in narrow columns may affect readability".to_string());
    }

    if let Some(pullquote) = &variant.pullquote {
        if pullquote.allow && metrics.paragraph_count >= pullquote.min_paragraph {
            score += 5.0;
        }
    }

    let hero_height_vh = variant.hero.and_then(|hero| {
        metrics.hero_image.as_ref().map(|_| if w >= hero_required_words { hero.max_vh } else { hero.min_vh })
    });

    LayoutDecision {
        variant: variant.clone(),
        font_size: font,
        line_height: leading,
        hero_height_vh,
        column_count: columns,
        score: score.max(0.0),
        warnings,
    }
}

fn fallback_decision(rules: &RuleSet) -> LayoutDecision {
    let fallback_variant = Variant {
        variant_id: "fallback-single-column".to_string(),
        columns: 1,
        hero: None,
        body: None,
        pullquote: None,
    };
    LayoutDecision {
        variant: fallback_variant,
        font_size: rules.typography.font_min,
        line_height: rules.typography.line_height_min,
        hero_height_vh: None,
        column_count: 1,
        score: 50.0,
        warnings: vec!["Using fallback layout decision".to_string()],
    }
}

fn round_to(value: f32, decimals: u32) -> f32 {
    let factor = 10f32.powi(decimals as i32);
    (value * factor).round() / factor
}

fn div_ceil(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { (a + b - 1) / b }
}
