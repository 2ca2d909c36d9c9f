//! Article Analyzer. Pure, infallible: any input, however malformed
//! its HTML, produces an `ArticleMetrics` record.

use crate::html;
use crate::model::{Article, ArticleMetrics, Image, ImageRole};

const LONG_PARAGRAPH_WORDS: u32 = 100;
const WORDS_PER_LINE: u32 = 10;

/// Builds `ArticleMetrics` for one article from its body and the images
/// attached to it.
pub fn analyze(article: &Article, images: &[Image]) -> ArticleMetrics {
    let plain = html::strip_tags(&article.body_html);
    let word_count = html::word_count(&plain);
    let char_count = plain.chars().count() as u32;
    let paragraph_count = count_closing_paragraphs(&article.body_html);
    let has_long_paragraphs = paragraphs(&article.body_html)
        .iter()
        .any(|p| html::word_count(&html::strip_tags(p)) > LONG_PARAGRAPH_WORDS);

    let hero_image = images.iter().find(|i| i.role == ImageRole::Hero).cloned();
    let inline_images: Vec<Image> = images.iter().filter(|i| i.role == ImageRole::Inline).cloned().collect();

    let estimated_lines = div_ceil(word_count, WORDS_PER_LINE);

    ArticleMetrics {
        word_count,
        paragraph_count,
        char_count,
        hero_image,
        inline_images,
        has_long_paragraphs,
        estimated_lines,
    }
}

fn count_closing_paragraphs(body_html: &str) -> u32 {
    let lower = body_html.to_ascii_lowercase();
    lower.matches("</p>").count() as u32
}

/// Splits `body_html` into paragraph chunks by `</p>`/`<p …>` boundaries,
/// used both for the long-paragraph check here and for inline-image
/// placement and pullquote selection in the Composer.
pub fn paragraphs(body_html: &str) -> Vec<String> {
    let lower = body_html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut start = 0usize;
    let bytes = body_html.as_bytes();
    let mut i = 0usize;
    while i < lower.len() {
        if lower[i..].starts_with("</p>") {
            out.push(String::from_utf8_lossy(&bytes[start..i]).into_owned());
            i += 4;
            start = i;
        } else {
            i += 1;
        }
    }
    // Trailing content without a closing </p> is still a paragraph worth
    // scanning for long-paragraph purposes.
    if start < bytes.len() {
        let rest = String::from_utf8_lossy(&bytes[start..]).into_owned();
        if !html::strip_tags(&rest).trim().is_empty() {
            out.push(rest);
        }
    }
    out.into_iter().map(|p| strip_leading_open_tag(&p)).collect()
}

fn strip_leading_open_tag(paragraph: &str) -> String {
    let trimmed = paragraph.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<p") {
        if let Some(end) = rest.find('>') {
            return rest[end + 1..].to_string();
        }
    }
    paragraph.to_string()
}

fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArticleType;

    fn article(body_html: &str) -> Article {
        Article {
            article_id: "a1".into(),
            issue_id: "i1".into(),
            section: "News".into(),
            article_type: ArticleType::Feature,
            title: "Title".into(),
            dek: None,
            author: "Author".into(),
            body_html: body_html.into(),
        }
    }

    fn image(role: ImageRole) -> Image {
        Image {
            image_id: "img1".into(),
            article_id: "a1".into(),
            src: "http://x/img.jpg".into(),
            role,
            caption: None,
            credit: None,
            focal_point: None,
            intrinsic_width: None,
            intrinsic_height: None,
            dpi: None,
        }
    }

    #[test]
    fn counts_words_and_paragraphs() {
        let body = "<p>one two three</p><p>four five</p>";
        let metrics = analyze(&article(body), &[]);
        assert_eq!(metrics.word_count, 5);
        assert_eq!(metrics.paragraph_count, 2);
        assert_eq!(metrics.estimated_lines, 1);
    }

    #[test]
    fn detects_long_paragraph() {
        let long: String = (0..150).map(|_| "w ").collect();
        let body = format!("<p>{}</p>", long.trim());
        let metrics = analyze(&article(&body), &[]);
        assert!(metrics.has_long_paragraphs);
    }

    #[test]
    fn classifies_hero_and_inline_images_in_order() {
        let mut hero = image(ImageRole::Hero);
        hero.image_id = "hero".into();
        let mut inline_a = image(ImageRole::Inline);
        inline_a.image_id = "inline-a".into();
        let mut inline_b = image(ImageRole::Inline);
        inline_b.image_id = "inline-b".into();
        let gallery = image(ImageRole::Gallery);

        let images = vec![inline_a.clone(), hero.clone(), gallery, inline_b.clone()];
        let metrics = analyze(&article("<p>text</p>"), &images);

        assert_eq!(metrics.hero_image.unwrap().image_id, "hero");
        assert_eq!(
            metrics.inline_images.iter().map(|i| i.image_id.clone()).collect::<Vec<_>>(),
            vec!["inline-a".to_string(), "inline-b".to_string()]
        );
    }

    #[test]
    fn estimated_lines_rounds_up() {
        let body = "<p>one two three four five six seven eight nine ten eleven</p>";
        let metrics = analyze(&article(body), &[]);
        assert_eq!(metrics.word_count, 11);
        assert_eq!(metrics.estimated_lines, 2);
    }
}
