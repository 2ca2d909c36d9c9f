//! A thin loader for the documented intake JSON wire format.
//!
//! This is deliberately not a validating gateway: JSON intake validation
//! and persistence belong to an external collaborator outside this
//! core's scope. What lives here only turns the documented wire shape
//! into this crate's `model` types so the CLI and tests have something
//! to hand the Supervisor; a real deployment's intake service owns
//! sanitization and schema enforcement before this core ever sees the
//! data. `body_html` in particular is passed through untouched, per the
//! trust-boundary note on `Article::body_html`.

use serde::Deserialize;

use crate::model::{Article, ArticleType, Image, ImageRole, Issue, IssueStatus};
use crate::{AppError, Result};

#[derive(Debug, Deserialize)]
struct IntakeDocument {
    issue: IntakeIssue,
    sections: Vec<String>,
    articles: Vec<IntakeArticle>,
}

#[derive(Debug, Deserialize)]
struct IntakeIssue {
    id: String,
    title: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct IntakeArticle {
    id: String,
    section: String,
    #[serde(rename = "type")]
    article_type: String,
    title: String,
    dek: Option<String>,
    author: String,
    body_html: String,
    #[serde(default)]
    images: Vec<IntakeImage>,
}

#[derive(Debug, Deserialize)]
struct IntakeImage {
    src: String,
    role: String,
    caption: Option<String>,
    credit: Option<String>,
    focal_point: Option<String>,
}

/// Parses one intake JSON document into `(Issue, articles, images)`.
pub fn parse_issue_json(raw: &str) -> Result<(Issue, Vec<Article>, Vec<Image>)> {
    let doc: IntakeDocument = serde_json::from_str(raw)?;

    let issue = Issue {
        issue_id: doc.issue.id.clone(),
        title: doc.issue.title,
        date: doc.issue.date,
        sections: doc.sections,
        status: IssueStatus::Draft,
    };

    let mut articles = Vec::with_capacity(doc.articles.len());
    let mut images = Vec::new();

    for raw_article in doc.articles.into_iter() {
        let article_type = parse_article_type(&raw_article.article_type)?;
        for (image_index, raw_image) in raw_article.images.into_iter().enumerate() {
            images.push(Image {
                image_id: format!("{}-img{}", raw_article.id, image_index),
                article_id: raw_article.id.clone(),
                src: raw_image.src,
                role: parse_image_role(&raw_image.role)?,
                caption: raw_image.caption,
                credit: raw_image.credit,
                focal_point: raw_image.focal_point.as_deref().map(parse_focal_point).transpose()?,
                intrinsic_width: None,
                intrinsic_height: None,
                dpi: None,
            });
        }
        articles.push(Article {
            article_id: raw_article.id,
            issue_id: issue.issue_id.clone(),
            section: raw_article.section,
            article_type,
            title: raw_article.title,
            dek: raw_article.dek,
            author: raw_article.author,
            body_html: raw_article.body_html,
        });
    }

    Ok((issue, articles, images))
}

fn parse_article_type(raw: &str) -> Result<ArticleType> {
    match raw {
        "feature" => Ok(ArticleType::Feature),
        "article" => Ok(ArticleType::Article),
        "reportage" => Ok(ArticleType::Reportage),
        "news" => Ok(ArticleType::News),
        "editorial" => Ok(ArticleType::Editorial),
        other => Err(AppError::IntakeSchema(format!("unknown article type `{other}`"))),
    }
}

fn parse_image_role(raw: &str) -> Result<ImageRole> {
    match raw {
        "hero" => Ok(ImageRole::Hero),
        "inline" => Ok(ImageRole::Inline),
        "gallery" => Ok(ImageRole::Gallery),
        other => Err(AppError::IntakeSchema(format!("unknown image role `{other}`"))),
    }
}

fn parse_focal_point(raw: &str) -> Result<(f32, f32)> {
    let (x_raw, y_raw) = raw
        .split_once(',')
        .ok_or_else(|| AppError::IntakeSchema(format!("invalid focal_point `{raw}`, expected \"x,y\"")))?;
    let x: f32 = x_raw.trim().parse().map_err(|_| AppError::IntakeSchema(format!("invalid focal_point `{raw}`")))?;
    let y: f32 = y_raw.trim().parse().map_err(|_| AppError::IntakeSchema(format!("invalid focal_point `{raw}`")))?;
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return Err(AppError::IntakeSchema(format!("focal_point `{raw}` out of [0,1] range")));
    }
    Ok((x, y))
}

/// Parses a `TemplatePack` from its JSON representation. Packs are
/// authored separately from issue intake documents, but share the same
/// "parse once, reject unknown keys" discipline.
pub fn parse_template_pack_json(raw: &str) -> Result<crate::model::TemplatePack> {
    serde_json::from_str(raw).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "issue": {"id": "issue-1", "title": "Summer Edition", "date": "2026-06-01"},
        "sections": ["News", "Features"],
        "articles": [{
            "id": "a1",
            "section": "News",
            "type": "feature",
            "title": "Headline",
            "dek": "A dek",
            "author": "Jane Doe",
            "body_html": "<p>Body text</p>",
            "images": [
                {"src": "http://x/hero.jpg", "role": "hero", "focal_point": "0.5,0.4"}
            ]
        }]
    }"#;

    #[test]
    fn parses_sample_document() {
        let (issue, articles, images) = parse_issue_json(SAMPLE).unwrap();
        assert_eq!(issue.issue_id, "issue-1");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].section, "News");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].focal_point, Some((0.5, 0.4)));
    }

    #[test]
    fn rejects_focal_point_out_of_range() {
        let bad = SAMPLE.replace("0.5,0.4", "1.5,0.4");
        assert!(parse_issue_json(&bad).is_err());
    }

    #[test]
    fn rejects_unknown_article_type() {
        let bad = SAMPLE.replace("\"feature\"", "\"listicle\"");
        assert!(parse_issue_json(&bad).is_err());
    }
}
