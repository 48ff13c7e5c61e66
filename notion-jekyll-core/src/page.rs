//! From a queried database row to a complete post file.

use tracing::warn;

use crate::assemble::assemble;
use crate::contract::{PropertyValue, SourcePage};
use crate::error::PageError;
use crate::front_matter;
use crate::model::{Block, PageMetadata, TextRun};

pub const TITLE: &str = "Title";
pub const CREATED: &str = "Created";
pub const MODIFIED: &str = "Modified";
pub const PUBLISHED: &str = "Published";
pub const FILE_NAME: &str = "File name";
pub const CATEGORIES: &str = "Categories";
pub const TAGS: &str = "Tags";

/// Reads the post attributes from a page's properties.
///
/// Title, Published and File name are required. Created and Modified fall back to the
/// page's own timestamps, and missing Categories or Tags are treated as empty.
pub fn page_metadata(page: &SourcePage) -> Result<PageMetadata, PageError> {
    let missing = |property: &str| PageError::MissingProperty {
        page_id: page.id.clone(),
        property: property.to_string(),
    };

    let title = match page.properties.get(TITLE) {
        Some(PropertyValue::Title(runs)) => joined_plain_text(runs),
        _ => None,
    }
    .ok_or_else(|| missing(TITLE))?;

    let published = match page.properties.get(PUBLISHED) {
        Some(PropertyValue::Checkbox(checked)) => *checked,
        _ => return Err(missing(PUBLISHED)),
    };

    let target_filename = match page.properties.get(FILE_NAME) {
        Some(PropertyValue::RichText(runs)) => joined_plain_text(runs),
        _ => None,
    }
    .ok_or_else(|| missing(FILE_NAME))?;

    let created_at = match page.properties.get(CREATED) {
        Some(PropertyValue::CreatedTime(ts)) => *ts,
        _ => page.created_time,
    };
    let modified_at = match page.properties.get(MODIFIED) {
        Some(PropertyValue::LastEditedTime(ts)) => *ts,
        _ => page.last_edited_time,
    };

    Ok(PageMetadata {
        title,
        created_at,
        modified_at,
        stable_id: page.id.clone(),
        categories: labels(page, CATEGORIES),
        tags: labels(page, TAGS),
        published,
        target_filename,
    })
}

/// Front matter followed by the assembled body.
pub fn render_post(metadata: &PageMetadata, blocks: &[Block]) -> Result<String, PageError> {
    let header = front_matter::encode(metadata).map_err(|e| PageError::FrontMatter {
        page_id: metadata.stable_id.clone(),
        message: e.to_string(),
    })?;
    let body = assemble(blocks).map_err(|source| PageError::Render {
        page_id: metadata.stable_id.clone(),
        source,
    })?;
    Ok(header + &body)
}

/// Text of all runs joined, ignoring styling. Blank text counts as missing.
fn joined_plain_text(runs: &[TextRun]) -> Option<String> {
    let text: String = runs.iter().map(|run| run.text.as_str()).collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn labels(page: &SourcePage, property: &str) -> Vec<String> {
    match page.properties.get(property) {
        Some(PropertyValue::MultiSelect(names)) => names.clone(),
        Some(other) => {
            warn!(page_id = %page.id, property, value = ?other, "Property is not a multi-select, using no labels");
            Vec::new()
        }
        None => {
            warn!(page_id = %page.id, property, "Property missing, using no labels");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn source_page() -> SourcePage {
        let mut properties = HashMap::new();
        properties.insert(
            TITLE.to_string(),
            PropertyValue::Title(vec![TextRun::plain("Hello")]),
        );
        properties.insert(PUBLISHED.to_string(), PropertyValue::Checkbox(true));
        properties.insert(
            FILE_NAME.to_string(),
            PropertyValue::RichText(vec![TextRun::plain("hello")]),
        );
        properties.insert(
            CREATED.to_string(),
            PropertyValue::CreatedTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        );
        properties.insert(
            MODIFIED.to_string(),
            PropertyValue::LastEditedTime(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        );
        properties.insert(
            TAGS.to_string(),
            PropertyValue::MultiSelect(vec!["rust".into(), "notion".into()]),
        );
        SourcePage {
            id: "abc".to_string(),
            created_time: Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap(),
            last_edited_time: Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap(),
            properties,
        }
    }

    #[test]
    fn reads_all_properties() {
        let meta = page_metadata(&source_page()).unwrap();
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.stable_id, "abc");
        assert_eq!(meta.target_filename, "hello");
        assert!(meta.published);
        assert_eq!(meta.tags, vec!["rust", "notion"]);
        assert!(meta.categories.is_empty());
        assert_eq!(
            meta.modified_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_required_property_fails_the_page() {
        for property in [TITLE, PUBLISHED, FILE_NAME] {
            let mut page = source_page();
            page.properties.remove(property);
            assert_eq!(
                page_metadata(&page).unwrap_err(),
                PageError::MissingProperty {
                    page_id: "abc".into(),
                    property: property.into()
                }
            );
        }
    }

    #[test]
    fn empty_file_name_counts_as_missing() {
        let mut page = source_page();
        page.properties
            .insert(FILE_NAME.to_string(), PropertyValue::RichText(vec![]));
        assert!(matches!(
            page_metadata(&page),
            Err(PageError::MissingProperty { .. })
        ));
    }

    #[test]
    fn multi_run_title_and_file_name_are_joined() {
        let mut page = source_page();
        let bold = crate::model::Annotations {
            bold: true,
            ..Default::default()
        };
        page.properties.insert(
            TITLE.to_string(),
            PropertyValue::Title(vec![
                TextRun::plain("Hello "),
                TextRun::plain("world").with_annotations(bold),
            ]),
        );
        page.properties.insert(
            FILE_NAME.to_string(),
            PropertyValue::RichText(vec![TextRun::plain("2024-"), TextRun::plain("hello")]),
        );
        let meta = page_metadata(&page).unwrap();
        assert_eq!(meta.title, "Hello world");
        assert_eq!(meta.target_filename, "2024-hello");
    }

    #[test]
    fn timestamps_fall_back_to_page_fields() {
        let mut page = source_page();
        page.properties.remove(MODIFIED);
        let meta = page_metadata(&page).unwrap();
        assert_eq!(meta.modified_at, page.last_edited_time);
    }

    #[test]
    fn rendered_post_has_header_then_body() {
        let meta = page_metadata(&source_page()).unwrap();
        let post = render_post(&meta, &[Block::Paragraph(vec![TextRun::plain("Hi.")])]).unwrap();
        assert!(post.starts_with("---\ntitle: Hello\n"));
        assert!(post.contains("notion_id: abc\n"));
        assert!(post.ends_with("---\n\nHi.\n\n"));
    }

    #[test]
    fn render_failure_names_the_page() {
        let meta = page_metadata(&source_page()).unwrap();
        let mut run = TextRun::plain("x");
        run.kind = crate::model::RunKind::Equation;
        let err = render_post(&meta, &[Block::Paragraph(vec![run])]).unwrap_err();
        assert!(matches!(err, PageError::Render { ref page_id, .. } if page_id == "abc"));
    }
}
