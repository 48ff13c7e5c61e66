//! Notion REST API client implementing [`PageSource`].
//!
//! Responses are read into private wire structs and converted into the domain model.
//! Block and rich text types this crate does not know are kept by name
//! ([`Block::Unsupported`], [`RunKind::Other`]) so the renderer can decide what to do.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::contract::{DatabaseSummary, PageSource, PropertyValue, SourcePage};
use crate::error::CollaboratorError;
use crate::model::{Annotations, Block, RunKind, TextRun};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Largest page size the API accepts.
const PAGE_SIZE: u32 = 100;

pub struct NotionClient {
    http: Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, NOTION_API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CollaboratorError> {
        let resp = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            error!(status = %status, "Notion API returned error. Response body: {message}");
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }

    /// Follows `has_more`/`next_cursor` until the last page. `request` builds the call
    /// for a given cursor.
    async fn collect_all<T, F>(&self, mut request: F) -> Result<Vec<T>, CollaboratorError>
    where
        T: DeserializeOwned,
        F: FnMut(Option<&str>) -> RequestBuilder,
    {
        paginate(move |cursor| self.send::<Paginated<T>>(request(cursor.as_deref()))).await
    }
}

/// Calls `fetch_page` with the cursor of the next page, starting from none, and
/// concatenates results in order. Stops when a page has no more results or no cursor.
async fn paginate<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, CollaboratorError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Paginated<T>, CollaboratorError>>,
{
    let mut results = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch_page(cursor.take()).await?;
        results.extend(page.results);
        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }
    Ok(results)
}

#[async_trait]
impl PageSource for NotionClient {
    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>, CollaboratorError> {
        let url = format!("{}/search", self.base_url);
        info!(url = %url, "Searching Notion for databases");
        let databases: Vec<WireDatabase> = self
            .collect_all(|cursor| {
                let mut body = json!({
                    "filter": { "property": "object", "value": "database" },
                    "page_size": PAGE_SIZE,
                });
                if let Some(cursor) = cursor {
                    body["start_cursor"] = json!(cursor);
                }
                self.http.post(&url).json(&body)
            })
            .await?;
        info!(count = databases.len(), "Fetched Notion databases");
        Ok(databases.into_iter().map(convert_database).collect())
    }

    async fn query_pages(&self, database_id: &str) -> Result<Vec<SourcePage>, CollaboratorError> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        info!(url = %url, "Querying Notion database");
        let pages: Vec<WirePage> = self
            .collect_all(|cursor| {
                let mut body = json!({ "page_size": PAGE_SIZE });
                if let Some(cursor) = cursor {
                    body["start_cursor"] = json!(cursor);
                }
                self.http.post(&url).json(&body)
            })
            .await?;
        info!(count = pages.len(), "Fetched Notion pages");
        Ok(pages.into_iter().map(convert_page).collect())
    }

    async fn get_block_children(&self, page_id: &str) -> Result<Vec<Block>, CollaboratorError> {
        let url = format!("{}/blocks/{}/children", self.base_url, page_id);
        debug!(url = %url, "Fetching page blocks");
        let blocks: Vec<WireBlock> = self
            .collect_all(|cursor| {
                let mut query = vec![("page_size", PAGE_SIZE.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("start_cursor", cursor.to_string()));
                }
                self.http.get(&url).query(&query)
            })
            .await?;
        debug!(page_id, count = blocks.len(), "Fetched page blocks");
        Ok(blocks.into_iter().map(convert_block).collect())
    }
}

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDatabase {
    id: String,
    #[serde(default)]
    title: Vec<WireRichText>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    id: String,
    created_time: DateTime<Utc>,
    last_edited_time: DateTime<Utc>,
    #[serde(default)]
    properties: HashMap<String, WireTyped>,
}

/// Any Notion object of the shape `{"type": "x", "x": {...}, ...}`.
#[derive(Debug, Deserialize)]
struct WireTyped {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

impl WireTyped {
    fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.fields.get(&self.kind)?;
        serde_json::from_value(value.clone()).ok()
    }
}

type WireBlock = WireTyped;

#[derive(Debug, Default, Deserialize)]
struct WireBlockContent {
    #[serde(default)]
    rich_text: Vec<WireRichText>,
    #[serde(default)]
    checked: bool,
    #[serde(default)]
    language: String,
}

#[derive(Debug, Deserialize)]
struct WireRichText {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    annotations: WireAnnotations,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAnnotations {
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    strikethrough: bool,
    #[serde(default)]
    underline: bool,
    #[serde(default)]
    code: bool,
}

#[derive(Debug, Deserialize)]
struct WireSelectOption {
    name: String,
}

fn convert_rich_text(runs: Vec<WireRichText>) -> Vec<TextRun> {
    runs.into_iter()
        .map(|run| TextRun {
            kind: match run.kind.as_str() {
                "text" => RunKind::Text,
                "mention" => RunKind::Mention,
                "equation" => RunKind::Equation,
                other => RunKind::Other(other.to_string()),
            },
            text: run.plain_text,
            annotations: Annotations {
                bold: run.annotations.bold,
                italic: run.annotations.italic,
                strikethrough: run.annotations.strikethrough,
                underline: run.annotations.underline,
                code: run.annotations.code,
            },
            href: run.href,
        })
        .collect()
}

fn convert_database(database: WireDatabase) -> DatabaseSummary {
    DatabaseSummary {
        id: database.id,
        title: database
            .title
            .iter()
            .map(|run| run.plain_text.as_str())
            .collect(),
    }
}

fn convert_page(page: WirePage) -> SourcePage {
    let properties = page
        .properties
        .into_iter()
        .map(|(name, property)| (name, convert_property(&property)))
        .collect();
    SourcePage {
        id: page.id,
        created_time: page.created_time,
        last_edited_time: page.last_edited_time,
        properties,
    }
}

fn convert_property(property: &WireTyped) -> PropertyValue {
    let other = || PropertyValue::Other(property.kind.clone());
    match property.kind.as_str() {
        "title" => property
            .payload()
            .map(|runs| PropertyValue::Title(convert_rich_text(runs))),
        "rich_text" => property
            .payload()
            .map(|runs| PropertyValue::RichText(convert_rich_text(runs))),
        "checkbox" => property.payload().map(PropertyValue::Checkbox),
        "created_time" => property.payload().map(PropertyValue::CreatedTime),
        "last_edited_time" => property.payload().map(PropertyValue::LastEditedTime),
        "multi_select" => property.payload::<Vec<WireSelectOption>>().map(|options| {
            PropertyValue::MultiSelect(options.into_iter().map(|o| o.name).collect())
        }),
        _ => None,
    }
    .unwrap_or_else(other)
}

fn convert_block(block: WireBlock) -> Block {
    let content = || -> WireBlockContent { block.payload().unwrap_or_default() };
    let text = || convert_rich_text(content().rich_text);
    match block.kind.as_str() {
        "paragraph" => Block::Paragraph(text()),
        "heading_1" => Block::Heading1(text()),
        "heading_2" => Block::Heading2(text()),
        "heading_3" => Block::Heading3(text()),
        "bulleted_list_item" => Block::BulletItem(text()),
        "numbered_list_item" => Block::NumberedItem(text()),
        "to_do" => {
            let content = content();
            Block::ChecklistItem {
                checked: content.checked,
                text: convert_rich_text(content.rich_text),
            }
        }
        "code" => {
            let content = content();
            Block::Code {
                language: fence_language(&content.language),
                text: content
                    .rich_text
                    .iter()
                    .map(|run| run.plain_text.as_str())
                    .collect(),
            }
        }
        other => Block::Unsupported(other.to_string()),
    }
}

/// Notion language names may contain spaces ("plain text"); fence info strings may not.
fn fence_language(language: &str) -> String {
    language.split_whitespace().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(value: Value) -> Block {
        convert_block(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn converts_text_blocks_with_annotations_and_links() {
        let converted = block(json!({
            "object": "block",
            "id": "b1",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {
                "color": "default",
                "rich_text": [
                    {
                        "type": "text",
                        "text": { "content": "Hello ", "link": null },
                        "annotations": { "bold": true, "italic": false, "strikethrough": false,
                                         "underline": false, "code": false, "color": "default" },
                        "plain_text": "Hello ",
                        "href": null
                    },
                    {
                        "type": "text",
                        "text": { "content": "site", "link": { "url": "https://example.com" } },
                        "annotations": { "bold": false, "italic": false, "strikethrough": false,
                                         "underline": false, "code": false, "color": "default" },
                        "plain_text": "site",
                        "href": "https://example.com"
                    }
                ]
            }
        }));
        let Block::Paragraph(runs) = converted else {
            panic!("expected paragraph, got {converted:?}");
        };
        assert_eq!(runs.len(), 2);
        assert!(runs[0].annotations.bold);
        assert_eq!(runs[0].text, "Hello ");
        assert_eq!(runs[1].href.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn converts_to_do_and_code_blocks() {
        let todo = block(json!({
            "type": "to_do",
            "to_do": { "checked": true, "rich_text": [
                { "type": "text", "plain_text": "ship it", "annotations": {} }
            ]}
        }));
        assert_eq!(
            todo,
            Block::ChecklistItem {
                checked: true,
                text: vec![TextRun::plain("ship it")]
            }
        );

        let code = block(json!({
            "type": "code",
            "code": { "language": "plain text", "rich_text": [
                { "type": "text", "plain_text": "line 1\n" },
                { "type": "text", "plain_text": "line 2" }
            ]}
        }));
        assert_eq!(
            code,
            Block::Code {
                language: "plaintext".into(),
                text: "line 1\nline 2".into()
            }
        );
    }

    #[test]
    fn unknown_block_types_are_kept_by_name() {
        let toggle = block(json!({ "type": "toggle", "toggle": { "rich_text": [] } }));
        assert_eq!(toggle, Block::Unsupported("toggle".into()));
    }

    #[test]
    fn mentions_keep_their_kind() {
        let converted = block(json!({
            "type": "paragraph",
            "paragraph": { "rich_text": [
                { "type": "mention", "plain_text": "@Ada", "mention": { "type": "user" } }
            ]}
        }));
        let Block::Paragraph(runs) = converted else {
            panic!("expected paragraph");
        };
        assert_eq!(runs[0].kind, RunKind::Mention);
    }

    #[test]
    fn converts_page_properties() {
        let page: WirePage = serde_json::from_value(json!({
            "object": "page",
            "id": "abc",
            "created_time": "2024-01-01T10:00:00.000Z",
            "last_edited_time": "2024-01-05T10:00:00.000Z",
            "properties": {
                "Title": { "id": "title", "type": "title", "title": [
                    { "type": "text", "plain_text": "Hello" }
                ]},
                "Published": { "id": "p", "type": "checkbox", "checkbox": true },
                "File name": { "id": "f", "type": "rich_text", "rich_text": [
                    { "type": "text", "plain_text": "hello" }
                ]},
                "Modified": { "id": "m", "type": "last_edited_time",
                              "last_edited_time": "2024-01-05T10:00:00.000Z" },
                "Tags": { "id": "t", "type": "multi_select", "multi_select": [
                    { "id": "1", "name": "rust", "color": "red" }
                ]},
                "Views": { "id": "v", "type": "number", "number": 3 }
            }
        }))
        .unwrap();
        let page = convert_page(page);
        assert_eq!(page.properties["Published"], PropertyValue::Checkbox(true));
        assert_eq!(
            page.properties["Tags"],
            PropertyValue::MultiSelect(vec!["rust".into()])
        );
        assert_eq!(page.properties["Views"], PropertyValue::Other("number".into()));
        assert!(matches!(
            page.properties["Modified"],
            PropertyValue::LastEditedTime(_)
        ));

        let meta = crate::page::page_metadata(&page).unwrap();
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.target_filename, "hello");
    }

    #[test]
    fn database_title_joins_runs() {
        let db: WireDatabase = serde_json::from_value(json!({
            "object": "database",
            "id": "db1",
            "title": [ { "type": "text", "plain_text": "Posts" } ]
        }))
        .unwrap();
        assert_eq!(
            convert_database(db),
            DatabaseSummary {
                id: "db1".into(),
                title: "Posts".into()
            }
        );
    }

    fn envelope(results: &[&str], next: Option<&str>) -> Paginated<String> {
        Paginated {
            results: results.iter().map(|r| r.to_string()).collect(),
            has_more: next.is_some(),
            next_cursor: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn pagination_follows_cursors_in_order() {
        let mut pages = vec![
            envelope(&["b1", "b2"], Some("c1")),
            envelope(&["b3"], Some("c2")),
            envelope(&["b4", "b5"], None),
        ]
        .into_iter();
        let mut cursors = Vec::new();

        let blocks = paginate(|cursor| {
            cursors.push(cursor);
            let page = pages.next().ok_or_else(|| {
                CollaboratorError::Decode("fetched past the last page".into())
            });
            std::future::ready(page)
        })
        .await
        .unwrap();

        assert_eq!(blocks, vec!["b1", "b2", "b3", "b4", "b5"]);
        assert_eq!(
            cursors,
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[tokio::test]
    async fn pagination_stops_when_cursor_is_missing() {
        let mut calls = 0;
        let results = paginate(|_| {
            calls += 1;
            std::future::ready(Ok(Paginated {
                results: vec![1, 2],
                has_more: true,
                next_cursor: None,
            }))
        })
        .await
        .unwrap();
        assert_eq!(results, vec![1, 2]);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn pagination_propagates_page_errors() {
        let mut pages = vec![
            Ok(envelope(&["b1"], Some("c1"))),
            Err(CollaboratorError::Api {
                status: 502,
                message: "bad gateway".into(),
            }),
        ]
        .into_iter();
        let err = paginate(|_| {
            std::future::ready(pages.next().unwrap_or_else(|| Ok(envelope(&[], None))))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CollaboratorError::Api { status: 502, .. }));
    }

    #[test]
    fn pagination_envelope_defaults() {
        let page: Paginated<WireDatabase> =
            serde_json::from_value(json!({ "object": "list", "results": [] })).unwrap();
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}
