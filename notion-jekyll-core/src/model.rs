//! Domain model shared by the renderer, the header codec and the reconciler.
//!
//! These are snapshots: a page's blocks and properties as fetched from Notion at one
//! point in time. Nothing here performs I/O.

use chrono::{DateTime, Utc};

/// Kind of a rich text run. Only [`RunKind::Text`] can be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunKind {
    Text,
    Mention,
    Equation,
    Other(String),
}

impl RunKind {
    pub fn as_str(&self) -> &str {
        match self {
            RunKind::Text => "text",
            RunKind::Mention => "mention",
            RunKind::Equation => "equation",
            RunKind::Other(kind) => kind,
        }
    }
}

/// Style flags on a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

/// A span of text with styling and an optional link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub kind: RunKind,
    pub text: String,
    pub annotations: Annotations,
    pub href: Option<String>,
}

impl TextRun {
    /// An unstyled plain text run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Text,
            text: text.into(),
            annotations: Annotations::default(),
            href: None,
        }
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}

/// One top-level content block of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<TextRun>),
    Heading1(Vec<TextRun>),
    Heading2(Vec<TextRun>),
    Heading3(Vec<TextRun>),
    BulletItem(Vec<TextRun>),
    NumberedItem(Vec<TextRun>),
    ChecklistItem { checked: bool, text: Vec<TextRun> },
    Code { language: String, text: String },
    /// Any block type the renderer has no markdown form for, named by its Notion type.
    Unsupported(String),
}

/// List variants that are joined tightly when adjacent to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
    Checklist,
}

impl Block {
    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            Block::BulletItem(_) => Some(ListKind::Bullet),
            Block::NumberedItem(_) => Some(ListKind::Numbered),
            Block::ChecklistItem { .. } => Some(ListKind::Checklist),
            _ => None,
        }
    }

    pub fn is_numbered_item(&self) -> bool {
        matches!(self, Block::NumberedItem(_))
    }
}

/// Attributes of a Notion page that end up in the post's front matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Notion page id; the join key between pages and repository files.
    pub stable_id: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub published: bool,
    /// File name without directory or extension.
    pub target_filename: String,
}
