//! Single block to markdown fragment.

use crate::error::RenderError;
use crate::model::Block;
use crate::rich_text::render_rich_text;

/// Numbered list counter for one page. Create a fresh one per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numbering {
    next: u32,
}

impl Default for Numbering {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl Numbering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.next
    }

    fn advance(&mut self, continues: bool) {
        self.next = if continues { self.next + 1 } else { 1 };
    }
}

/// Renders `blocks[index]`. Returns `Ok(None)` for blocks that produce no output
/// (empty paragraphs). Looks at `blocks[index + 1]` to decide whether a numbered list
/// continues.
///
/// # Panics
///
/// Panics if `index` is out of bounds.
pub fn render_block(
    blocks: &[Block],
    index: usize,
    numbering: &mut Numbering,
) -> Result<Option<String>, RenderError> {
    let fragment = match &blocks[index] {
        Block::Paragraph(text) if text.is_empty() => return Ok(None),
        Block::Paragraph(text) => render_rich_text(text)?,
        Block::Heading1(text) => format!("# {}", render_rich_text(text)?),
        Block::Heading2(text) => format!("## {}", render_rich_text(text)?),
        Block::Heading3(text) => format!("### {}", render_rich_text(text)?),
        Block::BulletItem(text) => format!("- {}", render_rich_text(text)?),
        Block::NumberedItem(text) => {
            let fragment = format!("{}. {}", numbering.current(), render_rich_text(text)?);
            let continues = blocks
                .get(index + 1)
                .is_some_and(Block::is_numbered_item);
            numbering.advance(continues);
            fragment
        }
        Block::ChecklistItem { checked, text } => {
            let mark = if *checked { "x" } else { " " };
            format!("- [{mark}] {}", render_rich_text(text)?)
        }
        Block::Code { language, text } => format!("```{language}\n{text}\n```"),
        Block::Unsupported(kind) => {
            format!("**Unsupported Notion blocktype '{kind}'**\n{{: .notice--danger}}")
        }
    };
    Ok(Some(fragment))
}
