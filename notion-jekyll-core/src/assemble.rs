//! Page body assembly: blocks in, markdown out.

use crate::block::{render_block, Numbering};
use crate::error::RenderError;
use crate::model::Block;

/// Renders all blocks of one page and joins them. Consecutive list items of the same
/// kind are separated by a single newline; everything else, including the last block,
/// is followed by a blank line.
pub fn assemble(blocks: &[Block]) -> Result<String, RenderError> {
    let mut numbering = Numbering::new();
    let mut body = String::new();

    for (index, block) in blocks.iter().enumerate() {
        let Some(fragment) = render_block(blocks, index, &mut numbering)? else {
            continue;
        };
        body.push_str(&fragment);

        let tight = match (block.list_kind(), blocks.get(index + 1)) {
            (Some(kind), Some(next)) => next.list_kind() == Some(kind),
            _ => false,
        };
        body.push_str(if tight { "\n" } else { "\n\n" });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextRun;

    fn text(s: &str) -> Vec<TextRun> {
        vec![TextRun::plain(s)]
    }

    #[test]
    fn loose_blocks_are_separated_by_blank_lines() {
        let blocks = vec![
            Block::Heading1(text("Title")),
            Block::Paragraph(text("First.")),
            Block::Paragraph(text("Second.")),
        ];
        assert_eq!(
            assemble(&blocks).unwrap(),
            "# Title\n\nFirst.\n\nSecond.\n\n"
        );
    }

    #[test]
    fn same_kind_list_items_are_tight() {
        let blocks = vec![
            Block::BulletItem(text("a")),
            Block::BulletItem(text("b")),
            Block::NumberedItem(text("one")),
            Block::NumberedItem(text("two")),
            Block::ChecklistItem {
                checked: true,
                text: text("x"),
            },
            Block::ChecklistItem {
                checked: false,
                text: text("y"),
            },
            Block::Paragraph(text("end")),
        ];
        assert_eq!(
            assemble(&blocks).unwrap(),
            "- a\n- b\n\n1. one\n2. two\n\n- [x] x\n- [ ] y\n\nend\n\n"
        );
    }

    #[test]
    fn empty_paragraphs_contribute_nothing() {
        let blocks = vec![
            Block::Paragraph(text("a")),
            Block::Paragraph(vec![]),
            Block::Paragraph(vec![]),
            Block::Paragraph(text("b")),
        ];
        assert_eq!(assemble(&blocks).unwrap(), "a\n\nb\n\n");
    }

    #[test]
    fn numbering_restarts_after_interruption() {
        let blocks = vec![
            Block::NumberedItem(text("a")),
            Block::NumberedItem(text("b")),
            Block::Heading2(text("Next")),
            Block::NumberedItem(text("c")),
        ];
        assert_eq!(
            assemble(&blocks).unwrap(),
            "1. a\n2. b\n\n## Next\n\n1. c\n\n"
        );
    }

    #[test]
    fn unsupported_block_does_not_stop_the_page() {
        let blocks = vec![
            Block::Paragraph(text("before")),
            Block::Unsupported("toggle".to_string()),
            Block::Paragraph(text("after")),
        ];
        let body = assemble(&blocks).unwrap();
        assert!(body.contains("toggle"));
        assert!(body.starts_with("before\n\n"));
        assert!(body.ends_with("after\n\n"));
    }

    #[test]
    fn empty_page_has_empty_body() {
        assert_eq!(assemble(&[]).unwrap(), "");
    }
}
