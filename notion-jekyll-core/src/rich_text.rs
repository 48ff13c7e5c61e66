//! Rich text runs to inline markdown.

use crate::error::RenderError;
use crate::model::{RunKind, TextRun};

/// Renders runs in order and concatenates them. Adjacent runs with the same style are
/// not merged, so `**a****b**` is expected output for two bold runs.
pub fn render_rich_text(runs: &[TextRun]) -> Result<String, RenderError> {
    let mut output = String::new();
    for run in runs {
        output.push_str(&render_run(run)?);
    }
    Ok(output)
}

/// Link wrapping happens first; then exactly one style wins, in the order
/// bold+italic, bold, italic, code, strikethrough, underline.
fn render_run(run: &TextRun) -> Result<String, RenderError> {
    if run.kind != RunKind::Text {
        return Err(RenderError::UnsupportedRunKind {
            kind: run.kind.as_str().to_string(),
        });
    }

    let text = match &run.href {
        Some(href) => format!("[{}]({})", run.text, href),
        None => run.text.clone(),
    };

    let a = &run.annotations;
    let rendered = if a.bold && a.italic {
        format!("***{text}***")
    } else if a.bold {
        format!("**{text}**")
    } else if a.italic {
        format!("*{text}*")
    } else if a.code {
        format!("`{text}`")
    } else if a.strikethrough {
        format!("~~{text}~~")
    } else if a.underline {
        format!("<u>{text}</u>")
    } else {
        text
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotations;

    fn styled(text: &str, annotations: Annotations) -> TextRun {
        TextRun::plain(text).with_annotations(annotations)
    }

    #[test]
    fn plain_runs_are_unchanged() {
        for text in ["", "hello", "with *stars* already", "ünïcödé"] {
            assert_eq!(render_rich_text(&[TextRun::plain(text)]).unwrap(), text);
        }
    }

    #[test]
    fn emphasis_marker_widths() {
        let both = Annotations {
            bold: true,
            italic: true,
            ..Default::default()
        };
        let bold = Annotations {
            bold: true,
            ..Default::default()
        };
        let italic = Annotations {
            italic: true,
            ..Default::default()
        };
        assert_eq!(render_rich_text(&[styled("x", both)]).unwrap(), "***x***");
        assert_eq!(render_rich_text(&[styled("x", bold)]).unwrap(), "**x**");
        assert_eq!(render_rich_text(&[styled("x", italic)]).unwrap(), "*x*");
    }

    #[test]
    fn styles_are_mutually_exclusive_in_priority_order() {
        let all = Annotations {
            bold: true,
            italic: false,
            strikethrough: true,
            underline: true,
            code: true,
        };
        assert_eq!(render_rich_text(&[styled("x", all)]).unwrap(), "**x**");

        let code_and_strike = Annotations {
            code: true,
            strikethrough: true,
            ..Default::default()
        };
        assert_eq!(
            render_rich_text(&[styled("x", code_and_strike)]).unwrap(),
            "`x`"
        );

        let strike_and_underline = Annotations {
            strikethrough: true,
            underline: true,
            ..Default::default()
        };
        assert_eq!(
            render_rich_text(&[styled("x", strike_and_underline)]).unwrap(),
            "~~x~~"
        );

        let underline = Annotations {
            underline: true,
            ..Default::default()
        };
        assert_eq!(
            render_rich_text(&[styled("x", underline)]).unwrap(),
            "<u>x</u>"
        );
    }

    #[test]
    fn link_is_wrapped_inside_style() {
        let run = TextRun::plain("docs")
            .with_href("https://example.com")
            .with_annotations(Annotations {
                bold: true,
                ..Default::default()
            });
        assert_eq!(
            render_rich_text(&[run]).unwrap(),
            "**[docs](https://example.com)**"
        );
    }

    #[test]
    fn runs_are_concatenated_without_merging() {
        let bold = Annotations {
            bold: true,
            ..Default::default()
        };
        let runs = vec![
            TextRun::plain("Hello "),
            styled("big", bold),
            styled("ger", bold),
            TextRun::plain(" world"),
        ];
        assert_eq!(
            render_rich_text(&runs).unwrap(),
            "Hello **big****ger** world"
        );
    }

    #[test]
    fn non_text_run_is_rejected() {
        let mut mention = TextRun::plain("@someone");
        mention.kind = RunKind::Mention;
        let err = render_rich_text(&[TextRun::plain("hi "), mention]).unwrap_err();
        assert_eq!(
            err,
            RenderError::UnsupportedRunKind {
                kind: "mention".to_string()
            }
        );
    }
}
