//! Parser for the lightweight markup emitted by the final-summary call:
//! `##`/`###` headings, `* `/`- ` bullets, `**bold**`/`*italic*` spans,
//! `---` rules (skipped). Everything else is a paragraph.
//!
//! The grammar is line-oriented and deliberately forgiving — summary text
//! comes from an LLM, so unknown constructs degrade to plain paragraphs
//! rather than failing the render.

/// Inline emphasis. Bold wins when markers overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Regular,
    Bold,
    Italic,
}

/// A run of text with a single style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// A block-level element of the summary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// level 2 (`##`) or 3 (`###`).
    Heading { level: u8, spans: Vec<Span> },
    Bullet { spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
}

/// Splits summary text into blocks, one pass over the lines.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for line in text.lines() {
        let clean = line.trim();
        if clean.is_empty() || clean.starts_with("---") {
            continue;
        }
        if let Some(rest) = clean.strip_prefix("###") {
            blocks.push(Block::Heading {
                level: 3,
                spans: parse_spans(rest.trim_start()),
            });
        } else if let Some(rest) = clean.strip_prefix("##") {
            blocks.push(Block::Heading {
                level: 2,
                spans: parse_spans(rest.trim_start()),
            });
        } else if let Some(rest) = clean.strip_prefix("* ").or_else(|| clean.strip_prefix("- ")) {
            blocks.push(Block::Bullet {
                spans: parse_spans(rest.trim_start()),
            });
        } else {
            blocks.push(Block::Paragraph {
                spans: parse_spans(clean),
            });
        }
    }
    blocks
}

/// Splits a single line into styled spans by walking `**` and `*` markers.
/// Unclosed markers style the remainder of the line; empty runs are dropped.
pub fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut bold = false;
    let mut italic = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            let doubled = chars.peek() == Some(&'*');
            if doubled {
                chars.next();
            }
            flush(&mut spans, &mut current, bold, italic);
            if doubled {
                bold = !bold;
            } else {
                italic = !italic;
            }
        } else {
            current.push(c);
        }
    }
    flush(&mut spans, &mut current, bold, italic);
    spans
}

fn flush(spans: &mut Vec<Span>, current: &mut String, bold: bool, italic: bool) {
    if current.is_empty() {
        return;
    }
    let style = if bold {
        SpanStyle::Bold
    } else if italic {
        SpanStyle::Italic
    } else {
        SpanStyle::Regular
    };
    spans.push(Span {
        text: std::mem::take(current),
        style,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_heading_levels() {
        let blocks = parse_blocks("## Executive Summary\n### Details");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::Heading { level: 2, .. }));
        assert!(matches!(blocks[1], Block::Heading { level: 3, .. }));
    }

    #[test]
    fn test_bullets_both_markers() {
        let blocks = parse_blocks("* first\n- second");
        assert_eq!(blocks.len(), 2);
        for b in &blocks {
            assert!(matches!(b, Block::Bullet { .. }));
        }
    }

    #[test]
    fn test_rules_and_blank_lines_skipped() {
        let blocks = parse_blocks("one\n\n---\ntwo");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
    }

    #[test]
    fn test_bold_span_extraction() {
        let spans = parse_spans("a **bold** word");
        assert_eq!(
            spans,
            vec![
                Span {
                    text: "a ".to_string(),
                    style: SpanStyle::Regular
                },
                Span {
                    text: "bold".to_string(),
                    style: SpanStyle::Bold
                },
                Span {
                    text: " word".to_string(),
                    style: SpanStyle::Regular
                },
            ]
        );
    }

    #[test]
    fn test_italic_span_extraction() {
        let spans = parse_spans("*quiet* voice");
        assert_eq!(spans[0].style, SpanStyle::Italic);
        assert_eq!(spans[0].text, "quiet");
        assert_eq!(spans[1].style, SpanStyle::Regular);
    }

    #[test]
    fn test_unclosed_marker_styles_remainder() {
        let spans = parse_spans("plain **rest of line");
        assert_eq!(spans.last().unwrap().style, SpanStyle::Bold);
        assert_eq!(spans.last().unwrap().text, "rest of line");
    }

    #[test]
    fn test_plain_text_reassembles_line() {
        let spans = parse_spans("a **b** *c* d");
        assert_eq!(plain_text(&spans), "a b c d");
    }

    #[test]
    fn test_heading_with_emphasis() {
        let blocks = parse_blocks("## The **Key** Point");
        match &blocks[0] {
            Block::Heading { level, spans } => {
                assert_eq!(*level, 2);
                assert_eq!(plain_text(spans), "The Key Point");
            }
            other => panic!("expected heading, got {other:?}"),
        }
    }
}
