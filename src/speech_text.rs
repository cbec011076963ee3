//! Markdown-to-speech text cleanup.
//!
//! Assistant answers are markdown. Before they are spoken, markup that
//! sounds wrong read aloud is removed: fenced code becomes a short spoken
//! placeholder, inline code and images disappear, links keep only their
//! text, and structural markers (headings, list bullets, quotes, emphasis)
//! are dropped.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Spoken in place of a fenced or indented code block.
pub const CODE_BLOCK_PLACEHOLDER: &str = "(a code block)";

/// Reduce markdown to plain speakable text.
///
/// Returns an empty string when nothing speakable remains.
pub fn clean_for_speech(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);

    let mut out = String::new();
    let mut in_code_block = false;
    let mut image_depth = 0usize;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                out.push('\n');
                out.push_str(CODE_BLOCK_PLACEHOLDER);
                out.push('\n');
            }
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Image { .. }) => image_depth += 1,
            Event::End(TagEnd::Image) => image_depth = image_depth.saturating_sub(1),
            Event::Text(text) if !in_code_block && image_depth == 0 => {
                out.extend(text.chars().filter(|c| !matches!(c, '*' | '_' | '~')));
            }
            Event::SoftBreak | Event::HardBreak if image_depth == 0 => out.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::TableRow
                | TagEnd::TableHead,
            ) => out.push('\n'),
            // Inline code, raw HTML, rules and everything else are silent.
            _ => {}
        }
    }

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
