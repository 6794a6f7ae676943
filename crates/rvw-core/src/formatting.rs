//! Message formatters (Markdown → Telegram HTML).
//!
//! A broadcast applies its formatter once, before fan-out, so formatters
//! must be pure. Returning `Err` aborts the broadcast before any send.

use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

/// Pluggable text transformation applied once per broadcast.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, raw: &str) -> Result<String>;
}

impl<F> MessageFormatter for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn format(&self, raw: &str) -> Result<String> {
        self(raw)
    }
}

/// Converts the Markdown subset admins write into Telegram HTML.
///
/// With a length limit set, output longer than the limit is rejected instead
/// of letting every single recipient fail on the same oversized payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownToHtml {
    max_len: Option<usize>,
}

impl MarkdownToHtml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
        }
    }
}

impl MessageFormatter for MarkdownToHtml {
    fn format(&self, raw: &str) -> Result<String> {
        let html = convert_markdown_to_html(raw);
        if let Some(max) = self.max_len {
            let len = html.chars().count();
            if len > max {
                return Err(Error::Formatter(format!(
                    "formatted message is {len} chars, limit is {max}"
                )));
            }
        }
        Ok(html)
    }
}

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Convert a minimal markdown subset to Telegram-compatible HTML.
///
/// Telegram HTML supports only a small subset: `<b>`, `<i>`, `<code>`, `<pre>`, `<a href="...">`.
pub fn convert_markdown_to_html(input: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    static INLINE: OnceLock<Regex> = OnceLock::new();
    static HEADER: OnceLock<Regex> = OnceLock::new();
    static BOLD: OnceLock<Regex> = OnceLock::new();
    static STAR: OnceLock<Regex> = OnceLock::new();
    static UNDERSCORE: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();

    // Code is pulled out first so none of the inline rules touch it.
    let mut blocks: Vec<String> = Vec::new();
    let fence = re(&FENCE, r"(?s)```[A-Za-z0-9_]*\n?(.*?)```");
    let text = fence.replace_all(input, |c: &regex::Captures| {
        blocks.push(format!("<pre>{}</pre>", escape_html(&c[1])));
        format!("\0C{}\0", blocks.len() - 1)
    });
    let text = re(&INLINE, r"`([^`\n]+)`").replace_all(&text, |c: &regex::Captures| {
        blocks.push(format!("<code>{}</code>", escape_html(&c[1])));
        format!("\0C{}\0", blocks.len() - 1)
    });

    let mut text = escape_html(&text);
    // URLs are held back like code so emphasis rules never reach into an href.
    text = re(&LINK, r"\[([^\]]+)\]\(([^)\s]+)\)")
        .replace_all(&text, |c: &regex::Captures| {
            blocks.push(c[2].to_string());
            format!("<a href=\"\0C{}\0\">{}</a>", blocks.len() - 1, &c[1])
        })
        .into_owned();
    text = re(&HEADER, r"(?m)^#{1,6}[ \t]+(.+)$")
        .replace_all(&text, "<b>$1</b>")
        .into_owned();
    text = re(&BOLD, r"(\*\*|__)([^\n]+?)(\*\*|__)")
        .replace_all(&text, "<b>$2</b>")
        .into_owned();
    text = re(&STAR, r"\*([^*\n]+)\*")
        .replace_all(&text, "<b>$1</b>")
        .into_owned();
    // `snake_case` words stay intact: the underscore must sit at a word edge.
    text = re(&UNDERSCORE, r"(^|[\s(])_([^_\n]+)_([\s).,!?:;]|$)")
        .replace_all(&text, "$1<i>$2</i>$3")
        .into_owned();

    for (i, block) in blocks.iter().enumerate() {
        text = text.replace(&format!("\0C{i}\0"), block);
    }

    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    text
}
