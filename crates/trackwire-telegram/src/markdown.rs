//! MarkdownV2 escaping helpers.
//!
//! Telegram's MarkdownV2 dialect treats a long list of characters as markup.
//! Free-text fields from the tracker must never be able to break message
//! structure, so everything user-controlled passes through one of these.

/// Characters MarkdownV2 requires escaping outside code/links.
const SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape regular text for MarkdownV2.
pub fn escape_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape text destined for an inline `code` span — only backslash and
/// backtick are special there.
pub fn escape_code(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}

/// Escape a URL for the `[text](url)` form.
pub fn escape_url(url: &str) -> String {
    url.replace(' ', "%20")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Break up literal triple backticks so embedded text cannot terminate a
/// rendered code fence early.
pub fn sanitize_code_block(text: &str) -> String {
    text.replace("```", "``\\`")
}
