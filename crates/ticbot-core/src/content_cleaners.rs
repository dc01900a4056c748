/// Rewrites message content before it is embedded in a tracker body.
pub type ContentCleaner = fn(&str) -> String;

pub const DEFAULT_CLEANERS: &[ContentCleaner] = &[neutralize_at_mentions];

const AT_MENTION_BREAK: &str = "<!-- -->";

/// Breaks `@login` mentions so forwarded mail never pings tracker users.
///
/// An `@` counts as a mention when it starts a line or follows a
/// non-alphanumeric character, and is followed by an alphanumeric one.
/// Addresses such as `a@b.org` are left alone.
pub fn neutralize_at_mentions(content: &str) -> String {
    let mut cleaned = String::with_capacity(content.len());
    let mut previous: Option<char> = None;
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        cleaned.push(ch);
        if ch == '@' {
            let opens_mention = previous.is_none_or(|prev| !prev.is_ascii_alphanumeric());
            let next_is_word = chars.peek().is_some_and(|next| next.is_ascii_alphanumeric());
            if opens_mention && next_is_word {
                cleaned.push_str(AT_MENTION_BREAK);
            }
        }
        previous = Some(ch);
    }
    cleaned
}

pub fn clean_content(content: &str, cleaners: &[ContentCleaner]) -> String {
    cleaners
        .iter()
        .fold(content.to_string(), |current, cleaner| cleaner(&current))
}
