// src/utils/html.rs

/// Sanitizes instructor-authored text (course descriptions, lesson titles,
/// question and option text) before it is stored.
///
/// Whitelist-based: safe inline tags such as <b> survive, <script> and
/// event-handler attributes are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}
