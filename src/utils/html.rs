use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization for instructor-supplied text (quiz titles,
/// descriptions, question text and options): safe tags survive, <script> and
/// event-handler attributes do not. This is the fail-safe against stored XSS
/// reaching the student-facing quiz UI.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
