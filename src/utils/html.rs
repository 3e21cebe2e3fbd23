/// Sanitizes user-supplied comment text before it is stored.
///
/// Whitelist-based (ammonia): harmless markup such as <b> or <p> survives, while
/// <script>, <iframe> and event-handler attributes are removed. A comment that
/// consisted only of dangerous markup comes back empty and is rejected as such.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::clean_html;

    #[test]
    fn strips_scripts_but_keeps_text() {
        assert_eq!(clean_html("hi <script>alert(1)</script>"), "hi ");
        assert_eq!(clean_html("<b>bold</b>"), "<b>bold</b>");
        assert!(clean_html("<script>alert(1)</script>").trim().is_empty());
    }

    #[test]
    fn escapes_plain_text_entities() {
        assert_eq!(clean_html("a & b"), "a &amp; b");
        assert_eq!(clean_html(&clean_html("a & b")), clean_html("a & b"));
    }
}
