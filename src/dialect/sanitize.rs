// ============================================================================
// Value Sanitizer
// ============================================================================
//
// Content packages are untrusted. Every value accepted through setvalue is
// scrubbed of active markup before validation: script blocks, markup tags,
// inline event-handler attributes and javascript: URLs are removed.
// ============================================================================

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?(?:</script\s*>|$)").unwrap();
    static ref EVENT_HANDLER: Regex =
        Regex::new(r#"(?i)\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#).unwrap();
    static ref MARKUP_TAG: Regex = Regex::new(r"(?s)</?[a-zA-Z][^>]*>").unwrap();
    static ref JS_URL: Regex = Regex::new(r"(?i)javascript\s*:").unwrap();
}

/// Strip active content from an untrusted data-model value.
///
/// Whitespace is preserved; suspend data legitimately carries opaque
/// content-defined text, so only markup-shaped substrings are removed.
pub fn sanitize_value(raw: &str) -> String {
    let value = SCRIPT_BLOCK.replace_all(raw, "");
    let value = EVENT_HANDLER.replace_all(&value, "");
    let value = MARKUP_TAG.replace_all(&value, "");
    let value = JS_URL.replace_all(&value, "");
    value.into_owned()
}
