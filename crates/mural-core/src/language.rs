//! Supported content languages.
//!
//! Every content item carries a language tag. Submissions may omit it, in
//! which case the sender's preferred language is used; an explicit tag
//! outside the supported set is rejected, never silently replaced.

use crate::error::{Error, Result};

/// Language tags accepted for content items, sorted for binary search.
pub const SUPPORTED_LANGUAGES: &[&str] = &["de", "en", "hr", "it", "pt", "ro"];

/// Whether `tag` is an accepted content language.
#[must_use]
pub fn is_supported(tag: &str) -> bool {
    SUPPORTED_LANGUAGES.binary_search(&tag).is_ok()
}

/// Resolve the language for a content item: an empty tag falls back to
/// `default` (the sender's preference), a supported tag passes through.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when `tag` is non-empty and not in
/// [`SUPPORTED_LANGUAGES`].
pub fn resolve(tag: &str, default: &str) -> Result<String> {
    if tag.is_empty() {
        return Ok(default.to_owned());
    }
    if is_supported(tag) {
        return Ok(tag.to_owned());
    }
    Err(Error::InvalidArgument(format!(
        "unsupported language tag '{tag}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::{SUPPORTED_LANGUAGES, is_supported, resolve};
    use crate::error::Error;

    #[test]
    fn supported_list_is_sorted_for_binary_search() {
        let mut sorted = SUPPORTED_LANGUAGES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SUPPORTED_LANGUAGES);
    }

    #[test]
    fn empty_tag_falls_back_to_default() {
        assert_eq!(resolve("", "it").expect("fallback"), "it");
    }

    #[test]
    fn supported_tag_passes_through() {
        assert_eq!(resolve("de", "it").expect("passthrough"), "de");
        assert!(is_supported("en"));
    }

    #[test]
    fn unsupported_tag_is_rejected() {
        let err = resolve("tlh", "en").expect_err("klingon is not supported");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
