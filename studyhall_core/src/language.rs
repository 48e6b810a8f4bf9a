//! Language resolution for inbound queries.
//!
//! Maps free text to one of a fixed, closed set of supported language
//! codes. Detection is deterministic for a given input, so test
//! fixtures are reproducible.

use tracing::{info, warn};
use whatlang::Lang;

/// Fallback when detection fails or yields an unsupported language.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Supported language codes and their display names.
const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ru", "Russian"),
];

/// Detects and validates language codes against the supported set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageResolver;

impl LanguageResolver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Detect the language of `text`, falling back to `en` when the
    /// detector is unsure or the language is outside the supported set.
    #[must_use]
    pub fn detect(&self, text: &str) -> String {
        match whatlang::detect_lang(text).and_then(Self::lang_to_code) {
            Some(code) => {
                info!("Detected language: {code} ({})", self.display_name(code));
                code.to_string()
            }
            None => {
                warn!("Language detection failed or unsupported, defaulting to English");
                FALLBACK_LANGUAGE.to_string()
            }
        }
    }

    /// Whether `code` is in the supported set.
    #[must_use]
    pub fn is_supported(&self, code: &str) -> bool {
        SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
    }

    /// Human-readable name for `code`, or `"Unknown"` for anything
    /// outside the supported set. Never fails.
    #[must_use]
    pub fn display_name(&self, code: &str) -> &'static str {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|(c, _)| *c == code)
            .map_or("Unknown", |(_, name)| name)
    }

    /// Map a detector language to a supported two-letter code.
    const fn lang_to_code(lang: Lang) -> Option<&'static str> {
        match lang {
            Lang::Eng => Some("en"),
            Lang::Spa => Some("es"),
            Lang::Fra => Some("fr"),
            Lang::Deu => Some("de"),
            Lang::Ita => Some("it"),
            Lang::Por => Some("pt"),
            Lang::Cmn => Some("zh"),
            Lang::Jpn => Some("ja"),
            Lang::Kor => Some("ko"),
            Lang::Ara => Some("ar"),
            Lang::Hin => Some("hi"),
            Lang::Rus => Some("ru"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        let resolver = LanguageResolver::new();
        let code = resolver.detect("What are the enrolment requirements for this course?");
        assert_eq!(code, "en");
    }

    #[test]
    fn detects_spanish() {
        let resolver = LanguageResolver::new();
        let code = resolver.detect("¿Cuáles son los requisitos de matrícula para este curso?");
        assert_eq!(code, "es");
    }

    #[test]
    fn detection_is_deterministic() {
        let resolver = LanguageResolver::new();
        let text = "How do I register for courses next semester?";
        assert_eq!(resolver.detect(text), resolver.detect(text));
    }

    #[test]
    fn unsupported_falls_back_to_english() {
        let resolver = LanguageResolver::new();
        // Too short for the detector to commit to anything.
        assert_eq!(resolver.detect(""), FALLBACK_LANGUAGE);
    }

    #[test]
    fn supported_set_is_closed() {
        let resolver = LanguageResolver::new();
        for code in ["en", "es", "fr", "de", "it", "pt", "zh", "ja", "ko", "ar", "hi", "ru"] {
            assert!(resolver.is_supported(code), "missing {code}");
        }
        assert!(!resolver.is_supported("nl"));
        assert!(!resolver.is_supported("auto"));
    }

    #[test]
    fn display_name_never_fails() {
        let resolver = LanguageResolver::new();
        assert_eq!(resolver.display_name("en"), "English");
        assert_eq!(resolver.display_name("ja"), "Japanese");
        assert_eq!(resolver.display_name("xx"), "Unknown");
    }
}
