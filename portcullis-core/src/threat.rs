//! Detection and stripping of script-injection payloads in free text.
//!
//! Detection always looks at the raw input. [`sanitize`] is lossy and only
//! meant for values that are forwarded after the check passed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex pattern"));

static ANGLE_BRACKET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]").expect("Invalid angle bracket regex pattern"));

static SCHEME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:javascript|vbscript|data):").expect("Invalid scheme regex pattern")
});

static EVENT_HANDLER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("Invalid event handler regex pattern"));

static THREAT_PATTERNS: LazyLock<Vec<(ThreatKind, Regex)>> = LazyLock::new(|| {
    ThreatKind::ALL
        .iter()
        .map(|kind| {
            let regex = Regex::new(kind.pattern()).expect("Invalid threat regex pattern");
            (*kind, regex)
        })
        .collect()
});

/// A family of payload recognised by [`detect_threat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    ScriptTag,
    IframeTag,
    JavascriptUri,
    EventHandler,
    Eval,
    Expression,
    VbscriptUri,
    DataHtml,
}

impl ThreatKind {
    pub const ALL: [ThreatKind; 8] = [
        ThreatKind::ScriptTag,
        ThreatKind::IframeTag,
        ThreatKind::JavascriptUri,
        ThreatKind::EventHandler,
        ThreatKind::Eval,
        ThreatKind::Expression,
        ThreatKind::VbscriptUri,
        ThreatKind::DataHtml,
    ];

    fn pattern(&self) -> &'static str {
        match self {
            ThreatKind::ScriptTag => r"(?i)<\s*script\b",
            ThreatKind::IframeTag => r"(?i)<\s*iframe\b",
            ThreatKind::JavascriptUri => r"(?i)javascript\s*:",
            ThreatKind::EventHandler => r"(?i)on\w+\s*=",
            ThreatKind::Eval => r"(?i)eval\s*\(",
            ThreatKind::Expression => r"(?i)expression\s*\(",
            ThreatKind::VbscriptUri => r"(?i)vbscript\s*:",
            ThreatKind::DataHtml => r"(?i)data:text/html",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::ScriptTag => "script_tag",
            ThreatKind::IframeTag => "iframe_tag",
            ThreatKind::JavascriptUri => "javascript_uri",
            ThreatKind::EventHandler => "event_handler",
            ThreatKind::Eval => "eval",
            ThreatKind::Expression => "expression",
            ThreatKind::VbscriptUri => "vbscript_uri",
            ThreatKind::DataHtml => "data_html",
        }
    }
}

impl fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip markup and script vectors from `input`.
///
/// Whole tags go first, then stray angle brackets, `javascript:`/`vbscript:`/
/// `data:` schemes and inline `on*=` handlers. The result is trimmed.
///
/// # Examples
///
/// ```rust
/// use portcullis_core::threat::sanitize;
///
/// assert_eq!(sanitize("<script>alert('xss')</script>"), "alert('xss')");
/// assert_eq!(sanitize("  plain text  "), "plain text");
/// ```
pub fn sanitize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let without_tags = TAG_REGEX.replace_all(input, "");
    let without_brackets = ANGLE_BRACKET_REGEX.replace_all(&without_tags, "");
    let without_schemes = SCHEME_REGEX.replace_all(&without_brackets, "");
    let without_handlers = EVENT_HANDLER_REGEX.replace_all(&without_schemes, "");

    without_handlers.trim().to_string()
}

/// Whether `input` contains any known injection payload.
///
/// # Examples
///
/// ```rust
/// use portcullis_core::threat::detect_threat;
///
/// assert!(detect_threat("<script>alert(1)</script>"));
/// assert!(!detect_threat("admin@example.com"));
/// ```
pub fn detect_threat(input: &str) -> bool {
    if input.is_empty() {
        return false;
    }
    THREAT_PATTERNS.iter().any(|(_, regex)| regex.is_match(input))
}

/// Every payload family found in `input`, in declaration order.
pub fn scan(input: &str) -> Vec<ThreatKind> {
    if input.is_empty() {
        return Vec::new();
    }
    THREAT_PATTERNS
        .iter()
        .filter(|(_, regex)| regex.is_match(input))
        .map(|(kind, _)| *kind)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_threat_positive() {
        let payloads = [
            "<script>alert(1)</script>",
            "<SCRIPT src=x>",
            "<iframe src='evil'>",
            "javascript:alert(1)",
            "<img src=x onerror=alert(1)>",
            "eval(document.cookie)",
            "width: expression(alert(1))",
            "VBScript:msgbox",
            "data:text/html;base64,PHNjcmlwdD4=",
        ];
        for payload in payloads {
            assert!(detect_threat(payload), "expected threat in {payload:?}");
        }
    }

    #[test]
    fn test_detect_threat_negative() {
        assert!(!detect_threat(""));
        assert!(!detect_threat("admin@example.com"));
        assert!(!detect_threat("Password123!"));
        assert!(!detect_threat("a < b and c > d"));
    }

    #[test]
    fn test_sanitize_script_tag() {
        assert_eq!(sanitize("<script>alert('xss')</script>"), "alert('xss')");
    }

    #[test]
    fn test_sanitize_empty_and_clean() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("admin@example.com"), "admin@example.com");
        assert_eq!(sanitize("  padded  "), "padded");
    }

    #[test]
    fn test_sanitize_schemes_and_handlers() {
        assert_eq!(sanitize("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize("vbscript:run"), "run");
        assert_eq!(sanitize("data:payload"), "payload");
        assert_eq!(sanitize("x onclick=steal()"), "x steal()");
    }

    #[test]
    fn test_sanitize_stray_brackets() {
        assert_eq!(sanitize("a > b"), "a  b");
        assert_eq!(sanitize("<unterminated"), "unterminated");
    }

    #[test]
    fn test_sanitize_removes_detected_tags() {
        let raw = "<iframe src=x></iframe>admin@example.com";
        let cleaned = sanitize(raw);
        assert_eq!(cleaned, "admin@example.com");
        assert!(!detect_threat(&cleaned));
    }

    #[test]
    fn test_scan_reports_all_matches() {
        let found = scan("<script>eval(x)</script>");
        assert_eq!(found, vec![ThreatKind::ScriptTag, ThreatKind::Eval]);
        assert!(scan("hello").is_empty());
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_threat_kind_display() {
        assert_eq!(ThreatKind::JavascriptUri.to_string(), "javascript_uri");
        assert_eq!(
            serde_json::to_string(&ThreatKind::DataHtml).unwrap(),
            "\"data_html\""
        );
    }
}
