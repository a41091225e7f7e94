//! Credential checks for the login surface.
//!
//! Both validators are total: they never fail, they only report.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lazy-loaded email validation regex
///
/// This regex validates email addresses according to a practical subset of RFC 5322.
/// It's loaded once at runtime and reused for all email validation operations.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Passwords that are rejected outright, compared case-insensitively
/// against the whole password.
static COMMON_PASSWORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:123456|password|qwerty|abc123|admin|letmein|welcome|monkey)$")
        .expect("Invalid common password regex pattern")
});

const MAX_EMAIL_LENGTH: usize = 254;
const MIN_PASSWORD_LENGTH: usize = 8;
const LONG_PASSWORD_LENGTH: usize = 12;
const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validates an email address
///
/// Returns `true` when the address is non-empty, at most 254 bytes and
/// matches the address pattern.
///
/// # Examples
///
/// ```rust
/// use portcullis_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com"));
/// assert!(!validate_email("invalid-email"));
/// ```
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(email)
}

/// Coarse strength bucket derived from a password score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl PasswordStrength {
    pub fn from_score(score: u8) -> Self {
        match score {
            6.. => PasswordStrength::VeryStrong,
            5 => PasswordStrength::Strong,
            3 | 4 => PasswordStrength::Medium,
            _ => PasswordStrength::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "weak",
            PasswordStrength::Medium => "medium",
            PasswordStrength::Strong => "strong",
            PasswordStrength::VeryStrong => "very-strong",
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`validate_password_strength`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordAssessment {
    pub valid: bool,
    pub errors: Vec<String>,
    pub score: u8,
    pub strength: PasswordStrength,
}

/// Scores a password and lists every unmet requirement
///
/// One point each for reaching 8 characters, exceeding 12 characters, and
/// containing an uppercase letter, a lowercase letter, a digit and a special
/// character. A password that is one of the well-known common passwords
/// loses a point and is invalid.
///
/// # Examples
///
/// ```rust
/// use portcullis_core::validation::{PasswordStrength, validate_password_strength};
///
/// let assessment = validate_password_strength("Password123!");
/// assert!(assessment.valid);
/// assert_eq!(assessment.strength, PasswordStrength::Strong);
/// ```
pub fn validate_password_strength(password: &str) -> PasswordAssessment {
    if password.is_empty() {
        return PasswordAssessment {
            valid: false,
            errors: vec!["Password is required".to_string()],
            score: 0,
            strength: PasswordStrength::Weak,
        };
    }

    let mut errors = Vec::new();
    let mut score: u8 = 0;
    let length = password.chars().count();

    if length >= MIN_PASSWORD_LENGTH {
        score += 1;
    } else {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }

    if length > LONG_PASSWORD_LENGTH {
        score += 1;
    }

    let classes: [(fn(&char) -> bool, &str); 4] = [
        (char::is_ascii_uppercase, "one uppercase letter"),
        (char::is_ascii_lowercase, "one lowercase letter"),
        (char::is_ascii_digit, "one number"),
        (|c| SPECIAL_CHARACTERS.contains(*c), "one special character"),
    ];
    for (matches, requirement) in classes {
        if password.chars().any(|c| matches(&c)) {
            score += 1;
        } else {
            errors.push(format!("Password must contain at least {requirement}"));
        }
    }

    if COMMON_PASSWORD_REGEX.is_match(password) {
        errors.push("Password contains common patterns".to_string());
        score = score.saturating_sub(1);
    }

    PasswordAssessment {
        valid: errors.is_empty(),
        errors,
        score,
        strength: PasswordStrength::from_score(score),
    }
}
