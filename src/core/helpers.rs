use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::SecondsFormat;
use rand::rngs::OsRng;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use uuid::Uuid;

/// Fixed-width UTC timestamp, so stored values also sort lexically.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Regex should compile")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// At least MIN_PASSWORD_LENGTH characters, one uppercase letter and one
/// punctuation or symbol character.
pub fn is_strong_password(password: &str) -> bool {
    if password.chars().count() < crate::config::MIN_PASSWORD_LENGTH {
        return false;
    }
    let mut has_upper = false;
    let mut has_special = false;
    for ch in password.chars() {
        if ch.is_uppercase() {
            has_upper = true;
        } else if !ch.is_alphanumeric() && !ch.is_whitespace() && !ch.is_control() {
            has_special = true;
        }
    }
    has_upper && has_special
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Plain text only: every tag is stripped.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(HashSet::new())
        .clean(text)
        .to_string()
}

/// Keeps harmless markup, drops scripts and event handlers.
pub fn sanitize_html(content: &str) -> String {
    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("Secret#123").unwrap();
        assert_ne!(hash, "Secret#123");
        assert!(verify_password("Secret#123", &hash));
        assert!(!verify_password("secret#123", &hash));
        assert!(!verify_password("Secret#123", "not-a-phc-string"));
    }

    #[test]
    fn password_strength_policy() {
        assert!(is_strong_password("Passw0rd!"));
        assert!(is_strong_password("ABCDEFG$"));
        assert!(!is_strong_password("Sh0rt!"));
        assert!(!is_strong_password("password!"), "needs an uppercase letter");
        assert!(!is_strong_password("Password1"), "needs a symbol");
        assert!(!is_strong_password("Pass word"), "whitespace is not a symbol");
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn counts_whitespace_separated_words() {
        assert_eq!(word_count("  one\ttwo\nthree  "), 3);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn sanitizers() {
        assert_eq!(sanitize_text("<b>Ada</b> Lovelace"), "Ada Lovelace");
        let cleaned = sanitize_html("<p onclick=\"x()\">hi</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>hi</p>");
    }

    #[test]
    fn timestamps_are_fixed_width() {
        assert_eq!(now_iso().len(), "2026-01-01T00:00:00.000000Z".len());
    }
}
