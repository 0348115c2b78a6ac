//! Input normalization and validation shared by the services.

use std::collections::HashMap;

use chrono::NaiveDate;

pub const MIN_PASSWORD_LENGTH: usize = 6;

const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Collects per-field problems so a request can be rejected with all of them at once
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    /// Record `field` as required when the value is missing or blank
    pub fn require(&mut self, field: &str, value: Option<&str>) {
        if value.map(|v| v.trim().is_empty()).unwrap_or(true) {
            self.add(field, "This field is required");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.errors
    }
}

/// Trim and case-fold an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic structural email check
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err("Invalid email format".to_string());
    }
    if !parts[1].contains('.') || parts[1].starts_with('.') || parts[1].ends_with('.') {
        return Err("Invalid email format".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Keep only letters and digits of a tax document, uppercased.
/// Returns `None` when nothing is left.
pub fn normalize_document(document: &str) -> Option<String> {
    let normalized: String = document
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn validate_blood_type(value: &str) -> Result<String, String> {
    let upper = value.trim().to_uppercase();
    if BLOOD_TYPES.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(format!("Invalid blood type: {}", value))
    }
}

pub fn validate_birth_date(date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if date > today {
        return Err("Birth date cannot be in the future".to_string());
    }
    Ok(())
}

/// Trimmed value, or `None` when blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// URL-safe slug: lowercase ASCII, accents folded, runs of other characters collapsed to `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(c);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "organization".to_string()
    } else {
        slug
    }
}

/// `base`, then `base-1`, `base-2`, ... for collision resolution
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_accents_and_collapses_separators() {
        assert_eq!(slugify("Acme Dental"), "acme-dental");
        assert_eq!(slugify("  Clínica Sorriso & Cia.  "), "clinica-sorriso-cia");
        assert_eq!(slugify("Odonto---São João"), "odonto-sao-joao");
        assert_eq!(slugify("!!!"), "organization");
    }

    #[test]
    fn slug_candidates_append_counter() {
        assert_eq!(slug_candidate("acme-dental", 0), "acme-dental");
        assert_eq!(slug_candidate("acme-dental", 2), "acme-dental-2");
    }

    #[test]
    fn email_format() {
        assert!(validate_email_format("a@acme.com").is_ok());
        assert!(validate_email_format("a@acme").is_err());
        assert!(validate_email_format("@acme.com").is_err());
        assert!(validate_email_format("a b@acme.com").is_err());
        assert!(validate_email_format("a@@acme.com").is_err());
        assert_eq!(normalize_email("  A@Acme.COM "), "a@acme.com");
    }

    #[test]
    fn documents_are_normalized() {
        assert_eq!(normalize_document("123.456.789-09").as_deref(), Some("12345678909"));
        assert_eq!(normalize_document("ab-12").as_deref(), Some("AB12"));
        assert_eq!(normalize_document(" -./ "), None);
    }

    #[test]
    fn blood_types() {
        assert_eq!(validate_blood_type("ab+").unwrap(), "AB+");
        assert!(validate_blood_type("C+").is_err());
    }

    #[test]
    fn birth_date_not_in_future() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(validate_birth_date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(), today).is_ok());
        assert!(validate_birth_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), today).is_err());
    }

    #[test]
    fn field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.require("name", Some("   "));
        errors.require("email", Some("a@b.co"));
        errors.add("name", "second message");
        let map = errors.into_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["name"], "This field is required");
    }

    #[test]
    fn password_length() {
        assert!(validate_password("secret123").is_ok());
        assert!(validate_password("12345").is_err());
    }
}
