use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zÀ-ÖØ-öø-ÿ\s]*$").expect("NAME_REGEX: invalid regex pattern")
});

/// Latin letters, including the Latin-1 accented range, and whitespace only.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::NameCharacters)
    }
}

/// Title-cases a name: lower-case everything, then capitalize each token.
pub fn format_name(raw: &str) -> String {
    let mut formatted = String::with_capacity(raw.len());
    let mut at_token_start = true;
    for c in raw.chars() {
        if c.is_whitespace() {
            formatted.push(c);
            at_token_start = true;
        } else if at_token_start {
            formatted.extend(c.to_uppercase());
            at_token_start = false;
        } else {
            formatted.extend(c.to_lowercase());
        }
    }
    formatted
}

/// What a name field does on every keystroke: format, then validate the result.
pub fn format_then_validate(raw: &str) -> (String, Result<(), ValidationError>) {
    let formatted = format_name(raw);
    let verdict = validate_name(&formatted);
    (formatted, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_each_token() {
        assert_eq!(format_name("joão da silva"), "João Da Silva");
        assert_eq!(format_name("MARIA  DAS DORES"), "Maria  Das Dores");
        assert_eq!(format_name(" ana"), " Ana");
    }

    #[test]
    fn rejects_digits_and_punctuation() {
        let err = validate_name("Jo4o").expect_err("digit rejected");
        assert!(!err.to_string().is_empty());
        assert_eq!(validate_name("Ana-Maria"), Err(ValidationError::NameCharacters));
    }

    #[test]
    fn accepts_accented_latin_letters() {
        assert!(validate_name("Conceição Ângela Müller").is_ok());
        assert_eq!(validate_name("Łukasz"), Err(ValidationError::NameCharacters));
        assert_eq!(validate_name("Ana×Maria"), Err(ValidationError::NameCharacters));
    }

    #[test]
    fn empty_name_is_required() {
        assert_eq!(
            validate_name(""),
            Err(ValidationError::Required { field: "name" })
        );
    }

    #[test]
    fn keystroke_formats_before_validating() {
        let (formatted, verdict) = format_then_validate("josé 2");
        assert_eq!(formatted, "José 2");
        assert_eq!(verdict, Err(ValidationError::NameCharacters));
    }
}
