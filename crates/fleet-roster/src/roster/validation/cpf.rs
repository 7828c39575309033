//! Brazilian CPF (taxpayer registry) checks.

use super::ValidationError;

const CPF_LEN: usize = 11;

/// Keeps only the ASCII digits of `raw`.
pub fn normalize_cpf(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a CPF typed in any punctuation style.
///
/// Returns the normalized eleven digits on success.
pub fn validate_cpf(raw: &str) -> Result<String, ValidationError> {
    let digits = normalize_cpf(raw);
    if digits.is_empty() {
        return Err(ValidationError::Required { field: "CPF" });
    }
    if digits.len() != CPF_LEN {
        return Err(ValidationError::CpfLength);
    }

    let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    if values.iter().all(|&d| d == values[0]) {
        return Err(ValidationError::CpfInvalid);
    }

    if check_digit(&values[..9]) != values[9] || check_digit(&values[..10]) != values[10] {
        return Err(ValidationError::CpfInvalid);
    }

    Ok(digits)
}

/// Weights run from `len + 1` down to 2 across the preceding digits.
fn check_digit(preceding: &[u32]) -> u32 {
    let top = preceding.len() as u32 + 1;
    let sum: u32 = preceding
        .iter()
        .enumerate()
        .map(|(index, digit)| digit * (top - index as u32))
        .sum();

    match (sum * 10) % 11 {
        10 | 11 => 0,
        remainder => remainder,
    }
}

/// Groups the digits of `raw` as `000.000.000-00`, progressively while typing.
///
/// Digits beyond the eleventh are dropped.
pub fn format_cpf(raw: &str) -> String {
    let digits: String = normalize_cpf(raw).chars().take(CPF_LEN).collect();
    let mut formatted = String::with_capacity(14);
    for (index, digit) in digits.chars().enumerate() {
        match index {
            3 | 6 => formatted.push('.'),
            9 => formatted.push('-'),
            _ => {}
        }
        formatted.push(digit);
    }
    formatted
}

/// Keystroke helper: `None` when the edit would push the CPF past eleven digits.
pub fn accept_cpf_keystroke(raw: &str) -> Option<String> {
    (normalize_cpf(raw).len() <= CPF_LEN).then(|| format_cpf(raw))
}
