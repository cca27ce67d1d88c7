//! CPF/CNPJ tax-identifier validation.
//!
//! Checkout submissions carry the payer's document number; it gates the data
//! synced to the remote customer record, so it is validated before anything
//! goes upstream. Pure functions, no I/O.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const CPF_LEN: usize = 11;
pub const CNPJ_LEN: usize = 14;

const CNPJ_WEIGHTS_FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// NATURAL (CPF, a person) vs LEGAL (CNPJ, a company), as the remote
/// customer record tags document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    Natural,
    Legal,
}

impl DocumentKind {
    /// Infers the kind from an already-normalized digit string.
    pub fn from_digits(digits: &str) -> Option<Self> {
        match digits.len() {
            CPF_LEN => Some(Self::Natural),
            CNPJ_LEN => Some(Self::Legal),
            _ => None,
        }
    }
}

/// Strips non-digit characters and validates the checksum. Returns the cleaned
/// digit string when it is a well-formed CPF or CNPJ, otherwise an empty
/// string. Never fails: an unusable document and an absent one are handled the
/// same way by callers.
pub fn normalize_and_validate(raw: &str) -> String {
    let digits = only_digits(raw);
    match digits.len() {
        CPF_LEN if is_valid_cpf(&digits) => digits,
        CNPJ_LEN if is_valid_cnpj(&digits) => digits,
        _ => String::new(),
    }
}

pub fn only_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digit_values(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

/// Mod-11 CPF check: two check digits at positions 9 and 10, each computed
/// over the preceding digits with descending weights.
fn is_valid_cpf(cpf: &str) -> bool {
    if cpf.len() != CPF_LEN || all_same(cpf) {
        return false;
    }
    let nums = digit_values(cpf);

    for t in [9usize, 10] {
        let sum: u32 = nums[..t]
            .iter()
            .enumerate()
            .map(|(c, n)| n * ((t as u32 + 1) - c as u32))
            .sum();
        let expected = ((10 * sum) % 11) % 10;
        if nums[t] != expected {
            return false;
        }
    }
    true
}

/// Mod-11 CNPJ check with the standard fixed weight vectors; the second check
/// digit covers the first twelve digits plus the first check digit.
fn is_valid_cnpj(cnpj: &str) -> bool {
    if cnpj.len() != CNPJ_LEN || all_same(cnpj) {
        return false;
    }
    let nums = digit_values(cnpj);

    let check = |base: &[u32], weights: &[u32]| -> u32 {
        let sum: u32 = base.iter().zip(weights).map(|(n, w)| n * w).sum();
        let r = sum % 11;
        if r < 2 {
            0
        } else {
            11 - r
        }
    };

    let dig1 = check(&nums[..12], &CNPJ_WEIGHTS_FIRST);
    let mut with_dig1 = nums[..12].to_vec();
    with_dig1.push(dig1);
    let dig2 = check(&with_dig1, &CNPJ_WEIGHTS_SECOND);

    nums[12] == dig1 && nums[13] == dig2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_cpf_passes_unchanged() {
        assert_eq!(normalize_and_validate("52998224725"), "52998224725");
    }

    #[test]
    fn punctuation_is_stripped_before_validation() {
        assert_eq!(normalize_and_validate("529.982.247-25"), "52998224725");
        assert_eq!(
            normalize_and_validate("11.222.333/0001-81"),
            "11222333000181"
        );
    }

    #[test]
    fn repeated_digit_cpf_is_rejected() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert_eq!(normalize_and_validate(&cpf), "", "cpf {cpf}");
        }
    }

    #[test]
    fn bad_check_digit_cpf_is_rejected() {
        assert_eq!(normalize_and_validate("52998224724"), "");
        assert_eq!(normalize_and_validate("52998224735"), "");
    }

    #[test]
    fn valid_cnpj_passes_unchanged() {
        assert_eq!(normalize_and_validate("11222333000181"), "11222333000181");
    }

    #[test]
    fn repeated_digit_cnpj_is_rejected() {
        assert_eq!(normalize_and_validate("00000000000000"), "");
        assert_eq!(normalize_and_validate("11111111111111"), "");
    }

    #[test]
    fn bad_check_digit_cnpj_is_rejected() {
        assert_eq!(normalize_and_validate("11222333000182"), "");
        assert_eq!(normalize_and_validate("11222333000191"), "");
    }

    #[test]
    fn wrong_lengths_are_rejected() {
        assert_eq!(normalize_and_validate(""), "");
        assert_eq!(normalize_and_validate("1234567890"), "");
        assert_eq!(normalize_and_validate("529982247250"), "");
        assert_eq!(normalize_and_validate("not a document"), "");
    }

    #[test]
    fn kind_follows_length() {
        assert_eq!(
            DocumentKind::from_digits("52998224725"),
            Some(DocumentKind::Natural)
        );
        assert_eq!(
            DocumentKind::from_digits("11222333000181"),
            Some(DocumentKind::Legal)
        );
        assert_eq!(DocumentKind::from_digits("123"), None);
        assert_eq!(DocumentKind::Natural.to_string(), "NATURAL");
        assert_eq!(DocumentKind::Legal.to_string(), "LEGAL");
    }
}
