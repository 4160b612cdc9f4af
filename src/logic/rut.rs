// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Fichapack Authors

//! Codec for the RUT, the Chilean national identity number.
//!
//! A RUT is a body of 1-8 digits plus one trailing check character
//! (a digit or `K`) derived from the body via a weighted modulo-11
//! checksum. The canonical form is the unpunctuated, uppercased
//! concatenation of body and check character and doubles as the
//! storage key; the display form groups the body in triples
//! (`12.345.678-5`).

/// Strip grouping dots and the check-character dash, uppercasing letters.
///
/// Total over arbitrary input; performs no digit-count validation.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '.' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Compute the check character for an all-digit body.
///
/// Digits are walked right-to-left and multiplied by a cyclic weight
/// sequence 2, 3, 4, 5, 6, 7, 2, ...; the result is `11 - (sum % 11)`
/// mapped as 11 → `0`, 10 → `K`, otherwise the decimal digit itself.
/// The caller guarantees `body` contains only ASCII digits.
pub fn compute_check_digit(body: &str) -> char {
    let mut sum: u32 = 0;
    let mut weight: u32 = 2;
    for ch in body.chars().rev() {
        sum += ch.to_digit(10).unwrap_or(0) * weight;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }
    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        digit => char::from_digit(digit, 10).unwrap_or('0'),
    }
}

/// Whether `raw` is a structurally well-formed RUT with a correct
/// check character. Fails closed: malformed input returns `false`,
/// never panics.
pub fn is_valid(raw: &str) -> bool {
    let cleaned = clean(raw);
    let chars: Vec<char> = cleaned.chars().collect();
    // Shape: 1-8 digits followed by one digit-or-K.
    if chars.len() < 2 || chars.len() > 9 {
        return false;
    }
    let (body, check) = chars.split_at(chars.len() - 1);
    if !body.iter().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let check = check[0];
    if !check.is_ascii_digit() && check != 'K' {
        return false;
    }
    let body: String = body.iter().collect();
    compute_check_digit(&body) == check
}

/// Render a RUT in display form: body grouped in right-aligned triples
/// separated by `.`, joined to the check character by `-`.
///
/// Inputs of length ≤ 1 after cleaning are returned unchanged, so the
/// function is safe to re-apply on every keystroke of a partially
/// typed number, and `format(format(x)) == format(x)`.
pub fn format(raw: &str) -> String {
    let chars: Vec<char> = clean(raw).chars().collect();
    if chars.len() <= 1 {
        return chars.into_iter().collect();
    }

    let (body, check) = chars.split_at(chars.len() - 1);
    let mut out = String::with_capacity(chars.len() + body.len() / 3 + 1);
    for (i, ch) in body.iter().enumerate() {
        if i > 0 && (body.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(*ch);
    }
    out.push('-');
    out.push(check[0]);
    out
}
