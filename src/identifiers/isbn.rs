//! ISBN-10 / ISBN-13 checksum validation.
//!
//! Valid ISBNs are normalized to their ISBN-13 form so that the same book
//! listed once as ISBN-10 and once as ISBN-13 compares equal.

/// The bare ISBN characters of `input`.
///
/// A leading `ISBN`, `ISBN-10:` or `ISBN-13:` label is dropped, and reading
/// stops at the first character that cannot belong to an ISBN, so trailing
/// notes such as `(pbk.)` are ignored.
fn strip(input: &str) -> String {
    let input = input.trim_start();
    let rest = match input.get(..4) {
        Some(label) if label.eq_ignore_ascii_case("isbn") => &input[4..],
        _ => input,
    };
    let rest = rest
        .strip_prefix("-13")
        .or_else(|| rest.strip_prefix("-10"))
        .unwrap_or(rest)
        .trim_start_matches(|c: char| c == ':' || c.is_whitespace());

    rest.chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | ' ' | 'X' | 'x'))
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn isbn10_digits(stripped: &str) -> Option<Vec<u32>> {
    let mut digits = Vec::with_capacity(10);
    for (i, c) in stripped.chars().enumerate() {
        match c {
            'X' if i == 9 => digits.push(10),
            c => digits.push(c.to_digit(10)?),
        }
    }
    Some(digits)
}

fn isbn13_check(first12: &[u32]) -> u32 {
    let sum: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

/// Validate an ISBN and return it as a bare ISBN-13 string.
///
/// Hyphens and spaces are ignored. Returns `None` when the length or the
/// check digit is wrong.
pub fn normalize(input: &str) -> Option<String> {
    let stripped = strip(input);

    match stripped.len() {
        10 => {
            let digits = isbn10_digits(&stripped)?;
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| (10 - i as u32) * d)
                .sum();
            if sum % 11 != 0 {
                return None;
            }

            let mut d13 = vec![9, 7, 8];
            d13.extend_from_slice(&digits[..9]);
            let check = isbn13_check(&d13);
            d13.push(check);
            Some(d13.iter().map(|d| d.to_string()).collect())
        }
        13 => {
            let digits = stripped
                .chars()
                .map(|c| c.to_digit(10))
                .collect::<Option<Vec<u32>>>()?;
            if isbn13_check(&digits[..12]) != digits[12] {
                return None;
            }
            Some(stripped)
        }
        _ => None,
    }
}

/// Whether `input` is a checksum-valid ISBN-10 or ISBN-13.
pub fn is_valid(input: &str) -> bool {
    normalize(input).is_some()
}
