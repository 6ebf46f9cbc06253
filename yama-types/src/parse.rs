//! Literal parsing for the Yama scalar types.
//!
//! Each parser consumes the longest valid literal prefix of its input and
//! reports how many bytes it consumed, so tokenisers can resume after the
//! literal. A malformed digit separator anywhere in the literal fails the
//! whole parse rather than truncating it.

use crate::{is_surrogate, Bool, Char, Float, Int, UInt, UNICODE_END};

/// A successfully parsed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parsed<T> {
    /// The parsed value. Unspecified if `overflow` or `underflow` is set.
    pub v: T,
    /// Bytes of input consumed.
    pub bytes: usize,
    /// The literal exceeded the type's maximum.
    pub overflow: bool,
    /// The literal exceeded the type's minimum.
    pub underflow: bool,
}

impl<T> Parsed<T> {
    fn new(v: T, bytes: usize) -> Self {
        Self {
            v,
            bytes,
            overflow: false,
            underflow: false,
        }
    }
}

/// Scans a run of digits with `_` separators.
///
/// `Ok(None)` means no run starts here; `Err(())` means a separator leads,
/// trails, doubles, or touches a non-digit, which poisons the whole literal.
fn scan_digits(s: &[u8], radix: u32) -> Result<Option<(Vec<u8>, usize)>, ()> {
    let is_digit = |b: u8| (b as char).is_digit(radix);
    match s.first() {
        Some(b'_') => return Err(()),
        Some(&b) if is_digit(b) => (),
        _ => return Ok(None),
    }
    let mut digits = Vec::new();
    let mut i = 0;
    while i < s.len() {
        let b = s[i];
        if is_digit(b) {
            digits.push(b);
            i += 1;
        } else if b == b'_' {
            match s.get(i + 1) {
                Some(&next) if is_digit(next) => i += 1,
                _ => return Err(()),
            }
        } else {
            break;
        }
    }
    Ok(Some((digits, i)))
}

fn accumulate(digits: &[u8], radix: u32) -> u128 {
    digits.iter().fold(0u128, |acc, &b| {
        let d = (b as char).to_digit(radix).unwrap_or(0) as u128;
        acc.saturating_mul(radix as u128).saturating_add(d)
    })
}

/// Scans an optional `0x`/`0b` radix prefix plus its digit run.
///
/// Returns `(magnitude, bytes)` on success.
fn scan_integer(s: &[u8]) -> Option<(u128, usize)> {
    let (radix, prefix) = match s {
        [b'0', b'x', ..] => (16, 2),
        [b'0', b'b', ..] => (2, 2),
        _ => (10, 0),
    };
    match scan_digits(&s[prefix..], radix) {
        Ok(Some((digits, len))) => Some((accumulate(&digits, radix), prefix + len)),
        // A bare `0x`/`0b` prefix is not salvageable as a decimal `0`.
        _ => None,
    }
}

/// Parses an [`Int`] literal: decimal, `0x` hex, or `0b` binary digits with
/// optional `_` separators and an optional leading `-`.
///
/// Out-of-range literals still report their consumed length, with the
/// `overflow`/`underflow` flag set and an unspecified value.
pub fn parse_int(s: &str) -> Option<Parsed<Int>> {
    let b = s.as_bytes();
    let negative = b.first() == Some(&b'-');
    let sign = usize::from(negative);
    let (mag, len) = scan_integer(&b[sign..])?;
    let mut parsed = Parsed::new(0, sign + len);
    if negative {
        if mag > Int::MAX as u128 + 1 {
            parsed.underflow = true;
        } else {
            parsed.v = (mag as i128).wrapping_neg() as Int;
        }
    } else if mag > Int::MAX as u128 {
        parsed.overflow = true;
    } else {
        parsed.v = mag as Int;
    }
    Some(parsed)
}

/// Parses a [`UInt`] literal.
///
/// With `expect_u` the trailing `u` marker is mandatory and consumed; without
/// it the marker is neither required nor consumed.
pub fn parse_uint(s: &str, expect_u: bool) -> Option<Parsed<UInt>> {
    let b = s.as_bytes();
    let (mag, mut len) = scan_integer(b)?;
    if expect_u {
        if b.get(len) != Some(&b'u') {
            return None;
        }
        len += 1;
    }
    let mut parsed = Parsed::new(0, len);
    if mag > UInt::MAX as u128 {
        parsed.overflow = true;
    } else {
        parsed.v = mag as UInt;
    }
    Some(parsed)
}

/// Parses a [`Float`] literal: optional `-`, then decimal digits with an
/// optional fraction and exponent, or the `inf` / `nan` keywords.
///
/// Values beyond IEEE-754 double range saturate to the signed infinity with
/// the matching `overflow`/`underflow` flag; values too small for a subnormal
/// round to zero with no flag.
pub fn parse_float(s: &str) -> Option<Parsed<Float>> {
    let b = s.as_bytes();
    let negative = b.first() == Some(&b'-');
    let sign = usize::from(negative);
    let body = &b[sign..];

    if body.starts_with(b"inf") {
        let v = if negative { Float::NEG_INFINITY } else { Float::INFINITY };
        return Some(Parsed::new(v, sign + 3));
    }
    if body.starts_with(b"nan") {
        return Some(Parsed::new(Float::NAN, sign + 3));
    }

    let mut i = 0;
    let int_digits = match scan_digits(body, 10) {
        Err(()) => return None,
        Ok(Some((digits, len))) => {
            i += len;
            digits
        }
        Ok(None) => Vec::new(),
    };
    let mut frac_digits = Vec::new();
    if body.get(i) == Some(&b'.') {
        // A lone `.` is only a literal if digits surround it somewhere.
        i += 1;
        match scan_digits(&body[i..], 10) {
            Err(()) => return None,
            Ok(Some((digits, len))) => {
                i += len;
                frac_digits = digits;
            }
            Ok(None) => (),
        }
    }
    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    let mut exp_sign = b'+';
    let mut exp_digits = Vec::new();
    if body.get(i) == Some(&b'e') {
        let mut j = i + 1;
        if let Some(&sgn) = body.get(j) {
            if sgn == b'+' || sgn == b'-' {
                exp_sign = sgn;
                j += 1;
            }
        }
        match scan_digits(&body[j..], 10) {
            Ok(Some((digits, len))) => {
                i = j + len;
                exp_digits = digits;
            }
            _ => return None,
        }
    }

    // Reassemble without separators and let the IEEE-754 parser do the
    // rounding; it saturates to the infinities and to zero at the extremes.
    let text = format!(
        "{}{}.{}e{}{}",
        if negative { "-" } else { "" },
        String::from_utf8(int_digits).ok()?,
        if frac_digits.is_empty() {
            "0".to_string()
        } else {
            String::from_utf8(frac_digits).ok()?
        },
        exp_sign as char,
        if exp_digits.is_empty() {
            "0".to_string()
        } else {
            String::from_utf8(exp_digits).ok()?
        },
    );
    let v: Float = text.parse().ok()?;
    let mut parsed = Parsed::new(v, sign + i);
    parsed.overflow = v == Float::INFINITY;
    parsed.underflow = v == Float::NEG_INFINITY;
    Some(parsed)
}

/// Parses a [`Bool`] literal: the keywords `true` or `false`.
pub fn parse_bool(s: &str) -> Option<Parsed<Bool>> {
    if s.starts_with("true") {
        Some(Parsed::new(true, 4))
    } else if s.starts_with("false") {
        Some(Parsed::new(false, 5))
    } else {
        None
    }
}

fn hex_value(s: &[u8]) -> Option<Char> {
    s.iter().try_fold(0, |acc: Char, &b| {
        let d = (b as char).to_digit(16)?;
        Some(acc << 4 | d)
    })
}

/// Parses a [`Char`] literal body: a plain character, one of the escapes
/// `\0 \a \b \f \n \r \t \v \' \" \\`, or a `\xHH` / `\uHHHH` / `\UHHHHHHHH`
/// hex escape. A backslash before anything else literalises that character;
/// so does a hex escape with malformed digits (yielding the `x`/`u`/`U`).
///
/// UTF-16 surrogates and code points outside the Unicode codespace are
/// rejected here even though [`Char`] itself can hold them.
pub fn parse_char(s: &str) -> Option<Parsed<Char>> {
    let mut chars = s.chars();
    let first = chars.next()?;
    let (v, bytes) = if first != '\\' {
        (first as Char, first.len_utf8())
    } else {
        let escaped = chars.next()?;
        let simple = match escaped {
            '0' => Some(0x00),
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(0x0a),
            'r' => Some(0x0d),
            't' => Some(0x09),
            'v' => Some(0x0b),
            '\'' | '"' | '\\' => Some(escaped as Char),
            _ => None,
        };
        let hex_len = match escaped {
            'x' => Some(2),
            'u' => Some(4),
            'U' => Some(8),
            _ => None,
        };
        if let Some(v) = simple {
            (v, 2)
        } else if let Some(v) = hex_len.and_then(|n| hex_value(s.as_bytes().get(2..2 + n)?)) {
            (v, 2 + hex_len.unwrap_or(0))
        } else {
            // Unknown or malformed escape: the escaped character itself.
            (escaped as Char, 1 + escaped.len_utf8())
        }
    };
    if is_surrogate(v) || v >= UNICODE_END {
        return None;
    }
    Some(Parsed::new(v, bytes))
}
