//! Literal formatting for the Yama scalar types.

use crate::{Bool, Char, Float, Int, UInt, UNICODE_END};

/// Radix selector for integer formatting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntFmt {
    /// Plain decimal digits.
    #[default]
    Dec,
    /// `0x`-prefixed hexadecimal digits.
    Hex,
    /// `0b`-prefixed binary digits.
    Bin,
}

/// Options for [`fmt_char_ext`].
///
/// The default escapes quotes and backslashes and renders hex digits in
/// lowercase, matching what [`fmt_char`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharFmt {
    /// Render hex escape digits in uppercase.
    pub uppercase_hex: bool,
    /// Escape `'` as `\'`.
    pub escape_single_quote: bool,
    /// Escape `"` as `\"`.
    pub escape_double_quote: bool,
    /// Escape `\` as `\\`.
    pub escape_backslash: bool,
}

impl Default for CharFmt {
    fn default() -> Self {
        Self {
            uppercase_hex: false,
            escape_single_quote: true,
            escape_double_quote: true,
            escape_backslash: true,
        }
    }
}

fn digits(mag: u64, fmt: IntFmt, uppercase_hex: bool) -> String {
    match fmt {
        IntFmt::Dec => format!("{mag}"),
        IntFmt::Hex if uppercase_hex => format!("0x{mag:X}"),
        IntFmt::Hex => format!("0x{mag:x}"),
        IntFmt::Bin => format!("0b{mag:b}"),
    }
}

/// Formats an [`Int`] in the given radix.
///
/// Negative values carry a leading `-` before the radix prefix, e.g. `-0x1`.
pub fn fmt_int(x: Int, fmt: IntFmt, uppercase_hex: bool) -> String {
    if x < 0 {
        format!("-{}", digits(x.unsigned_abs(), fmt, uppercase_hex))
    } else {
        digits(x as u64, fmt, uppercase_hex)
    }
}

/// Formats an [`Int`] in decimal.
pub fn fmt_int_dec(x: Int) -> String {
    fmt_int(x, IntFmt::Dec, false)
}

/// Formats an [`Int`] in `0x`-prefixed hexadecimal.
pub fn fmt_int_hex(x: Int, uppercase: bool) -> String {
    fmt_int(x, IntFmt::Hex, uppercase)
}

/// Formats an [`Int`] in `0b`-prefixed binary.
pub fn fmt_int_bin(x: Int) -> String {
    fmt_int(x, IntFmt::Bin, false)
}

/// Formats a [`UInt`] in the given radix, with the trailing `u` marker.
pub fn fmt_uint(x: UInt, fmt: IntFmt, uppercase_hex: bool) -> String {
    format!("{}u", digits(x, fmt, uppercase_hex))
}

/// Formats a [`UInt`] in decimal, with the trailing `u` marker.
pub fn fmt_uint_dec(x: UInt) -> String {
    fmt_uint(x, IntFmt::Dec, false)
}

/// Formats a [`UInt`] in `0x`-prefixed hexadecimal, with the trailing `u` marker.
pub fn fmt_uint_hex(x: UInt, uppercase: bool) -> String {
    fmt_uint(x, IntFmt::Hex, uppercase)
}

/// Formats a [`UInt`] in `0b`-prefixed binary, with the trailing `u` marker.
pub fn fmt_uint_bin(x: UInt) -> String {
    fmt_uint(x, IntFmt::Bin, false)
}

/// Formats a [`Float`] as a literal the float parser accepts.
///
/// Finite values use the shortest decimal rendering that round-trips;
/// non-finite values use the `inf` / `-inf` / `nan` keywords.
pub fn fmt_float(x: Float) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        if x < 0.0 { "-inf".to_string() } else { "inf".to_string() }
    } else {
        format!("{x}")
    }
}

/// Formats a [`Bool`] as `true` or `false`.
pub fn fmt_bool(x: Bool) -> String {
    if x { "true" } else { "false" }.to_string()
}

/// Formats a [`Char`] with the default options; see [`fmt_char_ext`].
pub fn fmt_char(c: Char) -> String {
    fmt_char_ext(c, CharFmt::default())
}

/// Formats a [`Char`] as a character-literal body.
///
/// Characters from the standard escape set render as their escape sequence,
/// printable ASCII renders verbatim, and everything else renders as the
/// shortest of `\xHH` / `\uHHHH` / `\UHHHHHHHH` that fits. Bit patterns
/// outside the Unicode codespace render as `?`.
pub fn fmt_char_ext(c: Char, opts: CharFmt) -> String {
    match c {
        0x00 => "\\0".to_string(),
        0x07 => "\\a".to_string(),
        0x08 => "\\b".to_string(),
        0x0c => "\\f".to_string(),
        0x0a => "\\n".to_string(),
        0x0d => "\\r".to_string(),
        0x09 => "\\t".to_string(),
        0x0b => "\\v".to_string(),
        0x27 if opts.escape_single_quote => "\\'".to_string(),
        0x27 => "'".to_string(),
        0x22 if opts.escape_double_quote => "\\\"".to_string(),
        0x22 => "\"".to_string(),
        0x5c if opts.escape_backslash => "\\\\".to_string(),
        0x5c => "\\".to_string(),
        0x21..=0x7e => char::from_u32(c).map(String::from).unwrap_or_default(),
        _ if c < 0x100 && opts.uppercase_hex => format!("\\x{c:02X}"),
        _ if c < 0x100 => format!("\\x{c:02x}"),
        _ if c < 0x10000 && opts.uppercase_hex => format!("\\u{c:04X}"),
        _ if c < 0x10000 => format!("\\u{c:04x}"),
        _ if c < UNICODE_END && opts.uppercase_hex => format!("\\U{c:08X}"),
        _ if c < UNICODE_END => format!("\\U{c:08x}"),
        _ => "?".to_string(),
    }
}
