//! Scalar types of the Yama VM.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod fmt;
mod parse;

pub use fmt::{
    fmt_bool,
    fmt_char,
    fmt_char_ext,
    fmt_float,
    fmt_int,
    fmt_int_bin,
    fmt_int_dec,
    fmt_int_hex,
    fmt_uint,
    fmt_uint_bin,
    fmt_uint_dec,
    fmt_uint_hex,
    CharFmt,
    IntFmt,
};
pub use parse::{
    parse_bool,
    parse_char,
    parse_float,
    parse_int,
    parse_uint,
    Parsed,
};

/// Signed 64-bit integer scalar.
pub type Int = i64;

/// Unsigned 64-bit integer scalar.
pub type UInt = u64;

/// IEEE-754 64-bit floating-point scalar.
pub type Float = f64;

/// Boolean scalar.
pub type Bool = bool;

/// 32-bit character scalar.
///
/// Covers the full Unicode scalar range, and additionally tolerates UTF-16
/// surrogate values and bit patterns beyond U+10FFFF as opaque payloads.
/// Only the literal parser rejects those (see [`parse_char`]).
pub type Char = u32;

/// First code point after the Unicode codespace.
pub const UNICODE_END: Char = 0x110000;

/// Returns whether `c` is a UTF-16 surrogate code point.
pub const fn is_surrogate(c: Char) -> bool {
    c >= 0xd800 && c <= 0xdfff
}

/// Returns whether `c` is a legal Unicode scalar value.
pub const fn is_unicode_scalar(c: Char) -> bool {
    c < UNICODE_END && !is_surrogate(c)
}
