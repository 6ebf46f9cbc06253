//! Qualified-name grammar: `head ':' (owner '::')? name`.

/// A split qualified name. Borrowed segments of the input; `unqualified` is
/// the whole `(owner '::')? name` tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SplitQName<'a> {
    pub head: &'a str,
    pub owner: Option<&'a str>,
    pub name: &'a str,
    pub unqualified: &'a str,
}

pub(crate) fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => (),
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits an unqualified name into its optional owner prefix and base name,
/// validating both as identifier tokens.
pub(crate) fn split_unqualified(s: &str) -> Option<(Option<&str>, &str)> {
    match s.split_once("::") {
        Some((owner, name)) if is_ident(owner) && is_ident(name) => Some((Some(owner), name)),
        Some(_) => None,
        None if is_ident(s) => Some((None, s)),
        None => None,
    }
}

/// Splits a qualified name into head, optional owner, base name and the
/// whole unqualified tail, validating every segment.
pub(crate) fn split_qualified(s: &str) -> Option<SplitQName<'_>> {
    let (head, tail) = s.split_once(':')?;
    if !is_ident(head) {
        return None;
    }
    // Guard against `a::b` tails bleeding into the head split: the head
    // separator is a single `:` and the tail may itself contain `::`.
    if tail.starts_with(':') {
        return None;
    }
    let (owner, name) = split_unqualified(tail)?;
    Some(SplitQName {
        head,
        owner,
        name,
        unqualified: tail,
    })
}
