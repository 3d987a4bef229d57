//! Small SQL text helpers shared by the engine adapters.

/// Quote `name` as an identifier with `quote`, doubling embedded quote characters.
///
/// Savepoint names are caller supplied and cannot be bound as parameters.
#[must_use]
pub fn quote_identifier(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for ch in name.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}
