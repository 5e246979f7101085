/// Split raw extracted text into trimmed, non-empty lines in original order.
///
/// Always succeeds; fully blank input yields an empty iterator. The iterator
/// borrows the input, so callers can walk the same text any number of times.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}
