/// Split `text` on every occurrence of any of `delimiters`.
///
/// Empty fragments are kept so that positional callers can decide
/// what to do with runs of delimiters.
pub fn split_many<'a>(text: &'a str, delimiters: &[char]) -> Vec<&'a str> {
    text.split(|c: char| delimiters.contains(&c)).collect()
}
