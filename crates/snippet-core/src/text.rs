pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Leading spaces and tabs of a line.
pub(crate) fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, ch)| *ch != ' ' && *ch != '\t')
        .map_or(line.len(), |(idx, _)| idx);
    &line[..end]
}

/// Character lengths of the longest common prefix and, of what remains, the longest common
/// suffix of `a` and `b`.
pub(crate) fn common_affixes(a: &str, b: &str) -> (usize, usize) {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    (prefix, suffix)
}

/// Substring by char range.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
