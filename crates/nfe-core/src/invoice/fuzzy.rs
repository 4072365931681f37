//! Substring-tolerant label similarity.

/// Best-alignment similarity between the shorter string and any substring of
/// the longer one, on a 0-100 scale.
///
/// Computed as `100 * (1 - d / len)`, where `d` is the smallest edit distance
/// between the shorter string (`len` characters) and a substring of the
/// longer one. An exact substring scores 100; an empty input scores 0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return 0.0;
    }

    let distance = substring_distance(short, long);
    100.0 * (1.0 - distance as f64 / short.len() as f64)
}

/// Semi-global edit distance: free start and end positions in `text`.
fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    // prev[j]: distance of pattern[..i] against the best substring ending at text[j - 1]
    let mut prev = vec![0usize; text.len() + 1];
    let mut curr = vec![0usize; text.len() + 1];

    for (i, &pc) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &tc) in text.iter().enumerate() {
            let substitute = prev[j] + usize::from(pc != tc);
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            curr[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev.into_iter().min().unwrap_or(pattern.len())
}
