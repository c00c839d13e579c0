//! Path wildcard matching
//!
//! `*` matches any run of characters (including `/`); everything else is
//! literal. Matching keeps at most one pending wildcard and never recurses.

/// Match `text` against a glob `pattern`.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();

    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is currently anchored at
    let mut pending: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            pending = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, anchor)) = pending {
            // Let the wildcard swallow one more character and retry
            p = star + 1;
            t = anchor + 1;
            pending = Some((star, anchor + 1));
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

/// Collapse runs of `*` into a single wildcard.
pub(crate) fn collapse_wildcards(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_star = false;
    for ch in path.chars() {
        if ch == '*' {
            if previous_star {
                continue;
            }
            previous_star = true;
        } else {
            previous_star = false;
        }
        out.push(ch);
    }
    out
}
