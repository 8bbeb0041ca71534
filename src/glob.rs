//! Channel pattern matching with PSUBSCRIBE semantics.
//!
//! `*` matches any run of bytes, `?` exactly one byte, `[abc]` / `[^abc]` /
//! `[a-z]` a byte class, and `\x` the literal `x`.

pub fn channel_matches(pattern: &str, channel: &str) -> bool {
    match_bytes(pattern.as_bytes(), channel.as_bytes())
}

/// Greedy match that remembers only the most recent `*`. On a mismatch the
/// star absorbs one more subject byte and matching resumes after it, so the
/// cost stays within `pattern.len() * subject.len()` steps.
fn match_bytes(pattern: &[u8], subject: &[u8]) -> bool {
    let mut pi = 0;
    let mut si = 0;
    let mut star: Option<(usize, usize)> = None;

    while si < subject.len() {
        if pattern.get(pi) == Some(&b'*') {
            star = Some((pi, si));
            pi += 1;
            continue;
        }
        if let Some(next) = consume(pattern, pi, subject[si]) {
            pi = next;
            si += 1;
            continue;
        }
        match star {
            Some((star_pi, star_si)) => {
                pi = star_pi + 1;
                si = star_si + 1;
                star = Some((star_pi, si));
            }
            None => return false,
        }
    }

    while pattern.get(pi) == Some(&b'*') {
        pi += 1;
    }
    pi == pattern.len()
}

/// Match one non-star pattern token at `pi` against `ch`. Returns the index
/// of the next token on success.
fn consume(pattern: &[u8], pi: usize, ch: u8) -> Option<usize> {
    let &token = pattern.get(pi)?;
    let rest = &pattern[pi + 1..];
    match token {
        b'?' => Some(pi + 1),
        b'[' => match class_matches(rest, ch) {
            Some((true, used)) => Some(pi + 1 + used),
            Some((false, _)) => None,
            // unterminated class: treat '[' literally
            None => (ch == b'[').then_some(pi + 1),
        },
        b'\\' if !rest.is_empty() => (rest[0] == ch).then_some(pi + 2),
        literal => (literal == ch).then_some(pi + 1),
    }
}

/// Evaluate a byte class body (after the `[`). Returns whether `ch` is in the
/// class and how many pattern bytes the class used, including the `]`.
fn class_matches(body: &[u8], ch: u8) -> Option<(bool, usize)> {
    let (negate, mut i) = match body.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };
    let mut hit = false;
    while i < body.len() && body[i] != b']' {
        if i + 2 < body.len() && body[i + 1] == b'-' && body[i + 2] != b']' {
            let (lo, hi) = (body[i].min(body[i + 2]), body[i].max(body[i + 2]));
            hit |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            hit |= body[i] == ch;
            i += 1;
        }
    }
    if i >= body.len() {
        return None;
    }
    Some((hit != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star() {
        assert!(channel_matches("*", "anything"));
        assert!(channel_matches("*", ""));
        assert!(channel_matches("news.*", "news.sport"));
        assert!(!channel_matches("news.*", "weather.today"));
    }

    #[test]
    fn test_question() {
        assert!(channel_matches("h?llo", "hello"));
        assert!(!channel_matches("h?llo", "hllo"));
    }

    #[test]
    fn test_class() {
        assert!(channel_matches("room:[ab]", "room:a"));
        assert!(!channel_matches("room:[ab]", "room:c"));
        assert!(channel_matches("room:[0-9]", "room:7"));
        assert!(channel_matches("room:[^0-9]", "room:x"));
        assert!(!channel_matches("room:[^0-9]", "room:7"));
    }

    #[test]
    fn test_escape_and_literal() {
        assert!(channel_matches(r"a\*b", "a*b"));
        assert!(!channel_matches(r"a\*b", "axb"));
        assert!(channel_matches("exact", "exact"));
        assert!(!channel_matches("exact", "exactly"));
    }

    #[test]
    fn test_unterminated_class_is_literal() {
        assert!(channel_matches("a[b", "a[b"));
    }

    #[test]
    fn test_multiple_stars() {
        assert!(channel_matches("user:*:*:name", "user:1:2:name"));
        assert!(channel_matches("*.*", "a.b.c"));
        assert!(!channel_matches("*.*.d", "a.b.c"));
        assert!(channel_matches("a*b*c", "aXbYbZc"));
        assert!(channel_matches("**", ""));
    }

    #[test]
    fn test_star_before_class_and_escape() {
        assert!(channel_matches("*[0-9]", "room42"));
        assert!(!channel_matches("*[0-9]", "room"));
        assert!(channel_matches(r"*\?", "why?"));
        assert!(!channel_matches(r"*\?", "why"));
    }

    #[test]
    fn test_many_stars_against_long_channel() {
        let channel = "a".repeat(4096);
        let start = std::time::Instant::now();
        assert!(!channel_matches("*a*a*a*a*a*a*a*a*a*a*a*a*b", &channel));
        assert!(channel_matches("*a*a*a*a*a*a*a*a*a*a*a*a*a", &channel));
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }
}
