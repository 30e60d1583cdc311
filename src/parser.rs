//! JSON extraction from free-form model output.
//!
//! Vision models answer with prose wrapped around a JSON object, and some
//! of them leak literal `\n` escape sequences between JSON tokens. Those
//! sequences are valid inside string values but break a strict parser
//! anywhere else. [`extract_json`] cuts the object out of the prose and
//! repairs the structural ones in a single quote-aware pass.

/// Extract and clean the JSON object embedded in `raw`.
///
/// 1. Take the span from the first `{` to the last `}`. Without such a
///    span the input is returned unchanged so the caller's parser fails
///    loudly instead of on a guess.
/// 2. Walk the span once, tracking whether we are inside a string literal
///    and whether the previous character was an unconsumed escape.
/// 3. Outside strings, a literal `\` `n` pair becomes a single space.
///    Inside strings every escape is kept verbatim.
/// 4. A whitespace run containing such a substitution that sits directly
///    before `,`, `{` or `:` collapses to one space.
/// 5. Trim.
///
/// Runs in O(n) with no backtracking and is idempotent on its own output.
pub fn extract_json(raw: &str) -> String {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => return raw.to_string(),
    };
    let candidate = &raw[start..=end];

    let mut out = String::with_capacity(candidate.len());
    let mut in_string = false;
    let mut escaped = false;
    // Byte offset in `out` where the current structural whitespace run began.
    let mut run_start: Option<usize> = None;
    let mut run_substituted = false;

    let mut chars = candidate.chars().peekable();
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '\\' && chars.peek() == Some(&'n') {
            chars.next();
            run_start.get_or_insert(out.len());
            run_substituted = true;
            out.push(' ');
            continue;
        }

        if c.is_whitespace() {
            run_start.get_or_insert(out.len());
            out.push(c);
            continue;
        }

        if let Some(run) = run_start.take() {
            if run_substituted && matches!(c, ',' | '{' | ':') {
                out.truncate(run);
                out.push(' ');
            }
            run_substituted = false;
        }

        if c == '"' {
            in_string = true;
        }
        out.push(c);
    }

    out.trim().to_string()
}
