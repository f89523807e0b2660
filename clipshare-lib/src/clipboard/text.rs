//! Line-ending normalisation between the wire and the platform clipboard.

/// Normalise line endings in `text`.
///
/// With `force_lf` set the result always uses LF; this is the outgoing
/// direction, where the wire carries LF regardless of platform. Without it
/// the platform convention applies: LF everywhere except Windows, which gets
/// CRLF. This is the incoming direction, used before text reaches the
/// clipboard or disk.
///
/// CRLF pairs collapse to LF first; a lone CR is preserved as-is.
pub fn convert_eol(text: &str, force_lf: bool) -> String {
    let lf = to_lf(text);
    if force_lf || !cfg!(windows) {
        return lf;
    }
    to_crlf(&lf)
}

fn to_lf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' && chars.peek() == Some(&'\n') {
            continue;
        }
        out.push(c);
    }
    out
}

fn to_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    for c in text.chars() {
        if c == '\n' {
            out.push('\r');
        }
        out.push(c);
    }
    out
}
