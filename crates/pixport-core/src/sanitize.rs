//! Filename sanitizing shared by every destination.
//!
//! The same policy runs wherever a name reaches a filesystem write, an
//! archive entry, or a download attribute, so all of them agree on what
//! a valid name looks like.

/// Default maximum name length, in UTF-16 code units.
pub const DEFAULT_MAX_LEN: usize = 128;

/// Name used when the input is empty or sanitizes to nothing.
pub const FALLBACK_NAME: &str = "image";

/// Characters that are invalid in a filename on at least one platform.
const FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Normalize `name` into a filesystem- and archive-safe filename.
///
/// Steps, in order:
///
/// 1. Replace each run of `\ / : * ? " < > |` with a single `_`.
/// 2. Trim surrounding whitespace and collapse internal whitespace runs
///    to one space.
/// 3. Fall back to `"image"` if nothing is left.
/// 4. Cut to `max_len` UTF-16 code units (a hard cut, not word-aware),
///    never splitting a surrogate pair, then trim whitespace exposed by
///    the cut.
///
/// The result is never empty (`max_len` of 0 behaves as 1), and the
/// function is idempotent: `sanitize(&sanitize(x, n), n) == sanitize(x, n)`.
///
/// # Examples
///
/// ```
/// use pixport_core::sanitize::sanitize;
///
/// assert_eq!(sanitize("  my:render  v2?.png ", 128), "my_render v2_.png");
/// assert_eq!(sanitize("", 128), "image");
/// ```
#[must_use]
pub fn sanitize(name: &str, max_len: usize) -> String {
    let mut replaced = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if FORBIDDEN.contains(&c) {
            if !in_run {
                replaced.push('_');
            }
            in_run = true;
        } else {
            replaced.push(c);
            in_run = false;
        }
    }
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = if collapsed.is_empty() {
        FALLBACK_NAME
    } else {
        collapsed.as_str()
    };

    let max_len = max_len.max(1);
    let cut = truncate_utf16(name, max_len).trim_end();
    if cut.is_empty() {
        // Only reachable when the first character alone is wider than
        // `max_len` (an astral character with `max_len == 1`).
        return truncate_utf16(FALLBACK_NAME, max_len).to_owned();
    }
    cut.to_owned()
}

/// Longest prefix of `s` that fits in `max_units` UTF-16 code units.
fn truncate_utf16(s: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (index, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return &s[..index];
        }
    }
    s
}
