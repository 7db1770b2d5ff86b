//! Filename validation and cleaning.
//! Keeps rendered output names portable across filesystems, including the
//! reserved characters and device names Windows refuses.

use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

/// Characters that are never allowed inside a single path segment.
const RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)[<>:"/\\|?*\x00-\x1F]|^(?:CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])(?:\..+)?$|[ .]$"#,
    )
    .expect("filename pattern is valid")
});

fn is_forbidden_char(c: char) -> bool {
    RESERVED_CHARS.contains(&c) || c <= '\u{1F}'
}

/// Returns true if `name` can be used as a single file or directory name.
///
/// A name is rejected when it contains a reserved character (`<>:"/\|?*`),
/// a control character, is a reserved device name such as `CON` or
/// `lpt1.txt`, or ends in a space or a period.
pub fn is_valid_name(name: &str) -> bool {
    !FORBIDDEN.is_match(name)
}

/// Returns true if every segment of a rendered output path is a valid name.
///
/// Root, prefix, `.` and `..` components are left to the operator; the
/// remaining segments must each pass [`is_valid_name`]. Empty paths are
/// rejected.
pub fn is_valid_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    Path::new(path).components().all(|component| match component {
        Component::Normal(segment) => segment.to_str().is_some_and(is_valid_name),
        _ => true,
    })
}

/// Cleans `name` for use as a filename.
///
/// `": "` becomes `" - "` unless the colon already follows a space, so
/// `"Game: Subtitle"` reads `"Game - Subtitle"`. Reserved and control
/// characters are then removed and surrounding whitespace trimmed.
///
/// The result is not guaranteed to satisfy [`is_valid_name`]: trailing
/// periods and device names pass through unchanged.
pub fn sanitize(name: &str) -> String {
    let mut expanded = String::with_capacity(name.len() + 8);
    let mut previous: Option<char> = None;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&' ') && previous != Some(' ') {
            chars.next();
            expanded.push_str(" - ");
            previous = Some(' ');
            continue;
        }
        expanded.push(c);
        previous = Some(c);
    }

    expanded
        .chars()
        .filter(|c| !is_forbidden_char(*c))
        .collect::<String>()
        .trim()
        .to_string()
}
