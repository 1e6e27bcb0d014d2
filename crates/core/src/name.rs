use crate::error::ValidationError;

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Reduce a user-supplied filename to its final path component.
///
/// Trailing separators are ignored. Names that are empty after reduction, or
/// that are `.` or `..`, are rejected.
pub fn sanitize_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_end_matches(is_separator);
    let base = trimmed
        .rsplit(is_separator)
        .next()
        .unwrap_or_default()
        .trim();

    match base {
        "" => Err(ValidationError::InvalidName("name must not be empty".into())),
        "." | ".." => Err(ValidationError::InvalidName(format!(
            "{base:?} is not a file name"
        ))),
        _ => Ok(base.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(sanitize_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_name("  cat.png ").unwrap(), "cat.png");
    }

    #[test]
    fn strips_directories() {
        assert_eq!(sanitize_name("/etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_name("../../secret.txt").unwrap(), "secret.txt");
        assert_eq!(sanitize_name("C:\\Users\\me\\photo.jpg").unwrap(), "photo.jpg");
        assert_eq!(sanitize_name("dir/sub/").unwrap(), "sub");
    }

    #[test]
    fn rejects_empty_and_dot_names() {
        for raw in ["", "   ", "/", "//", ".", "..", "a/..", "x/./"] {
            assert!(sanitize_name(raw).is_err(), "{raw:?} should be rejected");
        }
    }
}
