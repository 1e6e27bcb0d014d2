/// Split a comma-separated tag list, trimming whitespace around each tag and
/// dropping empty entries. Order is preserved.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
