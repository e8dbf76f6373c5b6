/// Replace every non-alphanumeric character with `_`, per the snapshot
/// filesystem layout's host/page slug rule (spec §3).
pub fn slugify(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
