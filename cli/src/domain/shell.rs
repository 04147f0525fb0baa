//! POSIX shell quoting for command strings sent to a target shell.

/// Quote `value` so a POSIX shell reads it back as one literal word.
#[must_use]
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-:@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
