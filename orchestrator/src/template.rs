//! `{placeholder}` handling for instruction templates
//!
//! Only identifiers (`[A-Za-z_][A-Za-z0-9_]*`) in single braces count as
//! placeholders, so JSON examples inside a prompt are left alone.

use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex"));

/// Placeholder names in order of first appearance, without duplicates
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Fill every placeholder using `lookup`
///
/// Returns the name of the first placeholder `lookup` cannot resolve.
pub fn render<F>(template: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = lookup(name).ok_or_else(|| name.to_string())?;

        output.push_str(&template[last..whole.start()]);
        output.push_str(&value);
        last = whole.end();
    }
    output.push_str(&template[last..]);

    Ok(output)
}
