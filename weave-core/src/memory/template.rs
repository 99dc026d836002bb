//! Slugs, template rendering and frontmatter for memory entries

use crate::workflow::render_with;

/// Template used when the memory directory carries none
pub const FALLBACK_TEMPLATE: &str = "# Agent Memory Entry\n\n\
- **Date:** {{DATE}}\n\
- **Topic:** {{TOPIC}}\n\
- **Topics/Tags:** {{TAGS}}\n\
- **Source:** {{SOURCE}}\n\n\
## Context\n\n## Key Insights\n\n## Decisions / Rules\n\n## References\n\n## Next Actions\n\n";

/// Lowercase `text` and collapse every run of non-alphanumerics into one `-`
///
/// Only ASCII letters and digits survive; leading and trailing separators are
/// dropped, so punctuation-only input yields an empty slug.
pub fn kebab_case(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Fill the `{{DATE}}`, `{{TOPIC}}`, `{{TAGS}}` and `{{SOURCE}}` tokens
pub fn render(template: &str, date: &str, topic: &str, tags: &[String], source: &str) -> String {
    let tags = tags.join(", ");
    render_with(template, |key| match key {
        "DATE" => Some(date),
        "TOPIC" => Some(topic),
        "TAGS" => Some(tags.as_str()),
        "SOURCE" => Some(source),
        _ => None,
    })
}

/// YAML frontmatter block, terminated by a newline
pub fn frontmatter(agent: &str, date: &str, topic: &str, tags: &[String], source: &str) -> String {
    let tags = if tags.is_empty() {
        "[]".to_string()
    } else {
        let quoted: Vec<String> = tags.iter().map(|t| format!("'{}'", t)).collect();
        format!("[{}]", quoted.join(", "))
    };

    [
        "---".to_string(),
        format!("agent: {}", agent),
        format!("date: {}", date),
        format!("topic: {}", topic),
        format!("tags: {}", tags),
        format!("source: {}", source),
        "---".to_string(),
        String::new(),
    ]
    .join("\n")
}
