// src/utils/html.rs

/// Sanitizes user-authored rich text before it is stored.
///
/// Whitelist based: formatting tags such as `<b>` or `<p>` survive, while
/// `<script>`/`<iframe>` (with their content) and event-handler attributes
/// are removed. Applied to forum posts, forum comments and feedback text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes a list of short labels (tags) and drops the ones left empty.
pub fn clean_labels(labels: &[String]) -> Vec<String> {
    labels
        .iter()
        .map(|label| clean_html(label.trim()))
        .filter(|label| !label.is_empty())
        .collect()
}
