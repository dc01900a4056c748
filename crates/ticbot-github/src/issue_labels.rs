/// Normalize label names for case-insensitive matching.
pub fn normalize_issue_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// GitHub treats label names case-insensitively.
pub fn labels_match(left: &str, right: &str) -> bool {
    normalize_issue_label(left) == normalize_issue_label(right)
}

/// Build the label list sent on issue creation: trimmed, blank and duplicate
/// names removed, first spelling kept.
pub fn build_ticket_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() || kept.iter().any(|existing| labels_match(existing, trimmed)) {
            continue;
        }
        kept.push(trimmed.to_string());
    }
    kept
}
