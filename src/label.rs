use crate::classify::{contains_ci, normalize, Category, NO_SITTING_COUNCIL};
use crate::types::ReconciledRegion;

/// Fields longer than this are cut to `TRUNCATED_CHARS` plus an ellipsis.
pub const MAX_FIELD_CHARS: usize = 50;
const TRUNCATED_CHARS: usize = 47;
const ELLIPSIS: &str = "...";

pub fn truncate_field(text: &str) -> String {
    if text.chars().count() > MAX_FIELD_CHARS {
        let mut cut: String = text.chars().take(TRUNCATED_CHARS).collect();
        cut.push_str(ELLIPSIS);
        cut
    } else {
        text.to_string()
    }
}

/// Annotation lines for a matched region. The name always comes first; a `NoData`
/// region shows nothing else.
pub fn label_lines(region: &ReconciledRegion) -> Vec<String> {
    let record = &region.record;
    let mut lines = vec![record.region_name.clone()];

    if region.category == Category::NoData {
        return lines;
    }

    lines.push(format!("Status: {}", region.category));

    let assembly = normalize(&record.assembly_status);
    let council = normalize(&record.council_status);
    let notes = normalize(&record.notes);

    if !assembly.is_empty() {
        lines.push(format!("Assembly: {}", truncate_field(assembly)));
    }
    if !council.is_empty() && !contains_ci(council, NO_SITTING_COUNCIL) {
        lines.push(format!("Council: {}", truncate_field(council)));
    }
    if !notes.is_empty() {
        lines.push(format!("Note: {}", truncate_field(notes)));
    }

    lines
}
