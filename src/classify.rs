//! Status classification.
//!
//! A row's three status fields are reduced to a handful of boolean signals,
//! then walked through [`RULES`] top to bottom. The first rule that holds
//! decides the category; later rules are never consulted. Several rules
//! overlap, so the order of [`RULES`] is part of the contract.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    BothCompleted,
    AssemblyCompleted,
    AssemblyDoneCouncilPending,
    BothNeedUpdate,
    AssemblyNeedsUpdate,
    CouncilNeedsUpdate,
    AssemblyNeedsUpdateHasCouncil,
    AssemblyInProgress,
    CouncilInProgress,
    NoData,
    Other,
}

/// Order of the swatches in the map legend.
pub const LEGEND_ORDER: [Category; 11] = [
    Category::BothCompleted,
    Category::AssemblyCompleted,
    Category::AssemblyDoneCouncilPending,
    Category::BothNeedUpdate,
    Category::AssemblyNeedsUpdateHasCouncil,
    Category::AssemblyNeedsUpdate,
    Category::CouncilNeedsUpdate,
    Category::AssemblyInProgress,
    Category::CouncilInProgress,
    Category::NoData,
    Category::Other,
];

/// Fill for geometry that no status row resolved to.
pub const UNMAPPED_COLOR: &str = "#f5f5f5";

impl Category {
    pub fn display_text(self) -> &'static str {
        match self {
            Category::BothCompleted => "Both Completed",
            Category::AssemblyCompleted => "Assembly Completed",
            Category::AssemblyDoneCouncilPending => "Assembly Done, Council Pending",
            Category::BothNeedUpdate => "Both Need Update",
            Category::AssemblyNeedsUpdate => "Assembly Needs Update",
            Category::CouncilNeedsUpdate => "Council Needs Update",
            Category::AssemblyNeedsUpdateHasCouncil => "Assembly Needs Update (Has Council)",
            Category::AssemblyInProgress => "Assembly In Progress",
            Category::CouncilInProgress => "Council In Progress",
            Category::NoData => "No Data",
            Category::Other => "Other",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::BothCompleted => "#2ca02c",
            Category::AssemblyCompleted => "#98df8a",
            Category::AssemblyDoneCouncilPending => "#74c476",
            Category::BothNeedUpdate => "#ff7f0e",
            Category::AssemblyNeedsUpdate => "#ffbb78",
            Category::CouncilNeedsUpdate => "#fdd0a2",
            Category::AssemblyNeedsUpdateHasCouncil => "#fd8d3c",
            Category::AssemblyInProgress => "#1f77b4",
            Category::CouncilInProgress => "#6baed6",
            Category::NoData => "#d3d3d3",
            Category::Other => "#e0e0e0",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

/// Cell values a spreadsheet export uses for "no value".
pub const MISSING_VALUE_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Trims a raw cell and folds missing-value tokens to "".
pub fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    if MISSING_VALUE_TOKENS.contains(&trimmed) {
        ""
    } else {
        trimmed
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub const NO_SITTING_COUNCIL: &str = "No sitting council";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub no_council: bool,
    pub assembly_completed: bool,
    pub council_completed: bool,
    pub assembly_needs_update: bool,
    pub council_needs_update: bool,
    pub assembly_in_progress: bool,
    pub council_in_progress: bool,
    pub assembly_empty: bool,
}

impl Signals {
    pub fn from_fields(
        assembly_status: &str,
        council_status: &str,
        council_website_note: &str,
    ) -> Self {
        let assembly = normalize(assembly_status);
        let council = normalize(council_status);
        let website = normalize(council_website_note);

        let needs_update = |s: &str| contains_ci(s, "Metadata") || contains_ci(s, "update");
        let in_progress =
            |s: &str| contains_ci(s, "Started") || contains_ci(s, "pending completion");

        Self {
            no_council: council.is_empty()
                // Exact case: "Scan/Archive" must not read as "n/a".
                || council.contains("N/A")
                || contains_ci(website, NO_SITTING_COUNCIL),
            assembly_completed: contains_ci(assembly, "Completed"),
            council_completed: contains_ci(council, "Completed"),
            assembly_needs_update: needs_update(assembly),
            council_needs_update: needs_update(council),
            assembly_in_progress: in_progress(assembly),
            council_in_progress: in_progress(council),
            assembly_empty: assembly.is_empty(),
        }
    }
}

pub struct Rule {
    pub name: &'static str,
    pub category: Category,
    pub holds: fn(&Signals) -> bool,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "both completed",
        category: Category::BothCompleted,
        holds: |s| s.assembly_completed && s.council_completed,
    },
    Rule {
        name: "assembly completed, no council",
        category: Category::AssemblyCompleted,
        holds: |s| s.assembly_completed && s.no_council,
    },
    Rule {
        name: "assembly completed, council pending",
        category: Category::AssemblyDoneCouncilPending,
        holds: |s| s.assembly_completed && (s.council_in_progress || s.council_needs_update),
    },
    Rule {
        name: "both need update",
        category: Category::BothNeedUpdate,
        holds: |s| s.assembly_needs_update && s.council_needs_update,
    },
    Rule {
        name: "assembly needs update, no council",
        category: Category::AssemblyNeedsUpdate,
        holds: |s| s.assembly_needs_update && s.no_council,
    },
    Rule {
        name: "council needs update",
        category: Category::CouncilNeedsUpdate,
        holds: |s| s.council_needs_update && (s.assembly_completed || s.assembly_empty),
    },
    Rule {
        name: "assembly needs update, has council",
        category: Category::AssemblyNeedsUpdateHasCouncil,
        holds: |s| s.assembly_needs_update && !s.no_council,
    },
    Rule {
        name: "assembly in progress",
        category: Category::AssemblyInProgress,
        holds: |s| s.assembly_in_progress,
    },
    Rule {
        name: "council in progress",
        category: Category::CouncilInProgress,
        holds: |s| s.council_in_progress,
    },
    Rule {
        name: "no assembly data",
        category: Category::NoData,
        holds: |s| s.assembly_empty,
    },
];

/// First rule in [`RULES`] that holds, or `None` when the row falls through to `Other`.
pub fn matching_rule(signals: &Signals) -> Option<&'static Rule> {
    RULES.iter().find(|rule| (rule.holds)(signals))
}

pub fn classify(
    assembly_status: &str,
    council_status: &str,
    council_website_note: &str,
) -> Category {
    let signals = Signals::from_fields(assembly_status, council_status, council_website_note);
    matching_rule(&signals).map_or(Category::Other, |rule| rule.category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn empty_row_has_no_data() {
        assert_eq!(classify("", "", ""), Category::NoData);
        assert_eq!(classify("  ", "nan", "NaN"), Category::NoData);
    }

    #[test]
    fn missing_value_tokens_read_as_empty() {
        for token in ["N/A", "NA", "NULL", "null", "None", "#N/A", "<NA>", "-NaN", " n/a "] {
            assert_eq!(normalize(token), "", "{token:?}");
            assert_eq!(classify(token, "", ""), Category::NoData, "{token:?}");
        }
        assert_eq!(classify("Completed", "N/A", ""), Category::AssemblyCompleted);
        // Only whole-cell tokens count.
        assert_eq!(normalize("NA pending"), "NA pending");
        assert_eq!(normalize("Nan"), "Nan");
    }

    #[test]
    fn council_na_marker_is_case_sensitive() {
        assert_eq!(
            classify("Completed", "Scan/Archive started", ""),
            Category::AssemblyDoneCouncilPending
        );
        assert_eq!(classify("Completed", "Website N/A, started", ""), Category::AssemblyCompleted);
    }

    #[test]
    fn completed_assembly_without_council() {
        assert_eq!(
            classify("Completed on 2023-01-01", "No sitting council", "No sitting council"),
            Category::AssemblyCompleted
        );
        assert_eq!(classify("Completed", "", ""), Category::AssemblyCompleted);
        assert_eq!(classify("Completed", "N/A", ""), Category::AssemblyCompleted);
    }

    #[test]
    fn metadata_on_both_sides_needs_update() {
        assert_eq!(
            classify("Metadata pending", "Metadata pending", ""),
            Category::BothNeedUpdate
        );
    }

    #[test]
    fn started_assembly_is_in_progress() {
        assert_eq!(classify("Started", "", ""), Category::AssemblyInProgress);
        assert_eq!(
            classify("Scraped, pending completion", "", ""),
            Category::AssemblyInProgress
        );
    }

    #[test]
    fn earliest_rule_wins_over_later_matches() {
        let assembly = "Completed, needs update";
        let council = "Completed, needs update";
        let signals = Signals::from_fields(assembly, council, "");
        assert!(signals.assembly_completed && signals.council_completed);
        assert!(signals.assembly_needs_update && signals.council_needs_update);
        assert_eq!(classify(assembly, council, ""), Category::BothCompleted);
    }

    #[test]
    fn each_rule_is_reachable_in_order() {
        let cases = [
            (("Completed", "Completed", ""), Category::BothCompleted),
            (("Completed", "", ""), Category::AssemblyCompleted),
            (("Completed", "Started", ""), Category::AssemblyDoneCouncilPending),
            (("Completed", "Metadata missing", ""), Category::AssemblyDoneCouncilPending),
            (("Needs update", "Metadata missing", ""), Category::BothNeedUpdate),
            (("Metadata missing", "", ""), Category::AssemblyNeedsUpdate),
            (("", "Metadata missing", ""), Category::CouncilNeedsUpdate),
            (("Metadata missing", "Started", ""), Category::AssemblyNeedsUpdateHasCouncil),
            (("Started", "Started", ""), Category::AssemblyInProgress),
            (("Not begun", "Started", ""), Category::CouncilInProgress),
            (("", "Started", ""), Category::CouncilInProgress),
            (("", "Not begun", ""), Category::NoData),
            (("Not begun", "", ""), Category::Other),
        ];
        for ((asm, council, website), expected) in cases {
            assert_eq!(classify(asm, council, website), expected, "{asm:?} / {council:?}");
        }
    }

    #[test]
    fn sitting_council_note_overrides_council_text() {
        // Council text alone would mean a council exists.
        assert_eq!(
            classify("Metadata missing", "Started", ""),
            Category::AssemblyNeedsUpdateHasCouncil
        );
        assert_eq!(
            classify("Metadata missing", "Started", "No sitting council since 2019"),
            Category::AssemblyNeedsUpdate
        );
    }

    #[test]
    fn council_update_with_unfinished_assembly_falls_through() {
        // Rule 6 needs a completed or empty assembly; "Not begun" is neither.
        assert_eq!(classify("Not begun", "update pending", ""), Category::Other);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("COMPLETED", "completed", ""), Category::BothCompleted);
        assert_eq!(classify("UPDATE required", "", ""), Category::AssemblyNeedsUpdate);
    }

    #[test]
    fn fallthrough_has_no_rule() {
        let signals = Signals::from_fields("Something else", "", "");
        assert!(matching_rule(&signals).is_none());
        let signals = Signals::from_fields("", "", "");
        assert_eq!(matching_rule(&signals).map(|r| r.name), Some("no assembly data"));
    }

    #[test]
    fn classification_is_total_over_keyword_grid() {
        let values = [
            "",
            "nan",
            "Completed",
            "Metadata pending",
            "needs update",
            "Started",
            "pending completion",
            "N/A",
            "No sitting council",
            "something else",
        ];
        let mut seen = HashSet::new();
        for asm in values {
            for council in values {
                for website in ["", NO_SITTING_COUNCIL] {
                    let category = classify(asm, council, website);
                    assert!(LEGEND_ORDER.contains(&category));
                    assert_eq!(category, classify(asm, council, website));
                    seen.insert(category);
                }
            }
        }
        assert_eq!(seen.len(), LEGEND_ORDER.len());
    }

    #[test]
    fn every_category_has_a_distinct_color() {
        let colors: HashSet<_> = LEGEND_ORDER.iter().map(|c| c.color()).collect();
        assert_eq!(colors.len(), LEGEND_ORDER.len());
        assert!(!colors.contains(UNMAPPED_COLOR));
    }
}
