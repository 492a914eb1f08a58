//! Line-oriented section scanning.
//!
//! A region opens on a line containing one of its `open` markers and closes
//! on a line containing one of its `close` markers. Each region is scanned
//! independently over the whole text, so overlapping marker sets are fine.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cap shared by every scanned section.
pub const MAX_SECTION_ITEMS: usize = 5;

/// Lines shorter than this after cleaning are headings or noise.
const MIN_LINE_CHARS: usize = 10;

static LEADING_BULLETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[\s•·\-\*–]+|\d{1,2}[\.\)]\s*)+").expect("bullet regex is valid"));

/// Open/close markers for one region. Markers are matched lowercased.
#[derive(Debug, Clone, Copy)]
pub struct SectionMarkers {
    pub open: &'static [&'static str],
    pub close: &'static [&'static str],
}

pub const RESPONSIBILITIES: SectionMarkers = SectionMarkers {
    open: &[
        "responsibilities:",
        "what you'll do:",
        "what you’ll do:",
        "you will:",
        "your responsibilities:",
        "key responsibilities:",
        "duties:",
    ],
    close: &[
        "requirements:",
        "qualifications:",
        "skills:",
        "what we need:",
        "about you:",
        "experience:",
        "education:",
        "benefits:",
    ],
};

pub const REQUIREMENTS: SectionMarkers = SectionMarkers {
    open: &["requirements:", "qualifications:", "must have:", "required:"],
    close: &["responsibilities:", "benefits:", "nice to have:", "preferred:"],
};

pub const QUALIFICATIONS: SectionMarkers = SectionMarkers {
    open: &["nice to have:", "preferred:", "bonus points:"],
    close: &["responsibilities:", "benefits:", "requirements:", "about us:"],
};

pub const BENEFITS: SectionMarkers = SectionMarkers {
    open: &["benefits:", "perks:", "what we offer:"],
    close: &["responsibilities:", "requirements:", "qualifications:", "about us:"],
};

/// Collects up to `cap` cleaned lines from the region described by `markers`.
///
/// A line that opens the region is never collected itself; a closing line
/// ends the region but a later opening line can reopen it.
pub fn collect_section(text: &str, markers: &SectionMarkers, cap: usize) -> Vec<String> {
    let mut items = Vec::new();
    let mut inside = false;

    for line in text.lines() {
        if items.len() >= cap {
            break;
        }
        let lowered = line.trim().to_lowercase();

        if markers.open.iter().any(|m| lowered.contains(m)) {
            inside = true;
            continue;
        }
        if markers.close.iter().any(|m| lowered.contains(m)) {
            inside = false;
            continue;
        }
        if inside {
            if let Some(cleaned) = clean_line(line) {
                items.push(cleaned);
            }
        }
    }

    items
}

/// Strips leading bullet/number punctuation; rejects lines that end up too short.
pub fn clean_line(line: &str) -> Option<String> {
    let cleaned = LEADING_BULLETS.replace(line.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.chars().count() > MIN_LINE_CHARS {
        Some(cleaned.to_string())
    } else {
        None
    }
}
