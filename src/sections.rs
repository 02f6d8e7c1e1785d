//! Parser for the fixed four-section email format the generative service is
//! asked to produce:
//!
//! ```text
//! SUBJECT: ...
//! INITIAL: ...
//! FOLLOWUP1: ...
//! FOLLOWUP2: ...
//! ```
//!
//! Labels match case-insensitively and each section accumulates lines until
//! the next label or end of input. Content before the first label is
//! dropped. A missing section falls back to a fixed default so no field is
//! ever empty.

use crate::models::GeneratedEmail;

pub const DEFAULT_SUBJECT: &str = "Quick introduction";
pub const DEFAULT_BODY: &str =
    "Hi, I wanted to reach out about how we might be able to help your business.";
pub const DEFAULT_FOLLOW_UP1: &str =
    "Just following up on my previous email in case it got buried.";
pub const DEFAULT_FOLLOW_UP2: &str = "Final follow-up - I'd love to connect if you're interested.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Subject,
    Initial,
    FollowUp1,
    FollowUp2,
}

const LABELS: [(&str, Section); 4] = [
    ("SUBJECT:", Section::Subject),
    ("INITIAL:", Section::Initial),
    ("FOLLOWUP1:", Section::FollowUp1),
    ("FOLLOWUP2:", Section::FollowUp2),
];

/// Matches a label at the start of a (trimmed) line, case-insensitively,
/// returning the section and the rest of the line after the label.
fn match_label(line: &str) -> Option<(Section, &str)> {
    let trimmed = line.trim_start();
    for (label, section) in LABELS {
        // get() rejects non-boundary slices on multi-byte input
        if let Some(prefix) = trimmed.get(..label.len()) {
            if prefix.eq_ignore_ascii_case(label) {
                return Some((section, &trimmed[label.len()..]));
            }
        }
    }
    None
}

/// Splits a response blob into the four email fields, defaulting any
/// section the model failed to emit.
pub fn parse_email_sections(raw: &str) -> GeneratedEmail {
    let mut subject = String::new();
    let mut body = String::new();
    let mut follow_up1 = String::new();
    let mut follow_up2 = String::new();
    let mut current: Option<Section> = None;

    for line in raw.lines() {
        let (section, rest) = match match_label(line) {
            Some((section, rest)) => {
                current = Some(section);
                (section, rest)
            }
            // Lines before the first label are dropped
            None => match current {
                Some(section) => (section, line),
                None => continue,
            },
        };

        let buffer = match section {
            Section::Subject => &mut subject,
            Section::Initial => &mut body,
            Section::FollowUp1 => &mut follow_up1,
            Section::FollowUp2 => &mut follow_up2,
        };
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(rest.trim());
    }

    let or_default = |value: String, default: &str| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            default.to_string()
        } else {
            trimmed
        }
    };

    GeneratedEmail {
        subject: or_default(subject, DEFAULT_SUBJECT),
        body: or_default(body, DEFAULT_BODY),
        follow_up1: or_default(follow_up1, DEFAULT_FOLLOW_UP1),
        follow_up2: or_default(follow_up2, DEFAULT_FOLLOW_UP2),
    }
}
