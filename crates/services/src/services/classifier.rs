//! Keyword classification of damage descriptions into an issue category and
//! an urgency tier. Behavior lives in the two rule tables; the matching code
//! never changes when the vocabulary does.

use db::models::ticket::{IssueType, TicketPriority};

/// Ordered category rules; first matching set wins, case-insensitive
/// substring search.
const ISSUE_RULES: &[(IssueType, &[&str])] = &[
    (IssueType::Fan, &["fan"]),
    (IssueType::Light, &["light", "bulb", "tube", "lamp"]),
    (IssueType::Furniture, &["chair", "table", "desk", "furniture"]),
    (IssueType::Electrical, &["socket", "switch", "wire", "electrical"]),
    (
        IssueType::Electronics,
        &["laptop", "computer", "projector", "screen", "electronics"],
    ),
];

/// Ordered urgency tiers, checked top to bottom. A description matching no
/// tier defaults to Medium: unclassified severity is treated as the middle
/// tier, not the lowest.
const PRIORITY_RULES: &[(TicketPriority, &[&str])] = &[
    (
        TicketPriority::High,
        &["severely", "broken", "damaged", "fire", "sparking", "dangerous"],
    ),
    (
        TicketPriority::Medium,
        &["not working", "malfunctioning", "cracked", "bent"],
    ),
    (
        TicketPriority::Low,
        &["no maintenance issues", "minor", "slight"],
    ),
];

/// Map a damage description to (issue type, priority).
pub fn classify(description: &str) -> (IssueType, TicketPriority) {
    let text = description.to_lowercase();

    let issue_type = ISSUE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(issue, _)| issue.clone())
        .unwrap_or(IssueType::Other);

    let priority = PRIORITY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(tier, _)| tier.clone())
        .unwrap_or(TicketPriority::Medium);

    (issue_type, priority)
}
