//! CSV rendering for campaign exports.

use crate::models::{EmailTemplate, Target, TemplateType};

/// Column order is fixed; consumers import the file into their own CRM.
pub const CSV_COLUMNS: [&str; 9] = [
    "Name",
    "Email",
    "Company",
    "Title",
    "LinkedIn",
    "Subject",
    "Email Body",
    "Follow-up 1",
    "Follow-up 2",
];

/// Renders one row per target. Subject and bodies come from the campaign's
/// first initial/follow-up templates, same for every row.
pub fn campaign_to_csv(targets: &[Target], templates: &[EmailTemplate]) -> String {
    let find = |template_type: TemplateType| {
        templates
            .iter()
            .find(|t| t.template_type == template_type)
    };
    let initial = find(TemplateType::Initial);
    let followup1 = find(TemplateType::Followup1);
    let followup2 = find(TemplateType::Followup2);

    let mut rows = Vec::with_capacity(targets.len() + 1);
    rows.push(CSV_COLUMNS.join(","));

    for target in targets {
        let fields = [
            target.name.as_str(),
            target.email.as_deref().unwrap_or(""),
            target.company.as_str(),
            target.title.as_deref().unwrap_or(""),
            target.linkedin_url.as_deref().unwrap_or(""),
            initial.map(|t| t.subject.as_str()).unwrap_or(""),
            initial.map(|t| t.body.as_str()).unwrap_or(""),
            followup1.map(|t| t.body.as_str()).unwrap_or(""),
            followup2.map(|t| t.body.as_str()).unwrap_or(""),
        ];
        let row: Vec<String> = fields.iter().map(|f| escape_csv_field(f)).collect();
        rows.push(row.join(","));
    }

    rows.join("\n")
}

/// Standard CSV quoting: fields containing a comma, quote or newline are
/// wrapped in double quotes with inner quotes doubled.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
