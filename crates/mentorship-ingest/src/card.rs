//! Markdown bodies for project items and issue comments.

use crate::PairRecord;

/// Title of the project item tracking a pair.
pub fn item_title(record: &PairRecord) -> String {
    format!("{} → {}", record.mentor(), record.mentee())
}

fn bullets_or(items: &[String], placeholder: &str) -> String {
    if items.is_empty() {
        format!("- {placeholder}")
    } else {
        items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Body of the project item tracking a pair.
pub fn render_card(record: &PairRecord) -> String {
    let mut body = format!(
        "# {} ↔ {}\n\n## Goals\n{}\n\n## Progress\n{}\n\n## Meetings\n{}\n\n## Deliverables\n{}\n",
        record.mentor(),
        record.mentee(),
        bullets_or(record.goals(), "TBD"),
        record.progress(),
        bullets_or(record.meetings(), "No meetings scheduled"),
        bullets_or(record.deliverables(), "TBD"),
    );

    let timeline: Vec<String> = [
        ("Program Track", record.program_track()),
        ("Start Date", record.start_date()),
        ("End Date", record.end_date()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("- **{label}**: {v}")))
    .collect();
    if !timeline.is_empty() {
        body.push_str("\n## Timeline\n");
        body.push_str(&timeline.join("\n"));
        body.push('\n');
    }

    body.push_str(&format!(
        "\n## Last Updated\n{}\n\n---\n*This card tracks the mentorship pair progress. Update regularly to maintain current status.*\n",
        record.last_updated().to_rfc3339()
    ));
    body
}

/// Comment posted on an issue once its pair has been added to the project.
pub fn render_processing_comment(record: &PairRecord, project_url: Option<&str>) -> String {
    let project_line = match project_url {
        Some(url) => format!("**Project Item Created**: [View in Project]({url})"),
        None => "**Project Item Created**".to_string(),
    };
    format!(
        "**Mentorship Pair Successfully Processed**\n\n\
         **Mentor**: {}\n\
         **Mentee**: {}\n\n\
         {project_line}\n\
         **Goals**: {} goals identified\n\n\
         ## Next Steps\n\
         1. Check the project item for tracking progress\n\
         2. Schedule the initial mentor-mentee meeting\n\
         3. Update the project item with meeting notes and progress\n\n\
         ---\n\
         *This pair was automatically processed from this issue.*\n",
        record.mentor(),
        record.mentee(),
        record.goals().len(),
    )
}
