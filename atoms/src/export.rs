use crate::attachments::model::AttachmentSource;
use crate::tasks::model::Task;

pub const CSV_HEADER: [&str; 8] = [
    "Title",
    "Details",
    "Assigned",
    "Created At",
    "Deadline",
    "Status",
    "AttachmentsCount",
    "AttachmentLinks",
];

/// Quote a CSV field, doubling embedded quotes. Every field is quoted.
fn csv_escape(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn format_created(task: &Task) -> String {
    task.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_deadline(task: &Task) -> String {
    task.deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Attachment summary column: stored and external entries contribute their
/// URL, embedded payloads a marker, joined with ` | `. The format cannot
/// carry binary content, so this is all the row gets.
fn attachment_links(task: &Task) -> String {
    task.attachments
        .iter()
        .map(|a| match &a.source {
            AttachmentSource::Link { url } | AttachmentSource::Stored { url, .. } => url.clone(),
            AttachmentSource::Embedded { .. } => "[embedded]".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Serialize tasks to the export CSV, one row per task under the fixed
/// header.
pub fn tasks_to_csv(tasks: &[Task]) -> String {
    let mut lines = Vec::with_capacity(tasks.len() + 1);
    lines.push(
        CSV_HEADER
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for task in tasks {
        let row = [
            task.title.clone(),
            task.details.clone(),
            task.assigned_name.clone(),
            format_created(task),
            format_deadline(task),
            task.status.as_str().to_string(),
            task.attachments.len().to_string(),
            attachment_links(task),
        ];
        lines.push(
            row.iter()
                .map(|field| csv_escape(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    lines.join("\n")
}
