use crate::Poll;

pub const EXPORT_FILE_NAME: &str = "polls_export.csv";
pub const EXPORT_MIME: &str = "text/csv;charset=utf-8;";

const HEADER: &str = "Question,Options,Total Votes,Created At";

/// Renders the CSV export, or `None` when there is nothing to export.
pub fn polls_to_csv(polls: &[Poll]) -> Option<String> {
    if polls.is_empty() {
        return None;
    }
    let mut out = String::from(HEADER);
    out.push('\n');
    for poll in polls {
        let fields = [
            quote(&poll.question),
            quote(&poll.options.join(", ")),
            quote(&poll.total_votes.to_string()),
            quote(&poll.created_at),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Some(out)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
