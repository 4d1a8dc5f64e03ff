use std::fmt::Write;

use serde_json::Value;

use crate::models::Submission;

pub fn submission_subject(submission: &Submission) -> String {
    format!("New Submission from {}", submission.website_name)
}

pub fn render_submission(submission: &Submission) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "New form submission from {}", submission.website_name);
    let _ = writeln!(body, "Website: {}", submission.website_url);
    let _ = writeln!(body);

    for (key, value) in &submission.form_data {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let _ = writeln!(body, "{key}: {value}");
    }

    let _ = writeln!(body);
    let _ = writeln!(body, "Submission ID: {}", submission.id);
    let _ = writeln!(body, "Timestamp: {}", submission.timestamp.to_rfc3339());

    body
}
