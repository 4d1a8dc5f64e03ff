use serde_json::{Map, Value};

use super::parser::RawBody;

pub const WEBSITE_NAME: &str = "websiteName";
pub const WEBSITE_URL: &str = "websiteUrl";
pub const FORM_DATA: &str = "formData";

/// The validated, caller-supplied part of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitFields {
    pub website_name: String,
    pub website_url: String,
    pub form_data: Map<String, Value>,
}

/// Pull the required fields out of a decoded body.
///
/// Flat form bodies carry `websiteName` and `websiteUrl` as ordinary fields;
/// every other field becomes form data.
pub fn extract(body: RawBody) -> Result<SubmitFields, String> {
    let (website_name, website_url, form_data) = match body {
        RawBody::Json(Value::Object(mut obj)) => {
            let form_data = match obj.shift_remove(FORM_DATA) {
                Some(Value::Object(map)) => Some(map),
                Some(Value::Null) | None => None,
                Some(_) => return Err(format!("{FORM_DATA} must be an object")),
            };
            (
                take_string(&mut obj, WEBSITE_NAME),
                take_string(&mut obj, WEBSITE_URL),
                form_data,
            )
        }
        RawBody::Json(_) => return Err("Request body must be a JSON object".to_string()),
        RawBody::Fields(mut fields) => {
            let name = take_string(&mut fields, WEBSITE_NAME);
            let url = take_string(&mut fields, WEBSITE_URL);
            let data = (!fields.is_empty()).then_some(fields);
            (name, url, data)
        }
    };

    match (website_name, website_url, form_data) {
        (Some(website_name), Some(website_url), Some(form_data)) => Ok(SubmitFields {
            website_name,
            website_url,
            form_data,
        }),
        _ => Err(format!(
            "Missing required fields: {WEBSITE_NAME}, {WEBSITE_URL}, {FORM_DATA}"
        )),
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    match obj.shift_remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}
