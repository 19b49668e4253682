//! Wire payloads for each step's save requests.

use serde_json::{Map, Value};

use super::attachments::AttachmentSet;
use super::backend::{endpoints, BackendRequest, FilePart};
use super::record::ApplicationRecord;
use super::schema::{StepKind, StepSchema, INTER_RESULT_STATUSES};

/// Record key holding the identifier the backend assigned when the student step was saved.
pub const STUDENT_ID_FIELD: &str = "student_id";

/// Requests to issue, in order, when `schema`'s step is saved. Empty for local-only steps.
pub fn requests_for(
    schema: &StepSchema,
    slice: &ApplicationRecord,
    record: &ApplicationRecord,
    attachments: &AttachmentSet,
) -> Vec<BackendRequest> {
    let student_id = record.get(STUDENT_ID_FIELD).cloned().unwrap_or(Value::Null);

    match schema.kind {
        StepKind::Student => {
            let fields = ["first_name", "last_name", "email", "phone_number"]
                .into_iter()
                .filter_map(|field| slice.text(field).map(|value| (field.to_string(), value)))
                .collect();
            let files = file_parts(attachments, ["profile_image"]);
            vec![BackendRequest::multipart(endpoints::STUDENTS, fields, files)]
        }
        StepKind::Admission => vec![BackendRequest::json(
            endpoints::ADMISSIONS,
            admission_body(slice, student_id),
        )],
        StepKind::Basic => vec![BackendRequest::json(
            endpoints::BASIC_INFO,
            object(
                student_id,
                [
                    ("father_name", text(slice, "father_name")),
                    ("gender", text(slice, "gender")),
                    ("date_of_birth", text(slice, "date_of_birth")),
                    ("nationality", text(slice, "nationality")),
                    ("religion", text(slice, "religion")),
                    ("cnic", text(slice, "cnic")),
                    ("province", text(slice, "province")),
                    ("second_nationality", text(slice, "second_nationality")),
                    ("passport_number", text(slice, "passport_number")),
                    ("disability", text(slice, "disability")),
                    ("disability_details", text(slice, "disability_details")),
                ],
            ),
        )],
        StepKind::Residence => vec![BackendRequest::json(
            endpoints::RESIDENCE_INFO,
            object(
                student_id,
                [
                    ("present_address", text(slice, "present_address")),
                    ("present_city", text(slice, "present_city")),
                    ("present_area", text(slice, "present_area")),
                    ("present_postal_code", text(slice, "present_postal_code")),
                    (
                        "same_as_present_address",
                        Value::Bool(flag(slice, "same_as_present_address")),
                    ),
                    ("permanent_address", text(slice, "permanent_address")),
                    ("permanent_city", text(slice, "permanent_city")),
                    ("permanent_area", text(slice, "permanent_area")),
                    ("permanent_postal_code", text(slice, "permanent_postal_code")),
                ],
            ),
        )],
        StepKind::Guardian => vec![BackendRequest::json(
            endpoints::GUARDIAN_INFO,
            object(
                student_id,
                [
                    ("name", text(slice, "guardian_name")),
                    ("relationship", text(slice, "guardian_relationship")),
                    ("contact_no", text(slice, "guardian_contact_no")),
                    ("cnic", text(slice, "guardian_cnic")),
                    ("education", text(slice, "guardian_education")),
                    ("occupation", text(slice, "guardian_occupation")),
                    ("organization", text(slice, "guardian_organization")),
                    ("designation", text(slice, "guardian_designation")),
                    ("email", text(slice, "guardian_email")),
                ],
            ),
        )],
        StepKind::Academic => vec![
            BackendRequest::json(
                endpoints::MATRICULATION_INFO,
                matriculation_body(slice, student_id.clone()),
            ),
            BackendRequest::json(
                endpoints::INTERMEDIATE_INFO,
                intermediate_body(slice, student_id),
            ),
        ],
        StepKind::Documents => {
            let mut fields = Vec::new();
            if let Some(id) = super::record::value_text(&student_id) {
                fields.push((STUDENT_ID_FIELD.to_string(), id));
            }
            let files = file_parts(attachments, schema.field_names());
            vec![BackendRequest::multipart(
                endpoints::DOCUMENTS_UPLOAD,
                fields,
                files,
            )]
        }
        StepKind::Agreement | StepKind::Processing | StepKind::Test => Vec::new(),
    }
}

fn admission_body(slice: &ApplicationRecord, student_id: Value) -> Value {
    let admission_type = slice.text("admission_type").unwrap_or_default();
    let mut pairs = vec![
        ("current_qualification", text(slice, "qualification")),
        ("admission_type", text(slice, "admission_type")),
        ("program", text(slice, "program")),
        ("major", text(slice, "major")),
        ("campus", text(slice, "campus")),
        ("shift", text(slice, "shift")),
    ];
    match admission_type.as_str() {
        "transfer" => pairs.extend([
            ("previous_university", text(slice, "previous_university")),
            ("previous_program", text(slice, "previous_program")),
            ("completed_semesters", integer(slice, "completed_semesters")),
        ]),
        "international" => pairs.extend([
            ("nationality", text(slice, "international_nationality")),
            (
                "passport_number",
                text(slice, "international_passport_number"),
            ),
        ]),
        _ => {}
    }
    object(student_id, pairs)
}

fn matriculation_body(slice: &ApplicationRecord, student_id: Value) -> Value {
    object(
        student_id,
        [
            ("education_system", text(slice, "matric_system")),
            ("board_university", text(slice, "matric_board")),
            ("institute", text(slice, "matric_institute")),
            ("passing_year", integer(slice, "matric_year")),
            ("group_major", text(slice, "matric_group")),
            ("result_status", Value::String("Passed".to_string())),
            ("roll_number", text(slice, "matric_roll_number")),
            ("obtained_marks", integer(slice, "matric_obtained_marks")),
        ],
    )
}

fn intermediate_body(slice: &ApplicationRecord, student_id: Value) -> Value {
    let status = slice.text("inter_result_status").unwrap_or_default();
    let roll_number = if INTER_RESULT_STATUSES.iter().any(|known| *known == status) {
        slice.text("inter_roll_number").unwrap_or_default()
    } else {
        String::new()
    };
    let obtained_marks = if status == "Passed" {
        integer(slice, "inter_obtained_marks")
    } else {
        Value::Null
    };

    object(
        student_id,
        [
            ("education_system", text(slice, "inter_system")),
            ("board_university", text(slice, "inter_board")),
            ("institute", text(slice, "inter_institute")),
            ("passing_year", integer(slice, "inter_year")),
            ("group_major", text(slice, "inter_group")),
            ("result_status", text(slice, "inter_result_status")),
            ("roll_number", Value::String(roll_number)),
            ("obtained_marks", obtained_marks),
        ],
    )
}

fn object<'a, I>(student_id: Value, pairs: I) -> Value
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let mut body = Map::new();
    body.insert(STUDENT_ID_FIELD.to_string(), student_id);
    for (key, value) in pairs {
        body.insert(key.to_string(), value);
    }
    Value::Object(body)
}

fn text(slice: &ApplicationRecord, field: &str) -> Value {
    slice.text(field).map(Value::String).unwrap_or(Value::Null)
}

fn integer(slice: &ApplicationRecord, field: &str) -> Value {
    slice
        .text(field)
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn flag(slice: &ApplicationRecord, field: &str) -> bool {
    slice.text(field).as_deref() == Some("true")
}

fn file_parts<'a, I>(attachments: &AttachmentSet, fields: I) -> Vec<FilePart>
where
    I: IntoIterator<Item = &'a str>,
{
    attachments
        .for_fields(fields)
        .into_iter()
        .map(|attachment| FilePart {
            field: attachment.field.clone(),
            file_name: attachment.file_name.clone(),
            content_type: attachment.content_type.clone(),
            bytes: attachment.bytes.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::enrollment::backend::RequestBody;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> ApplicationRecord {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect()
    }

    fn json_body(request: &BackendRequest) -> &Value {
        match &request.body {
            RequestBody::Json(body) => body,
            RequestBody::Multipart { .. } => panic!("expected JSON body"),
        }
    }

    #[test]
    fn academic_step_sends_matric_before_inter() {
        let slice = record(&[
            ("matric_year", json!("2019")),
            ("matric_obtained_marks", json!("901")),
            ("inter_year", json!("2021")),
            ("inter_result_status", json!("Awaited")),
            ("inter_roll_number", json!("KB-77")),
            ("inter_obtained_marks", json!("800")),
        ]);
        let full = record(&[("student_id", json!(12))]);
        let requests = requests_for(
            StepKind::Academic.schema(),
            &slice,
            &full,
            &AttachmentSet::default(),
        );

        let endpoints: Vec<_> = requests.iter().map(|request| request.endpoint).collect();
        assert_eq!(endpoints, vec!["/matriculation-info", "/intermediate-info"]);

        let matric = json_body(&requests[0]);
        assert_eq!(matric["student_id"], json!(12));
        assert_eq!(matric["passing_year"], json!(2019));
        assert_eq!(matric["result_status"], json!("Passed"));

        let inter = json_body(&requests[1]);
        assert_eq!(inter["roll_number"], json!("KB-77"));
        assert_eq!(inter["obtained_marks"], Value::Null);
    }

    #[test]
    fn admission_extras_follow_admission_type() {
        let slice = record(&[
            ("qualification", json!("intermediate")),
            ("admission_type", json!("transfer")),
            ("previous_university", json!("NED")),
            ("completed_semesters", json!("2")),
        ]);
        let requests = requests_for(
            StepKind::Admission.schema(),
            &slice,
            &ApplicationRecord::new(),
            &AttachmentSet::default(),
        );
        let body = json_body(&requests[0]);
        assert_eq!(body["current_qualification"], json!("intermediate"));
        assert_eq!(body["completed_semesters"], json!(2));
        assert!(body.get("nationality").is_none());
    }

    #[test]
    fn local_steps_issue_no_requests() {
        for kind in [StepKind::Agreement, StepKind::Processing, StepKind::Test] {
            assert!(requests_for(
                kind.schema(),
                &ApplicationRecord::new(),
                &ApplicationRecord::new(),
                &AttachmentSet::default()
            )
            .is_empty());
        }
    }
}
