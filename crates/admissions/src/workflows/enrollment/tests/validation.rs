use super::common::*;
use serde_json::json;

use crate::workflows::enrollment::record::ApplicationRecord;
use crate::workflows::enrollment::schema::StepKind;
use crate::workflows::enrollment::validation::validate;

#[test]
fn every_step_accepts_its_fixture() {
    for kind in StepKind::ALL {
        let report = validate(kind.schema(), &valid_slice(kind), today());
        assert!(report.is_valid(), "{:?}: {:?}", kind, report.errors());
    }
}

#[test]
fn empty_student_step_reports_each_required_field() {
    let report = validate(StepKind::Student.schema(), &ApplicationRecord::new(), today());

    assert_eq!(report.message("first_name"), Some("First name is required"));
    assert_eq!(report.message("email"), Some("Email is required"));
    assert_eq!(report.message("profile_image"), Some("Profile photo is required"));
    assert_eq!(report.len(), 5);
}

#[test]
fn blank_strings_count_as_missing() {
    let mut slice = valid_slice(StepKind::Guardian);
    slice.set("guardian_name", json!("   "));
    let report = validate(StepKind::Guardian.schema(), &slice, today());
    assert_eq!(report.message("guardian_name"), Some("Guardian name is required"));
}

#[test]
fn inter_marks_only_required_when_passed() {
    let mut slice = valid_slice(StepKind::Academic);
    slice.remove("inter_obtained_marks");

    let report = validate(StepKind::Academic.schema(), &slice, today());
    assert_eq!(
        report.message("inter_obtained_marks"),
        Some("Intermediate obtained marks is required")
    );

    slice.set("inter_result_status", json!("Awaited"));
    let report = validate(StepKind::Academic.schema(), &slice, today());
    assert!(report.is_valid(), "{:?}", report.errors());
}

#[test]
fn marks_and_years_are_range_checked() {
    let mut slice = valid_slice(StepKind::Academic);
    slice.set("matric_obtained_marks", json!("1101"));
    slice.set("inter_obtained_marks", json!("-4"));
    slice.set("inter_year", json!("2021"));

    let report = validate(StepKind::Academic.schema(), &slice, today());
    assert_eq!(
        report.message("matric_obtained_marks"),
        Some("Matric obtained marks cannot exceed 1100")
    );
    assert_eq!(
        report.message("inter_obtained_marks"),
        Some("Intermediate obtained marks cannot be negative")
    );
    assert_eq!(
        report.message("inter_year"),
        Some("Intermediate passing year must be at least 2 years after Matric passing year")
    );
}

#[test]
fn dual_nationals_need_second_nationality_and_passport() {
    let mut slice = valid_slice(StepKind::Basic);
    slice.set("nationality", json!("Dual National"));

    let report = validate(StepKind::Basic.schema(), &slice, today());
    assert_eq!(
        report.message("second_nationality"),
        Some("Second nationality is required for dual nationals")
    );
    assert_eq!(
        report.message("passport_number"),
        Some("Passport number is required for dual nationals")
    );

    slice.set("second_nationality", json!("Canadian"));
    slice.set("passport_number", json!("AB12"));
    let report = validate(StepKind::Basic.schema(), &slice, today());
    assert_eq!(
        report.message("passport_number"),
        Some("Passport number must be at least 6 characters")
    );
}

#[test]
fn disability_details_follow_disability_choice() {
    let mut slice = valid_slice(StepKind::Basic);
    slice.set("disability", json!("None"));
    assert!(validate(StepKind::Basic.schema(), &slice, today()).is_valid());

    slice.set("disability", json!("Visual"));
    let report = validate(StepKind::Basic.schema(), &slice, today());
    assert_eq!(
        report.message("disability_details"),
        Some("Please provide disability details")
    );
}

#[test]
fn underage_applicants_are_rejected() {
    let mut slice = valid_slice(StepKind::Basic);
    slice.set("date_of_birth", json!("2012-01-01"));
    let report = validate(StepKind::Basic.schema(), &slice, today());
    assert_eq!(
        report.message("date_of_birth"),
        Some("You must be at least 15 years old")
    );
}

#[test]
fn contact_formats_are_enforced() {
    let mut slice = valid_slice(StepKind::Guardian);
    slice.set("guardian_contact_no", json!("0412345678"));
    slice.set("guardian_cnic", json!("42101-123"));
    slice.set("guardian_email", json!("not-an-email"));

    let report = validate(StepKind::Guardian.schema(), &slice, today());
    assert_eq!(
        report.message("guardian_contact_no"),
        Some("Please enter a valid mobile number (03XXXXXXXXX)")
    );
    assert_eq!(
        report.message("guardian_cnic"),
        Some("Please enter CNIC in the format XXXXX-XXXXXXX-X")
    );
    assert_eq!(
        report.message("guardian_email"),
        Some("Please enter a valid email address")
    );
}

#[test]
fn admission_choices_must_match_catalog() {
    let mut slice = valid_slice(StepKind::Admission);
    slice.set("program", json!("ms"));
    let report = validate(StepKind::Admission.schema(), &slice, today());
    assert_eq!(
        report.message("program"),
        Some("Selected program is not offered for this qualification")
    );

    let mut slice = valid_slice(StepKind::Admission);
    slice.set("major", json!("marketing"));
    slice.set("campus", json!("bahria"));
    slice.set("program", json!("bba"));
    slice.set("qualification", json!("intermediate"));
    assert!(validate(StepKind::Admission.schema(), &slice, today()).is_valid());

    slice.set("major", json!("cs"));
    let report = validate(StepKind::Admission.schema(), &slice, today());
    assert_eq!(
        report.message("major"),
        Some("Selected major is not offered for this program")
    );
}

#[test]
fn transfer_students_name_previous_university() {
    let mut slice = valid_slice(StepKind::Admission);
    slice.set("admission_type", json!("transfer"));
    let report = validate(StepKind::Admission.schema(), &slice, today());
    assert_eq!(
        report.message("previous_university"),
        Some("Previous university is required for transfer students")
    );
}

#[test]
fn acknowledgement_steps_require_a_true_flag() {
    let slice = record(&[("agreement_accepted", json!(false))]);
    let report = validate(StepKind::Agreement.schema(), &slice, today());
    assert_eq!(
        report.message("agreement_accepted"),
        Some("You must accept the terms and conditions to continue")
    );
}

#[test]
fn acknowledgement_flags_reject_truthy_looking_values() {
    for raw in [json!("no"), json!(0), json!(1), json!("yes")] {
        let slice = record(&[("agreement_accepted", raw.clone())]);
        let report = validate(StepKind::Agreement.schema(), &slice, today());
        assert_eq!(
            report.message("agreement_accepted"),
            Some("You must accept the terms and conditions to continue"),
            "{raw}"
        );
    }
}
