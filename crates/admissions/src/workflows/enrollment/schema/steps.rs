use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::super::catalog::{ADMISSION_TYPES, QUALIFICATIONS, SHIFTS};
use super::super::format::InputFilter;
use super::options::*;
use super::{
    CatalogField, ClearRule, Condition, CopyRule, FieldDescriptor, FieldFormat, FieldKind,
    Persistence, StepSchema,
};

pub const STEP_COUNT: usize = 10;

/// The wizard's steps in the order they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Student,
    Admission,
    Basic,
    Residence,
    Guardian,
    Academic,
    Documents,
    Agreement,
    Processing,
    Test,
}

impl StepKind {
    pub const ALL: [StepKind; STEP_COUNT] = [
        StepKind::Student,
        StepKind::Admission,
        StepKind::Basic,
        StepKind::Residence,
        StepKind::Guardian,
        StepKind::Academic,
        StepKind::Documents,
        StepKind::Agreement,
        StepKind::Processing,
        StepKind::Test,
    ];

    /// One-based position in the wizard.
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .map(|index| index + 1)
            .unwrap_or(STEP_COUNT)
    }

    pub fn from_position(position: usize) -> Option<Self> {
        position
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn key(self) -> &'static str {
        match self {
            StepKind::Student => "student",
            StepKind::Admission => "admission",
            StepKind::Basic => "basic",
            StepKind::Residence => "residence",
            StepKind::Guardian => "guardian",
            StepKind::Academic => "academic",
            StepKind::Documents => "documents",
            StepKind::Agreement => "agreement",
            StepKind::Processing => "processing",
            StepKind::Test => "test",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            StepKind::Student => "Student Info",
            StepKind::Admission => "Admission Info",
            StepKind::Basic => "Basic Info",
            StepKind::Residence => "Residence Info",
            StepKind::Guardian => "Guardian's Info",
            StepKind::Academic => "Academic Info",
            StepKind::Documents => "Documents",
            StepKind::Agreement => "Agreement",
            StepKind::Processing => "Application Processing",
            StepKind::Test => "Entry Test",
        }
    }

    pub fn is_last(self) -> bool {
        self.position() == STEP_COUNT
    }

    pub fn schema(self) -> &'static StepSchema {
        static SCHEMAS: OnceLock<Vec<StepSchema>> = OnceLock::new();
        let schemas = SCHEMAS.get_or_init(|| Self::ALL.into_iter().map(build_schema).collect());
        &schemas[self.position() - 1]
    }
}

fn build_schema(kind: StepKind) -> StepSchema {
    let (persistence, fields, clear_rules, copy_rules) = match kind {
        StepKind::Student => (Persistence::Multipart, student_fields(), vec![], vec![]),
        StepKind::Admission => (
            Persistence::Json,
            admission_fields(),
            admission_clear_rules(),
            vec![],
        ),
        StepKind::Basic => (Persistence::Json, basic_fields(), basic_clear_rules(), vec![]),
        StepKind::Residence => (
            Persistence::Json,
            residence_fields(),
            residence_clear_rules(),
            residence_copy_rules(),
        ),
        StepKind::Guardian => (Persistence::Json, guardian_fields(), vec![], vec![]),
        StepKind::Academic => (
            Persistence::Json,
            academic_fields(),
            academic_clear_rules(),
            vec![],
        ),
        StepKind::Documents => (Persistence::Multipart, document_fields(), vec![], vec![]),
        StepKind::Agreement => (
            Persistence::None,
            vec![acknowledgement(
                "agreement_accepted",
                "Agreement",
                "You must accept the terms and conditions to continue",
            )],
            vec![],
            vec![],
        ),
        StepKind::Processing => (
            Persistence::None,
            vec![acknowledgement(
                "processing_acknowledged",
                "Processing acknowledgement",
                "Please acknowledge the processing information to continue",
            )],
            vec![],
            vec![],
        ),
        StepKind::Test => (
            Persistence::None,
            vec![acknowledgement(
                "test_acknowledged",
                "Test acknowledgement",
                "Please acknowledge the test instructions to continue",
            )],
            vec![],
            vec![],
        ),
    };

    StepSchema {
        kind,
        title: kind.title(),
        persistence,
        fields,
        clear_rules,
        copy_rules,
    }
}

fn acknowledgement(
    name: &'static str,
    label: &'static str,
    message: &'static str,
) -> FieldDescriptor {
    FieldDescriptor::new(name, label, FieldKind::Flag).required_message(message)
}

fn student_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("first_name", "First name", FieldKind::Text),
        FieldDescriptor::new("last_name", "Last name", FieldKind::Text),
        FieldDescriptor::new("email", "Email", FieldKind::Text).format(FieldFormat::Email),
        FieldDescriptor::new("phone_number", "Phone number", FieldKind::Text)
            .format(FieldFormat::Phone),
        FieldDescriptor::new("profile_image", "Profile photo", FieldKind::Attachment),
    ]
}

fn admission_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("qualification", "Current qualification", FieldKind::Choice)
            .options(QUALIFICATIONS),
        FieldDescriptor::new("admission_type", "Admission type", FieldKind::Choice)
            .options(ADMISSION_TYPES),
        FieldDescriptor::new("program", "Program", FieldKind::Choice).format(FieldFormat::Catalog {
            field: CatalogField::Program,
        }),
        FieldDescriptor::new("major", "Major", FieldKind::Choice).format(FieldFormat::Catalog {
            field: CatalogField::Major,
        }),
        FieldDescriptor::new("campus", "Campus", FieldKind::Choice).format(FieldFormat::Catalog {
            field: CatalogField::Campus,
        }),
        FieldDescriptor::new("shift", "Shift", FieldKind::Choice).options(SHIFTS),
        FieldDescriptor::new("previous_university", "Previous university", FieldKind::Text)
            .required_when(Condition::Equals {
                field: "admission_type",
                value: "transfer",
            })
            .required_message("Previous university is required for transfer students"),
        FieldDescriptor::new("previous_program", "Previous program", FieldKind::Text).optional(),
        FieldDescriptor::new("completed_semesters", "Completed semesters", FieldKind::Number)
            .optional(),
        FieldDescriptor::new("international_nationality", "Nationality", FieldKind::Text)
            .required_when(Condition::Equals {
                field: "admission_type",
                value: "international",
            })
            .format(FieldFormat::LettersOnly)
            .required_message("Nationality is required for international students"),
        FieldDescriptor::new(
            "international_passport_number",
            "Passport number",
            FieldKind::Text,
        )
        .optional(),
    ]
}

fn admission_clear_rules() -> Vec<ClearRule> {
    vec![
        ClearRule {
            trigger: "qualification",
            when: None,
            clears: &["program", "major", "campus"],
        },
        ClearRule {
            trigger: "program",
            when: None,
            clears: &["major"],
        },
        ClearRule {
            trigger: "admission_type",
            when: Some(Condition::NotEquals {
                field: "admission_type",
                value: "transfer",
            }),
            clears: &["previous_university", "previous_program", "completed_semesters"],
        },
        ClearRule {
            trigger: "admission_type",
            when: Some(Condition::NotEquals {
                field: "admission_type",
                value: "international",
            }),
            clears: &["international_nationality", "international_passport_number"],
        },
    ]
}

fn basic_fields() -> Vec<FieldDescriptor> {
    let dual_national = || Condition::Equals {
        field: "nationality",
        value: "Dual National",
    };

    vec![
        FieldDescriptor::new("father_name", "Father's name", FieldKind::Text)
            .format(FieldFormat::LettersOnly),
        FieldDescriptor::new("gender", "Gender", FieldKind::Choice).options(GENDERS),
        FieldDescriptor::new("date_of_birth", "Date of birth", FieldKind::Date)
            .format(FieldFormat::Age { min: 15, max: 60 }),
        FieldDescriptor::new("nationality", "Nationality", FieldKind::Choice)
            .options(NATIONALITIES),
        FieldDescriptor::new("religion", "Religion", FieldKind::Choice).options(RELIGIONS),
        FieldDescriptor::new("cnic", "CNIC", FieldKind::Text)
            .format(FieldFormat::Cnic)
            .input(InputFilter::Cnic),
        FieldDescriptor::new("province", "Province", FieldKind::Choice).options(PROVINCES),
        FieldDescriptor::new("second_nationality", "Second nationality", FieldKind::Text)
            .required_when(dual_national())
            .format(FieldFormat::LettersOnly)
            .required_message("Second nationality is required for dual nationals"),
        FieldDescriptor::new("passport_number", "Passport number", FieldKind::Text)
            .required_when(dual_national())
            .format(FieldFormat::MinLength { min: 6 })
            .required_message("Passport number is required for dual nationals"),
        FieldDescriptor::new("disability", "Disability", FieldKind::Choice)
            .optional()
            .options(DISABILITIES),
        FieldDescriptor::new("disability_details", "Disability details", FieldKind::Text)
            .required_when(Condition::All {
                conditions: vec![
                    Condition::Present { field: "disability" },
                    Condition::NotEquals {
                        field: "disability",
                        value: "None",
                    },
                ],
            })
            .required_message("Please provide disability details"),
    ]
}

fn basic_clear_rules() -> Vec<ClearRule> {
    vec![
        ClearRule {
            trigger: "nationality",
            when: Some(Condition::NotEquals {
                field: "nationality",
                value: "Dual National",
            }),
            clears: &["second_nationality", "passport_number"],
        },
        ClearRule {
            trigger: "disability",
            when: Some(Condition::Equals {
                field: "disability",
                value: "None",
            }),
            clears: &["disability_details"],
        },
    ]
}

const PERMANENT_ADDRESS_FIELDS: &[&str] = &[
    "permanent_address",
    "permanent_city",
    "permanent_area",
    "permanent_postal_code",
];

fn residence_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("present_address", "Present address", FieldKind::Text),
        FieldDescriptor::new("present_city", "Present city", FieldKind::Choice).options(CITIES),
        FieldDescriptor::new("present_area", "Present area", FieldKind::Text),
        FieldDescriptor::new("present_postal_code", "Present postal code", FieldKind::Text)
            .format(FieldFormat::PostalCode)
            .input(InputFilter::Digits(5)),
        FieldDescriptor::new(
            "same_as_present_address",
            "Same as present address",
            FieldKind::Flag,
        )
        .optional(),
        FieldDescriptor::new("permanent_address", "Permanent address", FieldKind::Text),
        FieldDescriptor::new("permanent_city", "Permanent city", FieldKind::Choice)
            .options(CITIES),
        FieldDescriptor::new("permanent_area", "Permanent area", FieldKind::Text),
        FieldDescriptor::new(
            "permanent_postal_code",
            "Permanent postal code",
            FieldKind::Text,
        )
        .optional()
        .format(FieldFormat::PostalCode)
        .input(InputFilter::Digits(5)),
    ]
}

fn residence_clear_rules() -> Vec<ClearRule> {
    vec![ClearRule {
        trigger: "same_as_present_address",
        when: Some(Condition::NotEquals {
            field: "same_as_present_address",
            value: "true",
        }),
        clears: PERMANENT_ADDRESS_FIELDS,
    }]
}

fn residence_copy_rules() -> Vec<CopyRule> {
    vec![CopyRule {
        when: Condition::Equals {
            field: "same_as_present_address",
            value: "true",
        },
        pairs: &[
            ("present_address", "permanent_address"),
            ("present_city", "permanent_city"),
            ("present_area", "permanent_area"),
            ("present_postal_code", "permanent_postal_code"),
        ],
    }]
}

fn guardian_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("guardian_name", "Guardian name", FieldKind::Text)
            .format(FieldFormat::PersonName),
        FieldDescriptor::new("guardian_relationship", "Relationship", FieldKind::Choice)
            .options(RELATIONSHIPS),
        FieldDescriptor::new("guardian_contact_no", "Contact number", FieldKind::Text)
            .format(FieldFormat::PakistaniMobile)
            .input(InputFilter::Digits(11)),
        FieldDescriptor::new("guardian_cnic", "Guardian CNIC", FieldKind::Text)
            .format(FieldFormat::Cnic)
            .input(InputFilter::Cnic),
        FieldDescriptor::new("guardian_education", "Education", FieldKind::Choice)
            .optional()
            .options(EDUCATION_LEVELS),
        FieldDescriptor::new("guardian_occupation", "Occupation", FieldKind::Text).optional(),
        FieldDescriptor::new("guardian_organization", "Organization", FieldKind::Text).optional(),
        FieldDescriptor::new("guardian_designation", "Designation", FieldKind::Text).optional(),
        FieldDescriptor::new("guardian_email", "Email", FieldKind::Text)
            .optional()
            .format(FieldFormat::Email),
    ]
}

fn academic_fields() -> Vec<FieldDescriptor> {
    let marks = FieldFormat::IntegerRange {
        min: 0,
        max: MAX_OBTAINED_MARKS,
    };

    vec![
        FieldDescriptor::new("matric_system", "Matric education system", FieldKind::Choice)
            .options(MATRIC_SYSTEMS),
        FieldDescriptor::new("matric_board", "Matric board", FieldKind::Choice).options(BOARDS),
        FieldDescriptor::new("matric_year", "Matric passing year", FieldKind::Year),
        FieldDescriptor::new("matric_group", "Matric group", FieldKind::Choice).options(GROUPS),
        FieldDescriptor::new("matric_institute", "Matric institute", FieldKind::Text),
        FieldDescriptor::new("matric_roll_number", "Matric roll number", FieldKind::Text)
            .format(FieldFormat::RollNumber),
        FieldDescriptor::new(
            "matric_obtained_marks",
            "Matric obtained marks",
            FieldKind::Number,
        )
        .format(marks.clone()),
        FieldDescriptor::new(
            "matric_result_status",
            "Matric result status",
            FieldKind::Choice,
        )
        .optional()
        .options(MATRIC_RESULT_STATUSES),
        FieldDescriptor::new("inter_system", "Intermediate education system", FieldKind::Choice)
            .options(INTER_SYSTEMS),
        FieldDescriptor::new("inter_board", "Intermediate board", FieldKind::Choice)
            .options(BOARDS),
        FieldDescriptor::new("inter_year", "Intermediate passing year", FieldKind::Year).format(
            FieldFormat::YearAfter {
                field: "matric_year",
                label: "Matric passing year",
                gap: 2,
            },
        ),
        FieldDescriptor::new("inter_group", "Intermediate group", FieldKind::Choice)
            .options(GROUPS),
        FieldDescriptor::new("inter_institute", "Intermediate institute", FieldKind::Text),
        FieldDescriptor::new(
            "inter_result_status",
            "Intermediate result status",
            FieldKind::Choice,
        )
        .options(INTER_RESULT_STATUSES),
        FieldDescriptor::new(
            "inter_roll_number",
            "Intermediate roll number",
            FieldKind::Text,
        )
        .required_when(Condition::OneOf {
            field: "inter_result_status",
            values: INTER_RESULT_STATUSES,
        })
        .format(FieldFormat::RollNumber),
        FieldDescriptor::new(
            "inter_obtained_marks",
            "Intermediate obtained marks",
            FieldKind::Number,
        )
        .required_when(Condition::Equals {
            field: "inter_result_status",
            value: "Passed",
        })
        .format(marks),
    ]
}

fn academic_clear_rules() -> Vec<ClearRule> {
    vec![ClearRule {
        trigger: "inter_result_status",
        when: Some(Condition::NotEquals {
            field: "inter_result_status",
            value: "Passed",
        }),
        clears: &["inter_obtained_marks"],
    }]
}

/// Document field keys paired with whether the upload is mandatory.
pub const DOCUMENTS: &[(&str, &str, bool)] = &[
    ("nic_front", "NIC front", true),
    ("nic_back", "NIC back", true),
    ("matric_marksheet", "Matric marksheet", true),
    ("inter_part2_marksheet", "Intermediate part 2 marksheet", true),
    ("guardian_cnic_copy", "Guardian's CNIC", true),
    ("matric_certificate", "Matric certificate", false),
    ("inter_part1_marksheet", "Intermediate part 1 marksheet", false),
];

fn document_fields() -> Vec<FieldDescriptor> {
    DOCUMENTS
        .iter()
        .map(|&(name, label, required)| {
            let descriptor = FieldDescriptor::new(name, label, FieldKind::Attachment)
                .required_message("This document is required");
            if required {
                descriptor
            } else {
                descriptor.optional()
            }
        })
        .collect()
}
