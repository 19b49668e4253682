//! Generic interpreter for [`StepSchema`] descriptors.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::catalog;
use super::record::ApplicationRecord;
use super::schema::{CatalogField, FieldDescriptor, FieldFormat, FieldKind, StepSchema};

/// Field-to-message map produced by [`validate`]. Empty means the slice is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    /// First message in field order, used as the inline summary.
    pub fn first_message(&self) -> Option<&str> {
        self.errors.values().next().map(String::as_str)
    }
}

/// Validate one step's slice. `today` anchors age checks.
pub fn validate(schema: &StepSchema, slice: &ApplicationRecord, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();

    for field in &schema.fields {
        let Some(value) = slice.text(field.name) else {
            if field.requirement.applies(slice) {
                report.insert(field.name, field.missing_message());
            }
            continue;
        };

        if let Some(message) = check_field(field, &value, slice, today) {
            report.insert(field.name, message);
        }
    }

    report
}

fn check_field(
    field: &FieldDescriptor,
    value: &str,
    slice: &ApplicationRecord,
    today: NaiveDate,
) -> Option<String> {
    if let Some(message) = check_kind(field, value) {
        return Some(message);
    }

    field
        .formats
        .iter()
        .find_map(|format| check_format(field, format, value, slice, today))
}

fn check_kind(field: &FieldDescriptor, value: &str) -> Option<String> {
    match field.kind {
        FieldKind::Date => parse_date(value)
            .is_none()
            .then(|| "Please enter a valid date (YYYY-MM-DD)".to_string()),
        FieldKind::Year => parse_year(value)
            .is_none()
            .then(|| format!("{} must be a four-digit year", field.label)),
        FieldKind::Number => value
            .parse::<i64>()
            .is_err()
            .then(|| format!("{} must be a whole number", field.label)),
        FieldKind::Flag => (value != "true").then(|| field.missing_message()),
        FieldKind::Text | FieldKind::Choice | FieldKind::Attachment => None,
    }
}

fn check_format(
    field: &FieldDescriptor,
    format: &FieldFormat,
    value: &str,
    slice: &ApplicationRecord,
    today: NaiveDate,
) -> Option<String> {
    match format {
        FieldFormat::PersonName => (!matches(Pattern::PersonName, value))
            .then(|| format!("{} contains invalid characters", field.label)),
        FieldFormat::LettersOnly => (!matches(Pattern::LettersOnly, value))
            .then(|| format!("{} should only contain letters", field.label)),
        FieldFormat::Email => (!matches(Pattern::Email, value))
            .then(|| "Please enter a valid email address".to_string()),
        FieldFormat::Phone => (!matches(Pattern::Phone, value))
            .then(|| "Please enter a valid phone number".to_string()),
        FieldFormat::PakistaniMobile => (!matches(Pattern::PakistaniMobile, value))
            .then(|| "Please enter a valid mobile number (03XXXXXXXXX)".to_string()),
        FieldFormat::Cnic => (!matches(Pattern::Cnic, value))
            .then(|| "Please enter CNIC in the format XXXXX-XXXXXXX-X".to_string()),
        FieldFormat::PostalCode => (!matches(Pattern::PostalCode, value))
            .then(|| "Please enter a valid 5-digit postal code".to_string()),
        FieldFormat::RollNumber => (!matches(Pattern::RollNumber, value))
            .then(|| "Invalid roll number format".to_string()),
        FieldFormat::MinLength { min } => (value.chars().count() < *min)
            .then(|| format!("{} must be at least {min} characters", field.label)),
        FieldFormat::IntegerRange { min, max } => check_range(field, value, *min, *max),
        FieldFormat::Age { min, max } => check_age(value, *min, *max, today),
        FieldFormat::YearAfter { field: other, label, gap } => {
            let year = parse_year(value)?;
            let earlier = slice.text(other).as_deref().and_then(parse_year)?;
            (year < earlier + gap)
                .then(|| format!("{} must be at least {gap} years after {label}", field.label))
        }
        FieldFormat::OneOfOptions => (!field.options.iter().any(|option| *option == value))
            .then(|| format!("{} must be one of the listed options", field.label)),
        FieldFormat::Catalog { field: lookup } => check_catalog(*lookup, value, slice),
    }
}

fn check_range(field: &FieldDescriptor, value: &str, min: i64, max: i64) -> Option<String> {
    let number = value.parse::<i64>().ok()?;
    if number < min {
        return Some(if min == 0 {
            format!("{} cannot be negative", field.label)
        } else {
            format!("{} cannot be less than {min}", field.label)
        });
    }
    (number > max).then(|| format!("{} cannot exceed {max}", field.label))
}

fn check_age(value: &str, min: u32, max: u32, today: NaiveDate) -> Option<String> {
    let Some(born) = parse_date(value) else {
        return Some("Please enter a valid date (YYYY-MM-DD)".to_string());
    };
    match age_on(born, today) {
        None => Some("Please verify the date of birth".to_string()),
        Some(age) if age < min => Some(format!("You must be at least {min} years old")),
        Some(age) if age > max => Some("Please verify the date of birth".to_string()),
        Some(_) => None,
    }
}

fn check_catalog(lookup: CatalogField, value: &str, slice: &ApplicationRecord) -> Option<String> {
    let qualification = slice.text("qualification").unwrap_or_default();
    let chosen_program = slice.text("program");
    let chosen_campus = slice.text("campus");

    match lookup {
        CatalogField::Qualification => (!catalog::QUALIFICATIONS.iter().any(|q| *q == value))
            .then(|| "Please select a valid qualification".to_string()),
        CatalogField::Program => {
            if catalog::program(&qualification, value).is_none() {
                return Some("Selected program is not offered for this qualification".to_string());
            }
            let campus = chosen_campus.as_deref().and_then(catalog::campus)?;
            (!campus.programs.iter().any(|offered| *offered == value))
                .then(|| "Selected program is not offered at this campus".to_string())
        }
        CatalogField::Major => {
            let program = chosen_program.unwrap_or_default();
            let offered = catalog::available_majors(&qualification, &program);
            (!offered.iter().any(|major| major.value == value))
                .then(|| "Selected major is not offered for this program".to_string())
        }
        CatalogField::Campus => {
            let Some(campus) = catalog::campus(value) else {
                return Some("Please select a valid campus".to_string());
            };
            let program = chosen_program?;
            (!campus.programs.iter().any(|offered| *offered == program))
                .then(|| "Selected campus does not offer this program".to_string())
        }
    }
}

/// Whole years between `born` and `today`; `None` when born in the future.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> Option<u32> {
    if born > today {
        return None;
    }
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_year(value: &str) -> Option<i32> {
    if value.len() != 4 {
        return None;
    }
    value.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Pattern {
    PersonName,
    LettersOnly,
    Email,
    Phone,
    PakistaniMobile,
    Cnic,
    PostalCode,
    RollNumber,
}

impl Pattern {
    const ALL: [Pattern; 8] = [
        Pattern::PersonName,
        Pattern::LettersOnly,
        Pattern::Email,
        Pattern::Phone,
        Pattern::PakistaniMobile,
        Pattern::Cnic,
        Pattern::PostalCode,
        Pattern::RollNumber,
    ];

    fn source(self) -> &'static str {
        match self {
            Pattern::PersonName => r"^[\p{L}\s'\-]+$",
            Pattern::LettersOnly => r"^[A-Za-z\s]+$",
            Pattern::Email => r"^[^\s@]+@[^\s@]+\.[^\s@]+$",
            Pattern::Phone => r"^[\d\s\-+()]{10,}$",
            Pattern::PakistaniMobile => r"^03\d{9}$",
            Pattern::Cnic => r"^\d{5}-\d{7}-\d$",
            Pattern::PostalCode => r"^\d{5}$",
            Pattern::RollNumber => r"^[A-Za-z0-9-]+$",
        }
    }
}

static PATTERNS: OnceLock<HashMap<Pattern, Regex>> = OnceLock::new();

fn matches(pattern: Pattern, value: &str) -> bool {
    let patterns = PATTERNS.get_or_init(|| {
        Pattern::ALL
            .into_iter()
            .filter_map(|pattern| match Regex::new(pattern.source()) {
                Ok(regex) => Some((pattern, regex)),
                Err(error) => {
                    tracing::error!(?pattern, %error, "failed to compile field pattern");
                    None
                }
            })
            .collect()
    });

    patterns
        .get(&pattern)
        .is_some_and(|regex| regex.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn age_counts_completed_years() {
        let today = day(2025, 6, 15);
        assert_eq!(age_on(day(2010, 6, 15), today), Some(15));
        assert_eq!(age_on(day(2010, 6, 16), today), Some(14));
        assert_eq!(age_on(day(2026, 1, 1), today), None);
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let today = day(2025, 6, 15);
        assert_eq!(check_age("2010-06-15", 15, 60, today), None);
        assert_eq!(check_age("1965-06-15", 15, 60, today), None);
        assert_eq!(
            check_age("2010-06-16", 15, 60, today).as_deref(),
            Some("You must be at least 15 years old")
        );
        assert_eq!(
            check_age("1965-06-14", 15, 60, today).as_deref(),
            Some("Please verify the date of birth")
        );
        assert_eq!(
            check_age("15/06/2010", 15, 60, today).as_deref(),
            Some("Please enter a valid date (YYYY-MM-DD)")
        );
    }

    #[test]
    fn patterns_accept_expected_shapes() {
        assert!(matches(Pattern::PersonName, "Zoë O'Neil-Khan"));
        assert!(!matches(Pattern::PersonName, "R2D2"));
        assert!(matches(Pattern::Phone, "+92 (300) 123-4567"));
        assert!(!matches(Pattern::Phone, "12345"));
        assert!(matches(Pattern::PakistaniMobile, "03001234567"));
        assert!(!matches(Pattern::PakistaniMobile, "04001234567"));
        assert!(matches(Pattern::Cnic, "12345-1234567-1"));
        assert!(!matches(Pattern::Cnic, "123451234567-1"));
        assert!(matches(Pattern::RollNumber, "KB-2021-778"));
        assert!(!matches(Pattern::RollNumber, "KB 2021"));
    }
}
