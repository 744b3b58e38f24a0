//! Canonical field resolution over human-authored column headers.
//!
//! Roster files arrive with every spelling of the same column a placement
//! cell has ever used. Each canonical field keeps an ordered alias list and
//! the first alias present with a non-empty value wins. Resolution is pure
//! and total: a row with none of the aliases simply resolves to nothing.

use crate::table::{CellValue, Row};

/// Logical fields the pipeline reads from a roster row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    StudentId,
    Name,
    College,
    Email,
    Phone,
    Course,
    Password,
    Credits,
}

/// Ordered alias lists, most common spelling first. Order is part of the
/// contract: the writer emits every credit alias and the resolver must pick
/// the same one every time.
const STUDENT_ID_ALIASES: &[&str] = &[
    "ID", "id", "Id", "Student ID", "student id", "Roll No", "roll no", "Roll Number",
];

const NAME_ALIASES: &[&str] = &[
    "Name",
    "name",
    "NAME",
    "Student Name",
    "student name",
    "Full Name",
    "full name",
];

const COLLEGE_ALIASES: &[&str] = &["College", "college", "COLLEGE", "College Name", "college name"];

const EMAIL_ALIASES: &[&str] = &[
    "Email",
    "email",
    "EMAIL",
    "Email Address",
    "email address",
    "E-mail",
    "Mail",
];

const PHONE_ALIASES: &[&str] = &[
    "Phone",
    "phone",
    "PHONE",
    "Mobile",
    "mobile",
    "Phone Number",
    "phone number",
    "Contact",
    "contact",
];

const COURSE_ALIASES: &[&str] = &[
    "Course", "course", "COURSE", "Branch", "branch", "Stream", "stream",
];

const PASSWORD_ALIASES: &[&str] = &["Password", "password", "PASSWORD", "Pass"];

const CREDIT_ALIASES: &[&str] = &[
    "Credits Assigned",
    "credits assigned",
    "CREDITS ASSIGNED",
    "Credits",
    "credits",
    "CREDITS",
    "Credit",
    "credit",
];

/// Pure resolver over the static alias tables.
pub struct FieldResolver;

impl FieldResolver {
    pub fn aliases(field: CanonicalField) -> &'static [&'static str] {
        match field {
            CanonicalField::StudentId => STUDENT_ID_ALIASES,
            CanonicalField::Name => NAME_ALIASES,
            CanonicalField::College => COLLEGE_ALIASES,
            CanonicalField::Email => EMAIL_ALIASES,
            CanonicalField::Phone => PHONE_ALIASES,
            CanonicalField::Course => COURSE_ALIASES,
            CanonicalField::Password => PASSWORD_ALIASES,
            CanonicalField::Credits => CREDIT_ALIASES,
        }
    }

    /// First alias present in the row with a non-empty value.
    pub fn resolve(row: &Row, field: CanonicalField) -> Option<&CellValue> {
        Self::aliases(field)
            .iter()
            .filter_map(|alias| row.get(*alias))
            .find(|value| !value.is_empty())
    }

    /// Resolved value rendered as trimmed text.
    pub fn resolve_text(row: &Row, field: CanonicalField) -> Option<String> {
        Self::resolve(row, field).map(|v| v.to_text().trim().to_string())
    }

    /// Resolved credit value as an integer; non-numeric text resolves to
    /// nothing.
    pub fn resolve_credits(row: &Row) -> Option<i32> {
        Self::resolve(row, CanonicalField::Credits)
            .and_then(|v| v.as_number())
            .map(|n| n as i32)
    }

    /// Whether a header spelling is one of the known credit aliases.
    pub fn is_credit_header(header: &str) -> bool {
        CREDIT_ALIASES.contains(&header)
    }
}
