//! Form redisplay payloads

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Wire format of form dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const INVALID_DATE: &str = "Enter a valid date.";

/// Field name -> error messages, in field order
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// A form echoed back to the caller, with any field errors
#[derive(Debug, Serialize, ToSchema)]
pub struct FormResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub form: T,
    pub errors: FormErrors,
}

impl<T> FormResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Unbound form with its initial values
    pub fn initial(form: T) -> Self {
        Self {
            form,
            errors: FormErrors::new(),
        }
    }

    pub fn with_errors(form: T, errors: FormErrors) -> Self {
        Self { form, errors }
    }
}

/// Outcome of a form submission: the saved record, or the form to redisplay
#[derive(Debug)]
pub enum Submission<T, F> {
    Saved(T),
    Invalid(F),
}

/// A date field as submitted. Text that is not a date is kept so the form
/// can be redisplayed with the caller's input and a field error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Valid(NaiveDate),
    Invalid(String),
}

impl DateInput {
    pub fn parse(raw: &str) -> Self {
        match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => DateInput::Valid(date),
            Err(_) => DateInput::Invalid(raw.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateInput::Valid(date) => Some(*date),
            DateInput::Invalid(_) => None,
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Valid(date)
    }
}

impl Serialize for DateInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DateInput::Valid(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
            DateInput::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for DateInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DateInput::parse(&raw))
    }
}

/// Parsed value of an optional date field; invalid text counts as absent
pub fn date_value(input: &Option<DateInput>) -> Option<NaiveDate> {
    input.as_ref().and_then(DateInput::date)
}

/// Record "Enter a valid date." when an optional date field holds bad text
pub fn check_date(errors: &mut FormErrors, field: &str, input: &Option<DateInput>) {
    if let Some(DateInput::Invalid(_)) = input {
        add_error(errors, field, INVALID_DATE);
    }
}

/// Record an error message against a field
pub fn add_error(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Flatten validator output into per-field messages
pub fn from_validation(errors: &ValidationErrors) -> FormErrors {
    let mut out = FormErrors::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value ({})", error.code));
            add_error(&mut out, &field.to_string(), message);
        }
    }
    out
}
