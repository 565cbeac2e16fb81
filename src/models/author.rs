//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{
    book::BookShort,
    form::{check_date, date_value, from_validation, DateInput, FormErrors},
};

/// Placeholder death date pre-filled on the author creation form
pub fn date_of_death_placeholder() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 11, 6)
}

fn placeholder_input() -> Option<DateInput> {
    date_of_death_placeholder().map(DateInput::from)
}

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "Last, First" as shown in listings
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Author with the books attributed to them
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<BookShort>,
}

/// Author fields as stored and as accepted by the update form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct AuthorForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<DateInput>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_death: Option<DateInput>,
}

impl AuthorForm {
    /// Field errors from the length rules and the date fields
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => from_validation(&e),
        };
        check_date(&mut errors, "date_of_birth", &self.date_of_birth);
        check_date(&mut errors, "date_of_death", &self.date_of_death);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        date_value(&self.date_of_birth)
    }

    pub fn death_date(&self) -> Option<NaiveDate> {
        date_value(&self.date_of_death)
    }
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: author.date_of_birth.map(DateInput::from),
            date_of_death: author.date_of_death.map(DateInput::from),
        }
    }
}

/// Create author request.
///
/// An omitted `date_of_death` takes the placeholder date; an explicit
/// `null` leaves it empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAuthor {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<DateInput>,
    #[serde(default = "placeholder_input")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_death: Option<DateInput>,
}

impl CreateAuthor {
    /// Values of the unbound creation form
    pub fn initial() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            date_of_death: placeholder_input(),
        }
    }
}

impl From<CreateAuthor> for AuthorForm {
    fn from(c: CreateAuthor) -> Self {
        Self {
            first_name: c.first_name,
            last_name: c.last_name,
            date_of_birth: c.date_of_birth,
            date_of_death: c.date_of_death,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_date_of_death_uses_placeholder() {
        let create: CreateAuthor =
            serde_json::from_str(r#"{"first_name": "Ursula", "last_name": "Le Guin"}"#).unwrap();
        assert_eq!(
            create.date_of_death,
            Some(DateInput::Valid(NaiveDate::from_ymd_opt(2020, 11, 6).unwrap()))
        );

        let explicit: CreateAuthor = serde_json::from_str(
            r#"{"first_name": "Ursula", "last_name": "Le Guin", "date_of_death": null}"#,
        )
        .unwrap();
        assert_eq!(explicit.date_of_death, None);
    }

    #[test]
    fn test_name_length_rules() {
        let mut form = AuthorForm {
            first_name: String::new(),
            last_name: "x".repeat(101),
            date_of_birth: None,
            date_of_death: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
        assert!(errors.field_errors().contains_key("last_name"));

        form.first_name = "Terry".into();
        form.last_name = "Pratchett".into();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_bad_dates_are_field_errors() {
        let form: AuthorForm = serde_json::from_str(
            r#"{"first_name": "Mary", "last_name": "Shelley", "date_of_birth": "1797-02-30"}"#,
        )
        .unwrap();
        let errors = form.clean().unwrap_err();
        assert_eq!(errors["date_of_birth"], vec!["Enter a valid date."]);
        assert!(!errors.contains_key("date_of_death"));
        assert_eq!(form.birth_date(), None);

        let echoed = serde_json::to_value(&form).unwrap();
        assert_eq!(echoed["date_of_birth"], "1797-02-30");
    }

    #[test]
    fn test_missing_names_are_field_errors() {
        let form: AuthorForm = serde_json::from_str(r#"{"first_name": "Mary"}"#).unwrap();
        let errors = form.clean().unwrap_err();
        assert!(errors.contains_key("last_name"));
        assert!(!errors.contains_key("first_name"));
    }

    #[test]
    fn test_display_name() {
        let author = Author {
            id: 1,
            first_name: "Iain".into(),
            last_name: "Banks".into(),
            date_of_birth: None,
            date_of_death: None,
        };
        assert_eq!(author.display_name(), "Banks, Iain");
    }
}
