//! Book instance (loanable copy) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::form::{add_error, DateInput, FormErrors, INVALID_DATE};
use crate::error::{AppError, AppResult};

/// Proposed renewal is three weeks out
pub const RENEWAL_PROPOSAL_DAYS: i64 = 21;

/// Renewals may not push the due date further than four weeks out
pub const RENEWAL_MAX_DAYS: i64 = 28;

/// Copy availability, stored as a one-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "maintenance" => Ok(LoanStatus::Maintenance),
            "o" | "on_loan" => Ok(LoanStatus::OnLoan),
            "a" | "available" => Ok(LoanStatus::Available),
            "r" | "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.trim().parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Full book instance model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub language_id: Option<i32>,
    pub status: LoanStatus,
}

impl BookInstance {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.due_back, Some(due) if due < today)
    }
}

/// Book instance joined with its book and borrower, for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookInstanceDetails {
    pub id: Uuid,
    pub book_id: i32,
    pub book_title: String,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub borrower_username: Option<String>,
    pub language_id: Option<i32>,
    pub status: LoanStatus,
    pub is_overdue: bool,
}

/// Filters of the copy administration listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookInstanceQuery {
    pub status: Option<LoanStatus>,
    pub due_back: Option<NaiveDate>,
    pub page: Option<i64>,
}

/// Create/update book instance request (copy administration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookInstanceForm {
    pub book_id: i32,
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1-200 characters"))]
    pub imprint: String,
    #[serde(default)]
    pub due_back: Option<NaiveDate>,
    #[serde(default)]
    pub borrower_id: Option<i32>,
    #[serde(default)]
    pub language_id: Option<i32>,
    #[serde(default)]
    pub status: LoanStatus,
}

impl BookInstanceForm {
    /// A copy on loan has a due date and a borrower; any other copy has neither
    pub fn check_loan_state(&self) -> AppResult<()> {
        match (self.status, self.due_back, self.borrower_id) {
            (LoanStatus::OnLoan, Some(_), Some(_)) => Ok(()),
            (LoanStatus::OnLoan, _, _) => Err(AppError::Validation(
                "A copy on loan needs both a due date and a borrower".to_string(),
            )),
            (_, None, None) => Ok(()),
            (status, _, _) => Err(AppError::Validation(format!(
                "A copy with status '{}' cannot have a due date or a borrower",
                status
            ))),
        }
    }
}

/// Renewal form: a single due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RenewBookForm {
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub due_back: Option<DateInput>,
}

impl RenewBookForm {
    /// Unbound form proposing a due date three weeks from `today`
    pub fn initial(today: NaiveDate) -> Self {
        Self {
            due_back: Some(DateInput::Valid(today + Duration::days(RENEWAL_PROPOSAL_DAYS))),
        }
    }

    /// Validate against `today`: no past dates, at most four weeks ahead
    pub fn clean(&self, today: NaiveDate) -> Result<NaiveDate, FormErrors> {
        let mut errors = FormErrors::new();
        match &self.due_back {
            None => add_error(&mut errors, "due_back", "This field is required."),
            Some(DateInput::Invalid(_)) => add_error(&mut errors, "due_back", INVALID_DATE),
            Some(DateInput::Valid(date)) if *date < today => {
                add_error(&mut errors, "due_back", "Invalid date - renewal in past")
            }
            Some(DateInput::Valid(date)) if *date > today + Duration::days(RENEWAL_MAX_DAYS) => {
                add_error(
                    &mut errors,
                    "due_back",
                    "Invalid date - renewal more than 4 weeks ahead",
                )
            }
            Some(DateInput::Valid(date)) => return Ok(*date),
        }
        Err(errors)
    }
}

/// Renewal page: the copy being renewed and its form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalPage {
    pub book_instance: BookInstanceDetails,
    pub form: RenewBookForm,
    pub errors: FormErrors,
}
