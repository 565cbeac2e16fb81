//! Loans: the my-loans listing, renewals and copy administration

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{
            BookInstance, BookInstanceDetails, BookInstanceForm, BookInstanceQuery, RenewBookForm,
            RenewalPage,
        },
        form::Submission,
        pagination::{PageRequest, PaginatedResponse, DEFAULT_PER_PAGE},
        user::UserClaims,
    },
    repository::{InstanceFilter, Repository},
};

pub type RenewalSubmission = Submission<BookInstance, RenewalPage>;

/// Current date in the server's local time zone
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Copies on loan visible to the caller
#[derive(Debug, Serialize, ToSchema)]
pub struct MyLoans {
    #[serde(flatten)]
    pub loans: PaginatedResponse<BookInstanceDetails>,
    /// Librarians see every member's loans
    pub is_librarian: bool,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Copies on loan, soonest due first: all of them for librarians,
    /// only the caller's own otherwise
    pub async fn my_loans(&self, claims: &UserClaims, page: PageRequest) -> AppResult<MyLoans> {
        let is_librarian = claims.is_librarian();
        let filter = if is_librarian {
            InstanceFilter::on_loan(None)
        } else {
            InstanceFilter::on_loan(Some(claims.user_id))
        };

        let (items, total) = self
            .repository
            .book_instances
            .list(filter, page, today())
            .await?;
        Ok(MyLoans {
            loans: PaginatedResponse::new(items, total, page)?,
            is_librarian,
        })
    }

    /// Renewal page proposing a due date three weeks out
    pub async fn renewal_page(&self, id: Uuid) -> AppResult<RenewalPage> {
        self.renewal_page_on(id, today()).await
    }

    async fn renewal_page_on(&self, id: Uuid, today: NaiveDate) -> AppResult<RenewalPage> {
        let book_instance = self.repository.book_instances.get_details(id, today).await?;
        Ok(RenewalPage {
            book_instance,
            form: RenewBookForm::initial(today),
            errors: Default::default(),
        })
    }

    pub async fn renew(&self, id: Uuid, form: RenewBookForm) -> AppResult<RenewalSubmission> {
        self.renew_on(id, form, today()).await
    }

    /// Validate `form` against `today` and move the copy's due date.
    /// Nothing but `due_back` of that one copy changes.
    pub async fn renew_on(
        &self,
        id: Uuid,
        form: RenewBookForm,
        today: NaiveDate,
    ) -> AppResult<RenewalSubmission> {
        let book_instance = self.repository.book_instances.get_details(id, today).await?;

        let due_back = match form.clean(today) {
            Ok(date) => date,
            Err(errors) => {
                return Ok(Submission::Invalid(RenewalPage {
                    book_instance,
                    form,
                    errors,
                }))
            }
        };

        if !self.repository.book_instances.renew(id, due_back).await? {
            return Err(AppError::BusinessRule(format!(
                "Book instance {} is not on loan",
                id
            )));
        }
        tracing::info!(instance = %id, %due_back, "loan renewed");

        Ok(Submission::Saved(
            self.repository.book_instances.get_by_id(id).await?,
        ))
    }

    /// Copy administration listing, filterable by status and due date
    pub async fn list_instances(
        &self,
        query: &BookInstanceQuery,
    ) -> AppResult<PaginatedResponse<BookInstanceDetails>> {
        let page = PageRequest::new(query.page, DEFAULT_PER_PAGE)?;
        let filter = InstanceFilter {
            status: query.status,
            borrower_id: None,
            due_back: query.due_back,
        };
        let (items, total) = self
            .repository
            .book_instances
            .list(filter, page, today())
            .await?;
        PaginatedResponse::new(items, total, page)
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<BookInstanceDetails> {
        self.repository.book_instances.get_details(id, today()).await
    }

    fn check_instance(form: &BookInstanceForm) -> AppResult<()> {
        form.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        form.check_loan_state()
    }

    pub async fn create_instance(&self, form: BookInstanceForm) -> AppResult<BookInstance> {
        Self::check_instance(&form)?;
        let created = self.repository.book_instances.create(&form).await?;
        tracing::info!(instance = %created.id, book_id = created.book_id, "book instance created");
        Ok(created)
    }

    pub async fn update_instance(&self, id: Uuid, form: BookInstanceForm) -> AppResult<BookInstance> {
        Self::check_instance(&form)?;
        let updated = self.repository.book_instances.update(id, &form).await?;
        tracing::info!(instance = %id, status = %updated.status, "book instance updated");
        Ok(updated)
    }

    pub async fn delete_instance(&self, id: Uuid) -> AppResult<()> {
        self.repository.book_instances.delete(id).await?;
        tracing::info!(instance = %id, "book instance deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{
        book::BookForm,
        book_instance::LoanStatus,
        user::{NewUser, LIBRARIANS_GROUP},
    };

    struct Fixture {
        repository: Repository,
        service: LoansService,
        book_id: i32,
        today: NaiveDate,
    }

    async fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        let book = repository
            .books
            .create(&BookForm {
                title: "Beloved".into(),
                author_id: None,
                summary: "A novel".into(),
                isbn: "9781400033416".into(),
                genre_ids: vec![],
                language_id: None,
            })
            .await
            .unwrap();
        Fixture {
            service: LoansService::new(repository.clone()),
            repository,
            book_id: book.id,
            today: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        }
    }

    async fn member(repository: &Repository, username: &str) -> i32 {
        repository
            .users
            .create(&NewUser {
                username: username.into(),
                password_hash: "!".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: None,
            })
            .await
            .unwrap()
            .id
    }

    fn claims(user_id: i32, librarian: bool) -> UserClaims {
        UserClaims {
            sub: format!("user{}", user_id),
            user_id,
            groups: if librarian {
                vec![LIBRARIANS_GROUP.into()]
            } else {
                vec![]
            },
            permissions: vec![],
            exp: 0,
            iat: 0,
        }
    }

    async fn lend(f: &Fixture, borrower: i32, due_back: NaiveDate) -> BookInstance {
        f.service
            .create_instance(BookInstanceForm {
                book_id: f.book_id,
                imprint: "Knopf, 1987".into(),
                due_back: Some(due_back),
                borrower_id: Some(borrower),
                language_id: None,
                status: LoanStatus::OnLoan,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_my_loans_scoping_and_order() {
        let f = fixture().await;
        let ann = member(&f.repository, "ann").await;
        let bob = member(&f.repository, "bob").await;
        lend(&f, ann, f.today + Duration::days(9)).await;
        lend(&f, bob, f.today + Duration::days(2)).await;
        lend(&f, ann, f.today + Duration::days(4)).await;

        let page = PageRequest::new(None, DEFAULT_PER_PAGE).unwrap();
        let own = f.service.my_loans(&claims(ann, false), page).await.unwrap();
        assert!(!own.is_librarian);
        assert_eq!(own.loans.total, 2);
        assert!(own.loans.items.iter().all(|i| i.borrower_id == Some(ann)));
        assert!(own.loans.items[0].due_back < own.loans.items[1].due_back);

        let all = f.service.my_loans(&claims(bob, true), page).await.unwrap();
        assert!(all.is_librarian);
        let due: Vec<_> = all.loans.items.iter().map(|i| i.due_back).collect();
        assert_eq!(due.len(), 3);
        assert!(due.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_renewal_moves_only_the_due_date() {
        let f = fixture().await;
        let ann = member(&f.repository, "ann").await;
        let renewed = lend(&f, ann, f.today).await;
        let other = lend(&f, ann, f.today).await;

        let new_date = f.today + Duration::days(28);
        let outcome = f
            .service
            .renew_on(renewed.id, RenewBookForm { due_back: Some(new_date.into()) }, f.today)
            .await
            .unwrap();

        let Submission::Saved(after) = outcome else {
            panic!("renewal at the four week limit was rejected");
        };
        assert_eq!(
            after,
            BookInstance {
                due_back: Some(new_date),
                ..renewed
            }
        );
        assert_eq!(f.repository.book_instances.get_by_id(other.id).await.unwrap(), other);
    }

    #[tokio::test]
    async fn test_invalid_renewal_is_redisplayed() {
        let f = fixture().await;
        let ann = member(&f.repository, "ann").await;
        let instance = lend(&f, ann, f.today).await;

        let form = RenewBookForm {
            due_back: Some((f.today - Duration::days(1)).into()),
        };
        let outcome = f.service.renew_on(instance.id, form.clone(), f.today).await.unwrap();
        let Submission::Invalid(page) = outcome else {
            panic!("past date accepted");
        };
        assert_eq!(page.form, form);
        assert_eq!(page.book_instance.id, instance.id);
        assert_eq!(
            f.repository.book_instances.get_by_id(instance.id).await.unwrap(),
            instance
        );
    }

    #[tokio::test]
    async fn test_renewing_an_available_copy_is_refused() {
        let f = fixture().await;
        let copy = f
            .service
            .create_instance(BookInstanceForm {
                book_id: f.book_id,
                imprint: "Knopf, 1987".into(),
                due_back: None,
                borrower_id: None,
                language_id: None,
                status: LoanStatus::Available,
            })
            .await
            .unwrap();

        let result = f
            .service
            .renew_on(copy.id, RenewBookForm { due_back: Some(f.today.into()) }, f.today)
            .await;
        assert!(matches!(result, Err(AppError::BusinessRule(_))));
        assert!(matches!(
            f.service.renew_on(Uuid::new_v4(), RenewBookForm { due_back: Some(f.today.into()) }, f.today).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inconsistent_copy_state_is_rejected() {
        let f = fixture().await;
        let result = f
            .service
            .create_instance(BookInstanceForm {
                book_id: f.book_id,
                imprint: "Knopf, 1987".into(),
                due_back: None,
                borrower_id: None,
                language_id: None,
                status: LoanStatus::OnLoan,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(f.repository.book_instances.count().await.unwrap(), 0);
    }
}
