//! Author management

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorForm, CreateAuthor},
        form::{FormResponse, Submission},
    },
    repository::Repository,
};

pub type AuthorSubmission = Submission<Author, FormResponse<AuthorForm>>;

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    /// Form prefilled with the author's current values
    pub async fn edit_form(&self, id: i32) -> AppResult<FormResponse<AuthorForm>> {
        let author = self.repository.authors.get_by_id(id).await?;
        Ok(FormResponse::initial(AuthorForm::from(&author)))
    }

    pub async fn create(&self, author: CreateAuthor) -> AppResult<AuthorSubmission> {
        let form = AuthorForm::from(author);
        if let Err(errors) = form.clean() {
            return Ok(Submission::Invalid(FormResponse::with_errors(form, errors)));
        }

        let created = self.repository.authors.create(&form).await?;
        tracing::info!(id = created.id, name = %created.display_name(), "author created");
        Ok(Submission::Saved(created))
    }

    pub async fn update(&self, id: i32, form: AuthorForm) -> AppResult<AuthorSubmission> {
        self.repository.authors.get_by_id(id).await?;
        if let Err(errors) = form.clean() {
            return Ok(Submission::Invalid(FormResponse::with_errors(form, errors)));
        }

        let updated = self.repository.authors.update(id, &form).await?;
        tracing::info!(id, "author updated");
        Ok(Submission::Saved(updated))
    }

    /// Delete an author; refused while any book references them
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.count_by_author(id).await?;
        if books > 0 {
            return Err(AppError::HasDependents(format!(
                "Author {} still has {} books",
                id, books
            )));
        }

        self.repository.authors.delete(id).await?;
        tracing::info!(id, "author deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mary() -> CreateAuthor {
        CreateAuthor {
            first_name: "Mary".into(),
            last_name: "Shelley".into(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    #[tokio::test]
    async fn test_invalid_form_creates_nothing() {
        let repository = Repository::in_memory();
        let service = AuthorsService::new(repository.clone());

        let outcome = service
            .create(CreateAuthor {
                first_name: String::new(),
                ..mary()
            })
            .await
            .unwrap();
        match outcome {
            Submission::Invalid(response) => assert!(response.errors.contains_key("first_name")),
            Submission::Saved(_) => panic!("empty first name was accepted"),
        }
        assert_eq!(repository.authors.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_author_is_not_found() {
        let service = AuthorsService::new(Repository::in_memory());
        let result = service.update(42, AuthorForm::from(mary())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_without_books() {
        let repository = Repository::in_memory();
        let service = AuthorsService::new(repository.clone());
        let author = match service.create(mary()).await.unwrap() {
            Submission::Saved(author) => author,
            Submission::Invalid(_) => panic!("valid author rejected"),
        };

        service.delete(author.id).await.unwrap();
        assert!(matches!(
            repository.authors.get_by_id(author.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
