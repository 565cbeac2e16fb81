//! Book management

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm},
        form::{add_error, from_validation, FormErrors, FormResponse, Submission},
    },
    repository::Repository,
};

pub type BookSubmission = Submission<Book, FormResponse<BookForm>>;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Form prefilled with the book's current values
    pub async fn edit_form(&self, id: i32) -> AppResult<FormResponse<BookForm>> {
        let book = self.repository.books.get_by_id(id).await?;
        Ok(FormResponse::initial(BookForm::from(&book)))
    }

    /// Field rules plus existence of the referenced author, language and genres
    async fn check(&self, form: &BookForm) -> AppResult<FormErrors> {
        let mut errors = match form.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => from_validation(&e),
        };

        if let Some(author_id) = form.author_id {
            match self.repository.authors.get_by_id(author_id).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => add_error(&mut errors, "author_id", INVALID_CHOICE),
                Err(e) => return Err(e),
            }
        }
        if let Some(language_id) = form.language_id {
            match self.repository.languages.get_by_id(language_id).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => add_error(&mut errors, "language_id", INVALID_CHOICE),
                Err(e) => return Err(e),
            }
        }
        let found = self.repository.genres.get_many(&form.genre_ids).await?;
        if let Some(missing) = form
            .genre_ids
            .iter()
            .find(|id| !found.iter().any(|g| g.id == **id))
        {
            add_error(
                &mut errors,
                "genre_ids",
                format!("Select a valid choice. {} is not one of the available choices.", missing),
            );
        }

        Ok(errors)
    }

    pub async fn create(&self, form: BookForm) -> AppResult<BookSubmission> {
        let errors = self.check(&form).await?;
        if !errors.is_empty() {
            return Ok(Submission::Invalid(FormResponse::with_errors(form, errors)));
        }

        let created = self.repository.books.create(&form).await?;
        tracing::info!(id = created.id, title = %created.title, "book created");
        Ok(Submission::Saved(created))
    }

    pub async fn update(&self, id: i32, form: BookForm) -> AppResult<BookSubmission> {
        self.repository.books.get_by_id(id).await?;
        let errors = self.check(&form).await?;
        if !errors.is_empty() {
            return Ok(Submission::Invalid(FormResponse::with_errors(form, errors)));
        }

        let updated = self.repository.books.update(id, &form).await?;
        tracing::info!(id, "book updated");
        Ok(Submission::Saved(updated))
    }

    /// Delete a book; refused while copies of it exist
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;
        let copies = self.repository.book_instances.count_by_book(id).await?;
        if copies > 0 {
            return Err(AppError::HasDependents(format!(
                "Book {} still has {} copies",
                id, copies
            )));
        }

        self.repository.books.delete(id).await?;
        tracing::info!(id, "book deleted");
        Ok(())
    }
}
