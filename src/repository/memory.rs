//! In-process storage backend.
//!
//! Mirrors the constraints of the PostgreSQL schema (unique names,
//! restricted deletes, copy state checks) so both backends answer the
//! same way.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuthorStore, BookInstanceStore, BookStore, GenreStore, InstanceFilter, LanguageStore, UserStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookForm},
        book_instance::{BookInstance, BookInstanceDetails, BookInstanceForm, LoanStatus},
        genre::Genre,
        language::Language,
        pagination::PageRequest,
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct MemoryData {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    book_genres: BTreeMap<i32, BTreeSet<i32>>,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    instances: HashMap<Uuid, BookInstance>,
    users: BTreeMap<i32, User>,
    groups: BTreeMap<String, BTreeSet<String>>,
    user_groups: BTreeMap<i32, BTreeSet<String>>,
    user_permissions: BTreeMap<i32, BTreeSet<String>>,
    sequences: HashMap<&'static str, i32>,
}

impl MemoryData {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Book with its genres, ordered by name
    fn load_book(&self, book: &Book) -> Book {
        let mut genres: Vec<Genre> = self
            .book_genres
            .get(&book.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Book {
            genres,
            ..book.clone()
        }
    }

    fn check_book_references(&self, book: &BookForm) -> AppResult<()> {
        let author_ok = book.author_id.map_or(true, |id| self.authors.contains_key(&id));
        let language_ok = book.language_id.map_or(true, |id| self.languages.contains_key(&id));
        let genres_ok = book.genre_ids.iter().all(|id| self.genres.contains_key(id));
        if author_ok && language_ok && genres_ok {
            Ok(())
        } else {
            Err(AppError::Validation(
                "Author, language or genre does not exist".to_string(),
            ))
        }
    }

    fn check_instance(&self, instance: &BookInstanceForm) -> AppResult<()> {
        let book_ok = self.books.contains_key(&instance.book_id);
        let borrower_ok = instance.borrower_id.map_or(true, |id| self.users.contains_key(&id));
        let language_ok = instance
            .language_id
            .map_or(true, |id| self.languages.contains_key(&id));
        if !(book_ok && borrower_ok && language_ok) {
            return Err(AppError::Validation(
                "Book, borrower or language does not exist".to_string(),
            ));
        }
        instance.check_loan_state()
    }

    fn details(&self, instance: &BookInstance, today: NaiveDate) -> BookInstanceDetails {
        BookInstanceDetails {
            id: instance.id,
            book_id: instance.book_id,
            book_title: self
                .books
                .get(&instance.book_id)
                .map(|b| b.title.clone())
                .unwrap_or_default(),
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            borrower_id: instance.borrower_id,
            borrower_username: instance
                .borrower_id
                .and_then(|id| self.users.get(&id))
                .map(|u| u.username.clone()),
            language_id: instance.language_id,
            status: instance.status,
            is_overdue: instance.is_overdue(today),
        }
    }
}

fn page_of<T: Clone>(all: &[T], page: PageRequest, cap: Option<i64>) -> Vec<T> {
    let (offset, limit) = page.window(cap);
    all.iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

#[async_trait]
impl AuthorStore for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.data.read().await.authors.len() as i64)
    }

    async fn list(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)> {
        let data = self.data.read().await;
        let mut all: Vec<Author> = data.authors.values().cloned().collect();
        all.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        Ok((page_of(&all, page, None), all.len() as i64))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.data
            .read()
            .await
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        let data = self.data.read().await;
        Ok(ids.iter().filter_map(|id| data.authors.get(id).cloned()).collect())
    }

    async fn create(&self, author: &AuthorForm) -> AppResult<Author> {
        let mut data = self.data.write().await;
        let id = data.next_id("authors");
        let created = Author {
            id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: author.birth_date(),
            date_of_death: author.death_date(),
        };
        data.authors.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, author: &AuthorForm) -> AppResult<Author> {
        let mut data = self.data.write().await;
        let existing = data
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        existing.first_name = author.first_name.clone();
        existing.last_name = author.last_name.clone();
        existing.date_of_birth = author.birth_date();
        existing.date_of_death = author.death_date();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.authors.contains_key(&id) {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        if data.books.values().any(|b| b.author_id == Some(id)) {
            return Err(AppError::HasDependents(format!("Author {} still has books", id)));
        }
        data.authors.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.data.read().await.books.len() as i64)
    }

    async fn list(&self, cap: i64, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let data = self.data.read().await;
        let all: Vec<Book> = data.books.values().take(cap.max(0) as usize).cloned().collect();
        let books = page_of(&all, page, Some(cap))
            .iter()
            .map(|b| data.load_book(b))
            .collect();
        Ok((books, all.len() as i64))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let data = self.data.read().await;
        data.books
            .get(&id)
            .map(|b| data.load_book(b))
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let data = self.data.read().await;
        let mut books: Vec<Book> = data
            .books
            .values()
            .filter(|b| b.author_id == Some(author_id))
            .map(|b| data.load_book(b))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn count_by_author(&self, author_id: i32) -> AppResult<i64> {
        let data = self.data.read().await;
        Ok(data.books.values().filter(|b| b.author_id == Some(author_id)).count() as i64)
    }

    async fn count_by_language(&self, language_id: i32) -> AppResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .books
            .values()
            .filter(|b| b.language_id == Some(language_id))
            .count() as i64)
    }

    async fn create(&self, book: &BookForm) -> AppResult<Book> {
        let mut data = self.data.write().await;
        data.check_book_references(book)?;
        let id = data.next_id("books");
        let created = Book {
            id,
            title: book.title.clone(),
            author_id: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            language_id: book.language_id,
            genres: Vec::new(),
        };
        data.books.insert(id, created.clone());
        data.book_genres.insert(id, book.genre_ids.iter().copied().collect());
        Ok(data.load_book(&created))
    }

    async fn update(&self, id: i32, book: &BookForm) -> AppResult<Book> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        data.check_book_references(book)?;
        let updated = Book {
            id,
            title: book.title.clone(),
            author_id: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            language_id: book.language_id,
            genres: Vec::new(),
        };
        data.books.insert(id, updated.clone());
        data.book_genres.insert(id, book.genre_ids.iter().copied().collect());
        Ok(data.load_book(&updated))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if data.instances.values().any(|i| i.book_id == id) {
            return Err(AppError::HasDependents(format!("Book {} still has copies", id)));
        }
        data.books.remove(&id);
        data.book_genres.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl GenreStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let data = self.data.read().await;
        let mut genres: Vec<Genre> = data.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        let data = self.data.read().await;
        let wanted: BTreeSet<i32> = ids.iter().copied().collect();
        let mut genres: Vec<Genre> = wanted
            .iter()
            .filter_map(|id| data.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn create(&self, name: &str) -> AppResult<Genre> {
        let mut data = self.data.write().await;
        if data.genres.values().any(|g| g.name.to_lowercase() == name.to_lowercase()) {
            return Err(AppError::Conflict(format!("Genre '{}' already exists", name)));
        }
        let id = data.next_id("genres");
        let genre = Genre {
            id,
            name: name.to_string(),
        };
        data.genres.insert(id, genre.clone());
        Ok(genre)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut data = self.data.write().await;
        if data.genres.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        for genre_ids in data.book_genres.values_mut() {
            genre_ids.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl LanguageStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Language>> {
        let data = self.data.read().await;
        let mut languages: Vec<Language> = data.languages.values().cloned().collect();
        languages.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(languages)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Language> {
        self.data
            .read()
            .await
            .languages
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))
    }

    async fn create(&self, name: &str) -> AppResult<Language> {
        let mut data = self.data.write().await;
        if data
            .languages
            .values()
            .any(|l| l.name.to_lowercase() == name.to_lowercase())
        {
            return Err(AppError::Conflict(format!("Language '{}' already exists", name)));
        }
        let id = data.next_id("languages");
        let language = Language {
            id,
            name: name.to_string(),
        };
        data.languages.insert(id, language.clone());
        Ok(language)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.languages.contains_key(&id) {
            return Err(AppError::NotFound(format!("Language with id {} not found", id)));
        }
        let in_use = data.books.values().any(|b| b.language_id == Some(id))
            || data.instances.values().any(|i| i.language_id == Some(id));
        if in_use {
            return Err(AppError::HasDependents(format!("Language {} is still in use", id)));
        }
        data.languages.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookInstanceStore for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.data.read().await.instances.len() as i64)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let data = self.data.read().await;
        Ok(data.instances.values().filter(|i| i.status == status).count() as i64)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        self.data
            .read()
            .await
            .instances
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn get_details(&self, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails> {
        let data = self.data.read().await;
        data.instances
            .get(&id)
            .map(|i| data.details(i, today))
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn list(
        &self,
        filter: InstanceFilter,
        page: PageRequest,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let data = self.data.read().await;
        let mut matching: Vec<&BookInstance> =
            data.instances.values().filter(|i| filter.matches(i)).collect();
        matching.sort_by(|a, b| {
            (a.due_back.is_none(), a.due_back, a.id).cmp(&(b.due_back.is_none(), b.due_back, b.id))
        });
        let details: Vec<BookInstanceDetails> =
            matching.iter().map(|i| data.details(i, today)).collect();
        Ok((page_of(&details, page, None), details.len() as i64))
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let data = self.data.read().await;
        let mut instances: Vec<BookInstance> = data
            .instances
            .values()
            .filter(|i| i.book_id == book_id)
            .cloned()
            .collect();
        instances.sort_by(|a, b| {
            (a.due_back.is_none(), a.due_back, a.id).cmp(&(b.due_back.is_none(), b.due_back, b.id))
        });
        Ok(instances)
    }

    async fn count_by_book(&self, book_id: i32) -> AppResult<i64> {
        let data = self.data.read().await;
        Ok(data.instances.values().filter(|i| i.book_id == book_id).count() as i64)
    }

    async fn count_by_language(&self, language_id: i32) -> AppResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .instances
            .values()
            .filter(|i| i.language_id == Some(language_id))
            .count() as i64)
    }

    async fn create(&self, instance: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut data = self.data.write().await;
        data.check_instance(instance)?;
        let created = BookInstance {
            id: Uuid::new_v4(),
            book_id: instance.book_id,
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            borrower_id: instance.borrower_id,
            language_id: instance.language_id,
            status: instance.status,
        };
        data.instances.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, instance: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut data = self.data.write().await;
        if !data.instances.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        data.check_instance(instance)?;
        let updated = BookInstance {
            id,
            book_id: instance.book_id,
            imprint: instance.imprint.clone(),
            due_back: instance.due_back,
            borrower_id: instance.borrower_id,
            language_id: instance.language_id,
            status: instance.status,
        };
        data.instances.insert(id, updated.clone());
        Ok(updated)
    }

    async fn renew(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool> {
        let mut data = self.data.write().await;
        match data.instances.get_mut(&id) {
            Some(instance) if instance.status == LoanStatus::OnLoan => {
                instance.due_back = Some(due_back);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut data = self.data.write().await;
        data.instances
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.data
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut data = self.data.write().await;
        if data.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!("Username '{}' is taken", user.username)));
        }
        let id = data.next_id("users");
        let created = User {
            id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_active: true,
        };
        data.users.insert(id, created.clone());
        Ok(created)
    }

    async fn groups(&self, user_id: i32) -> AppResult<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .user_groups
            .get(&user_id)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn permissions(&self, user_id: i32) -> AppResult<Vec<String>> {
        let data = self.data.read().await;
        let mut codenames: BTreeSet<String> =
            data.user_permissions.get(&user_id).cloned().unwrap_or_default();
        for group in data.user_groups.get(&user_id).into_iter().flatten() {
            if let Some(granted) = data.groups.get(group) {
                codenames.extend(granted.iter().cloned());
            }
        }
        Ok(codenames.into_iter().collect())
    }

    async fn ensure_group(&self, name: &str, permissions: &[&str]) -> AppResult<()> {
        let mut data = self.data.write().await;
        data.groups
            .entry(name.to_string())
            .or_default()
            .extend(permissions.iter().map(|p| p.to_string()));
        Ok(())
    }

    async fn add_to_group(&self, user_id: i32, group: &str) -> AppResult<()> {
        let mut data = self.data.write().await;
        if !data.groups.contains_key(group) {
            return Err(AppError::NotFound(format!("Group '{}' not found", group)));
        }
        data.user_groups
            .entry(user_id)
            .or_default()
            .insert(group.to_string());
        Ok(())
    }

    async fn grant_permission(&self, user_id: i32, codename: &str) -> AppResult<()> {
        let mut data = self.data.write().await;
        data.user_permissions
            .entry(user_id)
            .or_default()
            .insert(codename.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: i64) -> PageRequest {
        PageRequest::new(Some(n), 10).unwrap()
    }

    fn book_form(title: &str, author_id: Option<i32>, genre_ids: Vec<i32>) -> BookForm {
        BookForm {
            title: title.into(),
            author_id,
            summary: "summary".into(),
            isbn: "9780000000000".into(),
            genre_ids,
            language_id: None,
        }
    }

    #[tokio::test]
    async fn test_book_list_is_capped() {
        let store = MemoryStore::default();
        for i in 0..25 {
            BookStore::create(&store, &book_form(&format!("Book {}", i), None, vec![]))
                .await
                .unwrap();
        }

        let (first, total) = BookStore::list(&store, 20, page(1)).await.unwrap();
        assert_eq!(total, 20);
        assert_eq!(first.len(), 10);

        let (second, _) = BookStore::list(&store, 20, page(2)).await.unwrap();
        assert_eq!(second.len(), 10);
        assert_eq!(second.last().unwrap().title, "Book 19");

        let (third, _) = BookStore::list(&store, 20, page(3)).await.unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_genre_delete_detaches_books() {
        let store = MemoryStore::default();
        let horror = GenreStore::create(&store, "Horror").await.unwrap();
        let poetry = GenreStore::create(&store, "Poetry").await.unwrap();
        let book = BookStore::create(&store, &book_form("Odes", None, vec![horror.id, poetry.id]))
            .await
            .unwrap();
        assert_eq!(book.genres.len(), 2);

        GenreStore::delete(&store, horror.id).await.unwrap();
        let book = BookStore::get_by_id(&store, book.id).await.unwrap();
        assert_eq!(book.genres, vec![poetry]);
    }

    #[tokio::test]
    async fn test_genre_names_unique_ignoring_case() {
        let store = MemoryStore::default();
        GenreStore::create(&store, "Fantasy").await.unwrap();
        let dup = GenreStore::create(&store, "fantasy").await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_author_with_books_cannot_be_deleted() {
        let store = MemoryStore::default();
        let author = AuthorStore::create(
            &store,
            &AuthorForm {
                first_name: "Mary".into(),
                last_name: "Shelley".into(),
                date_of_birth: None,
                date_of_death: None,
            },
        )
        .await
        .unwrap();
        BookStore::create(&store, &book_form("Frankenstein", Some(author.id), vec![]))
            .await
            .unwrap();

        let result = AuthorStore::delete(&store, author.id).await;
        assert!(matches!(result, Err(AppError::HasDependents(_))));
    }

    #[tokio::test]
    async fn test_renew_only_touches_copies_on_loan() {
        let store = MemoryStore::default();
        let book = BookStore::create(&store, &book_form("Dune", None, vec![]))
            .await
            .unwrap();
        let available = BookInstanceStore::create(
            &store,
            &BookInstanceForm {
                book_id: book.id,
                imprint: "Chilton, 1965".into(),
                due_back: None,
                borrower_id: None,
                language_id: None,
                status: LoanStatus::Available,
            },
        )
        .await
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(!store.renew(available.id, date).await.unwrap());
        assert_eq!(
            BookInstanceStore::get_by_id(&store, available.id).await.unwrap(),
            available
        );
        assert!(!store.renew(Uuid::new_v4(), date).await.unwrap());
    }

    #[tokio::test]
    async fn test_permissions_union_user_and_group_grants() {
        let store = MemoryStore::default();
        let user = UserStore::create(
            &store,
            &NewUser {
                username: "ann".into(),
                password_hash: "!".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: None,
            },
        )
        .await
        .unwrap();
        store
            .ensure_group("Librarians", &["catalog.add_book"])
            .await
            .unwrap();
        store.add_to_group(user.id, "Librarians").await.unwrap();
        store.grant_permission(user.id, "catalog.add_author").await.unwrap();

        assert_eq!(
            store.permissions(user.id).await.unwrap(),
            vec!["catalog.add_author".to_string(), "catalog.add_book".to_string()]
        );
        assert!(store.add_to_group(user.id, "Nobody").await.is_err());
    }
}
