use std::fmt;

use crate::{
    author::Author,
    book::{Book, Loan, ReturnReceipt},
    clock::{Clock, SystemClock},
    error::{LibraryError, StoreError},
    observers::{NotificationService, StateObserver, TransitionLogger},
    policy::LoanPolicy,
    store::{LoadNotice, LoadReport, Store},
    user::User,
};

/// All books, users and authors, with their backing store
pub struct Catalog {
    /// Books in insertion order
    books: Vec<Book>,
    /// Users in insertion order
    users: Vec<User>,
    /// Authors in insertion order
    authors: Vec<Author>,
    /// Backing files
    store: Store,
    /// Loan length and fines
    policy: LoanPolicy,
    /// Time source for loans and returns
    clock: Box<dyn Clock>,
    /// Registered book state observers
    observers: Vec<Box<dyn StateObserver>>,
    /// Problems met by the last load
    notices: Vec<LoadNotice>,
}

// Manual implementation of Debug for Catalog
impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("books", &self.books)
            .field("users", &self.users)
            .field("authors", &self.authors)
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .field("observers_count", &self.observers.len())
            .field("notices", &self.notices)
            .finish()
    }
}

impl Catalog {
    /// Load every collection from `store` using the system clock
    #[must_use]
    pub fn open(store: Store, policy: LoanPolicy) -> Self {
        Self::with_clock(store, policy, Box::new(SystemClock))
    }

    /// Load every collection from `store` using `clock` for loan times.
    ///
    /// The standard observers are registered; see [`Catalog::load_notices`]
    /// for files that were missing or only partly read.
    #[must_use]
    pub fn with_clock(store: Store, policy: LoanPolicy, clock: Box<dyn Clock>) -> Self {
        let mut catalog = Self {
            books: Vec::new(),
            users: Vec::new(),
            authors: Vec::new(),
            store,
            policy,
            clock,
            observers: Vec::new(),
            notices: Vec::new(),
        };
        catalog.load_all();
        catalog.register_observer(Box::new(TransitionLogger));
        catalog.register_observer(Box::new(NotificationService));
        catalog
    }

    /// Register an observer to be notified of book state changes
    pub fn register_observer(&mut self, observer: Box<dyn StateObserver>) {
        self.observers.push(observer);
    }

    /// Replace every collection with the contents of the data files
    pub fn load_all(&mut self) {
        tracing::info!(data_dir = %self.store.root().display(), "loading catalog");
        self.notices.clear();
        self.books = take_records(self.store.load_books(), &mut self.notices);
        self.users = take_records(self.store.load_users(), &mut self.notices);
        self.authors = take_records(self.store.load_authors(), &mut self.notices);
        tracing::info!(
            books = self.books.len(),
            users = self.users.len(),
            authors = self.authors.len(),
            "catalog loaded"
        );
    }

    /// Write every collection to its data file.
    ///
    /// All three files are attempted even if one fails.
    ///
    /// # Errors
    ///
    /// Returns the first `LibraryError::Store` met.
    pub fn save_all(&self) -> Result<(), LibraryError> {
        tracing::info!(data_dir = %self.store.root().display(), "saving catalog");
        let results = [
            self.store.save_books(&self.books),
            self.store.save_users(&self.users),
            self.store.save_authors(&self.authors),
        ];
        let mut first = None;
        for error in results.into_iter().filter_map(Result::err) {
            tracing::warn!(%error, "save failed");
            if first.is_none() {
                first = Some(error);
            }
        }
        first.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Files that were missing or failed to load when the catalog was opened
    #[must_use]
    pub fn load_notices(&self) -> &[LoadNotice] {
        &self.notices
    }

    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    #[must_use]
    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// First user with exactly this id
    #[must_use]
    pub fn find_user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.user_id() == user_id)
    }

    /// First book whose title matches, ignoring case
    #[must_use]
    pub fn find_book_by_title(&self, title: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.matches_title(title))
    }

    /// First author whose name matches, ignoring case
    #[must_use]
    pub fn find_author_by_name(&self, name: &str) -> Option<&Author> {
        self.authors.iter().find(|author| author.matches_name(name))
    }

    /// Add an available book and rewrite the books file.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::AlreadyExists` if the title is taken, or
    /// `LibraryError::Store` if saving fails; in that case the book stays in
    /// the catalog.
    pub fn add_book(&mut self, title: &str, author: &str, genre: &str) -> Result<(), LibraryError> {
        if self.find_book_by_title(title).is_some() {
            return Err(LibraryError::AlreadyExists { entity: "Book", key: title.to_string() });
        }
        self.books.push(Book::new(title, author, genre));
        tracing::info!(title, "book added");
        self.store.save_books(&self.books).map_err(saving_failed)
    }

    /// Add a user and rewrite the users file.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::AlreadyExists` if the id is taken, or
    /// `LibraryError::Store` if saving fails; in that case the user stays in
    /// the catalog.
    pub fn add_user(&mut self, name: &str, user_id: &str) -> Result<(), LibraryError> {
        if self.find_user_by_id(user_id).is_some() {
            return Err(LibraryError::AlreadyExists { entity: "User", key: user_id.to_string() });
        }
        self.users.push(User::new(name, user_id));
        tracing::info!(user_id, "user added");
        self.store.save_users(&self.users).map_err(saving_failed)
    }

    /// Add an author and rewrite the authors file.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::AlreadyExists` if the name is taken, or
    /// `LibraryError::Store` if saving fails; in that case the author stays
    /// in the catalog.
    pub fn add_author(&mut self, name: &str, biography: &str) -> Result<(), LibraryError> {
        if self.find_author_by_name(name).is_some() {
            return Err(LibraryError::AlreadyExists { entity: "Author", key: name.to_string() });
        }
        self.authors.push(Author::new(name, biography));
        tracing::info!(name, "author added");
        self.store.save_authors(&self.authors).map_err(saving_failed)
    }

    /// Lend the book titled `title` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or `BookNotFound` on a lookup miss and
    /// `Unavailable` if the book is already out.
    pub fn borrow_book(&mut self, user_id: &str, title: &str) -> Result<Loan, LibraryError> {
        let now = self.clock.now();
        let user = self
            .users
            .iter_mut()
            .find(|user| user.user_id() == user_id)
            .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;
        let book = self
            .books
            .iter_mut()
            .find(|book| book.matches_title(title))
            .ok_or_else(|| LibraryError::BookNotFound(title.to_string()))?;

        let before = book.transition_count();
        let loan = user.borrow_book(book, now, &self.policy)?;
        notify(&self.observers, book, before);
        Ok(loan)
    }

    /// Take back the book titled `title` from `user_id`.
    ///
    /// Any fine is added to the user's balance. If someone had reserved the
    /// book it is lent to them straight away and recorded in their set.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or `BookNotFound` on a lookup miss and
    /// `NotBorrowedByUser` if the user does not hold the book.
    pub fn return_book(&mut self, user_id: &str, title: &str) -> Result<ReturnReceipt, LibraryError> {
        let now = self.clock.now();
        let user = self
            .users
            .iter_mut()
            .find(|user| user.user_id() == user_id)
            .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;
        let book = self
            .books
            .iter_mut()
            .find(|book| book.matches_title(title))
            .ok_or_else(|| LibraryError::BookNotFound(title.to_string()))?;

        let before = book.transition_count();
        let receipt = user.return_book(book, now, &self.policy)?;
        notify(&self.observers, book, before);

        if let Some(loan) = &receipt.handoff {
            match self.users.iter_mut().find(|user| user.user_id() == loan.borrower) {
                Some(next) => next.record_loan(book.title()),
                None => tracing::warn!(
                    user_id = %loan.borrower,
                    title = book.title(),
                    "reserving user no longer in catalog"
                ),
            }
        }

        Ok(receipt)
    }

    /// Queue `user_id` for the book titled `title`; returns the queue position.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or `BookNotFound` on a lookup miss.
    pub fn reserve_book(&mut self, user_id: &str, title: &str) -> Result<usize, LibraryError> {
        if self.find_user_by_id(user_id).is_none() {
            return Err(LibraryError::UserNotFound(user_id.to_string()));
        }
        let book = self
            .books
            .iter_mut()
            .find(|book| book.matches_title(title))
            .ok_or_else(|| LibraryError::BookNotFound(title.to_string()))?;

        let position = book.reserve(user_id);
        tracing::info!(user_id, title = book.title(), position, "reservation queued");
        Ok(position)
    }

    /// Pay towards a user's fine; returns the remaining balance.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if no user has this id.
    pub fn pay_fine(&mut self, user_id: &str, amount: u64) -> Result<u64, LibraryError> {
        let user = self
            .users
            .iter_mut()
            .find(|user| user.user_id() == user_id)
            .ok_or_else(|| LibraryError::UserNotFound(user_id.to_string()))?;
        let remaining = user.pay_fine(amount);
        tracing::info!(user_id, amount, remaining, "fine paid");
        Ok(remaining)
    }
}

/// Keep the records of a load and stash its notice
fn take_records<T>(report: LoadReport<T>, notices: &mut Vec<LoadNotice>) -> Vec<T> {
    if let Some(notice) = report.notice {
        match &notice {
            LoadNotice::Missing(_) => tracing::info!(%notice, "data file missing"),
            LoadNotice::Failed(_) => tracing::warn!(%notice, "data file only partly loaded"),
        }
        notices.push(notice);
    }
    report.records
}

/// Log a failed write-through save
fn saving_failed(error: StoreError) -> LibraryError {
    tracing::warn!(%error, "save failed");
    error.into()
}

/// Tell every observer about the transitions `book` made since `before`
fn notify(observers: &[Box<dyn StateObserver>], book: &Book, before: usize) {
    for transition in book.transitions_since(before) {
        for observer in observers {
            observer.on_state_change(book.title(), transition);
        }
    }
}

#[cfg(test)]
mod tests;
