use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use csv::{QuoteStyle, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{author::Author, book::Book, book_state::BookState, error::StoreError, user::User};

/// File holding one `title,author,genre,availability` line per book
pub const BOOKS_FILE: &str = "books.txt";
/// File holding one `name,userId` line per user
pub const USERS_FILE: &str = "users.txt";
/// File holding one `name,biography` line per author
pub const AUTHORS_FILE: &str = "authors.txt";

/// A line of one of the data files
trait Row: Serialize + DeserializeOwned {
    /// Number of fields on a well-formed line
    const ARITY: usize;
}

/// Stored form of a book; loan details are not kept
#[derive(Debug, Serialize, Deserialize)]
struct BookRow {
    /// Book title
    title: String,
    /// Author name
    author: String,
    /// Genre
    genre: String,
    /// `Available` or `Unavailable`
    availability: String,
}

impl Row for BookRow {
    const ARITY: usize = 4;
}

impl From<&Book> for BookRow {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            author: book.author().to_string(),
            genre: book.genre().to_string(),
            availability: book.state().token().to_string(),
        }
    }
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self::with_state(&row.title, &row.author, &row.genre, BookState::from_token(&row.availability))
    }
}

/// Stored form of a user; fines and loans are not kept
#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    /// Display name
    name: String,
    /// User id
    user_id: String,
}

impl Row for UserRow {
    const ARITY: usize = 2;
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self { name: user.name().to_string(), user_id: user.user_id().to_string() }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self::new(&row.name, &row.user_id)
    }
}

/// Stored form of an author
#[derive(Debug, Serialize, Deserialize)]
struct AuthorRow {
    /// Author name
    name: String,
    /// Biography
    biography: String,
}

impl Row for AuthorRow {
    const ARITY: usize = 2;
}

impl From<&Author> for AuthorRow {
    fn from(author: &Author) -> Self {
        Self { name: author.name().to_string(), biography: author.biography().to_string() }
    }
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self::new(&row.name, &row.biography)
    }
}

/// Why a load came back empty or short
#[derive(Debug, Error)]
pub enum LoadNotice {
    /// The file does not exist yet
    #[error("{} not found, starting with an empty list", .0.display())]
    Missing(PathBuf),
    /// Loading stopped early; records before the failure were kept
    #[error("error loading data: {0}")]
    Failed(#[from] StoreError),
}

/// Records read from one file, with the reason if the read was cut short
#[derive(Debug)]
pub struct LoadReport<T> {
    /// Records parsed before any failure
    pub records: Vec<T>,
    /// Set when the file was missing or loading stopped early
    pub notice: Option<LoadNotice>,
}

impl<T> LoadReport<T> {
    /// Convert each record, keeping the notice
    fn map<U>(self, f: impl FnMut(T) -> U) -> LoadReport<U> {
        LoadReport { records: self.records.into_iter().map(f).collect(), notice: self.notice }
    }

    /// Whether every line of an existing file was loaded
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.notice.is_none()
    }
}

/// Flat-file persistence rooted at a data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Directory holding the three data files
    root: PathBuf,
}

impl Store {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of one of the data files
    #[must_use]
    pub fn path_of(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    #[must_use]
    pub fn load_books(&self) -> LoadReport<Book> {
        self.load::<BookRow>(BOOKS_FILE).map(Book::from)
    }

    #[must_use]
    pub fn load_users(&self) -> LoadReport<User> {
        self.load::<UserRow>(USERS_FILE).map(User::from)
    }

    #[must_use]
    pub fn load_authors(&self) -> LoadReport<Author> {
        self.load::<AuthorRow>(AUTHORS_FILE).map(Author::from)
    }

    /// Rewrite the books file.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the file cannot be created or written; the
    /// file may then hold a partial write.
    pub fn save_books(&self, books: &[Book]) -> Result<(), StoreError> {
        self.save(BOOKS_FILE, books.iter().map(BookRow::from))
    }

    /// Rewrite the users file.
    ///
    /// # Errors
    ///
    /// See [`Store::save_books`].
    pub fn save_users(&self, users: &[User]) -> Result<(), StoreError> {
        self.save(USERS_FILE, users.iter().map(UserRow::from))
    }

    /// Rewrite the authors file.
    ///
    /// # Errors
    ///
    /// See [`Store::save_books`].
    pub fn save_authors(&self, authors: &[Author]) -> Result<(), StoreError> {
        self.save(AUTHORS_FILE, authors.iter().map(AuthorRow::from))
    }

    /// Read every line of `file`, stopping at the first bad one.
    ///
    /// Each line is trimmed and split on commas; a blank line counts as a
    /// single empty field.
    fn load<R: Row>(&self, file: &str) -> LoadReport<R> {
        let path = self.path_of(file);
        let handle = match File::open(&path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return LoadReport { records: Vec::new(), notice: Some(LoadNotice::Missing(path)) };
            }
            Err(source) => {
                let notice = LoadNotice::Failed(StoreError::Io { path, source });
                return LoadReport { records: Vec::new(), notice: Some(notice) };
            }
        };

        let mut records = Vec::new();
        for (line, result) in (1_u64..).zip(BufReader::new(handle).lines()) {
            let parsed = result
                .map_err(|source| StoreError::Io { path: path.clone(), source })
                .and_then(|text| parse_line::<R>(&path, line, &text));

            match parsed {
                Ok(row) => records.push(row),
                Err(e) => return LoadReport { records, notice: Some(LoadNotice::Failed(e)) },
            }
        }

        LoadReport { records, notice: None }
    }

    /// Truncate `file` and write one line per row
    fn save<R: Row>(&self, file: &str, rows: impl IntoIterator<Item = R>) -> Result<(), StoreError> {
        let path = self.path_of(file);
        let handle =
            File::create(&path).map_err(|source| StoreError::Io { path: path.clone(), source })?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(handle);

        for row in rows {
            writer
                .serialize(row)
                .map_err(|source| StoreError::Csv { path: path.clone(), source })?;
        }
        writer.flush().map_err(|source| StoreError::Io { path, source })?;

        Ok(())
    }
}

/// Parse line number `line` of `path` into a row
fn parse_line<R: Row>(path: &Path, line: u64, text: &str) -> Result<R, StoreError> {
    let record: StringRecord = text.trim().split(',').collect();
    if record.len() != R::ARITY {
        return Err(StoreError::Malformed {
            path: path.to_path_buf(),
            line,
            expected: R::ARITY,
            found: record.len(),
        });
    }
    record
        .deserialize::<R>(None)
        .map_err(|source| StoreError::Csv { path: path.to_path_buf(), source })
}
