//! Library catalog manager: books, users and authors with loans, fines and
//! reservation queues, persisted to flat comma-separated text files.
//!
//! The [`Catalog`] owns every record and drives the book state machine; the
//! [`Store`] maps each collection to and from its backing file; the [`Shell`]
//! is a text-menu front end over any reader/writer pair.

pub mod author;
pub mod book;
pub mod book_state;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod observers;
pub mod policy;
pub mod shell;
pub mod store;
pub mod user;

pub use author::Author;
pub use book::{Book, Loan, ReturnReceipt, StateTransition};
pub use book_state::BookState;
pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, ErrorKind, LibraryError, StoreError};
pub use events::BookEvent;
pub use policy::LoanPolicy;
pub use shell::Shell;
pub use store::{LoadNotice, LoadReport, Store};
pub use user::User;
