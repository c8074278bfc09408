use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Utc};

use crate::{
    book_state::BookState, error::LibraryError, events::BookEvent, policy::LoanPolicy,
};

/// Maximum number of transitions kept per book
pub const MAX_HISTORY: usize = 100;

/// Represents a state transition of a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    /// The state before the transition
    pub from: BookState,
    /// The state after the transition
    pub to: BookState,
    /// The event that triggered the transition
    pub event: BookEvent,
    /// When the transition occurred
    pub at: DateTime<Utc>,
}

/// A loan handed out by a borrow or a reservation handoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    /// Id of the user now holding the book
    pub borrower: String,
    /// When the book is due back
    pub due: DateTime<Utc>,
}

/// Outcome of a successful return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    /// When the book came back
    pub returned_at: DateTime<Utc>,
    /// When it was due
    pub due: DateTime<Utc>,
    /// Whole days past the due date
    pub overdue_days: u64,
    /// Fine owed by the returning user
    pub fine: u64,
    /// Loan given to the head of the reservation queue, if anyone was waiting
    pub handoff: Option<Loan>,
}

impl ReturnReceipt {
    /// Whether the book came back after its due date
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.returned_at > self.due
    }
}

/// A catalogued book with its availability and reservation queue
#[derive(Debug, Clone)]
pub struct Book {
    /// Title, the lookup key
    title: String,
    /// Free-text author name
    author: String,
    /// Genre
    genre: String,
    /// Current availability
    state: BookState,
    /// User ids waiting for the book, oldest first
    reservations: VecDeque<String>,
    /// Most recent transitions, oldest first
    history: Vec<StateTransition>,
    /// Transitions ever recorded, including those dropped from `history`
    transition_count: usize,
}

impl Book {
    /// Create an available book with an empty reservation queue
    #[must_use]
    pub fn new(title: &str, author: &str, genre: &str) -> Self {
        Self::with_state(title, author, genre, BookState::Available)
    }

    /// Create a book in a given state, as restored from the books file
    #[must_use]
    pub fn with_state(title: &str, author: &str, genre: &str, state: BookState) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            state,
            reservations: VecDeque::new(),
            history: Vec::new(),
            transition_count: 0,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn genre(&self) -> &str {
        &self.genre
    }

    #[must_use]
    pub fn state(&self) -> &BookState {
        &self.state
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    /// User ids in the reservation queue, head first
    pub fn reservations(&self) -> impl Iterator<Item = &str> {
        self.reservations.iter().map(String::as_str)
    }

    /// Recorded transitions, oldest first
    #[must_use]
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Number of transitions ever recorded for this book
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transition_count
    }

    /// Transitions recorded after the count was `since`
    pub fn transitions_since(&self, since: usize) -> impl Iterator<Item = &StateTransition> {
        let fresh = self.transition_count.saturating_sub(since);
        self.history.iter().rev().take(fresh).rev()
    }

    /// Case-insensitive title comparison
    #[must_use]
    pub fn matches_title(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }

    /// Lend the book to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Unavailable` if the book is not on the shelf;
    /// the state is left unchanged.
    pub fn borrow(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
    ) -> Result<Loan, LibraryError> {
        if !self.is_available() {
            return Err(LibraryError::Unavailable { title: self.title.clone() });
        }
        Ok(self.lend(user_id, now, policy, BookEvent::Borrow(user_id.to_string())))
    }

    /// Take the book back and pass it to the next reservation, if any.
    ///
    /// The fine is computed against the due date of the loan being closed.
    /// When the queue is non-empty its head borrows the book before this
    /// returns, so the book may end up borrowed again.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotBorrowed` if the book is available and
    /// `LibraryError::NoLoanRecord` if it was restored as unavailable.
    pub fn return_book(
        &mut self,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
    ) -> Result<ReturnReceipt, LibraryError> {
        let due = match &self.state {
            BookState::Borrowed { due, .. } => *due,
            BookState::Available => {
                return Err(LibraryError::NotBorrowed { title: self.title.clone() });
            }
            BookState::Unavailable => {
                return Err(LibraryError::NoLoanRecord { title: self.title.clone() });
            }
        };

        let overdue_days = LoanPolicy::overdue_days(due, now);
        let fine = policy.fine(due, now);
        self.transition(BookState::Available, BookEvent::Return, now);

        let handoff = self.reservations.pop_front().map(|next| {
            let event = BookEvent::Handoff(next.clone());
            self.lend(&next, now, policy, event)
        });

        Ok(ReturnReceipt { returned_at: now, due, overdue_days, fine, handoff })
    }

    /// Queue `user_id` for the book and return their 1-based position.
    ///
    /// The queue accepts the same user more than once and accepts
    /// reservations while the book is on the shelf.
    pub fn reserve(&mut self, user_id: &str) -> usize {
        self.reservations.push_back(user_id.to_string());
        self.reservations.len()
    }

    /// Move to `Borrowed` for `user_id`
    fn lend(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
        event: BookEvent,
    ) -> Loan {
        let due = policy.due_date(now);
        self.transition(BookState::Borrowed { borrower: user_id.to_string(), due }, event, now);
        Loan { borrower: user_id.to_string(), due }
    }

    /// Apply a state change and record it in the bounded history
    fn transition(&mut self, to: BookState, event: BookEvent, at: DateTime<Utc>) {
        let from = std::mem::replace(&mut self.state, to.clone());
        self.history.push(StateTransition { from, to, event, at });
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        self.transition_count = self.transition_count.saturating_add(1);
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} - {}", self.title, self.author, self.state.token())
    }
}
