use std::fmt;

use chrono::{DateTime, Utc};

use crate::{
    book::{Book, Loan, ReturnReceipt},
    error::LibraryError,
    policy::LoanPolicy,
};

/// A library member with a fine balance and the titles they hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique id, the lookup key
    user_id: String,
    /// Display name
    name: String,
    /// Outstanding fine in whole currency units
    fine_balance: u64,
    /// Titles currently held, each at most once
    borrowed: Vec<String>,
}

impl User {
    /// Create a member with no fine and no books
    #[must_use]
    pub fn new(name: &str, user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            fine_balance: 0,
            borrowed: Vec::new(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fine_balance(&self) -> u64 {
        self.fine_balance
    }

    /// Titles held by this user, in borrow order
    pub fn borrowed_titles(&self) -> impl Iterator<Item = &str> {
        self.borrowed.iter().map(String::as_str)
    }

    /// Whether `title` is in this user's borrowed set
    #[must_use]
    pub fn holds(&self, title: &str) -> bool {
        let wanted = title.to_lowercase();
        self.borrowed.iter().any(|held| held.to_lowercase() == wanted)
    }

    /// Borrow `book` and add it to the borrowed set on success.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Unavailable` if the book is already out; the
    /// borrowed set is left unchanged.
    pub fn borrow_book(
        &mut self,
        book: &mut Book,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
    ) -> Result<Loan, LibraryError> {
        let loan = book.borrow(&self.user_id, now, policy)?;
        self.record_loan(book.title());
        Ok(loan)
    }

    /// Return `book`, charge any fine and drop it from the borrowed set.
    ///
    /// The book leaves this user's set even when a reservation handoff
    /// lends it straight out again.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotBorrowedByUser` if this user does not hold
    /// the book, or the book's own error if it cannot be returned.
    pub fn return_book(
        &mut self,
        book: &mut Book,
        now: DateTime<Utc>,
        policy: &LoanPolicy,
    ) -> Result<ReturnReceipt, LibraryError> {
        if !self.holds(book.title()) {
            return Err(LibraryError::NotBorrowedByUser {
                user_id: self.user_id.clone(),
                title: book.title().to_string(),
            });
        }
        let receipt = book.return_book(now, policy)?;
        self.fine_balance = self.fine_balance.saturating_add(receipt.fine);
        let title = book.title().to_lowercase();
        self.borrowed.retain(|held| held.to_lowercase() != title);
        Ok(receipt)
    }

    /// Record a loan made on this user's behalf, such as a reservation handoff
    pub fn record_loan(&mut self, title: &str) {
        if !self.holds(title) {
            self.borrowed.push(title.to_string());
        }
    }

    /// Pay towards the fine and return the remaining balance.
    ///
    /// Paying at least the balance clears it; the excess is discarded.
    pub fn pay_fine(&mut self, amount: u64) -> u64 {
        self.fine_balance = self.fine_balance.saturating_sub(amount);
        self.fine_balance
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {}) - Fine: ${}", self.name, self.user_id, self.fine_balance)
    }
}
