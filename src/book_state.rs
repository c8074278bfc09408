use chrono::{DateTime, Utc};

/// Availability of a single book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BookState {
    /// Book is on the shelf and can be borrowed
    #[default]
    Available,
    /// Book is lent to a user until the due date
    Borrowed {
        /// Id of the user holding the book
        borrower: String,
        /// When the loan ends
        due: DateTime<Utc>,
    },
    /// Book was saved as unavailable; loan details are not kept on disk
    Unavailable,
}

impl BookState {
    /// Token written to the books file for this state
    pub const AVAILABLE_TOKEN: &'static str = "Available";
    /// Token written to the books file for any state other than `Available`
    pub const UNAVAILABLE_TOKEN: &'static str = "Unavailable";

    /// Parse the availability token of a stored book line.
    ///
    /// Anything other than `Available` restores as `Unavailable`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token == Self::AVAILABLE_TOKEN { Self::Available } else { Self::Unavailable }
    }

    /// The token persisted for this state
    #[must_use]
    pub fn token(&self) -> &'static str {
        if self.is_available() { Self::AVAILABLE_TOKEN } else { Self::UNAVAILABLE_TOKEN }
    }

    /// Whether the book can be borrowed right now
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Id of the current borrower, if the loan is known
    #[must_use]
    pub fn borrower(&self) -> Option<&str> {
        match self {
            Self::Borrowed { borrower, .. } => Some(borrower),
            Self::Available | Self::Unavailable => None,
        }
    }

    /// Due date of the current loan, if the loan is known
    #[must_use]
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Borrowed { due, .. } => Some(*due),
            Self::Available | Self::Unavailable => None,
        }
    }

    /// Get a human-readable description of the current state
    #[must_use]
    pub fn get_description(&self) -> String {
        match self {
            Self::Available => "Book is available for borrowing".to_string(),
            Self::Borrowed { borrower, due } => {
                format!("Book is borrowed by {borrower} until {}", due.format("%Y-%m-%d"))
            }
            Self::Unavailable => "Book is unavailable (no loan on record)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        assert_eq!(BookState::from_token("Available"), BookState::Available);
        assert_eq!(BookState::from_token("Unavailable"), BookState::Unavailable);
        assert_eq!(BookState::from_token("available"), BookState::Unavailable);

        let borrowed = BookState::Borrowed { borrower: "u1".to_string(), due: Utc::now() };
        assert_eq!(borrowed.token(), "Unavailable");
        assert_eq!(BookState::Available.token(), "Available");
    }

    #[test]
    fn test_loan_details_only_when_borrowed() {
        assert_eq!(BookState::Available.borrower(), None);
        assert_eq!(BookState::Unavailable.due_date(), None);
        let due = Utc::now();
        let borrowed = BookState::Borrowed { borrower: "u1".to_string(), due };
        assert_eq!(borrowed.borrower(), Some("u1"));
        assert_eq!(borrowed.due_date(), Some(due));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(BookState::Available.get_description(), "Book is available for borrowing");
        assert_eq!(BookState::Unavailable.get_description(), "Book is unavailable (no loan on record)");

        let due = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 4, 15, 9, 0, 0).single().unwrap_or_default();
        let borrowed = BookState::Borrowed { borrower: "u1".to_string(), due };
        assert_eq!(borrowed.get_description(), "Book is borrowed by u1 until 2024-04-15");
    }
}
