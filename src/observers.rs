use std::fmt;

use crate::{book::StateTransition, book_state::BookState, events::BookEvent};

/// Trait for book state change observation
pub trait StateObserver: fmt::Debug {
    /// Called for each transition of the book titled `title`
    fn on_state_change(&self, title: &str, transition: &StateTransition);
}

/// Logs all transitions that occur in the catalog
#[derive(Debug)]
pub struct TransitionLogger;

impl StateObserver for TransitionLogger {
    fn on_state_change(&self, title: &str, transition: &StateTransition) {
        tracing::debug!(
            book = title,
            from = ?transition.from,
            to = ?transition.to,
            event = ?transition.event,
            "transition occurred"
        );
    }
}

/// Announces returns and reservation handoffs
#[derive(Debug)]
pub struct NotificationService;

impl StateObserver for NotificationService {
    fn on_state_change(&self, title: &str, transition: &StateTransition) {
        match (&transition.from, &transition.event) {
            (BookState::Borrowed { borrower, .. }, BookEvent::Return) => {
                tracing::info!("Book '{title}' has been returned by {borrower}");
            }
            (_, BookEvent::Handoff(user_id)) => {
                tracing::info!("Book '{title}' is now available for {user_id}");
            }
            _ => {}
        }
    }
}
