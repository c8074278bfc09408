use std::{cell::RefCell, fs, rc::Rc};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;

use super::Catalog;
use crate::{
    book::StateTransition,
    book_state::BookState,
    clock::ManualClock,
    error::{ErrorKind, LibraryError},
    events::BookEvent,
    observers::StateObserver,
    policy::LoanPolicy,
    store::{BOOKS_FILE, LoadNotice, Store, USERS_FILE},
};

/// Start of every test's clock
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).single().unwrap_or_default()
}

/// Catalog over a fresh data directory, plus a handle on its clock
#[allow(clippy::expect_used)]
fn setup_test_catalog() -> (TempDir, Catalog, ManualClock) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let clock = ManualClock::new(start());
    let catalog =
        Catalog::with_clock(Store::new(dir.path()), LoanPolicy::default(), Box::new(clock.clone()));
    (dir, catalog, clock)
}

/// Catalog with users alice, xavier, yvonne and the book Dune
fn setup_populated_catalog() -> (TempDir, Catalog, ManualClock) {
    let (dir, mut catalog, clock) = setup_test_catalog();
    assert!(catalog.add_user("Alice", "alice").is_ok());
    assert!(catalog.add_user("Xavier", "xavier").is_ok());
    assert!(catalog.add_user("Yvonne", "yvonne").is_ok());
    assert!(catalog.add_book("Dune", "Herbert", "SciFi").is_ok());
    (dir, catalog, clock)
}

fn holder(catalog: &Catalog, title: &str) -> Option<String> {
    catalog.find_book_by_title(title).and_then(|b| b.state().borrower().map(str::to_string))
}

fn holds(catalog: &Catalog, user_id: &str, title: &str) -> bool {
    catalog.find_user_by_id(user_id).is_some_and(|u| u.holds(title))
}

#[derive(Debug, Default)]
struct RecordingObserver {
    /// Events seen so far
    seen: Rc<RefCell<Vec<(String, BookEvent)>>>,
}

impl StateObserver for RecordingObserver {
    fn on_state_change(&self, title: &str, transition: &StateTransition) {
        self.seen.borrow_mut().push((title.to_string(), transition.event.clone()));
    }
}

#[test]
fn test_fresh_directory_reports_missing_files() {
    let (_dir, catalog, _clock) = setup_test_catalog();
    assert!(catalog.books().is_empty());
    assert_eq!(catalog.load_notices().len(), 3);
    assert!(catalog.load_notices().iter().all(|n| matches!(n, LoadNotice::Missing(_))));
}

#[test]
fn test_borrow_return_round_trip() {
    let (_dir, mut catalog, clock) = setup_populated_catalog();

    let loan = catalog.borrow_book("alice", "Dune");
    assert!(matches!(loan, Ok(ref l) if l.due == start() + TimeDelta::days(14)));
    assert!(holds(&catalog, "alice", "Dune"));

    clock.advance(TimeDelta::days(10));
    let receipt = catalog.return_book("alice", "dune");
    assert!(matches!(receipt, Ok(ref r) if r.fine == 0 && r.handoff.is_none()));

    let book = catalog.find_book_by_title("Dune");
    assert!(matches!(book, Some(b) if *b.state() == BookState::Available));
    assert!(!holds(&catalog, "alice", "Dune"));
    assert!(matches!(catalog.find_user_by_id("alice"), Some(u) if u.fine_balance() == 0));
}

#[test]
fn test_overdue_return_adds_fine_to_balance() {
    for k in [1_i64, 2, 7, 30] {
        let (_dir, mut catalog, clock) = setup_populated_catalog();
        drop(catalog.borrow_book("alice", "Dune"));

        clock.advance(TimeDelta::days(14 + k));
        let receipt = catalog.return_book("alice", "Dune");
        let expected = u64::try_from(k).unwrap_or(0);
        assert!(matches!(receipt, Ok(ref r) if r.fine == expected && r.is_overdue()));
        assert!(matches!(catalog.find_user_by_id("alice"), Some(u) if u.fine_balance() == expected));
    }
}

#[test]
fn test_no_double_borrow() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));

    let second = catalog.borrow_book("xavier", "Dune");
    assert!(matches!(second, Err(ref e) if e.kind() == ErrorKind::InvalidStateTransition));
    assert_eq!(holder(&catalog, "Dune").as_deref(), Some("alice"));
    assert!(!holds(&catalog, "xavier", "Dune"));
}

#[test]
fn test_reservation_fifo_handoff() {
    let (_dir, mut catalog, clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));
    assert!(matches!(catalog.reserve_book("xavier", "Dune"), Ok(1)));
    assert!(matches!(catalog.reserve_book("yvonne", "Dune"), Ok(2)));

    clock.advance(TimeDelta::days(2));
    let receipt = catalog.return_book("alice", "Dune");
    assert!(matches!(receipt, Ok(ref r) if r.handoff.as_ref().is_some_and(|l| l.borrower == "xavier")));
    assert_eq!(holder(&catalog, "Dune").as_deref(), Some("xavier"));
    assert!(holds(&catalog, "xavier", "Dune"));
    assert!(!holds(&catalog, "alice", "Dune"));
    let queue: Vec<_> =
        catalog.find_book_by_title("Dune").map(|b| b.reservations().map(str::to_string).collect()).unwrap_or_default();
    assert_eq!(queue, vec!["yvonne".to_string()]);

    clock.advance(TimeDelta::days(1));
    drop(catalog.return_book("xavier", "Dune"));
    assert_eq!(holder(&catalog, "Dune").as_deref(), Some("yvonne"));
    assert!(holds(&catalog, "yvonne", "Dune"));
    assert!(!holds(&catalog, "xavier", "Dune"));
    assert!(matches!(catalog.find_book_by_title("Dune"), Some(b) if b.reservations().count() == 0));
}

#[test]
fn test_handoff_due_date_starts_at_return() {
    let (_dir, mut catalog, clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));
    drop(catalog.reserve_book("xavier", "Dune"));

    clock.advance(TimeDelta::days(20));
    drop(catalog.return_book("alice", "Dune"));
    let due = catalog.find_book_by_title("Dune").and_then(|b| b.state().due_date());
    assert_eq!(due, Some(start() + TimeDelta::days(34)));
    assert!(matches!(catalog.find_user_by_id("alice"), Some(u) if u.fine_balance() == 6));
}

#[test]
fn test_self_reservation_hands_book_back_to_returner() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));
    drop(catalog.reserve_book("alice", "Dune"));

    drop(catalog.return_book("alice", "Dune"));
    assert_eq!(holder(&catalog, "Dune").as_deref(), Some("alice"));
    assert!(holds(&catalog, "alice", "Dune"));
}

#[test]
fn test_return_by_non_holder_is_rejected() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));

    let result = catalog.return_book("xavier", "Dune");
    assert!(matches!(result, Err(LibraryError::NotBorrowedByUser { .. })));
    assert_eq!(holder(&catalog, "Dune").as_deref(), Some("alice"));
}

#[test]
fn test_lookup_misses() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();

    assert!(catalog.find_user_by_id("ALICE").is_none());
    assert!(catalog.find_book_by_title("Emma").is_none());
    assert!(catalog.find_author_by_name("Austen").is_none());
    assert!(matches!(catalog.borrow_book("nobody", "Dune"), Err(LibraryError::UserNotFound(_))));
    assert!(matches!(catalog.borrow_book("alice", "Emma"), Err(LibraryError::BookNotFound(_))));
    assert!(matches!(catalog.return_book("alice", "Emma"), Err(LibraryError::BookNotFound(_))));
    assert!(matches!(catalog.reserve_book("nobody", "Dune"), Err(LibraryError::UserNotFound(_))));
    assert!(matches!(catalog.pay_fine("nobody", 1), Err(ref e) if e.kind() == ErrorKind::NotFound));
}

#[test]
fn test_lookup_ignores_case_for_books_and_authors() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();
    drop(catalog.add_author("Frank Herbert", "American author"));

    assert!(matches!(catalog.find_book_by_title("dune"), Some(b) if b.title() == "Dune"));
    assert!(matches!(catalog.find_book_by_title("DUNE"), Some(b) if b.title() == "Dune"));
    assert!(matches!(catalog.find_author_by_name("frank HERBERT"), Some(a) if a.name() == "Frank Herbert"));
}

#[test]
fn test_duplicate_keys_are_rejected() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();

    let book = catalog.add_book("DUNE", "Someone", "Drama");
    assert!(matches!(book, Err(ref e) if e.kind() == ErrorKind::Duplicate));
    assert!(matches!(catalog.add_user("Other", "alice"), Err(LibraryError::AlreadyExists { .. })));
    assert_eq!(catalog.books().len(), 1);
    assert_eq!(catalog.users().len(), 3);
}

#[test]
fn test_pay_fine() {
    let (_dir, mut catalog, clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));
    clock.advance(TimeDelta::days(19));
    drop(catalog.return_book("alice", "Dune"));

    assert!(matches!(catalog.pay_fine("alice", 2), Ok(3)));
    assert!(matches!(catalog.pay_fine("alice", 10), Ok(0)));
    assert!(matches!(catalog.find_user_by_id("alice"), Some(u) if u.fine_balance() == 0));
}

#[test]
#[allow(clippy::expect_used)]
fn test_adds_are_written_through() {
    let (dir, mut catalog, _clock) = setup_test_catalog();
    drop(catalog.add_book("Dune", "Herbert", "SciFi"));
    drop(catalog.add_user("Alice", "alice"));

    let books = fs::read_to_string(dir.path().join(BOOKS_FILE)).expect("books file");
    let users = fs::read_to_string(dir.path().join(USERS_FILE)).expect("users file");
    assert_eq!(books, "Dune,Herbert,SciFi,Available\n");
    assert_eq!(users, "Alice,alice\n");
}

#[test]
fn test_reload_keeps_only_persisted_fields() {
    let (dir, mut catalog, clock) = setup_populated_catalog();
    drop(catalog.add_book("Emma", "Austen", "Classic"));
    drop(catalog.borrow_book("alice", "Emma"));
    drop(catalog.reserve_book("xavier", "Emma"));
    assert!(catalog.save_all().is_ok());

    let reloaded =
        Catalog::with_clock(Store::new(dir.path()), LoanPolicy::default(), Box::new(clock));
    assert!(reloaded.load_notices().is_empty());

    let dune = reloaded.find_book_by_title("Dune");
    assert!(matches!(dune, Some(b) if b.author() == "Herbert" && b.genre() == "SciFi" && b.is_available()));

    let emma = reloaded.find_book_by_title("Emma");
    assert!(matches!(emma, Some(b) if *b.state() == BookState::Unavailable && b.reservations().count() == 0));
    assert!(!holds(&reloaded, "alice", "Emma"));
}

#[test]
fn test_reloaded_unavailable_book_cannot_be_returned() {
    let (dir, mut catalog, clock) = setup_populated_catalog();
    drop(catalog.borrow_book("alice", "Dune"));
    drop(catalog.save_all());

    let mut reloaded =
        Catalog::with_clock(Store::new(dir.path()), LoanPolicy::default(), Box::new(clock));
    assert!(matches!(reloaded.return_book("alice", "Dune"), Err(LibraryError::NotBorrowedByUser { .. })));
    assert!(matches!(reloaded.borrow_book("xavier", "Dune"), Err(LibraryError::Unavailable { .. })));
}

#[test]
fn test_partial_load_keeps_earlier_records() {
    let (dir, _catalog, clock) = setup_test_catalog();
    drop(fs::write(dir.path().join(BOOKS_FILE), "Dune,Herbert,SciFi,Available\nbroken line\nEmma,Austen,Classic,Available\n"));

    let catalog = Catalog::with_clock(Store::new(dir.path()), LoanPolicy::default(), Box::new(clock));
    assert_eq!(catalog.books().len(), 1);
    assert!(catalog.load_notices().iter().any(|n| matches!(n, LoadNotice::Failed(_))));
}

#[test]
fn test_failed_save_keeps_record_in_memory() {
    let dir = tempfile::tempdir();
    let root = dir.as_ref().map(|d| d.path().join("missing")).unwrap_or_default();
    let mut catalog = Catalog::with_clock(
        Store::new(root),
        LoanPolicy::default(),
        Box::new(ManualClock::new(start())),
    );

    let result = catalog.add_book("Dune", "Herbert", "SciFi");
    assert!(matches!(result, Err(ref e) if e.kind() == ErrorKind::PersistenceIo));
    assert!(catalog.find_book_by_title("Dune").is_some());
    assert!(catalog.save_all().is_err());
}

#[test]
fn test_observers_see_every_transition() {
    let (_dir, mut catalog, _clock) = setup_populated_catalog();
    let observer = RecordingObserver::default();
    let seen = Rc::clone(&observer.seen);
    catalog.register_observer(Box::new(observer));

    drop(catalog.borrow_book("alice", "Dune"));
    drop(catalog.reserve_book("xavier", "Dune"));
    drop(catalog.return_book("alice", "Dune"));

    let events: Vec<_> = seen.borrow().iter().map(|(_, event)| event.clone()).collect();
    assert_eq!(
        events,
        vec![
            BookEvent::Borrow("alice".to_string()),
            BookEvent::Return,
            BookEvent::Handoff("xavier".to_string()),
        ]
    );
}
