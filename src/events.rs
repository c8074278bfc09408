/// Events that move a book between states
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookEvent {
    /// A user borrows the book from the shelf
    Borrow(String),
    /// The current borrower returns the book
    Return,
    /// The book passes to the head of its reservation queue on return
    Handoff(String),
}
