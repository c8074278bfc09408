use std::{
    fmt,
    io::{self, BufRead, Write},
};

use colored::Colorize;

use crate::{
    book::ReturnReceipt,
    catalog::Catalog,
    error::{ErrorKind, LibraryError},
};

/// Main menu entries
const MAIN_MENU: [&str; 4] =
    ["1. Book Operations", "2. User Operations", "3. Author Operations", "4. Quit"];

/// Book menu entries
const BOOK_MENU: [&str; 7] = [
    "1. Add Book",
    "2. Borrow Book",
    "3. Return Book",
    "4. Reserve Book",
    "5. Search Book",
    "6. Display All Books",
    "7. Back to Main Menu",
];

/// User menu entries
const USER_MENU: [&str; 5] = [
    "1. Add User",
    "2. View User Details",
    "3. Display All Users",
    "4. Pay Fine",
    "5. Back to Main Menu",
];

/// Author menu entries
const AUTHOR_MENU: [&str; 4] =
    ["1. Add Author", "2. View Author Details", "3. Display All Authors", "4. Back to Main Menu"];

/// What happens after a menu action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Show the current menu again
    Stay,
    /// Leave the current menu
    Back,
    /// Save and exit; also used when input runs out
    Quit,
}

/// Text-menu front end over a [`Catalog`]
#[derive(Debug)]
pub struct Shell<R, W> {
    /// Where answers are read from
    input: R,
    /// Where menus and messages go
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the output, e.g. to inspect what was written
    #[must_use]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run the menu loop until the user quits or input ends, then save
    /// every collection once.
    ///
    /// # Errors
    ///
    /// Returns an error only if the terminal itself cannot be read or
    /// written; catalog failures are reported and the loop carries on.
    pub fn run(&mut self, catalog: &mut Catalog) -> io::Result<()> {
        for notice in catalog.load_notices() {
            writeln!(self.output, "{}", notice.to_string().as_str().yellow())?;
        }

        loop {
            writeln!(self.output, "\n{}", "Welcome to the Library Management System!".green().bold())?;
            self.print_menu(&MAIN_MENU)?;
            let Some(choice) = self.prompt("Enter your choice: ")? else { break };
            let flow = match choice.trim() {
                "1" => self.book_menu(catalog)?,
                "2" => self.user_menu(catalog)?,
                "3" => self.author_menu(catalog)?,
                "4" => Flow::Quit,
                _ => self.invalid_choice()?,
            };
            if flow == Flow::Quit {
                break;
            }
        }

        if let Err(e) = catalog.save_all() {
            self.report(&e)?;
        }
        writeln!(self.output, "{}", "Exiting the Library Management System. Goodbye!".green())
    }

    /// Book operations submenu
    fn book_menu(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        loop {
            writeln!(self.output, "\n{}", "Book Operations:".cyan().bold())?;
            self.print_menu(&BOOK_MENU)?;
            let Some(choice) = self.prompt("Enter your choice (1-7): ")? else {
                return Ok(Flow::Quit);
            };
            let flow = match choice.trim() {
                "1" => self.add_book(catalog)?,
                "2" => self.borrow_book(catalog)?,
                "3" => self.return_book(catalog)?,
                "4" => self.reserve_book(catalog)?,
                "5" => self.search_book(catalog)?,
                "6" => self.list(catalog.books(), "No books in the catalog.")?,
                "7" => Flow::Back,
                _ => self.invalid_choice()?,
            };
            if flow != Flow::Stay {
                return Ok(flow);
            }
        }
    }

    /// User operations submenu
    fn user_menu(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        loop {
            writeln!(self.output, "\n{}", "User Operations:".cyan().bold())?;
            self.print_menu(&USER_MENU)?;
            let Some(choice) = self.prompt("Enter your choice (1-5): ")? else {
                return Ok(Flow::Quit);
            };
            let flow = match choice.trim() {
                "1" => self.add_user(catalog)?,
                "2" => self.view_user(catalog)?,
                "3" => self.list(catalog.users(), "No users registered.")?,
                "4" => self.pay_fine(catalog)?,
                "5" => Flow::Back,
                _ => self.invalid_choice()?,
            };
            if flow != Flow::Stay {
                return Ok(flow);
            }
        }
    }

    /// Author operations submenu
    fn author_menu(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        loop {
            writeln!(self.output, "\n{}", "Author Operations:".cyan().bold())?;
            self.print_menu(&AUTHOR_MENU)?;
            let Some(choice) = self.prompt("Enter your choice (1-4): ")? else {
                return Ok(Flow::Quit);
            };
            let flow = match choice.trim() {
                "1" => self.add_author(catalog)?,
                "2" => self.view_author(catalog)?,
                "3" => self.list(catalog.authors(), "No authors registered.")?,
                "4" => Flow::Back,
                _ => self.invalid_choice()?,
            };
            if flow != Flow::Stay {
                return Ok(flow);
            }
        }
    }

    /// Prompt for a new book and add it
    fn add_book(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(title) = self.prompt("Enter book title: ")? else { return Ok(Flow::Quit) };
        let Some(author) = self.prompt("Enter book author: ")? else { return Ok(Flow::Quit) };
        let Some(genre) = self.prompt("Enter book genre: ")? else { return Ok(Flow::Quit) };

        match catalog.add_book(&title, &author, &genre) {
            Ok(()) => writeln!(self.output, "Book '{title}' added.")?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Prompt for a user and a title, then lend the book
    fn borrow_book(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(user_id) = self.prompt("Enter your user ID: ")? else { return Ok(Flow::Quit) };
        let Some(name) = catalog.find_user_by_id(&user_id).map(|u| u.name().to_string()) else {
            self.report(&LibraryError::UserNotFound(user_id))?;
            return Ok(Flow::Stay);
        };
        let Some(title) = self.prompt("Enter the title of the book you want to borrow: ")? else {
            return Ok(Flow::Quit);
        };

        match catalog.borrow_book(&user_id, &title) {
            Ok(loan) => writeln!(
                self.output,
                "Book '{}' borrowed by {name}. Due date: {}",
                stored_title(catalog, &title),
                loan.due.format("%Y-%m-%d")
            )?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Prompt for a user and a title, then take the book back
    fn return_book(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(user_id) = self.prompt("Enter your user ID: ")? else { return Ok(Flow::Quit) };
        if catalog.find_user_by_id(&user_id).is_none() {
            self.report(&LibraryError::UserNotFound(user_id))?;
            return Ok(Flow::Stay);
        }
        let Some(title) = self.prompt("Enter the title of the book you want to return: ")? else {
            return Ok(Flow::Quit);
        };

        match catalog.return_book(&user_id, &title) {
            Ok(receipt) => self.print_receipt(catalog, &stored_title(catalog, &title), &receipt)?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Describe a completed return and any handoff it triggered
    fn print_receipt(
        &mut self,
        catalog: &Catalog,
        title: &str,
        receipt: &ReturnReceipt,
    ) -> io::Result<()> {
        if receipt.is_overdue() {
            writeln!(
                self.output,
                "{}",
                format!(
                    "Book '{title}' is overdue by {} days. Fine: ${}",
                    receipt.overdue_days, receipt.fine
                )
                .as_str()
                .yellow()
            )?;
        } else {
            writeln!(self.output, "Book '{title}' returned on time.")?;
        }

        if let Some(loan) = &receipt.handoff {
            let name = catalog
                .find_user_by_id(&loan.borrower)
                .map_or_else(|| loan.borrower.clone(), |u| u.name().to_string());
            writeln!(self.output, "Notification: Book '{title}' is now available for {name}.")?;
            writeln!(
                self.output,
                "Book '{title}' borrowed by {name}. Due date: {}",
                loan.due.format("%Y-%m-%d")
            )?;
        }
        Ok(())
    }

    /// Prompt for a user and a title, then queue the reservation
    fn reserve_book(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(user_id) = self.prompt("Enter your user ID: ")? else { return Ok(Flow::Quit) };
        let Some(title) = self.prompt("Enter the title of the book you want to reserve: ")? else {
            return Ok(Flow::Quit);
        };

        match catalog.reserve_book(&user_id, &title) {
            Ok(position) => writeln!(
                self.output,
                "User '{user_id}' has reserved '{}' (position {position} in queue).",
                stored_title(catalog, &title)
            )?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Show one book with its loan and queue details
    fn search_book(&mut self, catalog: &Catalog) -> io::Result<Flow> {
        let Some(title) = self.prompt("Enter the title of the book to search: ")? else {
            return Ok(Flow::Quit);
        };

        let Some(book) = catalog.find_book_by_title(&title) else {
            self.report(&LibraryError::BookNotFound(title))?;
            return Ok(Flow::Stay);
        };
        writeln!(self.output, "Found: {book}")?;
        writeln!(self.output, "  {}", book.state().get_description())?;
        let waiting = book.reservations().count();
        if waiting > 0 {
            writeln!(self.output, "  {waiting} reservation(s) pending")?;
        }
        Ok(Flow::Stay)
    }

    /// Prompt for a new user and add them
    fn add_user(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(name) = self.prompt("Enter user name: ")? else { return Ok(Flow::Quit) };
        let Some(user_id) = self.prompt("Enter user ID: ")? else { return Ok(Flow::Quit) };

        match catalog.add_user(&name, &user_id) {
            Ok(()) => writeln!(self.output, "User '{name}' added.")?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Show one user with their fine and borrowed titles
    fn view_user(&mut self, catalog: &Catalog) -> io::Result<Flow> {
        let Some(user_id) = self.prompt("Enter user ID: ")? else { return Ok(Flow::Quit) };

        let Some(user) = catalog.find_user_by_id(&user_id) else {
            self.report(&LibraryError::UserNotFound(user_id))?;
            return Ok(Flow::Stay);
        };
        writeln!(self.output, "User: {user}")?;
        let titles: Vec<&str> = user.borrowed_titles().collect();
        if !titles.is_empty() {
            writeln!(self.output, "  Borrowed: {}", titles.join(", "))?;
        }
        Ok(Flow::Stay)
    }

    /// Prompt for a user and an amount, then pay towards the fine
    fn pay_fine(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(user_id) = self.prompt("Enter user ID: ")? else { return Ok(Flow::Quit) };
        let Some(balance) = catalog.find_user_by_id(&user_id).map(crate::User::fine_balance) else {
            self.report(&LibraryError::UserNotFound(user_id))?;
            return Ok(Flow::Stay);
        };
        let Some(answer) = self.prompt("Enter amount to pay: ")? else { return Ok(Flow::Quit) };
        let Ok(amount) = answer.trim().parse::<u64>() else {
            writeln!(
                self.output,
                "{}",
                "Invalid amount. Enter a whole, non-negative number.".yellow()
            )?;
            return Ok(Flow::Stay);
        };

        match catalog.pay_fine(&user_id, amount) {
            Ok(_) if amount >= balance => writeln!(self.output, "Fine of ${balance} paid.")?,
            Ok(remaining) => {
                writeln!(self.output, "${amount} paid. Remaining fine: ${remaining}")?;
            }
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Prompt for a new author and add them
    fn add_author(&mut self, catalog: &mut Catalog) -> io::Result<Flow> {
        let Some(name) = self.prompt("Enter author name: ")? else { return Ok(Flow::Quit) };
        let Some(biography) = self.prompt("Enter author biography: ")? else {
            return Ok(Flow::Quit);
        };

        match catalog.add_author(&name, &biography) {
            Ok(()) => writeln!(self.output, "Author '{name}' added.")?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Stay)
    }

    /// Show one author
    fn view_author(&mut self, catalog: &Catalog) -> io::Result<Flow> {
        let Some(name) = self.prompt("Enter author name: ")? else { return Ok(Flow::Quit) };

        match catalog.find_author_by_name(&name) {
            Some(author) => writeln!(
                self.output,
                "Author: {} - Biography: {}",
                author.name(),
                author.biography()
            )?,
            None => writeln!(self.output, "{}", "Author not found.".yellow())?,
        }
        Ok(Flow::Stay)
    }

    /// Print one line per item, or `empty` if there are none
    fn list<T: fmt::Display>(&mut self, items: &[T], empty: &str) -> io::Result<Flow> {
        if items.is_empty() {
            writeln!(self.output, "{empty}")?;
        }
        for item in items {
            writeln!(self.output, "{item}")?;
        }
        Ok(Flow::Stay)
    }

    /// Print numbered menu entries
    fn print_menu(&mut self, entries: &[&str]) -> io::Result<()> {
        for entry in entries {
            writeln!(self.output, "{entry}")?;
        }
        Ok(())
    }

    /// Complain about an unknown menu entry
    fn invalid_choice(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "{}", "Invalid choice. Please try again.".yellow())?;
        Ok(Flow::Stay)
    }

    /// Print a catalog error in the colour of its kind
    fn report(&mut self, error: &LibraryError) -> io::Result<()> {
        match error.kind() {
            ErrorKind::PersistenceIo => {
                writeln!(self.output, "{}", format!("Error saving data: {error}").as_str().red())
            }
            ErrorKind::NotFound | ErrorKind::InvalidStateTransition | ErrorKind::Duplicate => {
                writeln!(self.output, "{}", format!("{error}.").as_str().yellow())
            }
        }
    }

    /// Write `label`, then read one line; `None` once input is exhausted
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Title as stored in the catalog, falling back to what was typed
fn stored_title(catalog: &Catalog, typed: &str) -> String {
    catalog.find_book_by_title(typed).map_or_else(|| typed.to_string(), |b| b.title().to_string())
}
