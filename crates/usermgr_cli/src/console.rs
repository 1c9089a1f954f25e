//! Interactive console driver.
//!
//! # Responsibility
//! - Render the numbered menu and collect line-oriented field input.
//! - Call the user service and print results.
//! - Own the blank-means-keep convention used by updates.
//! - Reject malformed field input before it reaches the service.
//!
//! # Invariants
//! - A single failed operation never ends the loop; fatal init errors do.
//! - End of input behaves like choosing `0`.

use anyhow::{Context, Result};
use log::{error, info};
use std::io::{BufRead, Write};
use std::str::FromStr;
use usermgr_core::{RepoError, User, UserRepository, UserService};

enum Flow {
    Continue,
    Exit,
}

/// Menu loop bound to one input, one output and one service.
pub struct Console<'s, I, O, R: UserRepository> {
    input: I,
    output: O,
    service: &'s UserService<R>,
}

impl<'s, I: BufRead, O: Write, R: UserRepository> Console<'s, I, O, R> {
    pub fn new(input: I, output: O, service: &'s UserService<R>) -> Self {
        Self {
            input,
            output,
            service,
        }
    }

    /// Runs the menu until the user exits or input ends.
    ///
    /// # Errors
    /// - Fatal storage initialization failures.
    /// - I/O failures on the console streams.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.print_menu()?;
            let Some(choice) = self.read_number::<i64>("")? else {
                return Ok(());
            };
            let flow = match choice {
                1 => self.create_user()?,
                2 => self.find_user()?,
                3 => self.show_all_users()?,
                4 => self.update_user()?,
                5 => self.delete_user()?,
                0 => {
                    writeln!(self.output, "Exiting application...")?;
                    Flow::Exit
                }
                _ => {
                    writeln!(self.output, "Invalid choice. Please try again.")?;
                    Flow::Continue
                }
            };
            if let Flow::Exit = flow {
                return Ok(());
            }
        }
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output, "\n=== User Management System ===")?;
        writeln!(self.output, "1. Create User")?;
        writeln!(self.output, "2. Find User by ID")?;
        writeln!(self.output, "3. Show All Users")?;
        writeln!(self.output, "4. Update User")?;
        writeln!(self.output, "5. Delete User")?;
        writeln!(self.output, "0. Exit")?;
        write!(self.output, "Enter your choice: ")?;
        self.output.flush()?;
        Ok(())
    }

    fn create_user(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n[Create New User]")?;
        let Some(name) = self.read_text("Enter name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(email) = self.read_text("Enter email: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(age) = self.read_number::<i32>("Enter age: ")? else {
            return Ok(Flow::Exit);
        };

        let user = User::new(name, email, age);
        if let Err(err) = user.validate() {
            error!(
                "event=user_create module=cli status=error error_code=invalid_input error={}",
                err
            );
            writeln!(self.output, "Error creating user: {err}")?;
            return Ok(Flow::Continue);
        }

        match self.service.save(user) {
            Ok(user) => {
                writeln!(self.output, "User created successfully: {user}")?;
                info!("event=user_create module=cli status=ok id={:?}", user.id);
            }
            Err(err) => self.report("Error creating user", "user_create", err)?,
        }
        Ok(Flow::Continue)
    }

    fn find_user(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n[Find User by ID]")?;
        let Some(id) = self.read_number::<i64>("Enter user ID: ")? else {
            return Ok(Flow::Exit);
        };

        match self.service.find_by_id(id) {
            Ok(Some(user)) => writeln!(self.output, "Found user: {user}")?,
            Ok(None) => writeln!(self.output, "User with ID {id} not found")?,
            Err(err) => self.report("Search error", "user_find", err)?,
        }
        Ok(Flow::Continue)
    }

    fn show_all_users(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n[All Users]")?;
        match self.service.find_all() {
            Ok(users) if users.is_empty() => writeln!(self.output, "No users found")?,
            Ok(users) => {
                for user in users {
                    writeln!(self.output, "{user}")?;
                }
            }
            Err(err) => self.report("Error fetching users", "user_list", err)?,
        }
        Ok(Flow::Continue)
    }

    fn update_user(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n[Update User]")?;
        let Some(id) = self.read_number::<i64>("Enter user ID to update: ")? else {
            return Ok(Flow::Exit);
        };

        let user = match self.service.find_by_id(id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                writeln!(self.output, "User not found")?;
                return Ok(Flow::Continue);
            }
            Err(err) => {
                self.report("Update error", "user_update", err)?;
                return Ok(Flow::Continue);
            }
        };
        writeln!(self.output, "Current data: {user}")?;

        let Some(name) = self.read_text("Enter new name (leave blank to keep current): ")? else {
            return Ok(Flow::Exit);
        };
        let Some(email) = self.read_text("Enter new email (leave blank to keep current): ")?
        else {
            return Ok(Flow::Exit);
        };
        let Some(age) = self.read_number::<i32>("Enter new age (0 to keep current): ")? else {
            return Ok(Flow::Exit);
        };

        let edited = apply_edits(user, &name, &email, age);
        if let Err(err) = edited.validate() {
            error!(
                "event=user_update module=cli status=error error_code=invalid_input error={}",
                err
            );
            writeln!(self.output, "Update error: {err}")?;
            return Ok(Flow::Continue);
        }

        match self.service.update(edited) {
            Ok(user) => {
                writeln!(self.output, "User updated: {user}")?;
                info!("event=user_update module=cli status=ok id={id}");
            }
            Err(err) => self.report("Update error", "user_update", err)?,
        }
        Ok(Flow::Continue)
    }

    fn delete_user(&mut self) -> Result<Flow> {
        writeln!(self.output, "\n[Delete User]")?;
        let Some(id) = self.read_number::<i64>("Enter user ID to delete: ")? else {
            return Ok(Flow::Exit);
        };

        match self.service.delete(id) {
            Ok(true) => {
                writeln!(self.output, "User deleted successfully")?;
                info!("event=user_delete module=cli status=ok id={id}");
            }
            Ok(false) => writeln!(self.output, "User not found")?,
            Err(err) => self.report("Deletion error", "user_delete", err)?,
        }
        Ok(Flow::Continue)
    }

    /// Prints a short message for recoverable failures; fatal ones end the
    /// session.
    fn report(&mut self, message: &str, event: &str, err: RepoError) -> Result<()> {
        if err.is_fatal() {
            return Err(err).context("storage is unavailable");
        }
        error!("event={event} module=cli status=error error={err}");
        writeln!(self.output, "{message}: {err}")?;
        Ok(())
    }

    fn read_text(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read console input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn read_number<T: FromStr>(&mut self, prompt: &str) -> Result<Option<T>> {
        let mut prompt = prompt;
        loop {
            let Some(line) = self.read_text(prompt)? else {
                return Ok(None);
            };
            if let Ok(value) = line.trim().parse() {
                return Ok(Some(value));
            }
            writeln!(self.output, "Please enter a number!")?;
            prompt = "";
        }
    }
}

/// Overlays console edits onto `user`: blank text and non-positive age keep
/// the current value.
pub fn apply_edits(mut user: User, name: &str, email: &str, age: i32) -> User {
    if !name.is_empty() {
        user.name = name.to_string();
    }
    if !email.is_empty() {
        user.email = email.to_string();
    }
    if age > 0 {
        user.age = age;
    }
    user
}
