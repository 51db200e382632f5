//! Sign-up, sign-in and user listing

use anyhow::{Context, Result};
use serde::Serialize;
use tabled::Tabled;

use super::App;
use crate::output::{print_info, print_success, print_table, OutputFormat};
use aether_lib::users::{UserRecord, UserStore};

/// Row for the users table
#[derive(Tabled, Serialize)]
struct UserRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Last name")]
    lastname: String,
    #[tabled(rename = "Email")]
    email: String,
}

impl From<&UserRecord> for UserRow {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            lastname: user.lastname.clone(),
            email: user.email.clone(),
        }
    }
}

/// Register a new user
pub async fn sign_up(app: &App, name: &str, lastname: &str, email: &str) -> Result<()> {
    let mut store = UserStore::open(&app.config.users_file);
    match store.sign_up(name, lastname, email) {
        Ok(user) => {
            app.logger.log_user_event("signup", &user.email, true);
            print_success(&format!("Welcome, {}! You can now sign in.", user.full_name()));
            Ok(())
        }
        Err(e) => {
            app.logger.log_user_event("signup", email.trim(), false);
            Err(e).context("Sign-up failed")
        }
    }
}

/// Check that an email is registered
pub async fn sign_in(app: &App, email: &str) -> Result<()> {
    let user = signed_in_user(app, email)?;
    print_success(&format!("Signed in as {} <{}>", user.full_name(), user.email));
    Ok(())
}

/// Resolve a registered user, logging the attempt
pub fn signed_in_user(app: &App, email: &str) -> Result<UserRecord> {
    let store = UserStore::open(&app.config.users_file);
    let result = store.sign_in(email).cloned();
    app.logger
        .log_user_event("signin", email.trim(), result.is_ok());
    result.context("Sign-in failed")
}

/// List registered users
pub async fn list_users(app: &App) -> Result<()> {
    let store = UserStore::open(&app.config.users_file);
    let rows: Vec<UserRow> = store.users().iter().map(UserRow::from).collect();
    print_table(&rows, app.format, "No users registered");
    if rows.is_empty() && app.format == OutputFormat::Table {
        print_info("Register with `aether signup --name <NAME> --lastname <LASTNAME> --email <EMAIL>`");
    }
    Ok(())
}
