//! The document written into a freshly connected repository.

/// File name of the seed document.
pub const SEED_FILE: &str = "README.md";

/// Message of the commit that adds the seed document.
pub const SEED_MESSAGE: &str = "Add application README";

/// Renders the seed document linking back to the application.
pub fn render(view_url: &str, edit_url: &str) -> String {
    format!(
        "# Application repository\n\
         \n\
         This repository is kept in sync with an application definition.\n\
         Every commit holds the application as a tree of JSON documents.\n\
         \n\
         - [View the application]({view_url})\n\
         - [Edit the application]({edit_url})\n\
         \n\
         Changes made directly in this repository are picked up the next time\n\
         the application pulls from its remote.\n"
    )
}
