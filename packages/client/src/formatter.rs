//! Terminal rendering for incoming packets.

use banter_shared::types::UserInfo;
use chrono::Local;

/// Message formatter for terminal display.
///
/// Sender names are colored with 24-bit ANSI escapes from the 32-bit RGB
/// value carried in the roster; the top 8 bits are ignored.
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message with a colored sender name.
    ///
    /// # Arguments
    ///
    /// * `username` - The sender's name
    /// * `color` - 32-bit RGB display color for the sender
    /// * `message` - The message text
    pub fn format_chat_message(username: &str, color: u32, message: &str) -> String {
        format!(
            "[{}] {}: {}\n",
            timestamp(),
            colored(username, color),
            message
        )
    }

    /// Format a replayed history message. No timestamp; history records
    /// carry none.
    pub fn format_history_message(username: &str, color: u32, message: &str) -> String {
        format!("{}: {}\n", colored(username, color), message)
    }

    pub fn format_join(user: &UserInfo) -> String {
        format!(
            "[{}] + {} joined\n",
            timestamp(),
            colored(&user.username, user.color)
        )
    }

    pub fn format_leave(user: &UserInfo) -> String {
        format!(
            "[{}] - {} left\n",
            timestamp(),
            colored(&user.username, user.color)
        )
    }

    /// Format the welcome banner shown once the session is ready.
    pub fn format_welcome(username: &str) -> String {
        format!(
            "\nWelcome to the server! You are '{}'.\n\
             Type messages and press Enter to send. Press Ctrl+C to exit.\n\n",
            username
        )
    }

    /// Format the current roster.
    ///
    /// # Arguments
    ///
    /// * `users` - Roster entries in display order
    /// * `own_username` - This client's name, marked in the listing
    pub fn format_roster<'a>(
        users: impl Iterator<Item = &'a UserInfo>,
        own_username: &str,
    ) -> String {
        let mut output = String::from("Connected users:\n");
        let mut any = false;
        for user in users {
            any = true;
            let me = if user.username == own_username {
                " (you)"
            } else {
                ""
            };
            output.push_str(&format!(
                "  {}{}\n",
                colored(&user.username, user.color),
                me
            ));
        }
        if !any {
            output.push_str("  (nobody)\n");
        }
        output
    }

    pub fn format_kick(reason: &str) -> String {
        if reason.is_empty() {
            "You have been kicked from the server.\n".to_string()
        } else {
            format!("You have been kicked from the server: {}\n", reason)
        }
    }

    pub fn format_shutdown() -> String {
        "The server is shutting down.\n".to_string()
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Wrap `text` in a 24-bit ANSI foreground escape.
fn colored(text: &str, color: u32) -> String {
    let r = (color >> 16) & 0xFF;
    let g = (color >> 8) & 0xFF;
    let b = color & 0xFF;
    format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
}
