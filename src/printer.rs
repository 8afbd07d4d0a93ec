//! Console printer
//!
//! All operator-facing output flows through here on the five severity
//! channels, so no algorithm formats its own output. Everything goes to
//! stdout.

use std::fmt::Display;

use crossterm::style::Stylize;

/// Tagged severity printer
#[derive(Debug, Default, Clone, Copy)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, msg: &str) {
        println!("{} {}", "[info]".cyan(), msg);
    }

    pub fn success(&self, msg: &str) {
        println!("{} {}", "[success]".green(), msg);
    }

    pub fn warning(&self, msg: &str) {
        println!("{} {}", "[warning]".yellow(), msg);
    }

    pub fn error(&self, msg: &str) {
        println!("{} {}", "[error]".red(), msg);
    }

    pub fn fatal(&self, msg: &str) {
        println!("{} {}", "[fatal]".red(), msg);
    }

    /// Section header for status blocks
    pub fn header(&self, title: &str) {
        println!("{}", title.bold());
    }

    /// One labelled value of a status block
    pub fn kv(&self, key: &str, value: impl Display) {
        println!("{}: {}", key, value);
    }

    /// A labelled list, comma separated
    pub fn kv_slice(&self, key: &str, values: &[String]) {
        println!("{}: {}", key, values.join(", "));
    }

    /// Unadorned output line
    pub fn line(&self, msg: impl Display) {
        println!("{}", msg);
    }
}
