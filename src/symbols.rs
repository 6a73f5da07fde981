// src/symbols.rs

//! Status markers shared by every command's output.

use colored::{ColoredString, Colorize};
use std::sync::LazyLock;

pub static OK: LazyLock<ColoredString> = LazyLock::new(|| "[OK]".green());
pub static ERROR: LazyLock<ColoredString> = LazyLock::new(|| "[X]".red());
pub static INFO: LazyLock<ColoredString> = LazyLock::new(|| "[i]".cyan());
pub static WARN: LazyLock<ColoredString> = LazyLock::new(|| "[!]".yellow());
/// Content that exists but is not published yet.
pub static PENDING: LazyLock<ColoredString> = LazyLock::new(|| "[~]".magenta());
/// Marker in front of purchased offerings and unlocked lessons.
pub static OWNED: LazyLock<ColoredString> = LazyLock::new(|| "[+]".bright_green());
pub static CANCEL_HINT: LazyLock<ColoredString> = LazyLock::new(|| "Ctrl+C".yellow());
