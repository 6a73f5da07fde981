// src/ui.rs

use crate::{constants, symbols, utils};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    future::Future,
    io::{self, Write},
    time::Duration,
};

/// Full-width title block opening a command's output.
pub fn print_header(title: &str) {
    let rule = "═".repeat(constants::UI_WIDTH);
    println!("\n{}\n {}\n{}", rule, title.cyan().bold(), rule);
}

pub fn print_sub_header(title: &str) {
    println!("\n{} {}", "»".cyan(), title.bold().underline());
}

/// Framed notice. Only the title is cut to the frame; content lines such as URLs stay whole.
pub fn box_message(title: &str, content: &[&str], color_func: impl Fn(ColoredString) -> ColoredString) {
    let inner = constants::UI_WIDTH - 4;
    let edge = "─".repeat(constants::UI_WIDTH - 2);
    println!("\n┌{}┐", edge);
    println!("│ {} ", color_func(utils::truncate_text(title, inner).as_str().bold()));
    println!("├{}┤", edge);
    for line in content {
        println!("│ {}", line);
    }
    println!("└{}┘", edge);
}

/// Two-column line, label truncated to keep the value column aligned.
pub fn print_row(label: &str, value: &str) {
    let label = utils::truncate_text(label, constants::TITLE_TRUNCATE_LENGTH);
    println!(
        "  {:<width$} {}",
        label,
        value,
        width = constants::TITLE_TRUNCATE_LENGTH
    );
}

pub fn prompt(message: &str, default: Option<&str>) -> io::Result<String> {
    let default_str = default.map_or("".to_string(), |d| format!(" (défaut: {})", d));
    print!("\n>>> {}{}: ", message, default_str);
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "entrée fermée"));
    }
    let input = input.trim().to_string();
    if input.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(input)
    }
}

pub fn confirm(question: &str, default_yes: bool) -> bool {
    let options = if default_yes { "(O/n)" } else { "(o/N)" };
    loop {
        match prompt(
            &format!("{} {} ({} pour annuler)", question, options, *symbols::CANCEL_HINT),
            None,
        ) {
            Ok(choice) => match choice.to_lowercase().as_str() {
                "o" | "oui" | "y" => return true,
                "n" | "non" => return false,
                "" => return default_yes,
                _ => println!("{}", "Réponse invalide, tapez 'o' ou 'n'.".red()),
            },
            Err(_) => return false,
        }
    }
}

/// Runs `future` behind a spinner that clears itself once the result is in.
pub async fn with_spinner<F: Future>(message: &str, future: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let output = future.await;
    spinner.finish_and_clear();
    output
}
