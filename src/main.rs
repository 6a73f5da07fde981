// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use serrure_master::{
    cli::Cli,
    constants,
    error::{AppError, NoticeKind},
    logger, run_from_cli, symbols, ui,
};
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} Interrompu par l'utilisateur.", *symbols::WARN);
            tokio::time::sleep(Duration::from_millis(100)).await;
            std::process::exit(130);
        }
    });

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| clap::crate_name!().to_string());
    let after_help = format!(
        "Exemples:\n  # Parcourir le catalogue\n  {bin} catalog\n\n  # Ajouter un guide puis payer\n  {bin} cart add p1_door_slammed\n  {bin} checkout\n\n  # Compte de démonstration\n  {bin} login --email demo@serruremaster.com\n  {bin} download p1_door_slammed",
        bin = bin_name
    );
    let matches = Cli::command().after_help(after_help).get_matches();
    let args = match Cli::from_arg_matches(&matches) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };
    logger::init_logger(args.log_level, args.home.as_deref());

    if let Err(e) = run_from_cli(args).await {
        log::error!("Échec de la commande: {}", e);
        match e.notice_kind() {
            NoticeKind::Fatal => {
                let detail = e.to_string();
                ui::box_message(
                    "Configuration requise",
                    &constants::HELP_CONFIGURATION_GUIDE
                        .lines()
                        .chain(std::iter::once(""))
                        .chain(std::iter::once(detail.as_str()))
                        .collect::<Vec<_>>(),
                    |s| s.red(),
                );
                std::process::exit(2);
            }
            NoticeKind::Pending => {
                println!("{} {}", *symbols::PENDING, e);
            }
            _ if matches!(e, AppError::UserInterrupt) => std::process::exit(130),
            _ => {
                eprintln!("\n{} {}", *symbols::ERROR, e.to_string().red());
                std::process::exit(1);
            }
        }
    }
}
