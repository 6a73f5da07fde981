// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn main_command() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_ANON_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("SITE_ORIGIN")
        .env_remove("APP_ENVIRONMENT");
    cmd
}

/// Offline invocation against an unreachable backend: nothing may touch the network.
fn offline_command(home: &Path) -> Command {
    let mut cmd = main_command();
    cmd.arg("--offline")
        .arg("--home")
        .arg(home)
        .arg("--backend-url")
        .arg("http://127.0.0.1:9")
        .arg("--backend-key")
        .arg("test-key");
    cmd
}

// --- Basic CLI behavior ---

#[test]
fn test_help_flag() {
    main_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Affiche cette aide"))
        .stdout(predicate::str::contains("cart add p1_door_slammed"));
}

#[test]
fn test_missing_command_shows_help() {
    main_command()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_cookie_action_is_rejected() {
    main_command()
        .args(["cookies", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("maybe"));
}

// --- Configuration ---

#[test]
fn test_missing_backend_shows_configuration_screen() {
    let home = tempdir().unwrap();
    main_command()
        .arg("--home")
        .arg(home.path())
        .arg("catalog")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Configuration requise"))
        .stdout(predicate::str::contains("SUPABASE_URL"));
}

#[test]
fn test_configure_then_use_saved_credentials() {
    let home = tempdir().unwrap();
    main_command()
        .arg("--home")
        .arg(home.path())
        .args(["configure", "--url", "http://127.0.0.1:9", "--key", "saved-key"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accès enregistrés"));

    main_command()
        .arg("--home")
        .arg(home.path())
        .args(["--offline", "cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Votre panier est vide."));
}

// --- Dispatch ---

#[test]
fn test_catalog_offline_lists_seed_offerings() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("p1_door_slammed"))
        .stdout(predicate::str::contains("p6_survival_kit"));
}

#[test]
fn test_cart_is_kept_between_invocations() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["cart", "add", "p1_door_slammed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ajouté au panier"));
    offline_command(home.path())
        .args(["cart", "add", "p4_security_pack"])
        .assert()
        .success();

    offline_command(home.path())
        .args(["cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Urgence : Porte Claquée"))
        .stdout(predicate::str::contains("Remise pack sécurité"))
        .stdout(predicate::str::contains("150 €"));
}

#[test]
fn test_unknown_product_is_reported() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["cart", "add", "p9_missing"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("p9_missing"));
}

#[test]
fn test_cookie_choice_hides_the_banner() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["cookies", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Aucun choix enregistré."));
    offline_command(home.path())
        .args(["cookies", "custom", "--analytics"])
        .assert()
        .success();

    offline_command(home.path())
        .args(["cookies", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Aucun choix enregistré.").not())
        .stdout(predicate::str::is_match(r"Mesure d'audience\s+oui").unwrap())
        .stdout(predicate::str::is_match(r"Marketing\s+non").unwrap());
}

#[test]
fn test_demo_login_opens_the_member_area() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Non connecté."));

    offline_command(home.path())
        .args(["login", "--email", "demo@serruremaster.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Utilisateur Démo"));

    offline_command(home.path())
        .args(["course", "p1_door_slammed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STOP - Diagnostic immédiat"));

    offline_command(home.path())
        .args(["course", "p2_key_broken"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Produit non acquis"));

    offline_command(home.path()).arg("logout").assert().success();
    offline_command(home.path())
        .args(["course", "p1_door_slammed"])
        .assert()
        .code(1);
}

#[test]
fn test_cancel_callback_keeps_the_cart() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["cart", "add", "p2_key_broken"])
        .assert()
        .success();

    offline_command(home.path())
        .args(["callback", "https://shop.test/?status=cancel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paiement annulé. Votre panier est conservé."));

    offline_command(home.path())
        .args(["cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Clé Cassée dans le Barillet"));
}

#[test]
fn test_second_purchase_clears_the_cart_again() {
    let home = tempdir().unwrap();
    let success = "https://shop.test/dashboard?status=success";

    offline_command(home.path())
        .args(["cart", "add", "p2_key_broken"])
        .assert()
        .success();
    offline_command(home.path())
        .args(["callback", success])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paiement validé"));
    offline_command(home.path())
        .args(["callback", success])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rien à traiter"));

    offline_command(home.path())
        .args(["cart", "add", "p3_cylinder_replace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ajouté au panier"));
    offline_command(home.path())
        .args(["callback", success])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paiement validé"));

    offline_command(home.path())
        .args(["cart", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Votre panier est vide."));
}

#[test]
fn test_version_flag_after_a_subcommand() {
    main_command()
        .args(["cart", "show", "--version"])
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_guest_cannot_submit_a_testimonial() {
    let home = tempdir().unwrap();
    offline_command(home.path())
        .args(["testimonials", "submit", "--name", "Paul", "--text", "Très clair."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("seuls les clients"));

    offline_command(home.path())
        .arg("testimonials")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sophie M."));
}
