// src/workflows.rs

//! One function per command: they drive the domain modules and render the outcome.

use crate::{
    AppContext,
    admin::AdminDesk,
    cart::{AddOutcome, CartEngine},
    catalog::require_admin,
    checkout::{self, CallbackGuard, CallbackOutcome, PaymentStatus},
    cli::{
        AdminAction, CartAction, CookieAction, LessonFields, LoginArgs, ProductEdit,
        SettingsAction, TestimonialAction,
    },
    constants::{self, api::callback::SUCCESS_PATH, pricing},
    dialogue::{ChatSession, CompletionBackend},
    download::{self, LinkTracker},
    error::{AppError, AppResult},
    models::{
        AccountStatus, ChatRole, LessonDraft, LessonUpdate, OfferingUpdate, ResourceStatus, Role,
        TestimonialDraft, VideoProvider, Viewer,
    },
    preferences, publication, session, symbols,
    testimonials::TestimonialUpdate,
    ui, utils,
    visibility::{self, PlayerSelection},
};
use anyhow::Context;
use colored::*;
use log::{info, warn};
use std::path::Path;

fn read_file(path: &Path) -> AppResult<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Lecture de '{}' impossible", path.display()))?;
    Ok(bytes)
}

fn status_label(status: ResourceStatus) -> ColoredString {
    match status {
        ResourceStatus::Draft => "brouillon".yellow(),
        ResourceStatus::Published => "publié".green(),
        ResourceStatus::Archived => "archivé".dimmed(),
    }
}

fn stars(rating: u8) -> String {
    format!(
        "{}{}",
        "★".repeat(usize::from(rating)),
        "☆".repeat(usize::from(5u8.saturating_sub(rating)))
    )
}

// --- Catalog and cart ---

pub(crate) fn show_catalog(ctx: &AppContext) -> AppResult<()> {
    ui::print_header(&format!("{} - Catalogue", constants::APP_NAME));
    let is_admin = ctx.viewer.as_ref().is_some_and(Viewer::is_admin);
    for offering in ctx.catalog.offerings() {
        let owned = ctx.viewer.as_ref().is_some_and(|v| v.owns(&offering.id));
        let price = match offering.original_price {
            Some(original) if original > offering.price => format!(
                "{} {}",
                utils::format_price(offering.price).green().bold(),
                utils::format_price(original).dimmed().strikethrough()
            ),
            _ => utils::format_price(offering.price).green().bold().to_string(),
        };
        println!(
            "\n {} {}",
            utils::truncate_text(&offering.title, constants::TITLE_TRUNCATE_LENGTH).bold(),
            if owned { format!("{} acquis", *symbols::OWNED) } else { String::new() }
        );
        ui::print_row("  Référence", &offering.id);
        ui::print_row("  Prix", &price);
        if !offering.description.is_empty() {
            ui::print_row("  Description", &utils::single_line(&offering.description));
        }
        if owned || is_admin {
            let affordance =
                publication::download_affordance(offering.current_resource.as_ref(), is_admin);
            let card = download::card_view(offering, affordance, &download::LinkState::Idle);
            ui::print_row("  Guide PDF", &card.subtitle);
        }
    }
    let totals = ctx.cart.totals();
    if totals.count > 0 {
        println!(
            "\n{} Panier: {} article(s), total {}",
            *symbols::INFO,
            totals.count,
            utils::format_price(totals.total)
        );
    }
    if ctx.consent.banner_visible() {
        println!(
            "\n{} Ce service utilise des cookies. Choisissez avec 'cookies accept-all', 'cookies refuse-all' ou 'cookies custom'.",
            *symbols::INFO
        );
    }
    Ok(())
}

fn print_cart(cart: &CartEngine) {
    ui::print_sub_header("Panier");
    if cart.is_empty() {
        println!("  Votre panier est vide.");
        return;
    }
    for item in cart.items() {
        let label = if item.quantity > 1 {
            format!("{} x{}", item.offering.title, item.quantity)
        } else {
            item.offering.title.clone()
        };
        ui::print_row(&label, &utils::format_price(item.line_total()));
    }
    let totals = cart.totals();
    println!();
    ui::print_row("Sous-total", &utils::format_price(totals.subtotal));
    if totals.discount > 0 {
        ui::print_row(
            "Remise pack sécurité",
            &format!("-{}", utils::format_price(totals.discount)).green().to_string(),
        );
    }
    ui::print_row("Total", &utils::format_price(totals.total).bold().to_string());
}

pub(crate) fn cart(ctx: &mut AppContext, action: &CartAction) -> AppResult<()> {
    match action {
        CartAction::Add { product_id } => {
            let offering = ctx.catalog.require_offering(product_id)?.clone();
            let owned = ctx.viewer.as_ref().is_some_and(|v| v.owns(product_id));
            if owned && offering.id != pricing::KIT_OFFERING_ID {
                println!("{} Vous possédez déjà '{}'.", *symbols::INFO, offering.title);
                return Ok(());
            }
            match ctx.cart.add_item(&offering)? {
                AddOutcome::Added => {
                    CallbackGuard::reset(ctx.store.as_ref())?;
                    println!("{} '{}' ajouté au panier.", *symbols::OK, offering.title)
                }
                AddOutcome::Incremented(quantity) => {
                    CallbackGuard::reset(ctx.store.as_ref())?;
                    println!(
                        "{} '{}' : quantité portée à {}.",
                        *symbols::OK,
                        offering.title,
                        quantity
                    )
                }
                AddOutcome::AlreadyPresent => {
                    println!("{} '{}' est déjà dans le panier.", *symbols::INFO, offering.title)
                }
            }
            print_cart(&ctx.cart);
        }
        CartAction::Remove { product_id } => {
            if ctx.cart.remove_item(product_id)? {
                println!("{} Article retiré.", *symbols::OK);
            } else {
                println!("{} '{}' n'est pas dans le panier.", *symbols::INFO, product_id);
            }
            print_cart(&ctx.cart);
        }
        CartAction::Show => print_cart(&ctx.cart),
        CartAction::Clear => {
            ctx.cart.clear()?;
            println!("{} Panier vidé.", *symbols::OK);
        }
    }
    Ok(())
}

// --- Checkout ---

pub(crate) async fn checkout(ctx: &mut AppContext, simulate: bool) -> AppResult<()> {
    let origin = ctx.config.site_origin.clone();
    let result = ui::with_spinner(
        "Création de la session de paiement...",
        checkout::start_checkout(
            ctx.viewer.as_ref(),
            &mut ctx.cart,
            &origin,
            ctx.client.as_ref(),
        ),
    )
    .await;

    match result {
        Ok(url) => {
            CallbackGuard::reset(ctx.store.as_ref())?;
            ui::box_message(
                "Paiement sécurisé",
                &["Ouvrez cette adresse pour finaliser votre commande :", &url],
                |s| s.green(),
            );
            Ok(())
        }
        Err(e) if e.is_payment_failure() && checkout::demo_fallback_allowed(ctx.config.environment) => {
            warn!("Session de paiement indisponible, simulation proposée: {}", e);
            println!("{} {}", *symbols::WARN, e);
            if simulate || ui::confirm(checkout::DEMO_FALLBACK_PROMPT, false) {
                let outcome = checkout::parse_callback(&checkout::simulated_success_url(&origin))?;
                apply_callback(ctx, outcome).await
            } else {
                println!("{} {}", *symbols::INFO, checkout::DEMO_DECLINED_NOTICE);
                Ok(())
            }
        }
        Err(e) => Err(e),
    }
}

pub(crate) async fn callback(ctx: &mut AppContext, url: &str) -> AppResult<()> {
    let mut guard = CallbackGuard::load(ctx.store.as_ref());
    let Some(outcome) = guard.take(url)? else {
        println!("{} Rien à traiter pour cette adresse.", *symbols::INFO);
        return Ok(());
    };
    guard.save(ctx.store.as_ref())?;
    apply_callback(ctx, outcome).await
}

async fn apply_callback(ctx: &mut AppContext, outcome: CallbackOutcome) -> AppResult<()> {
    if let Some(notice) = &outcome.auth {
        println!("{} {}", *symbols::WARN, notice.message().yellow());
    }
    match outcome.payment {
        Some(PaymentStatus::Success) => {
            let refreshed = match ctx.sessions.load() {
                Some(stored) if stored.local_viewer.is_none() => {
                    let viewer =
                        session::resolve_viewer(ctx.client.as_ref(), &stored.user_id, &stored.email)
                            .await;
                    viewer.is_customer().then_some(viewer)
                }
                _ => None,
            };
            let synthesized = refreshed.is_none();
            let viewer =
                checkout::apply_payment_success(&mut ctx.cart, refreshed, ctx.viewer.take())?;
            if synthesized {
                ctx.sessions.remember_local_viewer(&viewer)?;
            }
            info!("Paiement confirmé pour '{}'", viewer.id);
            ctx.viewer = Some(viewer);
            println!("{} {}", *symbols::OK, checkout::SUCCESS_NOTICE.green());
            println!(
                "{} Espace membre: {}{}",
                *symbols::INFO,
                ctx.config.site_origin,
                SUCCESS_PATH
            );
            print_dashboard(ctx);
        }
        Some(PaymentStatus::Cancel) => {
            checkout::apply_payment_cancel(&mut ctx.cart);
            println!("{} {}", *symbols::WARN, checkout::CANCEL_NOTICE);
            print_cart(&ctx.cart);
        }
        None => {}
    }
    println!("{} Adresse nettoyée: {}", *symbols::INFO, outcome.cleaned_url);
    Ok(())
}

// --- Member area ---

fn print_dashboard(ctx: &AppContext) {
    let Some(viewer) = ctx.viewer.as_ref() else {
        return;
    };
    ui::print_sub_header("Mes guides");
    if !viewer.is_customer() {
        println!("  Aucun achat pour le moment.");
        return;
    }
    for id in &viewer.purchased_product_ids {
        match ctx.catalog.offering(id) {
            Some(offering) => {
                let affordance = publication::download_affordance(
                    offering.current_resource.as_ref(),
                    viewer.is_admin(),
                );
                let button =
                    download::button_view("Télécharger le PDF", affordance, &download::LinkState::Idle);
                ui::print_row(&offering.title, &button.label);
            }
            None => ui::print_row(id, "produit retiré du catalogue"),
        }
    }
}

pub(crate) fn course(ctx: &AppContext, product_id: &str, lesson_id: Option<&str>) -> AppResult<()> {
    let viewer = ctx.require_viewer()?;
    let offering = ctx.catalog.require_offering(product_id)?;
    if !viewer.is_admin() && !viewer.owns(product_id) {
        return Err(AppError::Forbidden("Accès refusé. Produit non acquis.".to_string()));
    }
    let course = visibility::visible_course(
        ctx.catalog.course(product_id),
        product_id,
        viewer.is_admin(),
    )?;
    let (active_module, active_lesson) = match lesson_id {
        Some(id) => visibility::find_lesson(&course, id)
            .ok_or_else(|| AppError::NotFound(format!("leçon '{}'", id)))?,
        None => match visibility::default_selection(&course) {
            PlayerSelection::Ready { module, lesson } => (module, lesson),
            PlayerSelection::ContentPending => {
                return Err(AppError::ContentUnavailable(offering.title.clone()));
            }
        },
    };

    ui::print_header(&offering.title);
    for module in &course.modules {
        let marker = if module.id == active_module.id { "▼" } else { "▶" };
        let tag = if module.status == ResourceStatus::Draft {
            format!(" [{}]", status_label(module.status))
        } else {
            String::new()
        };
        println!(" {} {}{}", marker, module.title.bold(), tag);
        for lesson in &module.lessons {
            let line = format!("{} ({})", lesson.title, lesson.duration);
            let line = if lesson.id == active_lesson.id {
                format!("   ● {}", line.cyan().bold())
            } else {
                format!("   ○ {}", line)
            };
            if lesson.status == ResourceStatus::Published {
                println!("{}", line);
            } else {
                println!("{} [{}]", line, status_label(lesson.status));
            }
        }
    }

    ui::print_sub_header(&active_lesson.title);
    ui::print_row("Vidéo", &active_lesson.video_url);
    ui::print_row("Lecteur", &format!("{:?}", active_lesson.provider).to_lowercase());
    if let Some(description) = &active_lesson.description {
        println!("\n  {}", description);
    }
    if let Some(checklist) = &active_lesson.checklist {
        println!();
        for item in checklist {
            println!("  [ ] {}", item);
        }
    }
    let affordance =
        publication::download_affordance(offering.current_resource.as_ref(), viewer.is_admin());
    let button = download::button_view("Télécharger le PDF", affordance, &download::LinkState::Idle);
    println!(
        "\n{} {}{}",
        *symbols::INFO,
        button.label,
        button.tooltip.map(|t| format!(" ({})", t)).unwrap_or_default()
    );
    Ok(())
}

pub(crate) async fn download(ctx: &AppContext, product_id: &str) -> AppResult<()> {
    let offering = ctx.catalog.require_offering(product_id)?;
    let mut tracker = LinkTracker::default();
    tracker.begin();
    let result = ui::with_spinner(
        "Génération du lien sécurisé...",
        download::generate_secure_link(ctx.viewer.as_ref(), offering, ctx.client.as_ref()),
    )
    .await;
    tracker.resolve(&result);

    let is_admin = ctx.viewer.as_ref().is_some_and(Viewer::is_admin);
    let affordance = publication::download_affordance(offering.current_resource.as_ref(), is_admin);
    let card = download::card_view(offering, affordance, tracker.state());
    let link = result?;

    ui::box_message(download::WARNING_TITLE, download::WARNING_LINES, |s| s.red());
    println!("\n {}", offering.title.bold());
    ui::print_row("Fichier", &card.subtitle);
    if let Some(footer) = card.footer {
        ui::print_row("État", &footer);
    }
    ui::print_row(
        "Expire à",
        &link
            .expires_at
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S")
            .to_string(),
    );
    println!("\n{}", link.url.underline());
    Ok(())
}

// --- Assistant ---

pub(crate) async fn chat(ctx: &AppContext, message: Option<&str>, reset: bool) -> AppResult<()> {
    if reset {
        ChatSession::discard(ctx.store.as_ref())?;
    }
    let mut session = ChatSession::load_or_start(ctx.store.as_ref(), ctx.is_entitled());
    match message.map(str::trim).filter(|m| !m.is_empty()) {
        Some(text) => {
            let backend: Option<&dyn CompletionBackend> = if ctx.config.chat_api_key.is_some() {
                Some(ctx.client.as_ref())
            } else {
                None
            };
            let reply = ui::with_spinner("L'assistant répond...", session.send(text, backend)).await;
            println!("\n{} {}", "Assistant:".cyan().bold(), reply);
        }
        None => {
            ui::print_header("Assistant SerrureMaster");
            for turn in session.messages() {
                match turn.role {
                    ChatRole::User => println!("\n{} {}", "Vous:".bold(), turn.text),
                    ChatRole::Model => println!("\n{} {}", "Assistant:".cyan().bold(), turn.text),
                }
            }
        }
    }
    session.save(ctx.store.as_ref())
}

// --- Session ---

pub(crate) async fn login(ctx: &mut AppContext, args: &LoginArgs) -> AppResult<()> {
    let outcome = session::login(
        &ctx.sessions,
        ctx.client.as_ref(),
        &args.email,
        args.user_id.as_deref(),
    )
    .await?;
    match outcome {
        session::LoginOutcome::SignedIn(viewer) => {
            println!(
                "{} Connecté en tant que {} ({}).",
                *symbols::OK,
                viewer.name.bold(),
                viewer.email
            );
            ctx.viewer = Some(viewer);
            print_dashboard(ctx);
        }
        session::LoginOutcome::LinkSent => {
            println!(
                "{} Lien de connexion envoyé à {}. Relancez 'login' avec --user-id une fois connecté.",
                *symbols::OK,
                args.email
            );
        }
    }
    Ok(())
}

pub(crate) fn logout(ctx: &mut AppContext) -> AppResult<()> {
    ctx.sessions.clear()?;
    ctx.viewer = None;
    println!("{} Déconnecté.", *symbols::OK);
    Ok(())
}

pub(crate) fn whoami(ctx: &AppContext) -> AppResult<()> {
    let Some(viewer) = ctx.viewer.as_ref() else {
        println!("{} Non connecté.", *symbols::INFO);
        return Ok(());
    };
    ui::print_header(&viewer.name);
    ui::print_row("Email", &viewer.email);
    ui::print_row(
        "Rôle",
        if viewer.role == Role::Admin { "administrateur" } else { "client" },
    );
    if viewer.status == AccountStatus::Blocked {
        ui::print_row("Statut", &"bloqué".red().to_string());
    }
    if let Some(joined) = &viewer.joined_at {
        ui::print_row("Inscrit le", joined);
    }
    print_dashboard(ctx);
    Ok(())
}

// --- Testimonials, consent, branding ---

pub(crate) async fn testimonials(ctx: &mut AppContext, action: Option<&TestimonialAction>) -> AppResult<()> {
    match action {
        None | Some(TestimonialAction::List) => {
            ui::print_header("Ils nous ont fait confiance");
            for t in ctx.testimonials.public() {
                println!("\n {} {}", stars(t.rating).yellow(), t.name.bold());
                if !t.role.is_empty() {
                    println!("   {}", t.role.dimmed());
                }
                println!("   « {} »", t.text);
            }
        }
        Some(TestimonialAction::Submit {
            name,
            role,
            text,
            rating,
            source,
        }) => {
            let draft = TestimonialDraft {
                name: name.clone(),
                role: role.clone(),
                text: text.clone(),
                rating: *rating,
                source: source.map(Into::into),
            };
            ui::with_spinner(
                "Envoi de votre avis...",
                ctx.testimonials
                    .submit(ctx.viewer.as_ref(), draft, ctx.client.as_ref()),
            )
            .await?;
            println!(
                "{} Merci ! Votre avis sera publié après validation.",
                *symbols::OK
            );
        }
    }
    Ok(())
}

pub(crate) fn cookies(ctx: &mut AppContext, action: &CookieAction) -> AppResult<()> {
    let preferences = match action {
        CookieAction::Show => {
            if ctx.consent.banner_visible() {
                println!("{} Aucun choix enregistré.", *symbols::INFO);
            }
            ctx.consent.preferences()
        }
        CookieAction::AcceptAll => ctx.consent.accept_all()?,
        CookieAction::RefuseAll => ctx.consent.refuse_all()?,
        CookieAction::Custom {
            analytics,
            marketing,
        } => ctx.consent.custom(*analytics, *marketing)?,
        CookieAction::Reset => {
            ctx.consent.reset()?;
            println!("{} Préférences effacées, le bandeau sera de nouveau affiché.", *symbols::OK);
            return Ok(());
        }
    };
    let flag = |on: bool| if on { "oui".green() } else { "non".red() };
    ui::print_row("Nécessaires", &flag(preferences.necessary).to_string());
    ui::print_row("Mesure d'audience", &flag(preferences.analytics).to_string());
    ui::print_row("Marketing", &flag(preferences.marketing).to_string());
    Ok(())
}

pub(crate) fn settings(ctx: &mut AppContext, action: &SettingsAction) -> AppResult<()> {
    let describe = |value: &Option<String>| match value {
        Some(url) => format!("personnalisé ({} caractères)", url.len()),
        None => "par défaut".to_string(),
    };
    match action {
        SettingsAction::Show => {}
        SettingsAction::Logo { file } => {
            let viewer = ctx.require_viewer()?.clone();
            ctx.settings.update_logo(&viewer, &read_file(file)?)?;
            println!("{} Logo mis à jour.", *symbols::OK);
        }
        SettingsAction::Hero { file } => {
            let viewer = ctx.require_viewer()?.clone();
            ctx.settings.update_hero_image(&viewer, &read_file(file)?)?;
            println!("{} Image d'accueil mise à jour.", *symbols::OK);
        }
        SettingsAction::Reset => {
            let viewer = ctx.require_viewer()?.clone();
            ctx.settings.reset(&viewer)?;
            println!("{} Apparence par défaut restaurée.", *symbols::OK);
        }
    }
    let current = ctx.settings.settings();
    ui::print_row("Logo", &describe(&current.logo));
    ui::print_row("Image d'accueil", &describe(&current.hero_image));
    Ok(())
}

// --- Back office ---

fn offering_update(edit: &ProductEdit) -> OfferingUpdate {
    OfferingUpdate {
        title: edit.title.clone(),
        description: edit.description.clone(),
        price: edit.price,
        original_price: edit.original_price,
        stripe_price_id: edit.price_id.clone(),
        features: (!edit.features.is_empty()).then(|| edit.features.clone()),
    }
}

fn lesson_update(fields: &LessonFields) -> LessonUpdate {
    LessonUpdate {
        title: fields.title.clone(),
        duration: fields.duration.clone(),
        video_url: fields.video_url.clone(),
        provider: fields.provider.map(Into::into),
        description: fields.description.clone(),
        checklist: (!fields.checklist.is_empty()).then(|| fields.checklist.clone()),
    }
}

fn lesson_draft(fields: &LessonFields) -> AppResult<LessonDraft> {
    let required = |value: &Option<String>, flag: &str| {
        value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::UserInputError(format!("--{} est obligatoire", flag)))
    };
    Ok(LessonDraft {
        title: required(&fields.title, "title")?,
        duration: required(&fields.duration, "duration")?,
        video_url: required(&fields.video_url, "video-url")?,
        provider: fields.provider.map_or(VideoProvider::Native, Into::into),
        description: fields.description.clone(),
        checklist: (!fields.checklist.is_empty()).then(|| fields.checklist.clone()),
    })
}

fn found_or(found: bool, what: String) -> AppResult<()> {
    if found {
        println!("{} Modification enregistrée.", *symbols::OK);
        Ok(())
    } else {
        Err(AppError::NotFound(what))
    }
}

pub(crate) async fn admin(ctx: &mut AppContext, action: &AdminAction) -> AppResult<()> {
    let viewer = ctx.require_viewer()?.clone();
    require_admin(&viewer)?;
    let client = ctx.client.clone();
    let backend = client.as_ref();

    match action {
        AdminAction::Stats => {
            let desk = ui::with_spinner("Chargement des comptes...", AdminDesk::open(&viewer, backend)).await?;
            let stats = desk.stats(ctx.catalog.offerings());
            let pending = ctx.testimonials.all().iter().filter(|t| !t.approved).count();
            ui::print_header("Tableau de bord");
            ui::print_row("Chiffre d'affaires", &utils::format_price(stats.revenue).green().to_string());
            ui::print_row("Ventes", &stats.sales.to_string());
            ui::print_row("Clients actifs", &stats.active_clients.to_string());
            ui::print_row("Comptes bloqués", &stats.blocked_users.to_string());
            ui::print_row("Avis en attente", &pending.to_string());
        }
        AdminAction::Users => {
            let desk = AdminDesk::open(&viewer, backend).await?;
            ui::print_header("Utilisateurs");
            for user in desk.users() {
                let status = match user.status {
                    AccountStatus::Active => "actif".green(),
                    AccountStatus::Blocked => "bloqué".red(),
                };
                ui::print_row(
                    &format!("{} <{}>", user.name, user.email),
                    &format!("{} | {} achat(s) | {}", status, user.purchased_product_ids.len(), user.id),
                );
            }
        }
        AdminAction::Block { user_id } => {
            let mut desk = AdminDesk::open(&viewer, backend).await?;
            desk.block_user(user_id, backend).await?;
            println!("{} Utilisateur '{}' bloqué.", *symbols::OK, user_id);
        }
        AdminAction::Grant {
            user_id,
            product_id,
        } => {
            ctx.catalog.require_offering(product_id)?;
            let mut desk = AdminDesk::open(&viewer, backend).await?;
            if desk.grant_access(user_id, product_id, backend).await? {
                println!("{} Accès à '{}' accordé.", *symbols::OK, product_id);
            } else {
                println!("{} '{}' possède déjà '{}'.", *symbols::INFO, user_id, product_id);
            }
        }
        AdminAction::Product { product_id, edit } => {
            let update = offering_update(edit);
            if update.is_empty() {
                return Err(AppError::UserInputError("Aucune modification fournie.".to_string()));
            }
            ctx.catalog
                .update_product_details(&viewer, product_id, &update, backend)
                .await?;
            println!("{} Produit '{}' mis à jour.", *symbols::OK, product_id);
        }
        AdminAction::Image { product_id, file } => {
            let image = preferences::image_data_url(&read_file(file)?)?;
            ctx.catalog
                .update_product_image(&viewer, product_id, &image, backend)
                .await?;
            println!("{} Image de '{}' mise à jour.", *symbols::OK, product_id);
        }
        AdminAction::Upload { product_id, file } => {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| AppError::UserInputError(format!("'{}' n'est pas un fichier", file.display())))?;
            let bytes = read_file(file)?;
            let resource = ui::with_spinner(
                "Envoi du document...",
                ctx.catalog
                    .upload_product_resource(&viewer, product_id, &file_name, bytes, backend),
            )
            .await?;
            println!(
                "{} '{}' v{} ({}) déposé, statut {}.",
                *symbols::OK,
                resource.file_name,
                resource.version,
                resource.file_size,
                status_label(resource.status)
            );
        }
        AdminAction::Resource { product_id, status } => {
            let status = ctx
                .catalog
                .set_resource_status(&viewer, product_id, (*status).into())?;
            println!("{} Document de '{}' : {}.", *symbols::OK, product_id, status_label(status));
        }
        AdminAction::AddModule { product_id, title } => {
            let id = ctx.catalog.add_module(&viewer, product_id, title)?;
            println!("{} Module '{}' créé (brouillon).", *symbols::OK, id);
        }
        AdminAction::AddLesson {
            product_id,
            module_id,
            fields,
        } => {
            let draft = lesson_draft(fields)?;
            match ctx.catalog.add_lesson(&viewer, product_id, module_id, draft)? {
                Some(id) => println!("{} Leçon '{}' créée (brouillon).", *symbols::OK, id),
                None => {
                    return Err(AppError::NotFound(format!(
                        "module '{}' de '{}'",
                        module_id, product_id
                    )));
                }
            }
        }
        AdminAction::EditLesson {
            product_id,
            module_id,
            lesson_id,
            fields,
        } => {
            let found = ctx.catalog.update_lesson_details(
                &viewer,
                product_id,
                module_id,
                lesson_id,
                &lesson_update(fields),
            )?;
            found_or(found, format!("leçon '{}'", lesson_id))?;
        }
        AdminAction::LessonStatus {
            product_id,
            module_id,
            lesson_id,
            status,
        } => {
            let found = ctx.catalog.update_lesson_status(
                &viewer,
                product_id,
                module_id,
                lesson_id,
                (*status).into(),
            )?;
            found_or(found, format!("leçon '{}'", lesson_id))?;
        }
        AdminAction::ModuleStatus {
            product_id,
            module_id,
            status,
        } => {
            let found =
                ctx.catalog
                    .update_module_status(&viewer, product_id, module_id, (*status).into())?;
            found_or(found, format!("module '{}'", module_id))?;
        }
        AdminAction::Reviews => {
            ui::print_header("Modération des avis");
            for entry in ctx.testimonials.entries() {
                let t = entry.testimonial;
                let state = if t.approved { "publié".green() } else { "en attente".yellow() };
                println!("\n {} {} [{}] {}", t.id.dimmed(), t.name.bold(), state, stars(t.rating));
                println!("   {}", utils::truncate_text(&utils::single_line(&t.text), constants::UI_WIDTH - 4));
            }
        }
        AdminAction::Approve { id } => {
            let approved = ctx.testimonials.toggle_approval(&viewer, id, backend).await?;
            let label = if approved { "publié" } else { "masqué" };
            println!("{} Avis '{}' {}.", *symbols::OK, id, label);
        }
        AdminAction::EditReview {
            id,
            name,
            role,
            text,
            rating,
        } => {
            let update = TestimonialUpdate {
                name: name.clone(),
                role: role.clone(),
                text: text.clone(),
                rating: *rating,
                approved: None,
            };
            ctx.testimonials.update(&viewer, id, update, backend).await?;
            println!("{} Avis '{}' modifié.", *symbols::OK, id);
        }
        AdminAction::DeleteReview { id } => {
            ctx.testimonials.delete(&viewer, id, backend).await?;
            println!("{} Avis '{}' supprimé.", *symbols::OK, id);
        }
        AdminAction::ResetReviews => {
            ctx.testimonials.reset(&viewer)?;
            println!("{} Avis d'origine restaurés.", *symbols::OK);
        }
    }
    Ok(())
}
