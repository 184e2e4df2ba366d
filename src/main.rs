mod actions;
mod config;
mod contact;
mod editor;
mod logging;
mod notify;
mod search;
mod store;
mod ui;
mod validate;
mod view;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, warn};

use actions::{ActionError, Deleted};
use config::Config;
use contact::Contact;
use editor::Editor;
use logging::{LogTarget, Verbosity};
use notify::{AssumeYes, CommandLauncher, ConsoleNotifier, NotificationKind, Notifier, PromptConfirmer};
use store::{ContactStore, FileSlot, StoreError};
use validate::FieldState;

#[derive(Parser, Debug)]
#[command(name = "quickdial", version, about = "Personal address book for the terminal")]
struct Cli {
    /// Configuration file (default: <config_dir>/quickdial/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Contacts file, overriding `store_path` from the configuration
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List contacts, optionally filtered by name, phone or email
    List(ListArgs),
    /// Add a contact and print its id
    Add(AddArgs),
    /// Change fields of an existing contact
    Edit(EditArgs),
    /// Delete a contact after confirmation
    Delete(DeleteArgs),
    /// Toggle the favorite flag
    Favorite(IdArgs),
    /// Toggle the emergency flag
    Emergency(IdArgs),
    /// Print contact counts
    Stats(StatsArgs),
    /// Open a tel: link for the contact's phone
    Call(IdArgs),
    /// Open a mailto: link for the contact's email
    Email(IdArgs),
    /// Check a phone number's format and whether it is already in use
    CheckPhone(CheckPhoneArgs),
    /// Merge contacts from a JSON file (versioned or a bare browser export)
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Search term
    query: Option<String>,

    #[arg(long)]
    json: bool,

    /// Only favorites (the search term is ignored)
    #[arg(long, conflicts_with = "emergency")]
    favorites: bool,

    /// Only emergency contacts (the search term is ignored)
    #[arg(long)]
    emergency: bool,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    favorite: bool,
    #[arg(long)]
    emergency: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    /// New email; an empty string clears it
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, value_name = "BOOL")]
    favorite: Option<bool>,
    #[arg(long, value_name = "BOOL")]
    emergency: Option<bool>,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    id: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Args, Debug)]
struct IdArgs {
    id: String,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(value_name = "PATH")]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct CheckPhoneArgs {
    phone: String,

    /// Contact being edited; its own number is not a duplicate
    #[arg(long, value_name = "ID")]
    exclude: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let target = if cli.command.is_some() {
        LogTarget::Stderr
    } else {
        LogTarget::File(config::default_log_path()?)
    };
    logging::init_logging(Verbosity::from_count(cli.verbose), &target)?;

    let config = config::load(cli.config.as_deref())?;
    if let Some(path) = &config.config_path {
        debug!(path = %path.display(), "loaded configuration");
    }

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let mut store = ContactStore::load(Box::new(FileSlot::new(store_path)));

    let Some(command) = cli.command else {
        let mut app = ui::app::App::new(&config, store);
        app.run()?;
        return Ok(ExitCode::SUCCESS);
    };

    let mut notifier = ConsoleNotifier;
    match command {
        Command::List(args) => handle_list(&store, args),
        Command::Add(args) => handle_add(&mut store, &config, args, &mut notifier),
        Command::Edit(args) => handle_edit(&mut store, &config, args, &mut notifier),
        Command::Delete(args) => handle_delete(&mut store, args, &mut notifier),
        Command::Favorite(args) => {
            let on = actions::toggle_favorite(&mut store, &args.id, &mut notifier)
                .ok_or(ActionError::NotFound(args.id))?;
            println!("favorite: {}", on_off(on));
            Ok(ExitCode::SUCCESS)
        }
        Command::Emergency(args) => {
            let on = actions::toggle_emergency(&mut store, &args.id, &mut notifier)
                .ok_or(ActionError::NotFound(args.id))?;
            println!("emergency: {}", on_off(on));
            Ok(ExitCode::SUCCESS)
        }
        Command::Stats(args) => handle_stats(&store, args),
        Command::Call(args) => {
            let contact = find(&store, &args.id)?;
            let mut launcher = CommandLauncher::new(config.commands.open.clone());
            actions::call(&mut launcher, &contact.phone)
                .with_context(|| format!("failed to call {}", contact.name))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Email(args) => {
            let contact = find(&store, &args.id)?;
            let Some(address) = contact.email.as_deref() else {
                notifier.notify(
                    NotificationKind::Error,
                    "No email",
                    &format!("{} has no email address.", contact.name),
                );
                return Ok(ExitCode::FAILURE);
            };
            let mut launcher = CommandLauncher::new(config.commands.open.clone());
            actions::email(&mut launcher, address)
                .with_context(|| format!("failed to email {}", contact.name))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckPhone(args) => handle_check_phone(&store, &config, args),
        Command::Import(args) => handle_import(&mut store, args, &mut notifier),
    }
}

fn find<'s>(store: &'s ContactStore, id: &str) -> Result<&'s Contact> {
    Ok(store
        .get(id)
        .ok_or_else(|| ActionError::NotFound(id.to_string()))?)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn handle_list(store: &ContactStore, args: ListArgs) -> Result<ExitCode> {
    let projection = view::project(store.contacts(), args.query.as_deref());

    let (ids, empty): (Vec<&str>, Option<&str>) = if args.favorites {
        let items = projection.favorites.items();
        (items.iter().map(|i| i.id.as_str()).collect(), projection.favorites.empty_message())
    } else if args.emergency {
        let items = projection.emergency.items();
        (items.iter().map(|i| i.id.as_str()).collect(), projection.emergency.empty_message())
    } else {
        let items = projection.grid.items();
        (items.iter().map(|c| c.id.as_str()).collect(), projection.grid.empty_message())
    };

    let contacts: Vec<&Contact> = ids.iter().filter_map(|id| store.get(id)).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&contacts)?);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(message) = empty {
        println!("{}", message);
        return Ok(ExitCode::SUCCESS);
    }

    // id<TAB>name<TAB>phone<TAB>email<TAB>flags
    for contact in contacts {
        let mut flags = Vec::new();
        if contact.is_favorite {
            flags.push("favorite");
        }
        if contact.is_emergency {
            flags.push("emergency");
        }
        println!(
            "{}\t{}\t{}\t{}\t{}",
            contact.id,
            contact.name,
            contact.phone,
            contact.email.as_deref().unwrap_or("-"),
            flags.join(",")
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Print advisory rule failures. They never block a save.
fn warn_feedback(editor: &Editor, store: &ContactStore, config: &Config, notifier: &mut dyn Notifier) {
    let feedback = editor.feedback(&config.rules, store);
    for state in [&feedback.name, &feedback.phone, &feedback.email] {
        if let FieldState::Invalid(message) = state {
            notifier.notify(NotificationKind::Warning, "Check input", message);
        }
    }
}

fn submit(
    editor: &mut Editor,
    store: &mut ContactStore,
    config: &Config,
    notifier: &mut dyn Notifier,
) -> ExitCode {
    warn_feedback(editor, store, config, notifier);
    match editor.submit(store, notifier) {
        Ok(submitted) => {
            println!("{}", submitted.id());
            ExitCode::SUCCESS
        }
        // The notifier already reported it.
        Err(err) => {
            debug!(error = %err, "submit rejected");
            ExitCode::FAILURE
        }
    }
}

fn handle_add(
    store: &mut ContactStore,
    config: &Config,
    args: AddArgs,
    notifier: &mut dyn Notifier,
) -> Result<ExitCode> {
    let mut editor = Editor::default();
    editor.open_add();
    let form = &mut editor.form;
    form.name = args.name;
    form.phone = args.phone;
    form.email = args.email.unwrap_or_default();
    form.address = args.address.unwrap_or_default();
    form.group = args.group.unwrap_or_default();
    form.notes = args.notes.unwrap_or_default();
    form.is_favorite = args.favorite;
    form.is_emergency = args.emergency;

    Ok(submit(&mut editor, store, config, notifier))
}

fn handle_edit(
    store: &mut ContactStore,
    config: &Config,
    args: EditArgs,
    notifier: &mut dyn Notifier,
) -> Result<ExitCode> {
    let mut editor = Editor::default();
    if !editor.open_edit(store, &args.id) {
        return Err(ActionError::NotFound(args.id).into());
    }

    let form = &mut editor.form;
    let text_fields = [
        (&mut form.name, args.name),
        (&mut form.phone, args.phone),
        (&mut form.email, args.email),
        (&mut form.address, args.address),
        (&mut form.group, args.group),
        (&mut form.notes, args.notes),
    ];
    for (slot, value) in text_fields {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(value) = args.favorite {
        form.is_favorite = value;
    }
    if let Some(value) = args.emergency {
        form.is_emergency = value;
    }

    Ok(submit(&mut editor, store, config, notifier))
}

fn handle_delete(
    store: &mut ContactStore,
    args: DeleteArgs,
    notifier: &mut dyn Notifier,
) -> Result<ExitCode> {
    let outcome = if args.yes {
        actions::delete(store, &args.id, &mut AssumeYes, notifier)?
    } else {
        actions::delete(store, &args.id, &mut PromptConfirmer, notifier)?
    };

    if outcome == Deleted::Declined {
        eprintln!("Cancelled.");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_stats(store: &ContactStore, args: StatsArgs) -> Result<ExitCode> {
    let stats = view::Stats::of(store.contacts());
    if args.json {
        let value = serde_json::json!({
            "total": stats.total,
            "favorites": stats.favorites,
            "emergency": stats.emergency,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("total: {}", stats.total);
        println!("favorites: {}", stats.favorites);
        println!("emergency: {}", stats.emergency);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_check_phone(store: &ContactStore, config: &Config, args: CheckPhoneArgs) -> Result<ExitCode> {
    let state = config
        .rules
        .check_phone(&args.phone, store.contacts(), args.exclude.as_deref());
    match state {
        FieldState::Valid => {
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        FieldState::Invalid(message) => {
            println!("{}", message);
            Ok(ExitCode::FAILURE)
        }
        FieldState::Untouched => {
            println!("{}", editor::EditorError::MissingPhone);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_import(
    store: &mut ContactStore,
    args: ImportArgs,
    notifier: &mut dyn Notifier,
) -> Result<ExitCode> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let incoming = store::decode(&raw)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    let mut known_phones: HashSet<String> = store.phones().map(str::to_string).collect();
    let mut imported = 0;
    let mut skipped = incoming.malformed;

    for contact in incoming.contacts {
        if !contact.is_well_formed() {
            debug!(id = %contact.id, "skipping record without id, name or phone");
            skipped += 1;
            continue;
        }
        let phone = contact.phone.trim().to_string();
        if known_phones.contains(&phone) {
            warn!(name = %contact.name, phone = %contact.phone, "imported contact shares a phone number");
        }
        match store.add(contact) {
            Ok(()) => {
                imported += 1;
                known_phones.insert(phone);
            }
            Err(StoreError::DuplicateId(id)) => {
                debug!(id = %id, "skipping record with an existing id");
                skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if imported > 0 {
        actions::persist(store, notifier);
    }

    println!("Imported {} contacts.", imported);
    if skipped > 0 {
        println!(
            "Skipped {} contacts (existing id, or missing name or phone).",
            skipped
        );
    }
    Ok(ExitCode::SUCCESS)
}
