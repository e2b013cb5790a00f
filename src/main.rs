#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, io};
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ConsoleUI, Tab, UiAction};
use supportdesk::api::{SupportApi, SupportBackend};
use supportdesk::catalog::OptionCatalog;
use supportdesk::config::{normalize_base_url, Config};
use supportdesk::credentials;
use supportdesk::error::{ApiError, ApiResult};
use supportdesk::identity;
use supportdesk::models::{AdminUser, ChatReply, UploadReceipt};
use supportdesk::relay::{DeskSettings, InquiryDesk, Speaker, Transcript};
use supportdesk::storage::{self, FileStore, KeyValueStore};

/// Command line arguments for supportdesk
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "supportdesk: terminal console for the support chatbot backend.",
    long_about = "supportdesk is a terminal client for the support chatbot backend.\n\n\
    Without a subcommand it opens the admin console: live direct inquiries, a test chat,\n\
    quick options, knowledge-base documents and analytics.\n\n\
    The backend URL comes from --api-url, SUPPORTDESK_API_URL or config.json in the data directory."
)]
struct Args {
    /// Backend base URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Directory for config.json, state.json and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Log file (the console always logs to a file)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the admin console (default)
    Console,
    /// Chat with the bot as a visitor
    Chat {
        /// Send one message, print the answer and exit
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Log in and remember the access token
    Login,
    /// Forget the stored access token
    Logout,
    /// Upload a PDF to the knowledge base
    Upload { path: PathBuf },
    /// List knowledge-base documents
    Documents,
    /// Show usage analytics
    Analytics,
    /// Manage the quick options offered to visitors
    Options {
        #[command(subcommand)]
        action: Option<OptionsCommand>,
    },
}

#[derive(Subcommand, Debug)]
enum OptionsCommand {
    /// List active options in display order
    List,
    /// Add an option at the end of the list
    Add { label: String },
    /// Remove an option by id
    Remove { id: i64 },
}

/// Results of background work started from the console
enum ConsoleEvent {
    TestReply { session_id: String, result: ApiResult<ChatReply> },
    Uploaded { path: PathBuf, result: ApiResult<UploadReceipt> },
}

enum LoopExit {
    Quit,
    AuthExpired,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments FIRST
    let args = Args::parse();

    if let Some(dir) = &args.data_dir {
        storage::set_data_dir_override(dir.clone());
    }

    let log_level = args.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    let is_console = matches!(args.command, None | Some(Command::Console));
    if is_console || args.log_file.is_some() {
        // The console owns the terminal, so logs go to a file
        let log_file_path = match (&args.log_file, &args.data_dir) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => storage::get_data_dir()
                .map(|d| d.join("supportdesk.log"))
                .unwrap_or_else(|_| dir.join("supportdesk.log")),
            (None, None) => PathBuf::from("supportdesk.log"),
        };
        utils::setup_logging(log_file_path.to_str(), log_level)?;
        info!("Logging to file: {}", log_file_path.display());
    } else {
        env_logger::Builder::new().filter_level(log_level).init();
    }

    let mut config = Config::load()?;
    if let Some(url) = &args.api_url {
        config.api_url = normalize_base_url(url);
    }
    info!("Using backend at {}", config.api_url);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open_default()?);
    let api = Arc::new(SupportApi::new(&config.api_url, config.request_timeout())?);

    match args.command.unwrap_or(Command::Console) {
        Command::Console => run_console(api, store, &config).await,
        Command::Chat { message } => run_visitor_chat(api.as_ref(), store.as_ref(), message).await,
        Command::Login => {
            let user = prompt_login(&api, store.as_ref()).await?;
            println!("Logged in as {}", user.email);
            Ok(())
        }
        Command::Logout => {
            credentials::clear_login(store.as_ref());
            api.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Upload { path } => {
            ensure_login(&api, store.as_ref()).await?;
            let receipt = api
                .upload_document(&path)
                .await
                .map_err(|e| fail(store.as_ref(), e))?;
            println!("{} ({}): {}", receipt.filename, receipt.status, receipt.message);
            Ok(())
        }
        Command::Documents => {
            ensure_login(&api, store.as_ref()).await?;
            let documents = api.list_documents().await.map_err(|e| fail(store.as_ref(), e))?;
            if documents.is_empty() {
                println!("No documents uploaded yet.");
            }
            for doc in documents {
                println!(
                    "{:>5}  {:<40} {:<12} {:>5} pages {:>6} chunks",
                    doc.id,
                    doc.filename,
                    doc.status,
                    doc.pages.unwrap_or(0),
                    doc.chunks.unwrap_or(0)
                );
            }
            Ok(())
        }
        Command::Analytics => {
            ensure_login(&api, store.as_ref()).await?;
            let analytics = api.analytics().await.map_err(|e| fail(store.as_ref(), e))?;
            println!("Total conversations: {}", analytics.total_conversations);
            if let Some(ms) = analytics.average_response_ms() {
                println!("Average response time: {} ms", ms);
            }
            for conv in &analytics.recent_conversations {
                println!("  {}  {}", conv.created_at, conv.question);
            }
            Ok(())
        }
        Command::Options { action } => run_options(api, store, action.unwrap_or(OptionsCommand::List)).await,
    }
}

/// Maps a failed one-shot call to a printable error, dropping a rejected token.
fn fail(store: &dyn KeyValueStore, e: ApiError) -> anyhow::Error {
    if e.is_auth() {
        credentials::clear_login(store);
        return anyhow!("{} Run `supportdesk login`.", e.user_message());
    }
    error!("{}", e);
    anyhow!(e.user_message())
}

/// Uses the stored token when the backend still accepts it, otherwise prompts.
async fn ensure_login(api: &SupportApi, store: &dyn KeyValueStore) -> Result<AdminUser> {
    if let Some(stored) = credentials::load_login(store)? {
        api.set_token(Some(stored.access_token));
        match api.current_user().await {
            Ok(user) => {
                info!("Using stored login for {}", user.email);
                return Ok(user);
            }
            Err(e) if e.is_auth() => {
                warn!("Stored token for {} was rejected", stored.email);
                credentials::clear_login(store);
                api.logout();
            }
            Err(e) => return Err(anyhow!(e.user_message())),
        }
    }
    prompt_login(api, store).await
}

/// Prompts for credentials or uses SUPPORTDESK_EMAIL / SUPPORTDESK_PASSWORD
async fn prompt_login(api: &SupportApi, store: &dyn KeyValueStore) -> Result<AdminUser> {
    if let (Ok(email), Ok(password)) = (env::var("SUPPORTDESK_EMAIL"), env::var("SUPPORTDESK_PASSWORD")) {
        let login = api.login(&email, &password).await.map_err(|e| anyhow!(e.user_message()))?;
        credentials::save_login(store, &login)?;
        return Ok(login.user);
    }

    let last_email = credentials::last_email(store);
    for attempt in 1..=3 {
        let email = utils::prompt("Admin email", last_email.as_deref())?;
        let password = utils::prompt_password("Password (input is visible)")?;
        match api.login(&email, &password).await {
            Ok(login) => {
                credentials::save_login(store, &login)?;
                return Ok(login.user);
            }
            Err(e) => {
                warn!("Login attempt {} failed: {}", attempt, e);
                eprintln!("Login failed: {}", e.user_message());
            }
        }
    }
    Err(anyhow!("Too many failed login attempts"))
}

async fn run_visitor_chat(api: &SupportApi, store: &dyn KeyValueStore, message: Option<String>) -> Result<()> {
    let session_id = identity::get_or_create_session_id(store);
    debug!("Visitor session {}", session_id);

    let mut catalog = OptionCatalog::new();
    catalog.refresh(api).await;
    let mut transcript = Transcript::new(&session_id, catalog.labels());

    if let Some(message) = message {
        if transcript.send(api, &message).await {
            print_last_bubble(&transcript);
        }
        return Ok(());
    }

    println!("Hi! Ask me anything, or pick a question below. Empty line or 'quit' to leave.");
    loop {
        for (i, label) in transcript.options().iter().enumerate() {
            println!("  {}) {}", i + 1, label);
        }
        let line = utils::prompt("You", None)?;
        if line.is_empty() || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let picked = line
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .and_then(|n| transcript.click_option(n - 1));
        match picked {
            Some(label) => {
                let result = api.post_visitor_message(&session_id, &label).await;
                transcript.finish(result);
            }
            None => {
                if !transcript.send(api, &line).await {
                    continue;
                }
            }
        }
        print_last_bubble(&transcript);
    }
    Ok(())
}

fn print_last_bubble(transcript: &Transcript) {
    if let Some(bubble) = transcript.bubbles().last() {
        let who = match bubble.speaker {
            Speaker::Visitor => "You",
            Speaker::Bot => "Bot",
        };
        println!("{}: {}", who, bubble.text);
    }
}

async fn run_options(api: Arc<SupportApi>, store: Arc<dyn KeyValueStore>, action: OptionsCommand) -> Result<()> {
    let mut catalog = OptionCatalog::new();
    match action {
        OptionsCommand::List => {
            catalog.refresh(api.as_ref()).await;
            if catalog.is_fallback() {
                println!("No options configured; visitors see the built-in questions:");
            }
            for option in catalog.options() {
                println!("{:>5}  {:>3}  {}", option.id, option.order, option.label);
            }
        }
        OptionsCommand::Add { label } => {
            ensure_login(&api, store.as_ref()).await?;
            catalog.refresh(api.as_ref()).await;
            let option = catalog.add(api.as_ref(), &label).await.map_err(|e| fail(store.as_ref(), e))?;
            println!("Added option {} at position {}", option.id, option.order);
        }
        OptionsCommand::Remove { id } => {
            ensure_login(&api, store.as_ref()).await?;
            catalog.refresh(api.as_ref()).await;
            catalog.remove(api.as_ref(), id).await.map_err(|e| fail(store.as_ref(), e))?;
            println!("Removed option {}; {} remaining", id, catalog.stored_count());
        }
    }
    Ok(())
}

async fn run_console(api: Arc<SupportApi>, store: Arc<dyn KeyValueStore>, config: &Config) -> Result<()> {
    let mut user = ensure_login(&api, store.as_ref()).await?;
    info!("Support desk console starting for {}", user.email);

    let backend: Arc<dyn SupportBackend> = api.clone();
    let mut desk = InquiryDesk::new(backend.clone(), store.clone(), DeskSettings::from_config(config));
    let mut catalog = OptionCatalog::new();
    catalog.refresh(backend.as_ref()).await;
    let mut test_chat = Transcript::new(&identity::test_chat_session_id(), catalog.labels());
    let (console_tx, mut console_rx) = mpsc::unbounded_channel::<ConsoleEvent>();

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ConsoleUI::new(&user.email);
    desk.start();

    loop {
        let exit = run_main_loop(
            &mut chat_ui,
            &mut terminal,
            &mut desk,
            &mut catalog,
            &mut test_chat,
            &api,
            &console_tx,
            &mut console_rx,
        )
        .await;
        ui::restore_terminal(terminal)?;

        match exit? {
            LoopExit::Quit => break,
            LoopExit::AuthExpired => {
                desk.stop();
                credentials::clear_login(store.as_ref());
                api.logout();
                eprintln!("Your session has expired. Please log in again.");
                user = prompt_login(&api, store.as_ref()).await?;

                terminal = ui::setup_terminal()?;
                chat_ui = ConsoleUI::new(&user.email);
                desk.start();
            }
        }
    }

    desk.stop();
    println!("Support desk closed.");
    Ok(())
}

/// Run the main event loop
#[allow(clippy::too_many_arguments)]
async fn run_main_loop(
    chat_ui: &mut ConsoleUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    desk: &mut InquiryDesk,
    catalog: &mut OptionCatalog,
    test_chat: &mut Transcript,
    api: &Arc<SupportApi>,
    console_tx: &mpsc::UnboundedSender<ConsoleEvent>,
    console_rx: &mut mpsc::UnboundedReceiver<ConsoleEvent>,
) -> Result<LoopExit> {
    loop {
        // Apply poll results and finished requests
        desk.poll_events();
        if desk.auth_expired() {
            return Ok(LoopExit::AuthExpired);
        }

        while let Ok(event) = console_rx.try_recv() {
            match event {
                ConsoleEvent::TestReply { session_id, result } => {
                    // Replies for a test chat that was reset are dropped
                    if session_id != test_chat.session_id() {
                        continue;
                    }
                    let auth = matches!(&result, Err(e) if e.is_auth());
                    test_chat.finish(result);
                    if auth {
                        return Ok(LoopExit::AuthExpired);
                    }
                }
                ConsoleEvent::Uploaded { path, result } => {
                    chat_ui.set_busy(None);
                    match result {
                        Ok(receipt) => {
                            chat_ui.set_status(format!("Uploaded {}: {}", receipt.filename, receipt.status));
                            if let Some(exit) = refresh_tab(chat_ui, catalog, api, Tab::Documents).await {
                                return Ok(exit);
                            }
                        }
                        Err(e) => {
                            warn!("Upload of {} failed: {}", path.display(), e);
                            if let Some(exit) = report(chat_ui, &e) {
                                return Ok(exit);
                            }
                        }
                    }
                }
            }
        }

        chat_ui.set_reply_blocked(desk.reply_blocked());
        terminal.draw(|f| chat_ui.draw(f, desk, test_chat, catalog))?;

        let Some(action) = chat_ui.handle_input(catalog, test_chat)? else {
            continue;
        };

        match action {
            UiAction::Quit => return Ok(LoopExit::Quit),
            UiAction::MoveSelection(offset) => {
                desk.clear_status_line();
                desk.select_relative(offset);
            }
            UiAction::ClearSelection => desk.clear_selection(),
            UiAction::SendReply(text) => {
                if let Err(e) = desk.send_reply(&text) {
                    chat_ui.set_error(e.to_string());
                }
            }
            UiAction::CloseInquiry => {
                if let Err(e) = desk.close_selected() {
                    chat_ui.set_error(e.to_string());
                }
            }
            UiAction::DeleteInquiry => {
                if let Err(e) = desk.delete_selected() {
                    chat_ui.set_error(e.to_string());
                }
            }
            UiAction::SendTestChat(text) => {
                if let Some(body) = test_chat.begin_send(&text) {
                    spawn_test_chat(api, console_tx, test_chat.session_id(), body);
                }
            }
            UiAction::ClickTestOption(index) => {
                if let Some(body) = test_chat.click_option(index) {
                    spawn_test_chat(api, console_tx, test_chat.session_id(), body);
                }
            }
            UiAction::NewTestChat => {
                *test_chat = Transcript::new(&identity::test_chat_session_id(), catalog.labels());
                chat_ui.set_status("Started a new test conversation");
            }
            UiAction::AddOption(label) => match catalog.add(api.as_ref(), &label).await {
                Ok(option) => {
                    chat_ui.set_status(format!("Added quick option \"{}\"", option.label));
                    test_chat.set_options(catalog.labels());
                }
                Err(e) => {
                    if let Some(exit) = report(chat_ui, &e) {
                        return Ok(exit);
                    }
                }
            },
            UiAction::RemoveOption(id) => match catalog.remove(api.as_ref(), id).await {
                Ok(()) => {
                    chat_ui.set_status("Quick option removed");
                    test_chat.set_options(catalog.labels());
                }
                Err(e) => {
                    if let Some(exit) = report(chat_ui, &e) {
                        return Ok(exit);
                    }
                }
            },
            UiAction::UploadDocument(path) => {
                chat_ui.set_busy(Some(format!("Uploading {}...", display_name(&path))));
                let api = api.clone();
                let tx = console_tx.clone();
                tokio::spawn(async move {
                    let result = api.upload_document(&path).await;
                    let _ = tx.send(ConsoleEvent::Uploaded { path, result });
                });
            }
            UiAction::DeleteDocument(id) => match api.delete_document(id).await {
                Ok(()) => {
                    chat_ui.set_status("Document deleted");
                    if let Some(exit) = refresh_tab(chat_ui, catalog, api, Tab::Documents).await {
                        return Ok(exit);
                    }
                }
                Err(e) => {
                    if let Some(exit) = report(chat_ui, &e) {
                        return Ok(exit);
                    }
                }
            },
            UiAction::Refresh => {
                let tab = chat_ui.active_tab();
                if let Some(exit) = refresh_tab(chat_ui, catalog, api, tab).await {
                    return Ok(exit);
                }
            }
        }
    }
}

fn spawn_test_chat(api: &Arc<SupportApi>, tx: &mpsc::UnboundedSender<ConsoleEvent>, session_id: &str, body: String) {
    let api = api.clone();
    let tx = tx.clone();
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        let result = api.test_chat(&session_id, &body).await;
        if let Ok(reply) = &result {
            debug!("Test chat answered in {:?} ms", reply.response_time_ms);
        }
        let _ = tx.send(ConsoleEvent::TestReply { session_id, result });
    });
}

/// Reloads the data shown on `tab`. Inquiries refresh themselves by polling.
async fn refresh_tab(chat_ui: &mut ConsoleUI, catalog: &mut OptionCatalog, api: &Arc<SupportApi>, tab: Tab) -> Option<LoopExit> {
    match tab {
        Tab::Inquiries | Tab::TestChat => None,
        Tab::Options => {
            catalog.refresh(api.as_ref()).await;
            None
        }
        Tab::Documents | Tab::Analytics => {
            let (documents, analytics) = futures::future::join(api.list_documents(), api.analytics()).await;
            let mut exit = None;
            match documents {
                Ok(documents) => chat_ui.set_documents(documents),
                Err(e) => exit = report(chat_ui, &e),
            }
            match analytics {
                Ok(analytics) => chat_ui.set_analytics(analytics),
                Err(e) => exit = exit.or(report(chat_ui, &e)),
            }
            exit
        }
    }
}

/// Shows the error inline; auth failures end the loop for a new login.
fn report(chat_ui: &mut ConsoleUI, e: &ApiError) -> Option<LoopExit> {
    error!("Request failed: {}", e);
    chat_ui.set_error(e.user_message());
    if e.is_auth() {
        Some(LoopExit::AuthExpired)
    } else {
        None
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
