// crates/barbot-cli/src/main.rs
// ============================================================================
// Module: Barbot CLI Entry Point
// Description: Command dispatcher for the Barbot server and operator tasks.
// Purpose: Run the server, drive the rig by hand, and seed the recipe store.
// Dependencies: clap, barbot-client, barbot-server, barbot-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! `barbot serve` runs the HTTP surface. The client commands (`drinks`,
//! `mix`, `pump`, `watch`) talk to a running server the same way a display
//! does. `config` and `store` work offline against local files.
//!
//! Server URL resolution: `--server`, else `BARBOT_SERVER`, else
//! `http://127.0.0.1:7071`.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use barbot_broker::LogPublisher;
use barbot_client::ApiClient;
use barbot_client::BarbotApi;
use barbot_client::ClientLog;
use barbot_client::LivenessMonitor;
use barbot_client::LivenessState;
use barbot_client::ONLINE_WINDOW_MS;
use barbot_client::StatusFeed;
use barbot_client::StderrClientLog;
use barbot_client::SystemClock;
use barbot_config::BarbotConfig;
use barbot_config::PubSubMode;
use barbot_config::StoreType;
use barbot_config::config_toml_example;
use barbot_core::ActuationDurations;
use barbot_core::RecipeId;
use barbot_core::RecipeStore;
use barbot_core::filter_available;
use barbot_server::ServerBuilder;
use barbot_server::build_store;
use barbot_store_sqlite::SqliteRecipeStore;
use barbot_store_sqlite::SqliteStoreConfig;
use barbot_store_sqlite::load_seed_dir;
use clap::ArgGroup;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the server base URL.
const SERVER_ENV: &str = "BARBOT_SERVER";
/// Server base URL used when none is given.
const DEFAULT_SERVER: &str = "http://127.0.0.1:7071";
/// Identity header sent by client commands.
const DEFAULT_IDENTITY_HEADER: &str = "x-ms-client-principal-name";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "barbot", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Barbot HTTP server.
    Serve(ServeCommand),
    /// List the drinks the current pump configuration can make.
    Drinks(DrinksCommand),
    /// Mix a drink by recipe id.
    Mix(MixCommand),
    /// Run pumps for explicit durations.
    Pump(PumpCommand),
    /// Follow the rig's online and busy state.
    Watch(WatchCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Recipe store utilities.
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to `barbot.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write job messages to stdout instead of publishing them.
    #[arg(long)]
    dry_run: bool,
}

/// Connection settings shared by client commands.
#[derive(Args, Debug, Clone)]
struct ServerArgs {
    /// Server base URL.
    #[arg(long, value_name = "URL")]
    server: Option<String>,
    /// Caller identity sent to the server.
    #[arg(long, value_name = "NAME")]
    caller: Option<String>,
    /// Header carrying the caller identity.
    #[arg(long, value_name = "HEADER", default_value = DEFAULT_IDENTITY_HEADER)]
    identity_header: String,
}

/// Arguments for `drinks`.
#[derive(Args, Debug)]
struct DrinksCommand {
    /// Connection settings.
    #[command(flatten)]
    server: ServerArgs,
    /// Print the recipes as JSON.
    #[arg(long)]
    json: bool,
}

/// Arguments for `mix`.
#[derive(Args, Debug)]
struct MixCommand {
    /// Connection settings.
    #[command(flatten)]
    server: ServerArgs,
    /// Recipe identifier.
    recipe_id: String,
}

/// Arguments for `pump`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("mode").required(true).args(["durations", "slot"])))]
struct PumpCommand {
    /// Connection settings.
    #[command(flatten)]
    server: ServerArgs,
    /// One duration in milliseconds per pump slot, comma separated.
    #[arg(long, value_name = "MS,...", value_delimiter = ',', num_args = 1..)]
    durations: Option<Vec<f64>>,
    /// Single pump slot to run.
    #[arg(long, value_name = "N", requires = "seconds")]
    slot: Option<usize>,
    /// Seconds to run the single slot.
    #[arg(long, value_name = "S", requires = "slot")]
    seconds: Option<f64>,
}

/// Arguments for `watch`.
#[derive(Args, Debug)]
struct WatchCommand {
    /// Connection settings.
    #[command(flatten)]
    server: ServerArgs,
    /// Heartbeat age below which the rig counts as online.
    #[arg(long, value_name = "MS")]
    online_window_ms: Option<u64>,
    /// Path to `barbot.toml` supplying `[liveness] online_window_ms`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file and its recipe store.
    Check(ConfigCheckCommand),
    /// Print an example configuration.
    Example,
}

/// Arguments for `config check`.
#[derive(Args, Debug)]
struct ConfigCheckCommand {
    /// Path to `barbot.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Import recipe JSON files and `config.json` into the `SQLite` store.
    Import(StoreImportCommand),
}

/// Arguments for `store import`.
#[derive(Args, Debug)]
struct StoreImportCommand {
    /// Seed directory.
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Database path; defaults to `store.path` from the configuration.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Path to `barbot.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Drinks(command) => command_drinks(&command).await,
        Commands::Mix(command) => command_mix(&command).await,
        Commands::Pump(command) => command_pump(&command).await,
        Commands::Watch(command) => command_watch(&command).await,
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Store {
            command,
        } => command_store(&command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = BarbotConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let bind = config.server.bind.clone();
    let mut builder = ServerBuilder::new(config);
    if command.dry_run {
        builder = builder.publisher(Arc::new(LogPublisher::new(std::io::stdout())));
    }
    let server = tokio::task::spawn_blocking(move || builder.build())
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!("barbot listening on {bind}"))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Client Commands
// ============================================================================

/// Executes `drinks`.
async fn command_drinks(command: &DrinksCommand) -> CliResult<ExitCode> {
    let api = api_client(&command.server)?;
    let recipes =
        api.drinks().await.map_err(|err| CliError::new(format!("drinks failed: {err}")))?;
    if command.json {
        write_json(&recipes)?;
        return Ok(ExitCode::SUCCESS);
    }
    if recipes.is_empty() {
        write_stdout_line("no drinks available")?;
    }
    for recipe in &recipes {
        let ingredients: Vec<String> = recipe
            .ingredients
            .iter()
            .map(|line| format!("{} {}", line.ingredient, line.amount))
            .collect();
        write_stdout_line(&format!("{}\t{}\t{}", recipe.id, recipe.name, ingredients.join(", ")))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `mix`.
async fn command_mix(command: &MixCommand) -> CliResult<ExitCode> {
    let recipe_id = RecipeId::new(command.recipe_id.trim());
    if recipe_id.is_blank() {
        return Err(CliError::new("recipe id must not be empty".to_string()));
    }
    let api = api_client(&command.server)?;
    let confirmation =
        api.mix(&recipe_id).await.map_err(|err| CliError::new(format!("mix failed: {err}")))?;
    write_json(&confirmation)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `pump`.
async fn command_pump(command: &PumpCommand) -> CliResult<ExitCode> {
    let durations = pump_durations(command)?;
    let api = api_client(&command.server)?;
    let confirmation = api
        .actuate(&durations)
        .await
        .map_err(|err| CliError::new(format!("pump failed: {err}")))?;
    write_json(&confirmation)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the duration vector for `pump` from either argument form.
fn pump_durations(command: &PumpCommand) -> CliResult<Vec<f64>> {
    let durations = match (&command.durations, command.slot, command.seconds) {
        (Some(values), _, _) => ActuationDurations::try_from(values.clone()),
        (None, Some(slot), Some(seconds)) => {
            ActuationDurations::single_slot(slot, seconds * 1_000.0)
        }
        _ => {
            return Err(CliError::new(
                "pump needs --durations or both --slot and --seconds".to_string(),
            ));
        }
    };
    durations
        .map(Vec::<f64>::from)
        .map_err(|err| CliError::new(format!("invalid durations: {err}")))
}

/// Executes `watch`: prints one line per liveness transition until the feed closes.
async fn command_watch(command: &WatchCommand) -> CliResult<ExitCode> {
    let config = command
        .config
        .as_deref()
        .map(|path| BarbotConfig::load(Some(path)))
        .transpose()
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let window_ms = online_window(command.online_window_ms, config.as_ref());
    let api = api_client(&command.server)?;
    let url = api
        .negotiate()
        .await
        .map_err(|err| CliError::new(format!("negotiate failed: {err}")))?;
    let log: Arc<dyn ClientLog> = Arc::new(StderrClientLog);
    let feed = StatusFeed::connect(&url, Arc::clone(&log))
        .await
        .map_err(|err| CliError::new(format!("subscribe failed: {err}")))?;
    let monitor = LivenessMonitor::with_clock(Arc::new(SystemClock), window_ms, log);
    let mut changes = monitor.watch();
    write_stdout_line(&describe_state(monitor.state()))?;

    let run = feed.run(&monitor);
    tokio::pin!(run);
    loop {
        tokio::select! {
            result = &mut run => {
                monitor.shutdown();
                result.map_err(|err| CliError::new(format!("status feed failed: {err}")))?;
                write_stderr_line("status feed closed")?;
                return Ok(ExitCode::SUCCESS);
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    return Ok(ExitCode::SUCCESS);
                }
                let state = *changes.borrow_and_update();
                write_stdout_line(&describe_state(state))?;
            }
        }
    }
}

/// Resolves the online window: `--online-window-ms`, else the loaded
/// config's `[liveness]` section, else [`ONLINE_WINDOW_MS`].
fn online_window(flag: Option<u64>, config: Option<&BarbotConfig>) -> u64 {
    flag.or_else(|| config.map(|config| config.liveness.online_window_ms))
        .unwrap_or(ONLINE_WINDOW_MS)
}

/// Renders a liveness state as one output line.
fn describe_state(state: LivenessState) -> String {
    format!("{}\tonline={}\tbusy={}", state.phase().as_str(), state.online, state.busy)
}

/// Builds an API client from connection arguments.
fn api_client(args: &ServerArgs) -> CliResult<ApiClient> {
    let env_server = std::env::var(SERVER_ENV).ok();
    let base = resolve_server(args.server.as_deref(), env_server.as_deref());
    let client = ApiClient::new(&base)
        .map_err(|err| CliError::new(format!("invalid server url {base}: {err}")))?;
    Ok(match &args.caller {
        Some(caller) => client.with_identity(args.identity_header.as_str(), caller.as_str()),
        None => client,
    })
}

/// Picks the server URL from the flag, the environment, or the default.
fn resolve_server(flag: Option<&str>, env: Option<&str>) -> String {
    flag.or(env)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_SERVER)
        .to_string()
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check(command) => command_config_check(command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes `config check`: validates the file, opens the store, and reports
/// pump assignment problems.
fn command_config_check(command: &ConfigCheckCommand) -> CliResult<ExitCode> {
    let config = BarbotConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let pubsub = match &config.pubsub {
        Some(pubsub) => match pubsub.mode {
            PubSubMode::Embedded => "embedded",
            PubSubMode::Remote => "remote",
        },
        None => "not configured",
    };
    let store_type = match config.store.store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    };
    write_stdout_line(&format!("bind: {}", config.server.bind))?;
    write_stdout_line(&format!("pubsub: {pubsub}"))?;
    write_stdout_line(&format!("store: {store_type}"))?;
    if config.pubsub.is_none() {
        write_stderr_line("warning: no [pubsub] section; mix, pump, and negotiate will fail")?;
    }

    let store = build_store(&config.store)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let recipes = store
        .list_recipes()
        .map_err(|err| CliError::new(format!("failed to read recipes: {err}")))?;
    write_stdout_line(&format!("recipes: {}", recipes.len()))?;
    match store.load_config() {
        Ok(Some(pumps)) => {
            pumps
                .validate()
                .map_err(|err| CliError::new(format!("invalid pump config: {err}")))?;
            for (ingredient, slots) in pumps.duplicate_assignments() {
                let slots: Vec<String> = slots.iter().map(ToString::to_string).collect();
                write_stderr_line(&format!(
                    "warning: {ingredient} is assigned to slots {}; the first slot is used",
                    slots.join(", ")
                ))?;
            }
            let mixable = filter_available(&pumps, &recipes).len();
            write_stdout_line(&format!("mixable: {mixable}"))?;
        }
        Ok(None) => write_stderr_line("warning: no pump config in store")?,
        Err(err) => return Err(CliError::new(format!("failed to read pump config: {err}"))),
    }
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Dispatches store subcommands.
fn command_store(command: &StoreCommand) -> CliResult<ExitCode> {
    match command {
        StoreCommand::Import(command) => command_store_import(command),
    }
}

/// Executes `store import`.
fn command_store_import(command: &StoreImportCommand) -> CliResult<ExitCode> {
    let store_config = import_target(command)?;
    let seed = load_seed_dir(&command.dir)
        .map_err(|err| CliError::new(format!("failed to read seed directory: {err}")))?;
    let store = SqliteRecipeStore::new(&store_config)
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let summary =
        store.import(&seed).map_err(|err| CliError::new(format!("import failed: {err}")))?;
    let config_note = if summary.config { "pump config replaced" } else { "pump config unchanged" };
    write_stdout_line(&format!(
        "imported {} recipes into {} ({config_note})",
        summary.recipes,
        store_config.path.display()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves the database to import into.
fn import_target(command: &StoreImportCommand) -> CliResult<SqliteStoreConfig> {
    if let Some(path) = &command.db {
        return Ok(SqliteStoreConfig::new(path));
    }
    let config = BarbotConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    match (config.store.store_type, config.store.path) {
        (StoreType::Sqlite, Some(path)) => {
            let mut store_config = SqliteStoreConfig::new(path);
            store_config.busy_timeout_ms = config.store.busy_timeout_ms;
            Ok(store_config)
        }
        _ => Err(CliError::new(
            "store import needs --db or a sqlite [store] in the configuration".to_string(),
        )),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value as pretty JSON to stdout.
fn write_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))?;
    write_stdout_line(&text)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
    ExitCode::FAILURE
}
