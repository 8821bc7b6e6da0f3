/*!
# Wreckvault - Password Manager Client

Command-line client for a remote encrypted vault. Secrets are encrypted with
the master password before they are sent to the server.

## Usage

```text
wreckvault [OPTIONS] <COMMAND>

Commands:
  register   Create an account and log in
  login      Log in and unlock the vault
  logout     Lock the vault and forget the master password
  list       List entries, newest first
  add        Add an entry
  update     Replace an existing entry
  delete     Delete an entry
  export     Write every secret in plaintext to a JSON file
  import     Add entries from a JSON export file
  auto-lock  Set the inactivity auto-lock window in minutes (0 = never)
  status     Show login state and auto-lock settings
  shell      Start an interactive session

Options:
      --log-format <LOG_FORMAT>  Log output format [possible values: text, json]
  -v, --verbose                  Print debug logs
  -h, --help                     Print help
  -V, --version                  Print version
```

## Configuration

- `WRECKVAULT_SERVER`: Vault API base URL (defaults to "http://localhost:5000/api")
- `WRECKVAULT_DIR`: Settings directory (defaults to "~/.config/wreckvault")
- `WRECKVAULT_SESSION_DIR`: Volatile directory for the saved session
- `WRECKVAULT_LOG_FORMAT`: `text` or `json`
- `RUST_LOG`: Log filter, overrides `--verbose`
*/

use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::{debug, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wreckvault::cli::CliArgs;
use wreckvault::config::Config;
use wreckvault::constants::{
    APP_NAME, DEFAULT_LOG_LEVEL, ENV_VAR_LOG_FORMAT, LOG_FORMAT_JSON, LOG_FORMAT_TEXT,
    TRACING_ROOT_SPAN_NAME, TRACING_SERVICE_NAME, VERBOSE_LOG_LEVEL,
};
use wreckvault::errors::AppResult;
use wreckvault::ops::App;
use wreckvault::remote::HttpRemote;
use wreckvault::settings::Settings;

/// The main entry point for the wreckvault application.
///
/// 1. Parses command-line arguments
/// 2. Initializes logging on stderr
/// 3. Opens the root span with a correlation id
/// 4. Loads configuration and settings
/// 5. Dispatches the command
///
/// Errors are reported once here and turn into a non-zero exit status.
fn main() -> ExitCode {
    let args = CliArgs::parse();

    let log_format = args
        .log_format
        .clone()
        .or_else(|| std::env::var(ENV_VAR_LOG_FORMAT).ok())
        .unwrap_or_else(|| LOG_FORMAT_TEXT.to_string());
    init_tracing(&log_format, args.verbose);

    let correlation_id = Uuid::new_v4().to_string();
    let root_span = info_span!(
        TRACING_ROOT_SPAN_NAME,
        service_name = TRACING_SERVICE_NAME,
        correlation_id = %correlation_id
    );
    let _guard = root_span.enter();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(retryable = e.is_retryable(), "Command failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> AppResult<()> {
    let config = Config::load()?;
    debug!("Loaded configuration: {:?}", config);
    let settings = Settings::load(&config.data_dir)?;

    let remote = HttpRemote::new(config.server_url.clone());
    let stdin = io::stdin();
    let mut app = App::new(remote, config, settings, stdin.lock(), io::stdout());
    app.run(args.command)
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins over `--verbose`. Logs go to stderr so stdout stays clean
/// for command output.
fn init_tracing(format: &str, verbose: bool) {
    let level = if verbose {
        VERBOSE_LOG_LEVEL
    } else {
        DEFAULT_LOG_LEVEL
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={},warn", APP_NAME, level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    if format == LOG_FORMAT_JSON {
        builder.json().with_current_span(true).init();
    } else {
        builder.init();
    }
}
