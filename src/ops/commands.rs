//! Command dispatch for one-shot invocations and the interactive shell.
//!
//! Every command counts as a user interaction for the auto-lock timer. A
//! one-shot invocation restores the saved session first and saves it again
//! afterwards; the shell keeps its session in memory.

use crate::cli::{split_line, Command, EntryArgs, ShellLine};
use crate::config::Config;
use crate::constants::DECRYPTION_ERROR_PLACEHOLDER;
use crate::crypto::{
    prompt_new_passphrase, prompt_passphrase, LockCause, SessionManager, SessionState,
    SessionStore,
};
use crate::errors::{AppError, AppResult, CryptoError};
use crate::ops::transfer::{default_export_file_name, export_all, import_file, write_export};
use crate::remote::RemoteStore;
use crate::settings::{validate_auto_lock, Settings};
use crate::vault::{Credential, NewCredential, VaultStore};
use secrecy::{ExposeSecret, SecretString};
use chrono::Utc;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

const SHELL_PROMPT: &str = "wreckvault> ";
const MASKED_SECRET: &str = "********";

/// Application state shared by every command.
pub struct App<R, I, W> {
    config: Config,
    settings: Settings,
    session: SessionManager,
    vault: VaultStore<R>,
    session_store: Option<SessionStore>,
    input: I,
    output: W,
}

impl<R: RemoteStore, I: BufRead, W: Write> App<R, I, W> {
    /// Build the application around a remote store.
    ///
    /// `input` answers confirmation prompts and feeds the shell; `output`
    /// receives everything meant for the user.
    pub fn new(remote: R, config: Config, settings: Settings, input: I, output: W) -> Self {
        let session_store = config.session_dir.as_ref().map(SessionStore::new);
        Self {
            session: SessionManager::new(settings.auto_lock_minutes),
            vault: VaultStore::new(remote),
            config,
            settings,
            session_store,
            input,
            output,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn vault(&self) -> &VaultStore<R> {
        &self.vault
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Load a saved session, if any.
    pub fn restore_session(&mut self) -> AppResult<SessionState> {
        match &self.session_store {
            Some(store) => store.restore(&mut self.session),
            None => Ok(self.session.state()),
        }
    }

    /// Save the current session, or remove the snapshot when logged out.
    pub fn save_session(&self) -> AppResult<()> {
        match &self.session_store {
            Some(store) => store.save(&self.session),
            None => Ok(()),
        }
    }

    /// Run a single command as a one-shot invocation.
    pub fn run(&mut self, command: Command) -> AppResult<()> {
        if command == Command::Shell {
            self.restore_session()?;
            return self.run_shell();
        }

        self.restore_session()?;
        let result = self.execute(command);
        self.save_session()?;
        result
    }

    /// Execute one command against the current session.
    pub fn execute(&mut self, command: Command) -> AppResult<()> {
        self.interact()?;
        debug!("Executing {}", command_name(&command));

        match command {
            Command::Register { username } => self.register(&username),
            Command::Login { username } => self.login(&username),
            Command::Logout => self.logout(),
            Command::List { query, reveal } => self.list(query.as_deref(), reveal),
            Command::Add(entry) => {
                let entry = new_credential(entry)?;
                let added = self.vault.add(&mut self.session, entry)?;
                let (id, service) = (added.id, added.service_name.clone());
                writeln!(self.output, "Added entry {} ({})", id, service)?;
                Ok(())
            }
            Command::Update { id, entry } => {
                let entry = new_credential(entry)?;
                self.vault.update(&mut self.session, id, entry)?;
                writeln!(self.output, "Updated entry {}", id)?;
                Ok(())
            }
            Command::Delete { id } => {
                self.vault.delete(&mut self.session, id)?;
                writeln!(self.output, "Deleted entry {}", id)?;
                Ok(())
            }
            Command::Export { output, yes } => self.export(output, yes),
            Command::Import { path } => {
                let report = import_file(&mut self.vault, &mut self.session, &path)?;
                writeln!(
                    self.output,
                    "Imported {} of {} entries ({} skipped, {} failed)",
                    report.succeeded, report.attempted, report.skipped, report.failed
                )?;
                Ok(())
            }
            Command::AutoLock { minutes } => self.auto_lock(minutes),
            Command::Status => self.status(),
            Command::Shell => Err(AppError::Validation(
                "already in an interactive session".to_string(),
            )),
        }
    }

    /// Read commands from `input` until end of input or `exit`.
    ///
    /// Command errors are reported and the shell keeps running.
    pub fn run_shell(&mut self) -> AppResult<()> {
        info!("Starting interactive shell");
        writeln!(
            self.output,
            "Interactive session. Type `help` for commands, `exit` to quit."
        )?;

        loop {
            write!(self.output, "{}", SHELL_PROMPT)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }

            let words = match split_line(line) {
                Ok(words) => words,
                Err(message) => {
                    writeln!(self.output, "Error: {}", message)?;
                    continue;
                }
            };
            let command = match ShellLine::parse_words(&words) {
                Ok(command) => command,
                Err(e) => {
                    write!(self.output, "{}", e.render())?;
                    continue;
                }
            };

            if let Err(e) = self.execute(command) {
                writeln!(self.output, "Error: {}", e)?;
            }
        }

        self.session.logout();
        self.vault.clear();
        if let Some(store) = &self.session_store {
            store.clear()?;
        }
        info!("Interactive shell closed");
        Ok(())
    }

    /// Record a user interaction, reporting an auto-lock that happened while idle.
    fn interact(&mut self) -> AppResult<()> {
        let was_authenticated = self.session.state().is_authenticated();
        let state = self.session.touch();

        if was_authenticated
            && state
                == (SessionState::LoggedOut {
                    cause: Some(LockCause::AutoLocked),
                })
        {
            self.vault.clear();
            if let Some(store) = &self.session_store {
                store.clear()?;
            }
            writeln!(self.output, "Vault auto-locked after inactivity.")?;
        }
        Ok(())
    }

    fn register(&mut self, username: &str) -> AppResult<()> {
        let passphrase = prompt_new_passphrase()?;
        self.vault.clear();
        let user = self
            .session
            .register(self.vault.remote(), username, passphrase)?;
        let name = user.username.clone();
        writeln!(self.output, "Registered and logged in as {}", name)?;
        Ok(())
    }

    fn login(&mut self, username: &str) -> AppResult<()> {
        let passphrase = prompt_passphrase("Master password: ")?;
        self.vault.clear();
        let user = self
            .session
            .login(self.vault.remote(), username, passphrase)?;
        let name = user.username.clone();

        let report = self.vault.fetch_all(&mut self.session)?;
        writeln!(
            self.output,
            "Logged in as {}. {} entries unlocked.",
            name,
            report.total - report.failed
        )?;
        if report.failed > 0 {
            writeln!(
                self.output,
                "Warning: {} entries could not be decrypted with this master password.",
                report.failed
            )?;
        }
        Ok(())
    }

    fn logout(&mut self) -> AppResult<()> {
        self.session.logout();
        self.vault.clear();
        if let Some(store) = &self.session_store {
            store.clear()?;
        }
        writeln!(self.output, "Logged out.")?;
        Ok(())
    }

    fn list(&mut self, query: Option<&str>, reveal: bool) -> AppResult<()> {
        let report = self.vault.fetch_all(&mut self.session)?;
        let query = query.unwrap_or("");

        let mut shown = 0;
        for entry in self.vault.search(query) {
            writeln!(self.output, "{}", format_entry(entry, reveal))?;
            shown += 1;
        }

        if shown == 0 {
            let message = if query.is_empty() {
                "No entries yet."
            } else {
                "No matching entries."
            };
            writeln!(self.output, "{}", message)?;
        }
        if report.failed > 0 {
            writeln!(
                self.output,
                "Warning: {} entries could not be decrypted.",
                report.failed
            )?;
        }
        Ok(())
    }

    fn export(&mut self, output: Option<PathBuf>, yes: bool) -> AppResult<()> {
        self.vault.fetch_all(&mut self.session)?;
        let bundle = export_all(self.vault.entries());
        let path = output.unwrap_or_else(|| PathBuf::from(default_export_file_name(Utc::now())));

        if !yes {
            let question = format!(
                "This writes {} passwords UNENCRYPTED to {}. Anyone with the file can read them. Continue? [y/N] ",
                bundle.records.len(),
                path.display()
            );
            if !self.confirm(&question)? {
                return Err(AppError::Cancelled("export not confirmed".to_string()));
            }
        }

        let report = write_export(&bundle, &path)?;
        writeln!(
            self.output,
            "Exported {} entries to {} (blake3 {})",
            report.count,
            report.path.display(),
            report.checksum
        )?;
        if report.skipped > 0 {
            writeln!(
                self.output,
                "Skipped {} entries that could not be decrypted.",
                report.skipped
            )?;
        }
        Ok(())
    }

    fn auto_lock(&mut self, minutes: u64) -> AppResult<()> {
        validate_auto_lock(minutes)?;
        self.settings.auto_lock_minutes = minutes;
        self.settings.save(&self.config.data_dir)?;
        self.session.set_auto_lock_minutes(minutes);

        if minutes == 0 {
            writeln!(self.output, "Auto-lock disabled.")?;
        } else {
            writeln!(self.output, "Auto-lock set to {} minutes.", minutes)?;
        }
        Ok(())
    }

    fn status(&mut self) -> AppResult<()> {
        writeln!(self.output, "Server: {}", self.config.server_url)?;

        match (self.session.state(), self.session.user()) {
            (SessionState::Authenticated, Some(user)) => {
                writeln!(self.output, "Logged in as {}", user.username)?;
            }
            (SessionState::LoggedOut { cause: Some(LockCause::AutoLocked) }, _) => {
                writeln!(self.output, "Locked after inactivity")?;
            }
            _ => writeln!(self.output, "Logged out")?,
        }

        match self.session.window() {
            Some(window) => {
                write!(self.output, "Auto-lock: {} minutes", window.as_secs() / 60)?;
                match self.session.remaining() {
                    Some(remaining) => {
                        writeln!(self.output, " ({}s remaining)", remaining.as_secs())?
                    }
                    None => writeln!(self.output)?,
                }
            }
            None => writeln!(self.output, "Auto-lock: never")?,
        }
        Ok(())
    }

    fn confirm(&mut self, question: &str) -> AppResult<bool> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

fn new_credential(args: EntryArgs) -> AppResult<NewCredential> {
    let secret = match args.secret {
        Some(secret) => SecretString::new(secret),
        None => prompt_secret()?,
    };
    let mut entry = NewCredential::new(args.service, secret.expose_secret().as_str())
        .with_account_username(args.username);
    if let Some(website) = args.website {
        entry = entry.with_website_url(website);
    }
    Ok(entry)
}

fn prompt_secret() -> AppResult<SecretString> {
    let secret = rpassword::prompt_password("Secret: ")
        .map_err(|e| CryptoError::PassphrasePrompt(e.to_string()))?;
    Ok(SecretString::new(secret))
}

fn format_entry(entry: &Credential, reveal: bool) -> String {
    let secret = match entry.secret.expose() {
        Some(secret) if reveal => secret,
        Some(_) => MASKED_SECRET,
        None => DECRYPTION_ERROR_PLACEHOLDER,
    };
    let mut line = format!(
        "{:>4}  {}  {}  {}",
        entry.id,
        entry.service_name,
        if entry.account_username.is_empty() {
            "-"
        } else {
            &entry.account_username
        },
        secret
    );
    if let Some(url) = &entry.website_url {
        line.push_str("  ");
        line.push_str(url);
    }
    line
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Register { .. } => "register",
        Command::Login { .. } => "login",
        Command::Logout => "logout",
        Command::List { .. } => "list",
        Command::Add(_) => "add",
        Command::Update { .. } => "update",
        Command::Delete { .. } => "delete",
        Command::Export { .. } => "export",
        Command::Import { .. } => "import",
        Command::AutoLock { .. } => "auto-lock",
        Command::Status => "status",
        Command::Shell => "shell",
    }
}
