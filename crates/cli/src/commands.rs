// crates/cli/src/commands.rs
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tabops_core::{Config, Credentials, ServerEntry};
use tabops_db::{substitute_destination, ConstantLookup, ConstantStore};
use tabops_tableau::{JobStatus, PdfOptions, StatusLabel, TableauClient};
use tracing::{info, warn};

use crate::auth::{connect_vault, tableau_credentials};
use crate::cli::{Command, ExportCommand, PasswordCommand};

/// How a command finished; maps to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    JobFailed,
    JobCancelled,
}

impl Outcome {
    pub fn from_status(status: &JobStatus) -> Self {
        match status.status_label() {
            StatusLabel::Error => Outcome::JobFailed,
            StatusLabel::Cancelled => Outcome::JobCancelled,
            StatusLabel::Complete | StatusLabel::InProgress => Outcome::Success,
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::JobFailed => 2,
            Outcome::JobCancelled => 3,
        }
    }
}

/// Loaded config plus the global command-line selections.
pub struct App {
    pub config: Config,
    pub server: Option<String>,
    pub site: Option<String>,
}

impl App {
    pub fn run(&self, command: Command) -> Result<Outcome> {
        match command {
            Command::Refresh {
                workbook_id,
                no_wait,
            } => {
                let client = self.signed_in_client()?;
                if no_wait {
                    let handle = client.start_refresh(&workbook_id)?;
                    println!("{}", handle.job_id);
                    return Ok(Outcome::Success);
                }
                let status = client.refresh_and_wait(&workbook_id)?;
                print_status(&status);
                Ok(Outcome::from_status(&status))
            }
            Command::Job { job_id } => {
                let status = self.signed_in_client()?.query_job(&job_id)?;
                print_status(&status);
                Ok(Outcome::from_status(&status))
            }
            Command::Wait { job_id } => {
                let status = self.signed_in_client()?.poll_until_terminal(&job_id)?;
                print_status(&status);
                Ok(Outcome::from_status(&status))
            }
            Command::Cancel { job_id } => {
                let response = self.signed_in_client()?.cancel_job(&job_id)?;
                println!("HTTP {}", response.status);
                let body = response.text();
                if !body.is_empty() {
                    println!("{body}");
                }
                Ok(Outcome::Success)
            }
            Command::Export(export) => self.export(export),
            Command::Servers => {
                let login = login_hint(&self.config);
                for server in self
                    .config
                    .tableau
                    .candidate_servers(self.config.environment, &login)
                {
                    println!("{}\t{}\t{}", server.url, server.tier, sites_label(server));
                }
                Ok(Outcome::Success)
            }
            Command::Password(cmd) => self.password(cmd),
            Command::Constant { code } => {
                println!("{}", self.constants()?.get_constant_value(&code)?);
                Ok(Outcome::Success)
            }
            Command::ResolveDest { text } => {
                println!("{}", substitute_destination(&text, &self.constants()?)?);
                Ok(Outcome::Success)
            }
        }
    }

    fn export(&self, command: ExportCommand) -> Result<Outcome> {
        let client = self.signed_in_client()?;
        let (bytes, output) = match command {
            ExportCommand::Image { view_id, output } => (client.query_view_image(&view_id)?, output),
            ExportCommand::Pdf {
                view_id,
                page,
                width,
                height,
                output,
            } => {
                let options = PdfOptions {
                    orientation: page.orientation,
                    page_type: page.page_type,
                    viz_width: width,
                    viz_height: height,
                };
                (client.query_view_pdf(&view_id, &options)?, output)
            }
            ExportCommand::WorkbookPdf {
                workbook_id,
                page,
                output,
            } => (
                client.download_workbook_pdf(&workbook_id, page.orientation, page.page_type)?,
                output,
            ),
        };
        write_output(&output, &bytes)?;
        info!(path = %output.display(), bytes = bytes.len(), "export written");
        Ok(Outcome::Success)
    }

    fn password(&self, command: PasswordCommand) -> Result<Outcome> {
        let vault = connect_vault(&self.config)?;
        match command {
            PasswordCommand::Get { account, system } => {
                println!("{}", vault.get_password(&account, system.as_deref())?);
            }
            PasswordCommand::Set { account, system } => {
                let password = read_password(std::io::stdin().lock())?;
                vault.update_password(&account, &password, system.as_deref())?;
                eprintln!("Password updated for {account}");
            }
        }
        Ok(Outcome::Success)
    }

    fn constants(&self) -> Result<ConstantStore> {
        let db = self
            .config
            .database
            .as_ref()
            .context("no [database] section in config")?;
        Ok(ConstantStore::open(&db.path, self.config.paths.clone())?)
    }

    fn signed_in_client(&self) -> Result<TableauClient> {
        let credentials = tableau_credentials(&self.config)?;
        let (server, site) = select_target(
            &self.config,
            &credentials.username,
            self.server.as_deref(),
            self.site.as_deref(),
        )?;
        let mut client = TableauClient::new(&server, &self.config.tableau)?;
        client
            .sign_in(&credentials, &site)
            .with_context(|| format!("signing in to {server} as {}", credentials.username))?;
        Ok(client)
    }
}

/// Server URL and site content URL to sign in to.
///
/// An explicit server is used as given. Otherwise the first candidate for
/// the current tier and login wins. The site falls back to the server's
/// first configured site, then the default site (`""`).
pub fn select_target(
    config: &Config,
    login: &str,
    server: Option<&str>,
    site: Option<&str>,
) -> Result<(String, String)> {
    let server = match server {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => match config
            .tableau
            .candidate_servers(config.environment, login)
            .first()
        {
            Some(entry) => entry.url.trim_end_matches('/').to_string(),
            None => bail!(
                "no Tableau server configured for tier {} and login {login}",
                config.environment
            ),
        },
    };
    let site = match site {
        Some(site) => site.to_string(),
        None => config
            .tableau
            .sites_for(&server)
            .and_then(|sites| sites.first())
            .cloned()
            .unwrap_or_default(),
    };
    Ok((server, site))
}

/// Login used to filter candidate servers without contacting the vault.
fn login_hint(config: &Config) -> String {
    let Some(auth) = config.tableau.auth.as_ref() else {
        return String::new();
    };
    if let Some(path) = auth.credentials_file.as_deref() {
        match Credentials::from_properties_file(path) {
            Ok(creds) => return creds.username,
            Err(e) => warn!("cannot read {}: {e}", path.display()),
        }
    }
    auth.vault_account.clone().unwrap_or_default()
}

fn sites_label(server: &ServerEntry) -> String {
    server
        .sites
        .iter()
        .map(|s| if s.is_empty() { "(default)" } else { s.as_str() })
        .collect::<Vec<_>>()
        .join(",")
}

fn print_status(status: &JobStatus) {
    println!("job:      {}", status.id);
    println!("status:   {}", status.status_label());
    if let Some(progress) = status.progress {
        println!("progress: {progress}%");
    }
    if let Some(name) = &status.workbook_name {
        println!("workbook: {name}");
    }
    if let Some(done) = status.completed_at {
        println!("finished: {}", done.to_rfc3339());
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// First line of `input` without its line ending.
fn read_password(mut input: impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("reading new password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("empty password on stdin");
    }
    Ok(password.to_string())
}
