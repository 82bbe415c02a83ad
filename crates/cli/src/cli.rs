// crates/cli/src/cli.rs
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tabops_tableau::{Orientation, PageType};

/// Trigger, watch and cancel Tableau extract refreshes.
#[derive(Parser, Debug)]
#[command(name = "tabops")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $TABOPS_CONFIG, then <config dir>/tabops/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tableau server URL; defaults to the first candidate for this tier.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Site content URL; defaults to the server's first configured site.
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an extract refresh and wait for it to finish.
    Refresh {
        workbook_id: String,
        /// Print the job id and return once the refresh is accepted.
        #[arg(long)]
        no_wait: bool,
    },
    /// Query a job's status once.
    Job { job_id: String },
    /// Poll a job until it finishes.
    Wait { job_id: String },
    /// Ask the server to cancel a job.
    Cancel { job_id: String },
    /// Download a view or workbook rendering.
    #[command(subcommand)]
    Export(ExportCommand),
    /// List candidate servers and sites for the current tier.
    Servers,
    /// Read or change a vault-managed password.
    #[command(subcommand)]
    Password(PasswordCommand),
    /// Look up a constant in the constants database.
    Constant { code: String },
    /// Expand %dest_...% tokens in TEXT.
    ResolveDest { text: String },
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(long, default_value_t = Orientation::Portrait)]
    pub orientation: Orientation,
    #[arg(long, default_value_t = PageType::Letter)]
    pub page_type: PageType,
}

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    /// PNG image of a view.
    Image {
        view_id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// PDF of a single view.
    Pdf {
        view_id: String,
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, default_value_t = 1024)]
        width: u32,
        #[arg(long, default_value_t = 768)]
        height: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// PDF of a whole workbook.
    WorkbookPdf {
        workbook_id: String,
        #[command(flatten)]
        page: PageArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Print the current password.
    Get {
        account: String,
        #[arg(long)]
        system: Option<String>,
    },
    /// Set a new password read from stdin.
    Set {
        account: String,
        #[arg(long)]
        system: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_refresh_with_globals() {
        let cli = Cli::try_parse_from([
            "tabops",
            "refresh",
            "wb-1",
            "--no-wait",
            "--server",
            "https://tableau.example.com",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.server.as_deref(), Some("https://tableau.example.com"));
        match cli.command {
            Command::Refresh {
                workbook_id,
                no_wait,
            } => {
                assert_eq!(workbook_id, "wb-1");
                assert!(no_wait);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_export_pdf_defaults_and_overrides() {
        let cli = Cli::try_parse_from(["tabops", "export", "pdf", "v-1", "-o", "out.pdf"]).unwrap();
        match cli.command {
            Command::Export(ExportCommand::Pdf {
                page,
                width,
                height,
                ..
            }) => {
                assert_eq!(page.orientation, Orientation::Portrait);
                assert_eq!(page.page_type, PageType::Letter);
                assert_eq!((width, height), (1024, 768));
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "tabops",
            "export",
            "workbook-pdf",
            "wb-1",
            "--orientation",
            "landscape",
            "--page-type",
            "a4",
            "-o",
            "wb.pdf",
        ])
        .unwrap();
        match cli.command {
            Command::Export(ExportCommand::WorkbookPdf { page, .. }) => {
                assert_eq!(page.orientation, Orientation::Landscape);
                assert_eq!(page.page_type, PageType::A4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_page_type_rejected() {
        let err = Cli::try_parse_from([
            "tabops",
            "export",
            "workbook-pdf",
            "wb-1",
            "--page-type",
            "napkin",
            "-o",
            "x.pdf",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("napkin"));
    }

    #[test]
    fn test_password_set_with_system() {
        let cli =
            Cli::try_parse_from(["tabops", "password", "set", "svc.tableau", "--system", "AD"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Password(PasswordCommand::Set { ref system, .. }) if system.as_deref() == Some("AD")
        ));
    }
}
