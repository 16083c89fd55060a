use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,

    /// Validate the configuration and resolve every capability
    #[clap(name = "check")]
    Check,

    /// Show registered providers and the active one per capability
    #[clap(name = "providers")]
    Providers,

    /// Apply pending database migrations
    #[clap(name = "migrate")]
    Migrate,

    /// Manage package metadata
    #[command(arg_required_else_help = true)]
    #[clap(name = "package", visible_alias = "pkg")]
    Package {
        #[clap(subcommand)]
        action: PackageAction,
    },

    /// Search packages by id
    #[clap(name = "search", visible_alias = "s")]
    Search {
        /// Substring of the package id
        query: Option<String>,

        /// Number of results to skip
        #[arg(required = false, long, default_value_t = 0)]
        skip: usize,

        /// Maximum number of results
        #[arg(required = false, long, default_value_t = depot_core::search::DEFAULT_TAKE)]
        take: usize,

        /// Include unlisted versions
        #[arg(required = false, long)]
        all: bool,
    },

    /// Store and fetch portable PDB symbol files
    #[command(arg_required_else_help = true)]
    #[clap(name = "symbols", visible_alias = "sym")]
    Symbols {
        #[clap(subcommand)]
        action: SymbolsAction,
    },
}

impl Commands {
    /// Whether the command needs validated capabilities and an up to date
    /// schema before it runs. `check` validates on its own.
    pub fn runs_startup(&self) -> bool {
        !matches!(
            self,
            Commands::DefConfig | Commands::Check | Commands::Providers
        )
    }
}

#[derive(Subcommand)]
pub enum PackageAction {
    /// Record a published package version
    #[command(arg_required_else_help = true)]
    Add {
        id: String,
        version: String,

        /// Publish without listing in search
        #[arg(required = false, long)]
        unlisted: bool,
    },

    /// List the versions of a package
    #[command(arg_required_else_help = true)]
    #[clap(visible_alias = "ls")]
    List {
        id: String,

        /// Include unlisted versions
        #[arg(required = false, long)]
        all: bool,
    },

    /// Hide a version from search
    #[command(arg_required_else_help = true)]
    Unlist { id: String, version: String },

    /// Show a previously unlisted version again
    #[command(arg_required_else_help = true)]
    Relist { id: String, version: String },

    /// Delete a version permanently
    #[command(arg_required_else_help = true)]
    #[clap(visible_alias = "rm")]
    Delete { id: String, version: String },
}

#[derive(Subcommand)]
pub enum SymbolsAction {
    /// Upload a portable PDB file
    #[command(arg_required_else_help = true)]
    Push {
        /// File name the debugger asks for, e.g. App.pdb
        filename: String,

        /// Signature key of the PDB (at least 32 letters or digits)
        key: String,

        /// Local file to upload
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Download a portable PDB file
    #[command(arg_required_else_help = true)]
    Pull {
        filename: String,
        key: String,

        /// Write to this file instead of stdout
        #[arg(required = false, short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let args = Args::parse_from(["depot", "-vv", "search", "serilog", "--take", "5"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Search {
                query, skip, take, ..
            } => {
                assert_eq!(query.as_deref(), Some("serilog"));
                assert_eq!(skip, 0);
                assert_eq!(take, 5);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_runs_startup() {
        let parse = |args: &[&str]| Args::parse_from(args).command.runs_startup();

        assert!(parse(&["depot", "package", "add", "Depot", "1.0.0"]));
        assert!(parse(&["depot", "search"]));
        assert!(parse(&["depot", "migrate"]));
        assert!(!parse(&["depot", "providers"]));
        assert!(!parse(&["depot", "defconfig"]));
    }

    #[test]
    fn test_parse_symbols_pull() {
        let args = Args::parse_from([
            "depot",
            "symbols",
            "pull",
            "App.pdb",
            "0123456789abcdef0123456789abcdef",
            "-o",
            "out.pdb",
        ]);
        match args.command {
            Commands::Symbols {
                action: SymbolsAction::Pull { output, .. },
            } => assert_eq!(output, Some(PathBuf::from("out.pdb"))),
            _ => panic!("expected symbols pull"),
        }
    }
}
