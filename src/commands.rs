//! CLI command definitions for betterhub.

use std::path::PathBuf;

use betterhub::settings::{AliasKind, WhitelistKind};
use clap::{Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default ~/.betterhub/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the settings document, or one dotted key (e.g. prList.hideLabels)
    Get { key: Option<String> },

    /// Set one dotted key; VALUE is JSON, bare words are taken as strings
    Set { key: String, value: String },

    /// Restore the default settings
    Reset,

    /// Write an export file (stdout unless -o is given)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply an export file as a partial update
    Import { file: PathBuf },

    /// List registered features
    Features {
        /// Only features switched on in settings
        #[arg(long, conflicts_with = "with_settings")]
        enabled: bool,
        /// Only features with a settings section
        #[arg(long)]
        with_settings: bool,
    },

    /// Features that would run on a page path
    Active {
        /// Page path, e.g. /facebook/react/pulls
        #[arg(long)]
        path: String,
    },

    /// Manage user / project / org aliases
    Alias {
        #[command(subcommand)]
        command: AliasCommands,
    },

    /// Restrict where harvesting runs
    Whitelist {
        #[arg(value_enum)]
        target: WhitelistTarget,
        #[command(subcommand)]
        command: WhitelistCommands,
    },

    /// List entities found in a saved page
    Harvest {
        /// URL the page was loaded from
        #[arg(long)]
        url: String,
        /// HTML file
        file: PathBuf,
        /// Add new entities to the alias lists
        #[arg(long)]
        save: bool,
    },

    /// Run a page load (harvest, auto-alias, apply) on a saved page
    Apply {
        /// URL the page was loaded from
        #[arg(long)]
        url: String,
        /// HTML file
        file: PathBuf,
        /// Where to write the rewritten HTML (stdout by default)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the local settings API
    Serve {
        /// Port on 127.0.0.1 (defaults to [server] port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
pub enum AliasCommands {
    /// List aliases of one kind, or all
    List {
        kind: Option<AliasKind>,
        /// Print JSON instead of human output
        #[arg(long)]
        json: bool,
    },
    /// Add an alias (user, project or org)
    Add {
        kind: AliasKind,
        original: String,
        alias: String,
    },
    /// Change the alias text
    Rename {
        kind: AliasKind,
        original: String,
        alias: String,
    },
    /// Remove an alias
    Remove { kind: AliasKind, original: String },
    /// Switch how an alias is rendered
    Display {
        kind: AliasKind,
        original: String,
        #[arg(value_enum)]
        mode: DisplayMode,
    },
    /// Enable or disable an alias
    Toggle { kind: AliasKind, original: String },
}

#[derive(Subcommand)]
pub enum WhitelistCommands {
    /// Show the whitelist
    Show,
    /// Harvest everywhere (or, with --off, only on listed entries)
    All {
        #[arg(long)]
        off: bool,
    },
    /// Add an org or owner/repo
    Add { name: String },
    /// Remove an org or owner/repo
    Remove { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum WhitelistTarget {
    Org,
    Repo,
}

impl From<WhitelistTarget> for WhitelistKind {
    fn from(target: WhitelistTarget) -> Self {
        match target {
            WhitelistTarget::Org => WhitelistKind::Org,
            WhitelistTarget::Repo => WhitelistKind::Repo,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DisplayMode {
    Color,
    Icon,
    Plain,
}
