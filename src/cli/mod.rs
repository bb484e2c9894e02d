//! Command-line interface definitions.

pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::entities::ItemId;

/// Craft Value Scanner - production costs and profits of crafted goods
/// against the auction house.
#[derive(Parser, Debug)]
#[command(name = "craft-value-scanner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for stored snapshots (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch catalog data from the game-data API
    #[command(subcommand)]
    Update(UpdateCommand),

    /// Manage the auction house snapshot
    #[command(subcommand)]
    Auctions(AuctionsCommand),

    /// Remove stored catalog data
    Clear(ClearArgs),

    /// Compute production costs and profits
    Profit(ProfitArgs),

    /// Create, inspect and edit the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Which profession tiers to load recipes for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ProfessionScope {
    /// Tiers of the current expansion
    #[default]
    Latest,
    /// Every tier of every profession
    All,
    /// Tiers listed in the configuration
    Config,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ScopeArgs {
    /// Professions to load recipes from
    #[arg(long, value_enum, default_value_t = ProfessionScope::Latest)]
    pub professions: ProfessionScope,
}

/// Subcommands for `update`
#[derive(Subcommand, Debug)]
pub enum UpdateCommand {
    /// Update realm list
    Realms,
    /// Update profession list
    Professions,
    /// Update recipes and synthesize disenchant recipes
    Recipes(ScopeArgs),
    /// Update items used by the loaded recipes
    Items,
    /// Update realms, professions, recipes and items
    All(ScopeArgs),
}

/// Subcommands for `auctions`
#[derive(Subcommand, Debug)]
pub enum AuctionsCommand {
    /// Fetch and store current listings of the configured realm
    Update,
    /// Remove the stored listings
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    Realms,
    Professions,
    Recipes,
    Items,
    All,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    #[arg(value_enum)]
    pub target: ClearTarget,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

/// Arguments for the `profit` subcommand.
#[derive(Args, Debug)]
pub struct ProfitArgs {
    /// Profession tier names, e.g. "Shadowlands Alchemy"; configured tiers if omitted
    #[arg(long, num_args = 1..)]
    pub professions: Vec<String>,

    /// Only recipes whose name contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Additional item ids that may be bought from vendors
    #[arg(long, value_delimiter = ',')]
    pub vendor_items: Vec<ItemId>,

    /// Additional item ids that are always bought, never crafted
    #[arg(long, value_delimiter = ',')]
    pub buy_always: Vec<ItemId>,

    /// Refresh the auction snapshot before computing
    #[arg(long)]
    pub update: bool,

    /// Show the reagent breakdown of every recipe
    #[arg(long)]
    pub details: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,
}

/// Subcommands for `config`
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a new configuration file
    Init(InitArgs),
    /// Print the configuration
    Show,
    /// Edit the configured profession tiers (requires profession data)
    Professions(EditArgs),
    /// Edit the items that may be bought from vendors (requires item data)
    VendorItems(EditArgs),
    /// Edit the items that are always bought (requires item data)
    BuyAlways(EditArgs),
    /// Edit the items whose recipes are hidden from reports (requires item data)
    Ignore(EditArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Region of the realm
    #[arg(short, long, default_value = "us")]
    pub region: String,

    /// Realm slug to load auctions from
    #[arg(short = 's', long)]
    pub realm: String,

    /// Language of item names
    #[arg(short, long, default_value = "en_US")]
    pub language: String,

    /// API client id
    #[arg(long)]
    pub client_id: Option<String>,

    /// API client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EditAction {
    Add,
    Delete,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[arg(value_enum)]
    pub action: EditAction,

    /// Names in the configured language
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profit_arguments() {
        let cli = Cli::parse_from([
            "craft-value-scanner",
            "profit",
            "--professions",
            "Shadowlands Alchemy",
            "Shadowlands Inscription",
            "--vendor-items",
            "180732,177061",
            "--search",
            "flask",
        ]);

        let Commands::Profit(args) = cli.command else {
            panic!("expected profit command");
        };
        assert_eq!(args.professions.len(), 2);
        assert_eq!(args.vendor_items, vec![180732, 177061]);
        assert_eq!(args.search.as_deref(), Some("flask"));
        assert!(!args.update);
        assert_eq!(args.format, ReportFormat::Table);
    }

    #[test]
    fn update_recipes_defaults_to_latest() {
        let cli = Cli::parse_from(["craft-value-scanner", "update", "recipes"]);

        assert!(matches!(
            cli.command,
            Commands::Update(UpdateCommand::Recipes(ScopeArgs {
                professions: ProfessionScope::Latest
            }))
        ));
    }

    #[test]
    fn global_config_path() {
        let cli = Cli::parse_from([
            "craft-value-scanner",
            "config",
            "vendor-items",
            "add",
            "Rune Etched Vial",
            "--config",
            "/tmp/cvs.toml",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cvs.toml")));
        let Commands::Config(ConfigCommand::VendorItems(edit)) = cli.command else {
            panic!("expected vendor-items command");
        };
        assert_eq!(edit.action, EditAction::Add);
        assert_eq!(edit.names, vec!["Rune Etched Vial".to_string()]);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
