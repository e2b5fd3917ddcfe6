use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "recipe-cli", version, about = "Browse recipe lists from the command line")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to <config dir>/recipe-cli/config.toml)
    #[arg(short, long, global = true, env = "RECIPE_CLI_CONFIG")]
    pub config: Option<PathBuf>,

    /// API root, e.g. https://recipes.example.com/api/ (overrides RECIPE_API_BASE_URL and the config file)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in and store the credential locally
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "RECIPE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored credential
    Logout,

    /// Page through a recipe list
    List {
        #[arg(value_enum)]
        list: ListKind,

        /// Search text (required for `search`)
        #[arg(long)]
        query: Option<String>,

        /// Author id (required for `user`)
        #[arg(long)]
        user_id: Option<i64>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,

        /// Items per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort key, e.g. "likes,desc"
        #[arg(long)]
        sort: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Show or reset the configuration file
    Config {
        #[arg(long)]
        show: bool,
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Feed,
    Search,
    Bookmarks,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_base_url_flag_is_not_bound_to_environment() {
        let command = Args::command();
        let base_url = command
            .get_arguments()
            .find(|arg| arg.get_id() == "base_url")
            .unwrap();
        assert!(base_url.get_env().is_none());
    }

    #[test]
    fn test_parse_list_command() {
        let args = Args::try_parse_from([
            "recipe-cli",
            "list",
            "search",
            "--query",
            "tofu",
            "--pages",
            "2",
            "--base-url",
            "https://recipes.example.com/api/",
        ])
        .unwrap();

        assert_eq!(args.base_url.as_deref(), Some("https://recipes.example.com/api/"));
        match args.command {
            Commands::List {
                list, query, pages, ..
            } => {
                assert_eq!(list, ListKind::Search);
                assert_eq!(query.as_deref(), Some("tofu"));
                assert_eq!(pages, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
