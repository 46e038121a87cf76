mod commands;
mod terminal;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "geolist")]
#[command(about = "Load, enrich and browse location listings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the views in the catalog
    Views,
    /// Load a view and print one page of it
    Load {
        /// View name; unknown names fall back to the first view when
        /// GEOLIST_ALWAYS_LOAD is on
        view: Option<String>,
        /// Initial descriptor, e.g. "map=cities&search=athens"
        #[arg(long)]
        fragment: Option<String>,
        /// Search text applied after loading
        #[arg(long)]
        search: Option<String>,
        /// Show summary rows grouped by the view's first geo column
        #[arg(long)]
        summarize: bool,
        /// Page to print (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
        /// Select a record by id and print its details
        #[arg(long)]
        id: Option<String>,
        /// Geocode unmatched places and save them back to the dataset file
        #[arg(long)]
        refresh: bool,
        /// Ignore the session cache
        #[arg(long)]
        no_cache: bool,
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Pull a view's API data into its local file, then reload it
    RefreshLocal {
        view: String,
    },
    /// Parse a descriptor fragment and print its keys
    Fragment {
        fragment: String,
        /// Prior fragment; prints the changes between the two
        #[arg(long)]
        prior: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = geolist_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Views) => {
            commands::run_views(&config);
            Ok(())
        }
        Some(Commands::Load {
            view,
            fragment,
            search,
            summarize,
            page,
            id,
            refresh,
            no_cache,
            json,
        }) => {
            let request = commands::LoadRequest {
                view,
                fragment: fragment.unwrap_or_default(),
                search,
                summarize,
                page,
                id,
                refresh,
                use_cache: !no_cache,
                json,
            };
            commands::run_load(&config, request).await
        }
        Some(Commands::RefreshLocal { view }) => commands::run_refresh_local(&config, &view).await,
        Some(Commands::Fragment { fragment, prior }) => {
            commands::run_fragment(&fragment, prior.as_deref());
            Ok(())
        }
        None => {
            println!("geolist: run `geolist --help` for commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
