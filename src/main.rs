use clap::{Parser, Subcommand};
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;

use page_vision::config;
use page_vision::viewer::{self, ViewerState};
use tracing_subscriber::EnvFilter;

/// Page Vision - Visual regression testing for rendered pages
#[derive(Parser, Debug)]
#[command(
    name = "page-vision",
    about = "Visual regression testing for rendered pages with multi-viewport capture and a result viewer",
    after_help = "ENVIRONMENT VARIABLES:\n\
        PAGE_VISION_BASE_URL            Page opened when a session starts\n\
        PAGE_VISION_RESULTS_ROOT        Directory holding persisted test records\n\
        PAGE_VISION_SCREENSHOT_ROOT     Directory holding baseline/diff/fail images\n\
        PAGE_VISION_VIEWER_PORT         Port for the viewer HTTP server\n\
        PAGE_VISION_MISMATCH_TOLERANCE  Comparison tolerance in percent"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the result viewer backend
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PAGE_VISION_VIEWER_PORT")]
        port: Option<u16>,

        /// Directory holding persisted test records
        #[arg(long, env = "PAGE_VISION_RESULTS_ROOT")]
        results_root: Option<PathBuf>,

        /// Directory holding baseline/diff/fail images
        #[arg(long, env = "PAGE_VISION_SCREENSHOT_ROOT")]
        screenshot_root: Option<PathBuf>,

        /// Directory with the viewer front-end build, served at /
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Print every failed test under the results root
    Failed {
        /// Directory holding persisted test records
        #[arg(long, env = "PAGE_VISION_RESULTS_ROOT")]
        results_root: Option<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved detail view of one test record
    Details {
        /// Hierarchy path of the test (e.g. "shop/cart")
        path: String,

        /// Directory holding persisted test records
        #[arg(long, env = "PAGE_VISION_RESULTS_ROOT")]
        results_root: Option<PathBuf>,

        /// Directory holding baseline/diff/fail images
        #[arg(long, env = "PAGE_VISION_SCREENSHOT_ROOT")]
        screenshot_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let defaults = config::get();

    match args.command {
        Commands::Serve {
            port,
            results_root,
            screenshot_root,
            static_dir,
        } => {
            let state = ViewerState {
                results_root: results_root.unwrap_or_else(|| defaults.results_root.clone()),
                screenshot_root: screenshot_root
                    .unwrap_or_else(|| defaults.screenshot_root.clone()),
            };
            let port = port.unwrap_or(defaults.viewer_port);

            let app = viewer::create_app(state.clone(), static_dir);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!(
                "viewer listening on {} (results: {}, screenshots: {})",
                addr,
                state.results_root.display(),
                state.screenshot_root.display()
            );
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }

        Commands::Failed { results_root, json } => {
            let results_root = results_root.unwrap_or_else(|| defaults.results_root.clone());
            let failed = viewer::failed_tests(&results_root)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&failed)?);
            } else if failed.is_empty() {
                println!("No failed tests under {}", results_root.display());
            } else {
                println!("{} failed test(s):", failed.len());
                for record in &failed {
                    println!(
                        "  {} - {} ({})",
                        record.test_hierarchy,
                        record.description,
                        record.failure_reason.as_deref().unwrap_or("no reason")
                    );
                }
            }
            if !failed.is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Details {
            path,
            results_root,
            screenshot_root,
        } => {
            let results_root = results_root.unwrap_or_else(|| defaults.results_root.clone());
            let screenshot_root =
                screenshot_root.unwrap_or_else(|| defaults.screenshot_root.clone());
            let details = viewer::test_details(&results_root, &screenshot_root, &path)?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
    }

    Ok(())
}
