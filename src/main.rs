//! CLI entry point for submind

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "submind")]
#[command(author = "Mastering Subconscious")]
#[command(version)]
#[command(about = "Blog and admin server for the Mastering Subconscious site", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default site.yml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Start the site and admin server
    #[command(visible_alias = "server", alias = "s")]
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.host)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// List site content
    List {
        /// Type of content to list (articles, categories)
        #[arg(default_value = "articles")]
        r#type: String,
    },

    /// Sanitize pasted HTML read from a file or stdin
    Sanitize {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Print the paragraph blocks as JSON instead of the HTML
        #[arg(short, long)]
        blocks: bool,
    },

    /// Print the slug derived from a title
    Slug {
        /// Article title
        title: String,
    },

    /// Render a stored article by slug
    Render {
        /// Article slug
        slug: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "submind=debug,info"
    } else {
        "submind=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            if submind::commands::init::init_site(&target_dir)? {
                println!("Initialized site in {:?}", target_dir);
            } else {
                println!("Site already initialized in {:?}", target_dir);
            }
        }

        Commands::Serve { port, ip } => {
            let site = submind::Site::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| site.config.server.host.clone());
            let port = port.unwrap_or(site.config.server.port);
            tracing::info!("Starting server at http://{}:{}", ip, port);
            site.serve(&ip, port).await?;
        }

        Commands::List { r#type } => {
            let site = submind::Site::new(&base_dir)?;
            submind::commands::list::run(&site, &r#type).await?;
        }

        Commands::Sanitize { file, blocks } => {
            submind::commands::sanitize::run(file.as_deref(), blocks)?;
        }

        Commands::Slug { title } => {
            println!("{}", submind::content::derive_slug(&title));
        }

        Commands::Render { slug } => {
            let site = submind::Site::new(&base_dir)?;
            submind::commands::render::run(&site, &slug).await?;
        }

        Commands::Version => {
            println!("submind version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
