use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use shift_scheduler::config::{GoogleConfig, ServerConfig};
use shift_scheduler::display::print_option;
use shift_scheduler::form::export_schedule_to_file;
use shift_scheduler::parser::load_availability;
use shift_scheduler::schedule::{generate_options, OPTIONS_PER_REQUEST};
use shift_scheduler::web;

#[derive(Parser, Debug)]
#[command(name = "shift-scheduler")]
#[command(version)]
#[command(about = "Weekly shift scheduling from employee availability")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server
    Serve(ServeArgs),

    /// Generate schedule options offline from an availability CSV
    Generate {
        /// Rows of employee_id,name,day,shift,status
        #[arg(long)]
        csv: PathBuf,

        /// Seed for reproducible options
        #[arg(long)]
        seed: Option<u64>,

        /// Write the first option to this CSV file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "PORT", default_value = "5003")]
    port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://shift_scheduler.db")]
    database_url: String,

    /// At least 32 characters; a random key is used when unset
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Only send the session cookie over HTTPS
    #[arg(long)]
    secure_cookies: bool,

    #[arg(long, env = "BCRYPT_COST", default_value = "10")]
    bcrypt_cost: u32,

    /// Fixed seed for option generation
    #[arg(long, env = "SCHEDULE_SEED")]
    seed: Option<u64>,

    /// Directory served under /static
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Seconds a login stays valid
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "3600")]
    session_ttl_secs: u64,

    /// Enables Google sign-in together with --google-client-secret
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    google_client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: Option<String>,

    #[arg(
        long,
        env = "GOOGLE_REDIRECT_URL",
        default_value = "http://localhost:5003/api/auth/google/callback"
    )]
    google_redirect_url: String,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let google = match (args.google_client_id, args.google_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: args.google_redirect_url,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!("Google sign-in needs both a client id and a secret, leaving it disabled");
                None
            }
        };

        ServerConfig {
            host: args.host,
            port: args.port,
            database_url: args.database_url,
            session_secret: args.session_secret,
            secure_cookies: args.secure_cookies,
            password_hash_cost: args.bcrypt_cost,
            seed: args.seed,
            static_dir: args.static_dir,
            session_ttl: Duration::from_secs(args.session_ttl_secs),
            google,
        }
    }
}

fn generate(csv: PathBuf, seed: Option<u64>, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading availability from {}...", csv.display());
    let availability = load_availability(&csv)?;
    let names = availability.employee_names();
    if availability.is_empty() {
        tracing::warn!(csv = %csv.display(), "No usable availability rows, every shift will be unfilled");
    }
    println!("Loaded availability for {} employees", names.len());

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let options = generate_options(&availability, OPTIONS_PER_REQUEST, &mut rng);

    for (i, option) in options.iter().enumerate() {
        print_option(&format!("Option {}", i + 1), option, &names);
    }

    if let (Some(path), Some(first)) = (output, options.first()) {
        export_schedule_to_file(first, &names, &path)?;
        println!("\nOption 1 saved to {}", path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Commands::Serve(args) => {
            let config = ServerConfig::from(args);
            println!("Access the site at http://{}:{}", config.host, config.port);
            web::start_server(config).await?;
        }
        Commands::Generate { csv, seed, output } => generate(csv, seed, output)?,
    }

    Ok(())
}
