//! `fakerest` - CLI for fakerestaurant
//!
//! This binary runs the review API server and manages its database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use fakerestaurant::cli::{Cli, Command, ConfigCommand, SeedCommand, ServeCommand};
use fakerestaurant::{init_logging, seed, server, Config, Storage};

const REDACTED: &str = "<redacted>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Seed(seed_cmd) => handle_seed(&config, &seed_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, cli.config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    server::serve(&config).await
}

fn handle_seed(config: &Config, cmd: &SeedCommand) -> anyhow::Result<()> {
    let database_path = config.database_path();
    let mut storage = Storage::open(&database_path)
        .with_context(|| format!("opening database {}", database_path.display()))?;

    let summary = seed::seed(&mut storage, config.auth.bcrypt_cost, cmd.force)?;

    println!("Seeded {}", database_path.display());
    println!("  Users:         {}", summary.users);
    println!("  Restaurants:   {}", summary.restaurants);
    println!("  Reviews:       {}", summary.reviews);
    println!("  Votes:         {}", summary.votes);
    println!();
    println!("Every demo user logs in with password \"{}\".", seed::DEMO_PASSWORD);
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let database_path = config.database_path();
    let stats = if database_path.exists() {
        Some(Storage::open(&database_path)?.stats()?)
    } else {
        None
    };

    if json {
        let status = serde_json::json!({
            "databasePath": database_path,
            "uploadsDir": config.uploads_dir(),
            "bindAddress": format!("{}:{}", config.server.host, config.server.port),
            "initialized": stats.is_some(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("fakerest status");
    println!("---------------");
    println!("Database:      {}", database_path.display());
    println!("Uploads:       {}", config.uploads_dir().display());
    println!(
        "Listen:        {}:{}",
        config.server.host, config.server.port
    );
    match stats {
        Some(stats) => {
            println!();
            println!("Users:         {}", stats.users);
            println!("Restaurants:   {}", stats.restaurants);
            println!("Reviews:       {}", stats.reviews);
            println!("Votes:         {}", stats.votes);
            println!("Size:          {} bytes", stats.db_size_bytes);
        }
        None => {
            println!();
            println!("Database not created yet. Run `fakerest serve` or `fakerest seed`.");
        }
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_path: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                REDACTED.clone_into(&mut shown.auth.jwt_secret);
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!(
                    "  Allowed origins:    {}",
                    config.server.allowed_origins.join(", ")
                );
                println!("  Max body bytes:     {}", config.server.max_body_bytes);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Auth]");
                println!("  JWT secret:         {REDACTED}");
                println!("  Token TTL (min):    {}", config.auth.token_ttl_minutes);
                println!("  Bcrypt cost:        {}", config.auth.bcrypt_cost);
                println!(
                    "  Credential source:  {:?}",
                    config.auth.credential_source
                );
                println!("  Cookie name:        {}", config.auth.cookie_name);
                println!();
                println!("[Uploads]");
                println!("  Directory:          {}", config.uploads_dir().display());
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
