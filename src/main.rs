use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use relaybot::application::messaging::Dispatcher;
use relaybot::domain::entities::{Message, User};
use relaybot::domain::traits::{Transport, UserStore};
use relaybot::infrastructure::adapters::console::ConsoleAdapter;
use relaybot::infrastructure::config::Config;
use relaybot::infrastructure::database::{MemoryUserStore, SqliteUserStore};
use relaybot::infrastructure::plugins::{PermissionEvaluator, PluginLoader, PluginRegistry};
use relaybot::plugins as builtin;

#[derive(Parser)]
#[command(name = "relaybot")]
#[command(about = "A plugin-driven chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(cli.config),
        Commands::Version => {
            println!("relaybot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => init_config(),
    }
}

fn run_bot(config_path: String) {
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using environment", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    };
    let config = Arc::new(config);

    tracing::info!("Starting {}", config.bot.name);

    let store: Arc<dyn UserStore> = match SqliteUserStore::new(&config.database.path) {
        Ok(store) => {
            tracing::info!("Database initialized");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to initialize database: {}, using in-memory store", e);
            Arc::new(MemoryUserStore::new())
        }
    };

    let registry = Arc::new(PluginRegistry::new());
    let permissions = PermissionEvaluator::new(&config.bot.owner_number, store);
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), permissions, config.clone()));
    let loader = Arc::new(PluginLoader::new(registry.clone(), config.clone()));

    let rt = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    rt.block_on(async {
        // Builtins first, then the plugins directory; a directory plugin that
        // registers a colliding keyword intentionally wins.
        let builtins = [
            builtin::ping::descriptor(),
            builtin::menu::descriptor(registry.clone()),
            builtin::admin::descriptor(loader.clone()),
        ];
        for descriptor in builtins {
            if let Err(e) = loader.register_builtin(descriptor).await {
                tracing::error!("Failed to register builtin plugin: {}", e);
            }
        }

        if config.plugins.auto_load {
            loader.load_all().await;
        }

        run_console(dispatcher).await;
    });
}

/// Dev-mode loop: each stdin line becomes an inbound message
async fn run_console(dispatcher: Arc<Dispatcher>) {
    let transport: Arc<dyn Transport> = Arc::new(ConsoleAdapter::new());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("relaybot console mode. Type commands (Ctrl-D to exit).");

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let message = Message::new("console", User::new("console"), line);
        if let Err(e) = dispatcher.handle_inbound(&transport, message).await {
            tracing::error!("dispatch failed: {}", e);
        }
    }
}

fn init_config() {
    let config = Config::default();
    match serde_yaml::to_string(&config) {
        Ok(yaml) => {
            if std::path::Path::new("config.yaml").exists() {
                eprintln!("config.yaml already exists, not overwriting");
                return;
            }
            if let Err(e) = std::fs::write("config.yaml", yaml) {
                eprintln!("Failed to write config.yaml: {}", e);
            } else {
                println!("Wrote default config to config.yaml");
            }
        }
        Err(e) => eprintln!("Failed to serialize default config: {}", e),
    }
}
