//! dbkeeper CLI - manage personal SQLite databases and share them with other users

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use dbkeeper::config::{self, DbkeeperConfig};
use dbkeeper::output::{emit_error, OutputMode};
use dbkeeper::ui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dbkeeper")]
#[command(version)]
#[command(about = "Personal SQLite database manager with per-user sharing")]
#[command(long_about = r#"
dbkeeper keeps one SQLite file per database and a shared user store that
records who may open which database.

Example usage:
  dbkeeper register alice --password secret
  dbkeeper -u alice -p secret create-db shop
  dbkeeper -u alice -p secret create-table shop items -c name:TEXT -c price:REAL
  dbkeeper -u alice -p secret insert shop items -s name=pen -s price=1.5
  dbkeeper -u alice -p secret show shop items
  dbkeeper -u alice -p secret share shop bob
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the user store and database files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Username to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password for --user
    #[arg(short, long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with default settings and prepare the user store
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a new account
    Register {
        /// Username for the new account
        username: String,
    },

    /// Check credentials
    Login,

    /// List registered users
    Users,

    /// List databases you can open
    Databases,

    /// Create a database owned by you
    CreateDb {
        name: String,
    },

    /// Delete a database and every grant on it
    DeleteDb {
        name: String,

        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Give another user access to a database
    Share {
        database: String,
        username: String,
    },

    /// Remove a user's access to a database
    Revoke {
        database: String,
        username: String,
    },

    /// Show who can open a database
    Access {
        database: String,
    },

    /// List tables in a database
    Tables {
        database: String,
    },

    /// Create a table
    CreateTable {
        database: String,
        table: String,

        /// Column as name:TYPE (TEXT, INTEGER, REAL, BLOB); repeatable
        #[arg(short = 'c', long = "column", required = true)]
        columns: Vec<String>,
    },

    /// Show a table's columns and declared types
    Describe {
        database: String,
        table: String,
    },

    /// Insert a row
    Insert {
        database: String,
        table: String,

        /// Value as column=value; repeatable
        #[arg(short = 's', long = "set")]
        values: Vec<String>,
    },

    /// Show every row of a table
    Show {
        database: String,
        table: String,
    },

    /// Delete rows by id, or every row equal to the given values
    DeleteRows {
        database: String,
        table: String,

        /// Row id as shown by `show`; repeatable
        #[arg(long = "id", conflicts_with = "matches")]
        ids: Vec<i64>,

        /// Comma-separated values of all columns, matched as text; repeatable.
        /// Values containing commas and NULL cells cannot be matched, use --id
        #[arg(long = "match")]
        matches: Vec<String>,
    },

    /// Drop a table
    DropTable {
        database: String,
        table: String,

        /// Confirm dropping
        #[arg(long)]
        yes: bool,
    },

    /// Export a table to <table>.csv
    Export {
        database: String,
        table: String,

        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Register { .. } => "register",
            Commands::Login => "login",
            Commands::Users => "users",
            Commands::Databases => "databases",
            Commands::CreateDb { .. } => "create-db",
            Commands::DeleteDb { .. } => "delete-db",
            Commands::Share { .. } => "share",
            Commands::Revoke { .. } => "revoke",
            Commands::Access { .. } => "access",
            Commands::Tables { .. } => "tables",
            Commands::CreateTable { .. } => "create-table",
            Commands::Describe { .. } => "describe",
            Commands::Insert { .. } => "insert",
            Commands::Show { .. } => "show",
            Commands::DeleteRows { .. } => "delete-rows",
            Commands::DropTable { .. } => "drop-table",
            Commands::Export { .. } => "export",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("dbkeeper=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = OutputMode::from_flag(cli.json);
    match run(&cli, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if mode.is_human() {
                ui::error(&format!("{:#}", e));
            } else if let Err(json_err) = emit_error(mode, cli.command.name(), &format!("{:#}", e)) {
                tracing::error!("Failed to write JSON error: {}", json_err);
            }
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<DbkeeperConfig> {
    let mut config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn run(cli: &Cli, mode: OutputMode) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let ctx = || commands::Context::new(config.clone(), mode, cli.user.clone(), cli.password.clone());

    match &cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            commands::run_init(mode, &path, &config, *force)
        }
        Commands::Register { username } => ctx()?.register(username),
        Commands::Login => ctx()?.login(),
        Commands::Users => ctx()?.users(),
        Commands::Databases => ctx()?.databases(),
        Commands::CreateDb { name } => ctx()?.create_db(name),
        Commands::DeleteDb { name, yes } => ctx()?.delete_db(name, *yes),
        Commands::Share { database, username } => ctx()?.share(database, username),
        Commands::Revoke { database, username } => ctx()?.revoke(database, username),
        Commands::Access { database } => ctx()?.access(database),
        Commands::Tables { database } => ctx()?.tables(database),
        Commands::CreateTable { database, table, columns } => ctx()?.create_table(database, table, columns),
        Commands::Describe { database, table } => ctx()?.describe(database, table),
        Commands::Insert { database, table, values } => ctx()?.insert(database, table, values),
        Commands::Show { database, table } => ctx()?.show(database, table),
        Commands::DeleteRows { database, table, ids, matches } => {
            ctx()?.delete_rows(database, table, ids, matches)
        }
        Commands::DropTable { database, table, yes } => ctx()?.drop_table(database, table, *yes),
        Commands::Export { database, table, out } => ctx()?.export(database, table, out.as_deref()),
    }
}
