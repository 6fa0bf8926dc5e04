//! imbridge CLI: command-line driver for the read-cursor database facade.
//!
//! Every command runs against an in-process worker that hosts the store,
//! over the same RPC path an embedding application uses.

use clap::{Parser, Subcommand};
use imbridge_cli::commands;
use imbridge_core::config::{DEFAULT_INVOKE_TIMEOUT_MS, ENV_CONNECT_TIMEOUT_MS, ENV_DB_PATH, ENV_INVOKE_TIMEOUT_MS};
use imbridge_core::BridgeConfig;

/// imbridge: IM read-cursor database bridge
#[derive(Parser)]
#[command(name = "imbridge", version, about = "imbridge: IM read-cursor database bridge")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = ENV_DB_PATH, default_value = "imbridge.db")]
    db: String,

    /// Per-call timeout in milliseconds (0 waits forever)
    #[arg(long, env = ENV_INVOKE_TIMEOUT_MS, default_value_t = DEFAULT_INVOKE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Worker handshake timeout in milliseconds (0 waits forever)
    #[arg(long, env = ENV_CONNECT_TIMEOUT_MS, default_value_t = 0)]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the method catalog
    Methods,

    /// Invoke a catalog method and print the SDK envelope
    Rpc {
        /// Exposed method name (e.g. "getMinReadSeqFromCursors")
        #[arg(long)]
        method: String,
        /// Positional params as a JSON array
        #[arg(long, default_value = "[]")]
        params: String,
        /// Operation id echoed in the envelope (random when omitted)
        #[arg(long)]
        operation_id: Option<String>,
    },

    /// Read-cursor shortcuts
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },
}

#[derive(Subcommand)]
enum CursorAction {
    /// Insert or overwrite a cursor
    Upsert {
        #[arg(long)]
        conversation_id: String,
        #[arg(long)]
        user_id: String,
        /// Highest read sequence number
        #[arg(long)]
        seq: i64,
        /// Use the peer (1:1) tables
        #[arg(long)]
        peer: bool,
    },
    /// Show one cursor
    Get {
        #[arg(long)]
        conversation_id: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        peer: bool,
    },
    /// List a conversation's cursors
    List {
        #[arg(long)]
        conversation_id: String,
        #[arg(long)]
        peer: bool,
    },
    /// Lowest read sequence in a conversation
    MinSeq {
        #[arg(long)]
        conversation_id: String,
        #[arg(long)]
        peer: bool,
        /// Leave this user out of the minimum
        #[arg(long, requires = "peer")]
        exclude_user: Option<String>,
    },
    /// Increment a group's cursor version
    BumpVersion {
        #[arg(long)]
        conversation_id: String,
    },
    /// Recompute the cached read state from the cursors
    Refresh {
        #[arg(long)]
        conversation_id: String,
        /// Group member count stored with the aggregate
        #[arg(long, default_value_t = 0)]
        member_count: i64,
        /// Refresh the peer state, excluding this user
        #[arg(long)]
        self_user: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imbridge_core=warn,imbridge_cli=info".into()),
        )
        .init();

    let config = BridgeConfig {
        db_path: cli.db,
        connect_timeout_ms: cli.connect_timeout_ms,
        invoke_timeout_ms: cli.timeout_ms,
    };

    let result = match cli.command {
        Commands::Methods => Ok(commands::methods::list()),
        command => match commands::init_api(&config) {
            Ok(api) => {
                let result = run(&api, command).await;
                api.close().await;
                result
            }
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(value) => commands::print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(api: &imbridge_core::DatabaseApi, command: Commands) -> Result<serde_json::Value, String> {
    match command {
        Commands::Methods => Ok(commands::methods::list()),

        Commands::Rpc {
            method,
            params,
            operation_id,
        } => commands::rpc::call(api, &method, &params, operation_id).await,

        Commands::Cursor { action } => match action {
            CursorAction::Upsert {
                conversation_id,
                user_id,
                seq,
                peer,
            } => commands::cursor::upsert(api, &conversation_id, &user_id, seq, peer).await,
            CursorAction::Get {
                conversation_id,
                user_id,
                peer,
            } => commands::cursor::get(api, &conversation_id, &user_id, peer).await,
            CursorAction::List {
                conversation_id,
                peer,
            } => commands::cursor::list(api, &conversation_id, peer).await,
            CursorAction::MinSeq {
                conversation_id,
                peer,
                exclude_user,
            } => {
                commands::cursor::min_seq(api, &conversation_id, peer, exclude_user.as_deref()).await
            }
            CursorAction::BumpVersion { conversation_id } => {
                commands::cursor::bump_version(api, &conversation_id).await
            }
            CursorAction::Refresh {
                conversation_id,
                member_count,
                self_user,
            } => {
                commands::cursor::refresh(api, &conversation_id, member_count, self_user.as_deref())
                    .await
            }
        },
    }
}
