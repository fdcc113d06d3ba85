use clap::{Parser, Subcommand};

/// devgate — capability-token gateway for out-of-band device approval
#[derive(Parser)]
#[command(name = "devgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Work with capability tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint an action token for a device (all three actions when --action is
    /// omitted), printing the resulting links
    Mint {
        #[arg(long)]
        device_id: String,
        /// approve | block | remove
        #[arg(long)]
        action: Option<String>,
        /// Lifetime in seconds (default: configured TTL)
        #[arg(long)]
        ttl: Option<i64>,
    },

    /// Verify a token against a device and action, printing its claims
    Inspect {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        token: String,
    },
}
