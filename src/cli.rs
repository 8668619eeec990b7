use clap::{Parser, Subcommand};

/// Painted Playlists — self-hosted playlist library with Spotify import
#[derive(Parser)]
#[command(name = "painted-playlists", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to bind
        #[arg(short, long, env = "PP_PORT", default_value = "8080")]
        port: u16,
    },

    /// Create a local account without going through the web form
    CreateUser {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "")]
        email: String,

        /// Password for the new account (at least 8 characters)
        #[arg(long)]
        password: String,
    },
}
