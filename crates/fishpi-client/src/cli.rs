use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fishpi")]
#[command(about = "FishPi chat-room terminal client")]
#[command(version)]
pub struct Cli {
    /// Config file path.
    #[arg(long, default_value = "./_tmp/config.yaml")]
    pub conf: PathBuf,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exchange username/password for an API key and save it to the config.
    Login,
    /// Show the chat room; stdin takes room commands (0-5, revoke, repeat, topic).
    Ws,
    /// Send mode; stdin lines are commands or chat messages (type `help`).
    Msg,
    /// Companion-bot bridge.
    Ice,
    /// Chat room plus send mode on the same stdin.
    Chat,
}
