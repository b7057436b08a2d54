use clap::{Parser, Subcommand};

/// chat-notify — notification service for the chat-widget backend
#[derive(Parser)]
#[command(name = "chat-notifyd", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the service: background reaper and maintenance scheduler
    Serve,

    /// Delete expired notifications once and exit
    Cleanup,

    /// Print a notification statistics snapshot as JSON
    Stats,
}
