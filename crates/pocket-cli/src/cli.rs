use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pocket_chat::UserRole;

/// pocket: terminal client for a PocketLLM server.
#[derive(Parser, Debug)]
#[command(name = "pocket", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Backend base URL, overriding the config file.
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(short, long, env = "POCKET_USERNAME")]
    pub username: Option<String>,

    #[arg(short, long, env = "POCKET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Role to log in as (user or admin).
    #[arg(long, default_value = "user")]
    pub role: UserRole,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive chat (default).
    Chat,
    /// List sessions.
    Sessions,
    /// Operator commands; needs `--role admin`.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Check that the backend is up.
    Health,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminAction {
    /// Host CPU and memory usage, plus response cache occupancy.
    Stats,
    /// Drop every cached reply.
    ClearCache,
    /// Show or set the per-session prompt limit.
    Limit { value: Option<u32> },
    /// Show or set how many sessions may keep cached replies.
    CacheLimit { value: Option<u32> },
    /// List the backend's model files, or switch to NAME.
    Models { name: Option<String> },
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interactive_user() {
        let args = Args::try_parse_from(["pocket"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.role, UserRole::User);
    }

    #[test]
    fn admin_limit_takes_optional_value() {
        let args =
            Args::try_parse_from(["pocket", "--role", "admin", "admin", "limit", "25"]).unwrap();
        assert_eq!(args.role, UserRole::Admin);
        assert!(matches!(
            args.command,
            Some(Command::Admin {
                action: AdminAction::Limit { value: Some(25) }
            })
        ));
    }

    #[test]
    fn admin_models_takes_optional_name() {
        let args = Args::try_parse_from(["pocket", "admin", "models"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Admin {
                action: AdminAction::Models { name: None }
            })
        ));

        let args = Args::try_parse_from(["pocket", "admin", "models", "phi-2.gguf"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Admin {
                action: AdminAction::Models { name: Some(ref n) }
            }) if n == "phi-2.gguf"
        ));
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Args::try_parse_from(["pocket", "--role", "root"]).is_err());
    }
}
