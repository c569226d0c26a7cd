//! One-shot subcommands.

use pocket_chat::admin::{CacheSessionLimits, SessionLimits};
use pocket_chat::{Backend, HttpBackend};
use pocket_common::PocketError;

use crate::cli::AdminAction;
use crate::chat_err;

pub async fn health(backend: &HttpBackend) -> Result<(), PocketError> {
    let status = backend.health().await.map_err(chat_err)?;
    println!("{}: {status}", backend.url(""));
    Ok(())
}

pub async fn sessions(backend: &HttpBackend) -> Result<(), PocketError> {
    let sessions = backend.list_sessions().await.map_err(chat_err)?;
    if sessions.is_empty() {
        println!("(no sessions)");
    }
    for (n, session) in sessions.iter().enumerate() {
        println!("{:>3}  {}  {}", n + 1, session.id, session.title);
    }
    Ok(())
}

pub async fn admin(backend: &HttpBackend, action: AdminAction) -> Result<(), PocketError> {
    let admin = backend.admin().map_err(chat_err)?;
    match action {
        AdminAction::Stats => {
            let system = admin.system_stats().await.map_err(chat_err)?;
            let cache = admin.cache_stats().await.map_err(chat_err)?;
            println!("cpu      {:.1}%", system.cpu_percent);
            println!(
                "memory   {:.1}% ({:.2} / {:.2} GB)",
                system.memory_percent, system.memory_used_gb, system.memory_total_gb
            );
            println!("cache    {} entries, {} bytes", cache.count, cache.size_bytes);
        }
        AdminAction::ClearCache => {
            let status = admin.clear_cache().await.map_err(chat_err)?;
            println!("{status}");
        }
        AdminAction::Limit { value: Some(max_prompts) } => {
            admin
                .set_session_limits(SessionLimits { max_prompts })
                .await
                .map_err(chat_err)?;
            println!("max prompts per session: {max_prompts}");
        }
        AdminAction::Limit { value: None } => {
            let limits = admin.session_limits().await.map_err(chat_err)?;
            println!("max prompts per session: {}", limits.max_prompts);
        }
        AdminAction::CacheLimit {
            value: Some(max_cached_sessions),
        } => {
            admin
                .set_cache_session_limits(CacheSessionLimits {
                    max_cached_sessions,
                })
                .await
                .map_err(chat_err)?;
            println!("max cached sessions: {max_cached_sessions}");
        }
        AdminAction::CacheLimit { value: None } => {
            let limits = admin.cache_session_limits().await.map_err(chat_err)?;
            println!("max cached sessions: {}", limits.max_cached_sessions);
        }
        AdminAction::Models { name: Some(name) } => {
            admin.select_model(&name).await.map_err(chat_err)?;
            println!("serving {name}");
        }
        AdminAction::Models { name: None } => {
            let list = admin.models().await.map_err(chat_err)?;
            if list.models.is_empty() {
                println!("(no models)");
            }
            for model in &list.models {
                let marker = if *model == list.current_model { "*" } else { " " };
                println!("{marker} {model}");
            }
        }
    }
    Ok(())
}
