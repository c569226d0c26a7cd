//! Interactive chat loop.
//!
//! Reply text streams to stdout as fragments are applied; everything else
//! the client logs goes to stderr through `tracing`.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use pocket_chat::{
    ChatError, ClientUpdate, CredentialContext, RejectReason, Role, SessionClient, SessionId,
    Submission,
};
use pocket_common::PocketError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Message(String),
    New(Option<String>),
    List,
    Switch(usize),
    Delete(usize),
    Rename(usize, String),
    History,
    Logout,
    Quit,
    Help,
    Invalid(String),
}

const HELP: &str = "\
/new [title]          start a new session
/list                 list sessions
/switch <n>           make session n active
/delete <n>           delete session n
/rename <n> <title>   rename session n
/history              show the active transcript
/logout               forget the stored credential
/quit                 exit";

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let index = |arg: &str| arg.parse::<usize>().ok().filter(|&n| n >= 1);

    match name {
        "new" if rest.is_empty() => Input::New(None),
        "new" => Input::New(Some(rest.to_string())),
        "list" => Input::List,
        "switch" => index(rest)
            .map(Input::Switch)
            .unwrap_or_else(|| Input::Invalid("usage: /switch <n>".into())),
        "delete" => index(rest)
            .map(Input::Delete)
            .unwrap_or_else(|| Input::Invalid("usage: /delete <n>".into())),
        "rename" => {
            let parsed = rest
                .split_once(char::is_whitespace)
                .and_then(|(n, title)| Some((index(n)?, title.trim())))
                .filter(|(_, title)| !title.is_empty());
            match parsed {
                Some((n, title)) => Input::Rename(n, title.to_string()),
                None => Input::Invalid("usage: /rename <n> <title>".into()),
            }
        }
        "history" => Input::History,
        "logout" => Input::Logout,
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        other => Input::Invalid(format!("unknown command /{other}, try /help")),
    }
}

pub async fn run(
    client: &mut SessionClient,
    credentials: &CredentialContext,
) -> Result<(), PocketError> {
    if let Err(e) = client.refresh_sessions().await {
        tracing::warn!(error = %e, "could not load sessions");
    }
    list_sessions(client);
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        for update in client.drain_updates() {
            report(client, &update);
        }
        prompt(client)?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Invalid(message) => println!("{message}"),
            Input::Message(text) => send(client, &text).await?,
            Input::New(title) => {
                let title = title.as_deref().unwrap_or("New Chat");
                match client.create_session(title).await {
                    Ok(session) => println!("started \"{}\"", session.title),
                    Err(e) => println!("could not create session: {e}"),
                }
            }
            Input::List => {
                if let Err(e) = client.refresh_sessions().await {
                    println!("could not refresh sessions: {e}");
                }
                list_sessions(client);
            }
            Input::Switch(n) => match nth_session(client, n) {
                Some(id) => match client.select_session(&id).await {
                    Ok(()) => print_history(client),
                    Err(e) => println!("could not open session: {e}"),
                },
                None => println!("no session {n}"),
            },
            Input::Delete(n) => match nth_session(client, n) {
                Some(id) => match client.delete_session(&id).await {
                    Ok(()) => list_sessions(client),
                    Err(e) => println!("could not delete session: {e}"),
                },
                None => println!("no session {n}"),
            },
            Input::Rename(n, title) => match nth_session(client, n) {
                Some(id) => {
                    if let Err(e) = client.rename_session(&id, &title).await {
                        println!("could not rename session: {e}");
                    }
                }
                None => println!("no session {n}"),
            },
            Input::History => print_history(client),
            Input::Logout => {
                credentials.logout();
                println!("logged out");
            }
        }
    }
    Ok(())
}

async fn send(client: &mut SessionClient, text: &str) -> Result<(), PocketError> {
    match client.submit(text).await {
        Ok(Submission::Started(_)) => {}
        Ok(Submission::Rejected(RejectReason::LimitReached)) => {
            println!("{}. Start a new chat with /new.", client.limit().message);
            return Ok(());
        }
        Ok(Submission::Rejected(reason)) => {
            tracing::debug!(?reason, "submission ignored");
            return Ok(());
        }
        Err(e) => {
            println!("could not start a session: {e}");
            return Ok(());
        }
    }

    let mut stdout = std::io::stdout();
    while let Some(update) = client.next_update().await {
        match update {
            ClientUpdate::Fragment { text, .. } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            ClientUpdate::ExchangeCompleted { .. } | ClientUpdate::ExchangeFailed { .. } => {
                writeln!(stdout)?;
                report(client, &update);
                break;
            }
            ClientUpdate::TitleUpdated { .. } => report(client, &update),
        }
    }
    Ok(())
}

fn report(client: &SessionClient, update: &ClientUpdate) {
    match update {
        ClientUpdate::ExchangeFailed {
            error: ChatError::QuotaExceeded(message),
            ..
        } => println!("{message}. Start a new chat with /new."),
        ClientUpdate::ExchangeFailed { .. } => {
            if let Some(message) = client.last_error() {
                println!("{message}");
            }
        }
        ClientUpdate::TitleUpdated { session_id, title } => {
            if client.active_session_id() == Some(session_id) {
                println!("[session titled \"{title}\"]");
            }
        }
        ClientUpdate::Fragment { .. } | ClientUpdate::ExchangeCompleted { .. } => {}
    }
}

fn prompt(client: &SessionClient) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    match client.active_session() {
        Some(session) => write!(stdout, "[{}] > ", session.title)?,
        None => write!(stdout, "> ")?,
    }
    stdout.flush()
}

fn nth_session(client: &SessionClient, n: usize) -> Option<SessionId> {
    client.sessions().get(n - 1).map(|s| s.id.clone())
}

fn list_sessions(client: &SessionClient) {
    if client.sessions().is_empty() {
        println!("(no sessions)");
    }
    let active = client.active_session_id();
    for (n, session) in client.sessions().iter().enumerate() {
        let marker = if Some(&session.id) == active { '*' } else { ' ' };
        println!("{marker}{:>3}  {}", n + 1, session.title);
    }
}

fn print_history(client: &SessionClient) {
    for turn in client.active_log() {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        println!("{who}: {}", turn.content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse_input("  hello there "), Input::Message("hello there".into()));
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_input("/new"), Input::New(None));
        assert_eq!(parse_input("/new Rust questions"), Input::New(Some("Rust questions".into())));
        assert_eq!(parse_input("/switch 2"), Input::Switch(2));
        assert_eq!(parse_input("/delete 1"), Input::Delete(1));
        assert_eq!(
            parse_input("/rename 3 Trip planning"),
            Input::Rename(3, "Trip planning".into())
        );
        assert_eq!(parse_input("/quit"), Input::Quit);
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(matches!(parse_input("/switch"), Input::Invalid(_)));
        assert!(matches!(parse_input("/switch 0"), Input::Invalid(_)));
        assert!(matches!(parse_input("/rename 2"), Input::Invalid(_)));
        assert!(matches!(parse_input("/frobnicate"), Input::Invalid(_)));
    }
}
