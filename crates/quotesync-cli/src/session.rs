// Interactive session: stdin commands while the sync timer runs in the background
use quotesync_core::{lock_book, CategoryFilter, SyncEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Next(CategoryFilter),
    Add { category: String, text: String },
    Last,
    List,
    Sync,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "next" | "n" => SessionCommand::Next(rest.parse().unwrap_or_default()),
        "add" | "a" => match rest.split_once('|') {
            Some((category, text)) => SessionCommand::Add {
                category: category.trim().to_string(),
                text: text.trim().to_string(),
            },
            None => SessionCommand::Unknown(line.to_string()),
        },
        "last" => SessionCommand::Last,
        "list" | "ls" => SessionCommand::List,
        "sync" | "s" => SessionCommand::Sync,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        _ => SessionCommand::Unknown(line.to_string()),
    };
    Some(command)
}

const HELP: &str = "\
commands:
  next [CATEGORY]        show a random quote (all categories if omitted)
  add CATEGORY | TEXT    add a quote
  last                   last quote shown this session
  list                   list all quotes
  sync                   sync with the server now
  quit                   leave";

pub async fn run(engine: Arc<SyncEngine>, every: Duration) -> anyhow::Result<()> {
    let handle = engine.spawn_periodic(every);
    println!("Syncing every {}s. Type 'help' for commands.", every.as_secs());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            SessionCommand::Next(filter) => {
                let book = lock_book(engine.book());
                book.select_category(&filter);
                match book.show_random(&filter) {
                    Some(quote) => println!("\"{}\"", quote.text()),
                    None => println!("No quotes found for this category."),
                }
            }
            SessionCommand::Add { category, text } => {
                match lock_book(engine.book()).add_quote(&text, &category) {
                    Ok(quote) => println!("Quote added successfully: {}", quote),
                    Err(e) => println!("{}", e),
                }
            }
            SessionCommand::Last => match lock_book(engine.book()).last_viewed() {
                Some(text) => println!("\"{}\"", text),
                None => println!("Nothing shown yet this session."),
            },
            SessionCommand::List => {
                let book = lock_book(engine.book());
                for quote in book.quotes() {
                    println!("[{}] {}", quote.category(), quote.text());
                }
            }
            SessionCommand::Sync => crate::report(engine.sync_now().await),
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => break,
            SessionCommand::Unknown(input) => println!("Unknown command: {} (try 'help')", input),
        }
    }

    handle.cancel().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next() {
        assert_eq!(parse_command("next"), Some(SessionCommand::Next(CategoryFilter::All)));
        assert_eq!(
            parse_command("n  Life "),
            Some(SessionCommand::Next(CategoryFilter::category("Life")))
        );
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_command("add Wisdom | Know thyself"),
            Some(SessionCommand::Add {
                category: "Wisdom".to_string(),
                text: "Know thyself".to_string()
            })
        );
        assert!(matches!(
            parse_command("add no separator"),
            Some(SessionCommand::Unknown(_))
        ));
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("q"), Some(SessionCommand::Quit));
        assert_eq!(parse_command("sync"), Some(SessionCommand::Sync));
        assert!(matches!(parse_command("dance"), Some(SessionCommand::Unknown(_))));
    }
}
