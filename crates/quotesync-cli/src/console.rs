// Terminal side of notifications and conflict prompts
use async_trait::async_trait;
use chrono::Local;
use quotesync_core::{ConflictResolver, Divergence, Notification, Notifier, Resolution};
use std::io::{self, BufRead, Write};

/// Prints notices straight to stdout. A terminal can't auto-dismiss, so
/// the duration is ignored.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        println!("{}", render(&notification));
    }
}

fn render(notification: &Notification) -> String {
    format!(
        "[{} {}] {}",
        notification.issued_at.with_timezone(&Local).format("%H:%M:%S"),
        notification.kind.label(),
        notification.message
    )
}

/// Asks on stdin whether to take the server's quotes
pub struct PromptResolver;

#[async_trait]
impl ConflictResolver for PromptResolver {
    async fn resolve(&self, divergence: &Divergence) -> Resolution {
        let question = format!(
            "Server data differs from local quotes ({} local, {} on server).\n\
             Overwrite local quotes with server data? [y/N] ",
            divergence.local.len(),
            divergence.remote.len()
        );

        // stdin blocks, keep it off the runtime threads
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            stdout.write_all(question.as_bytes())?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if is_yes(&line) => Resolution::Accept,
            Ok(Ok(_)) => Resolution::Decline,
            Ok(Err(e)) => {
                tracing::warn!("Couldn't read answer ({}), keeping local quotes", e);
                Resolution::Decline
            }
            Err(e) => {
                tracing::warn!("Prompt task failed ({}), keeping local quotes", e);
                Resolution::Decline
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
