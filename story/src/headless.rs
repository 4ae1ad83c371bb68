//! Headless mode for the story player.
//!
//! This module provides a simple text-based interface for running a story
//! without a TUI. It's designed for automated testing and scripted runs.

use std::io::{self, BufRead, Write};

use story_core::{PositionStore, Settled, StoryView};
use storybot::resolve_media;

use crate::app::{choices, perform, ChoiceAction, Outcome, Session};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick the n-th row, 1-based.
    Choose(usize),
    /// Empty line: take the only row on screen.
    Continue,
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line of the headless protocol.
pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Continue;
    }

    if let Some(command) = line.strip_prefix('#') {
        return match command.trim() {
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
    }

    match line.parse::<usize>() {
        Ok(n) if n > 0 => Command::Choose(n),
        _ => Command::Unknown(line.to_string()),
    }
}

/// Run the story over stdin/stdout.
///
/// This provides a simple line-oriented protocol:
/// - A number picks that row
/// - An empty line takes the only row (continue)
/// - Lines starting with `#` are commands (status, help, quit)
///
/// Restarting goes through the terminal question's own buttons.
pub async fn run_headless(mut session: Session, base_url: &str) -> io::Result<()> {
    println!("=== Story Headless Mode ===");
    print_help();
    println!();
    print_view(&session.view(), base_url);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let view = session.view();
        let rows = choices(&view, base_url);

        let action = match parse_line(&line) {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => {
                print_help();
                None
            }
            Command::Status => {
                print_status(&session);
                None
            }
            Command::Continue => match rows.as_slice() {
                [only] => Some(only.action.clone()),
                _ => {
                    println!("[ERROR] Pick a number between 1 and {}", rows.len());
                    None
                }
            },
            Command::Choose(n) => match rows.get(n - 1) {
                Some(row) => Some(row.action.clone()),
                None => {
                    println!("[ERROR] No choice {n}");
                    None
                }
            },
            Command::Unknown(input) => {
                println!("[ERROR] Unknown input '{input}'. Type #help for help.");
                None
            }
        };

        if let Some(action) = action {
            run_action(&mut session, &action, base_url).await;
        }
        stdout.flush().ok();
    }

    Ok(())
}

async fn run_action(session: &mut Session, action: &ChoiceAction, base_url: &str) {
    match perform(session, action) {
        Ok(Outcome::Pending) => settle_and_print(session, base_url).await,
        Ok(Outcome::Settled(settled)) => {
            report(&settled);
            print_view(&session.view(), base_url);
        }
        Ok(Outcome::OpenUrl(url)) => println!("[OPEN] {url}"),
        Err(e) => println!("[ERROR] {e}"),
    }
}

async fn settle_and_print(session: &mut Session, base_url: &str) {
    let settled = session.wait_settled().await;
    report(&settled);
    print_view(&session.view(), base_url);
}

fn report(settled: &Settled) {
    match settled {
        Settled::BrokenEdge { target, .. } => {
            println!("[STUCK] Question {target} is missing, staying here");
        }
        Settled::Unreachable => println!("[STUCK] The story has no ending to go to"),
        Settled::NoStart => println!("[STUCK] The story is empty"),
        _ => {}
    }
}

fn print_view(view: &StoryView, base_url: &str) {
    match (view.final_index, &view.current_question) {
        (Some(index), _) => println!("[FINAL {}]", index + 1),
        (None, Some(q)) => println!("[QUESTION {}]", q.id),
        (None, None) => {
            println!("[EMPTY] No story loaded");
            return;
        }
    }

    if let Some(picture) = resolve_media(base_url, view.picture()) {
        println!("[IMAGE] {picture}");
    }
    if let Some(audio) = resolve_media(base_url, view.audio()) {
        println!("[AUDIO] {audio}");
    }
    for para in view.text().split("\n\n") {
        println!("{para}");
    }
    println!();

    for (i, row) in choices(view, base_url).iter().enumerate() {
        match &row.detail {
            Some(detail) => println!("  {}. {}  <{detail}>", i + 1, row.label),
            None => println!("  {}. {}", i + 1, row.label),
        }
    }
    println!();
}

fn print_status(session: &Session) {
    let engine = session.engine();
    println!("[STATUS]");
    match engine.current_question_id() {
        Some(id) => println!("  Question: {id}"),
        None => println!("  Question: none"),
    }
    if let Some(index) = engine.final_index() {
        println!("  Final slide: {}", index + 1);
    }
    println!("  Persisted: {}", engine.position_store().load().unwrap_or_else(|| "-".into()));
    println!(
        "  Graph: {} questions, {} answers, {} final slides",
        engine.graph().question_count(),
        engine.graph().answer_count(),
        engine.graph().final_variants_sorted().len()
    );
}

fn print_help() {
    println!("Input:");
    println!("  <n>          - Choose row n");
    println!("  (empty)      - Continue when there is a single row");
    println!("  #status      - Show the current position");
    println!("  #help        - Show this help");
    println!("  #quit        - Exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(""), Command::Continue);
        assert_eq!(parse_line("   "), Command::Continue);
        assert_eq!(parse_line("2"), Command::Choose(2));
        assert_eq!(parse_line("#restart"), Command::Unknown("restart".into()));
        assert_eq!(parse_line("# quit"), Command::Quit);
        assert_eq!(parse_line("#status"), Command::Status);
        assert_eq!(parse_line("0"), Command::Unknown("0".into()));
        assert_eq!(parse_line("go"), Command::Unknown("go".into()));
        assert_eq!(parse_line("#dance"), Command::Unknown("dance".into()));
    }
}
