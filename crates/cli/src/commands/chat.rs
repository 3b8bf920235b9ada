//! `personachat chat` - Interactive chat mode.
//!
//! History lives only for the session and is sent with every question.

use std::io::Write;
use std::path::Path;

use personachat_core::message::ConversationTurn;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let controller = super::build_controller(&config)?;
    let profile = controller.profile();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        PersonaChat — Interactive Mode        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Persona:   {}", profile.name);
    println!("  Primary:   {} ({})", controller.primary_model(), config.primary.provider);
    println!("  Judge:     {} ({})", controller.judge_model(), config.judge.provider);
    println!(
        "  Profile:   {} files loaded (~{} tokens)",
        profile.loaded_files.len(),
        profile.estimated_tokens()
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let question = match classify(&line) {
            Input::Quit => break,
            Input::Blank => {
                print!("  You > ");
                std::io::stdout().flush()?;
                continue;
            }
            Input::Question(question) => question,
        };

        eprint!("  ...");
        match controller.respond(question, &history).await {
            Ok(outcome) => {
                eprint!("\r     \r");
                println!();
                for line in outcome.reply.lines() {
                    println!("  {} > {line}", profile.name);
                }
                println!();
                tracing::debug!(path = ?outcome.path, calls = outcome.model_calls, "Turn complete");

                history.push(ConversationTurn::user(question));
                history.push(ConversationTurn::assistant(outcome.reply));
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    /// Nothing typed; re-prompt without asking the models or touching history.
    Blank,
    Question(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        "exit" | "quit" => Input::Quit,
        question => Input::Question(question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(classify(""), Input::Blank);
        assert_eq!(classify("   \t"), Input::Blank);
    }

    #[test]
    fn exit_words_quit() {
        assert_eq!(classify("exit"), Input::Quit);
        assert_eq!(classify("  quit "), Input::Quit);
    }

    #[test]
    fn questions_are_trimmed() {
        assert_eq!(
            classify("  What did you study?  "),
            Input::Question("What did you study?")
        );
    }
}
