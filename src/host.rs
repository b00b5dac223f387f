//! Line-oriented terminal front-end: stdin words become user actions,
//! published snapshots are printed as plain text.

use crate::dialogue::flow::{ContactDetails, FlowSnapshot, UserAction};
use crate::dialogue::{Choice, Step};
use crate::runtime::{FunnelHandle, RuntimeError};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Act(UserAction),
    Help,
    Quit,
}

/// Interpret one input line against the current step. Unknown input yields
/// `Help`. Reply numbers are 1-based as printed.
pub fn parse_line(line: &str, step: Step) -> HostCommand {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return HostCommand::Help;
    };
    let head = head.to_lowercase();

    let action = match head.as_str() {
        "quit" | "exit" => return HostCommand::Quit,
        "start" => UserAction::Start,
        "take" => UserAction::TakeProduct,
        "another" => UserAction::AnotherProduct,
        "custom" => UserAction::CustomOrder,
        "retry" => UserAction::RetryFetch,
        "reply" => match words.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n > 0 => UserAction::Reply(n - 1),
            _ => return HostCommand::Help,
        },
        "contact" => {
            let (Some(name), Some(contact)) = (words.next(), words.next()) else {
                return HostCommand::Help;
            };
            UserAction::SubmitContact(ContactDetails {
                name: name.to_string(),
                contact: contact.to_string(),
                message: words.collect::<Vec<_>>().join(" "),
            })
        }
        key => match Choice::parse(step, key) {
            Some(choice) => UserAction::Choose(choice),
            None => return HostCommand::Help,
        },
    };
    HostCommand::Act(action)
}

/// What the visitor can type at `step`.
pub fn hint(step: Step) -> String {
    match step {
        Step::Welcome | Step::WelcomeReturning => "start".to_string(),
        Step::Mood | Step::Location | Step::Size | Step::Style => step.choice_keys().join(" | "),
        Step::Reveal | Step::RevealRetry => "take | another | custom | retry".to_string(),
        Step::Contact => "contact <name> <phone-or-email> [message]".to_string(),
        Step::ThankYou | Step::ThankYouGrumpy => String::new(),
    }
}

#[derive(Default)]
struct Screen {
    message: String,
    step: Option<Step>,
    product: Option<String>,
    digression: Option<String>,
}

impl Screen {
    fn render(&mut self, snapshot: &FlowSnapshot) {
        if !snapshot.message.is_empty() && snapshot.message != self.message {
            println!("🌳 {}", snapshot.message);
        }
        self.message = snapshot.message.clone();

        let digression = snapshot
            .digression
            .as_ref()
            .filter(|d| d.awaiting_reply)
            .map(|d| d.id.clone());
        if digression.is_some() && digression != self.digression {
            if let Some(view) = &snapshot.digression {
                for (i, label) in view.replies.iter().enumerate() {
                    println!("   reply {}: {}", i + 1, label);
                }
            }
        }
        self.digression = digression;

        let product = snapshot.product.as_ref().map(|p| p.id.clone());
        if product.is_some() && product != self.product {
            if let Some(p) = &snapshot.product {
                match &p.price_range {
                    Some(price) => println!("   🪴 {} ({}): {}", p.name, price, p.description),
                    None => println!("   🪴 {}: {}", p.name, p.description),
                }
            }
        }
        self.product = product;

        if snapshot.awaiting_input && self.step != Some(snapshot.step) {
            let hint = hint(snapshot.step);
            if !hint.is_empty() {
                println!("   > {}", hint);
            }
            self.step = Some(snapshot.step);
        }
    }
}

/// Drive the funnel from stdin until `quit` or end of input.
pub async fn run_terminal(handle: FunnelHandle) -> anyhow::Result<()> {
    let mut snapshots = handle.snapshots();
    let printer = tokio::spawn(async move {
        let mut screen = Screen::default();
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            screen.render(&snapshot);
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let step = handle.snapshot().step;
        match parse_line(&line, step) {
            HostCommand::Quit => break,
            HostCommand::Help => println!("   > {}", hint(step)),
            HostCommand::Act(action) => match handle.act(action).await {
                Ok(()) => {}
                Err(RuntimeError::Stopped) => break,
                Err(e) => println!("   ({})", e),
            },
        }
    }

    handle.shutdown().await;
    printer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_map_to_actions() {
        assert_eq!(parse_line("start", Step::Welcome), HostCommand::Act(UserAction::Start));
        assert_eq!(parse_line("  TAKE ", Step::Reveal), HostCommand::Act(UserAction::TakeProduct));
        assert_eq!(parse_line("quit", Step::Mood), HostCommand::Quit);
        assert_eq!(parse_line("", Step::Mood), HostCommand::Help);
    }

    #[test]
    fn choice_keys_depend_on_step() {
        assert_eq!(
            parse_line("calm", Step::Mood),
            HostCommand::Act(UserAction::Choose(Choice::parse(Step::Mood, "calm").unwrap()))
        );
        assert_eq!(parse_line("calm", Step::Location), HostCommand::Help);
        // "minimal" is both a mood and a style
        assert_eq!(
            parse_line("minimal", Step::Style),
            HostCommand::Act(UserAction::Choose(Choice::parse(Step::Style, "minimal").unwrap()))
        );
    }

    #[test]
    fn replies_are_one_based() {
        assert_eq!(parse_line("reply 1", Step::Size), HostCommand::Act(UserAction::Reply(0)));
        assert_eq!(parse_line("reply 0", Step::Size), HostCommand::Help);
        assert_eq!(parse_line("reply x", Step::Size), HostCommand::Help);
    }

    #[test]
    fn contact_takes_optional_message() {
        assert_eq!(
            parse_line("contact Ada ada@example.com a tall one please", Step::Contact),
            HostCommand::Act(UserAction::SubmitContact(ContactDetails {
                name: "Ada".to_string(),
                contact: "ada@example.com".to_string(),
                message: "a tall one please".to_string(),
            }))
        );
        assert_eq!(parse_line("contact Ada", Step::Contact), HostCommand::Help);
    }

    #[test]
    fn every_interactive_step_has_a_hint() {
        for step in Step::ALL {
            if !step.is_thank_you() {
                assert!(!hint(step).is_empty(), "no hint for {}", step);
            }
        }
    }
}
