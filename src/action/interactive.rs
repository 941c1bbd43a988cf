//! The interactive per-target prompt (spec §4.7): inserted after the gate
//! and before the executor when `--interactive` is set.

use std::io::{self, BufRead, Write};

use crate::types::{ActionKind, FileRecord};

/// One of the choices a per-target prompt can yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveChoice {
    Delete,
    Hardlink,
    Quarantine,
    Skip,
    SwapKeep,
    View,
    Info,
    ApplyToAllRemaining,
    Quit,
}

/// Abstracts the actual prompt I/O so the resolution loop can be exercised
/// without a real terminal.
pub trait Prompter {
    fn prompt(&mut self, survivor: &FileRecord, target: &FileRecord) -> InteractiveChoice;
}

/// Reads choices from stdin, writes prompts to stdout. The real prompter
/// used outside tests.
pub struct StdioPrompter;

impl Prompter for StdioPrompter {
    fn prompt(&mut self, survivor: &FileRecord, target: &FileRecord) -> InteractiveChoice {
        let stdin = io::stdin();
        loop {
            print!(
                "keep {} ; resolve {} ? [d]elete/[h]ardlink/[q]uarantine/[s]kip/[w]swap-keep/[v]iew/[i]nfo/[a]ll-remaining/[u]quit: ",
                survivor.path.display(),
                target.path.display()
            );
            let _ = io::stdout().flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                return InteractiveChoice::Quit;
            }
            if let Some(choice) = parse_choice(line.trim()) {
                return choice;
            }
            println!("unrecognized choice: {}", line.trim());
        }
    }
}

fn parse_choice(input: &str) -> Option<InteractiveChoice> {
    match input.to_ascii_lowercase().as_str() {
        "d" | "delete" => Some(InteractiveChoice::Delete),
        "h" | "hardlink" => Some(InteractiveChoice::Hardlink),
        "q" | "quarantine" => Some(InteractiveChoice::Quarantine),
        "s" | "skip" => Some(InteractiveChoice::Skip),
        "w" | "swap-keep" => Some(InteractiveChoice::SwapKeep),
        "v" | "view" => Some(InteractiveChoice::View),
        "i" | "info" => Some(InteractiveChoice::Info),
        "a" | "all" | "apply-to-all-remaining" => Some(InteractiveChoice::ApplyToAllRemaining),
        "u" | "quit" => Some(InteractiveChoice::Quit),
        _ => None,
    }
}

impl InteractiveChoice {
    /// The action the choice maps to, if any (skip/view/info/quit have no
    /// direct action mapping).
    pub fn as_action(self) -> Option<ActionKind> {
        match self {
            InteractiveChoice::Delete => Some(ActionKind::Delete),
            InteractiveChoice::Hardlink => Some(ActionKind::Hardlink),
            InteractiveChoice::Quarantine => Some(ActionKind::Quarantine),
            _ => None,
        }
    }
}
