use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use console::Term;
use dialoguer::Input;
use tracing::warn;

use crate::traits::SelectionProvider;
use crate::types::{Amount, RewardRecord};

const MENU_WIDTH: usize = 70;
const AUTO_WIDTH: usize = 74;

/// Selects every candidate whose displayed price equals one of the requested amounts.
pub struct AmountSelector {
    amounts: Vec<Amount>,
}

impl AmountSelector {
    pub fn new(amounts: Vec<Amount>) -> Self {
        Self { amounts }
    }

    /// Requested amounts that no selected record carries.
    pub fn unmatched(&self, selected: &[RewardRecord]) -> Vec<Amount> {
        self.amounts
            .iter()
            .copied()
            .filter(|a| !selected.iter().any(|r| price_matches(*a, r)))
            .collect()
    }
}

impl SelectionProvider for AmountSelector {
    fn select(&self, candidates: &[RewardRecord]) -> Result<Vec<RewardRecord>> {
        let selected: Vec<RewardRecord> = candidates
            .iter()
            .filter(|r| self.amounts.iter().any(|a| price_matches(*a, r)))
            .cloned()
            .collect();

        for amount in self.unmatched(&selected) {
            warn!(amount = %amount, "No sold-out reward matches requested amount");
        }

        Ok(selected)
    }
}

/// A displayed price that does not parse never matches.
fn price_matches(amount: Amount, record: &RewardRecord) -> bool {
    record.amount() == Some(amount)
}

/// Auto-selects a lone candidate, otherwise shows a numbered menu and asks
/// for one or more 1-based indices. Without a terminal (piped stdin) the
/// answer is read line by line from stdin.
pub struct InteractiveSelector;

impl SelectionProvider for InteractiveSelector {
    fn select(&self, candidates: &[RewardRecord]) -> Result<Vec<RewardRecord>> {
        if let Some(only) = auto_select(candidates) {
            println!("Automatically selecting the only limited reward available:");
            println!("{} {}", only.price, truncate(&only.description, AUTO_WIDTH));
            return Ok(vec![only.clone()]);
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        for (i, r) in candidates.iter().enumerate() {
            println!("{}. {} {}", i + 1, r.price, truncate(&r.description, MENU_WIDTH));
        }
        println!();

        let count = candidates.len();
        let indices = if Term::stderr().is_term() && io::stdin().is_terminal() {
            prompt_indices(count)?
        } else {
            read_indices(io::stdin().lock(), count)?
        };
        Ok(indices.into_iter().map(|i| candidates[i].clone()).collect())
    }
}

fn prompt_indices(count: usize) -> Result<Vec<usize>> {
    let answer: String = Input::new()
        .with_prompt("Select pledge levels")
        .validate_with(|input: &String| -> Result<(), String> {
            parse_indices(input, count).map(|_| ())
        })
        .interact_text()
        .context("Failed to read pledge selection")?;

    parse_indices(&answer, count).map_err(anyhow::Error::msg)
}

/// Read lines until one parses as a valid selection. Invalid lines are
/// reported and skipped.
pub fn read_indices<R: BufRead>(reader: R, count: usize) -> Result<Vec<usize>> {
    print!("Select pledge levels: ");
    io::stdout().flush().ok();

    for line in reader.lines() {
        let line = line.context("Failed to read pledge selection")?;
        match parse_indices(&line, count) {
            Ok(indices) => return Ok(indices),
            Err(e) => eprintln!("{e}"),
        }
    }
    bail!("No pledge selection given")
}

fn auto_select(candidates: &[RewardRecord]) -> Option<&RewardRecord> {
    match candidates {
        [only] => Some(only),
        _ => None,
    }
}

/// Parse whitespace/comma separated 1-based indices into 0-based ones,
/// dropping duplicates but keeping first-seen order.
pub fn parse_indices(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for part in input.split(|c: char| c.is_whitespace() || c == ',') {
        if part.is_empty() {
            continue;
        }
        let n: usize = part
            .parse()
            .map_err(|_| format!("Not a number: {part}"))?;
        if n == 0 || n > count {
            return Err(format!("Choose between 1 and {count}"));
        }
        if !out.contains(&(n - 1)) {
            out.push(n - 1);
        }
    }
    if out.is_empty() {
        return Err("Enter at least one number".to_string());
    }
    Ok(out)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
