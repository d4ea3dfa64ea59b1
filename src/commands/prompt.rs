use anyhow::{bail, Result};
use hypdl::{GameNameIndex, InterruptChoice};
use std::io::{self, Write};

/// Read one trimmed line; `None` at end of input
pub fn line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Ask until a non-negative integer is entered
pub fn number(prompt: &str) -> Result<usize> {
    loop {
        let Some(input) = line(prompt)? else {
            bail!("No input received");
        };
        match input.parse() {
            Ok(n) => return Ok(n),
            Err(_) => println!("Invalid input! Please enter a valid number."),
        }
    }
}

/// Yes/no question; anything unrecognised (including an empty answer) takes `default`
pub fn yes_no(prompt: &str, default: bool) -> Result<bool> {
    let answer = line(prompt)?.unwrap_or_default().to_lowercase();
    Ok(parse_yes_no(&answer).unwrap_or(default))
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer {
        "no" | "n" | "false" | "0" => Some(false),
        "yes" | "y" | "true" | "1" => Some(true),
        _ => None,
    }
}

/// List the named games and return the chosen id
pub fn select_game(names: &GameNameIndex) -> Result<String> {
    if names.is_empty() {
        bail!("The game list is empty. Run 'hypdl game-list' first.");
    }

    println!("Games available:");
    for (i, (_, label)) in names.entries().iter().enumerate() {
        println!("({}) {}", i + 1, label);
    }

    loop {
        let choice = number("Select game: ")?;
        match choice.checked_sub(1).and_then(|i| names.entries().get(i)) {
            Some((id, _)) => return Ok(id.clone()),
            None => println!("Invalid input! Please enter a number between 1 and {}.", names.len()),
        }
    }
}

/// Asked after Ctrl+C stops a transfer
pub fn interrupt_choice(file: &str) -> InterruptChoice {
    println!();
    println!("Download of {} interrupted. The partial file is kept.", file);
    let answer = line("Skip this file and continue, or abort all downloads? (S/a) ")
        .ok()
        .flatten()
        .unwrap_or_default()
        .to_lowercase();

    match answer.as_str() {
        "a" | "abort" => InterruptChoice::AbortBatch,
        _ => InterruptChoice::SkipCurrent,
    }
}
