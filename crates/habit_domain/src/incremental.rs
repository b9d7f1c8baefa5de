//! Detects goals that need several completions per period ("3 times", "3x").

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{HabitError, Result};

/// Single-word numbers only. Of "twenty three" just the last word is read.
static NUMBER_WORDS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("one", 1),
        ("two", 2),
        ("three", 3),
        ("four", 4),
        ("five", 5),
        ("six", 6),
        ("seven", 7),
        ("eight", 8),
        ("nine", 9),
        ("ten", 10),
        ("eleven", 11),
        ("twelve", 12),
        ("thirteen", 13),
        ("fourteen", 14),
        ("fifteen", 15),
        ("sixteen", 16),
        ("seventeen", 17),
        ("eighteen", 18),
        ("nineteen", 19),
        ("twenty", 20),
        ("thirty", 30),
        ("forty", 40),
        ("fifty", 50),
        ("sixty", 60),
        ("seventy", 70),
        ("eighty", 80),
        ("ninety", 90),
    ]
    .into_iter()
    .collect()
});

pub fn number_word(word: &str) -> Option<u32> {
    NUMBER_WORDS.get(word.to_ascii_lowercase().as_str()).copied()
}

/// Reads a trailing quantity from a goal description.
///
/// Returns `Ok(None)` when the description carries no count; the goal is then
/// completed by a single progress event.
pub fn incremental_count(description: &str) -> Result<Option<u32>> {
    let tokens: Vec<String> = description
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    let Some(last) = tokens.last() else {
        return Ok(None);
    };

    let count = if let Some(digits) = last
        .strip_suffix('x')
        .filter(|digits| is_digits(digits))
    {
        Some(parse_digits(digits)?)
    } else if last == "times" && tokens.len() >= 2 {
        let amount = &tokens[tokens.len() - 2];
        if is_digits(amount) {
            Some(parse_digits(amount)?)
        } else {
            number_word(amount)
        }
    } else {
        None
    };

    match count {
        Some(0) => Err(HabitError::invalid("cannot do something 0 times")),
        other => Ok(other),
    }
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn parse_digits(token: &str) -> Result<u32> {
    token
        .parse::<u32>()
        .map_err(|_| HabitError::invalid(format!("{token} is too many times")))
}
