//! Command-line arguments and interactive fallbacks
//!
//! Precedence for uid and auth: CLI flag > AFKARENA_UID / AFKARENA_AUTH env
//! var > stdin prompt. clap resolves the first two; `or_prompt` the last.

use std::io::{BufRead, Write};

use clap::Parser;

use crate::error::{Error, Result};

/// Redeem AFK Arena gift codes for every account linked to a player.
#[derive(Debug, Parser)]
#[command(name = "afk-redeem", version)]
pub struct Args {
    /// Your in-game user ID
    #[arg(short, long, env = "AFKARENA_UID")]
    pub uid: Option<u64>,

    /// Your verification code, from the in-game CDKey screen
    #[arg(short, long, env = "AFKARENA_AUTH")]
    pub auth: Option<u64>,

    /// Config file (defaults to afk-redeem.toml when present)
    #[arg(short, long, env = "AFKARENA_CONFIG")]
    pub config: Option<String>,

    /// Delete all saved sessions before redeeming
    #[arg(long)]
    pub clear_sessions: bool,

    /// Gift codes to redeem
    #[arg(value_name = "CODE", required_unless_present = "clear_sessions")]
    pub codes: Vec<String>,
}

/// Use `value` when given, otherwise ask for it on stdin.
pub fn or_prompt(value: Option<u64>, prompt: &str) -> Result<u64> {
    if let Some(v) = value {
        return Ok(v);
    }
    let stdin = std::io::stdin();
    let answer = prompt_line(&mut stdin.lock(), &mut std::io::stderr(), prompt)?;
    answer.parse().map_err(|_| Error::InvalidAnswer {
        prompt: prompt.to_string(),
        answer,
    })
}

fn prompt_line(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<String> {
    write!(output, "{prompt}: ")
        .and_then(|_| output.flush())
        .map_err(|_| Error::Prompt(prompt.to_string()))?;
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => Err(Error::Prompt(prompt.to_string())),
        Ok(_) => Ok(line.trim().to_string()),
    }
}
