//! Terminal prompts. Input is read on the blocking pool so the runtime keeps
//! driving timers while the user types; secrets are read without echo.

use anyhow::{bail, Result};
use secrecy::SecretString;
use std::io::{self, BufRead, Write};

pub async fn line(label: &str) -> Result<String> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || read_line(&label, &mut io::stdin().lock())).await?
}

/// Reads without echo so passwords and codes stay out of the scrollback.
pub async fn secret(label: &str) -> Result<SecretString> {
    let label = format!("{label}: ");
    let answer = tokio::task::spawn_blocking(move || rpassword::prompt_password(label)).await??;
    Ok(into_secret(&answer))
}

fn into_secret(answer: &str) -> SecretString {
    SecretString::from(answer.trim().to_string())
}

fn read_line(label: &str, input: &mut impl BufRead) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}: ")?;
    stdout.flush()?;

    let mut buffer = String::new();
    if input.read_line(&mut buffer)? == 0 {
        bail!("input closed while waiting for {label}");
    }
    Ok(buffer.trim().to_string())
}
