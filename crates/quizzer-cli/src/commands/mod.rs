pub mod check;
pub mod courses;
pub mod init;
pub mod profile;
pub mod quiz;
pub mod register;

use std::io::Write;

use anyhow::Result;

/// Read one trimmed line from stdin, after printing a label.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
