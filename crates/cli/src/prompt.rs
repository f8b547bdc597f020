//! Interactive prompts

use console::Term;
use std::io;

/// Whether a user can answer prompts
pub fn is_interactive() -> bool {
    Term::stdout().is_term() && Term::stderr().is_term()
}

/// Ask a yes/no question on stderr. An empty answer takes `default`.
pub fn confirm(question: &str, default: bool) -> io::Result<bool> {
    let term = Term::stderr();
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    term.write_str(&format!("{question} {hint} "))?;
    let answer = term.read_line()?;
    Ok(parse_answer(&answer).unwrap_or(default))
}

/// `Some(true)` for yes, `Some(false)` for no, `None` when unrecognised or empty
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y"), Some(true));
        assert_eq!(parse_answer(" YES \n"), Some(true));
        assert_eq!(parse_answer("no"), Some(false));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
