//! Quote-aware splitting of a command line.

/// One positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// A quoted empty string (`""`), used to skip an optional slot.
    Absent,
}

impl Token {
    /// The text, or `None` for a skipped slot.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Word(word) => Some(word),
            Self::Absent => None,
        }
    }
}

/// Split on whitespace, keeping `"quoted text"` (or `'quoted text'`) as one
/// token. Quotes only open at the start of a token, so apostrophes inside
/// words survive. An unterminated quote runs to the end of the line.
#[must_use]
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if (ch == '"' || ch == '\'') && current.is_empty() && !quoted => {
                quote = Some(ch);
                quoted = true;
            }
            None if ch.is_whitespace() => flush(&mut tokens, &mut current, &mut quoted),
            None => current.push(ch),
        }
    }
    flush(&mut tokens, &mut current, &mut quoted);
    tokens
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, quoted: &mut bool) {
    if !current.is_empty() {
        tokens.push(Token::Word(std::mem::take(current)));
    } else if *quoted {
        tokens.push(Token::Absent);
    }
    *quoted = false;
}
