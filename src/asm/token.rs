//! Line lexer for TRC3 assembly.
//!
//! A line is split on whitespace and commas after its `;` comment is removed.
//! A quoted character literal (`'A'`, `' '`, `';'`, `','`) is always one token.

/// One whitespace/comma-delimited piece of a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Byte offset of the token in its line.
    pub column: usize,
}

impl Token {
    /// Byte range the token covers in its line.
    pub fn span(&self) -> (usize, usize) {
        (self.column, self.text.len())
    }
}

/// An operand token, classified once at lex time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Alias(String),
}

impl Operand {
    pub fn classify(text: &str) -> Self {
        if let Some(c) = char_literal(text) {
            return Operand::Literal(c as i64);
        }
        match parse_literal(text) {
            Some(value) => Operand::Literal(value),
            None => Operand::Alias(text.to_string()),
        }
    }
}

/// The code part of a line, with a trailing `;` comment removed.
///
/// A `;` inside a character literal does not start a comment.
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if i + 2 < bytes.len() && bytes[i + 2] == b'\'' => i += 3,
            b';' => return &line[..i],
            _ => i += 1,
        }
    }
    line
}

/// Split a line into tokens, dropping its comment.
pub fn tokenize(line: &str) -> Vec<Token> {
    let code = strip_comment(line);
    let bytes = code.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() || b == b',' {
            i += 1;
            continue;
        }

        let start = i;
        if b == b'\'' && i + 2 < bytes.len() && bytes[i + 2] == b'\'' && bytes[i + 1].is_ascii() {
            i += 3;
        } else {
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b',' {
                i += 1;
            }
        }

        tokens.push(Token {
            text: code[start..i].to_string(),
            column: start,
        });
    }

    tokens
}

/// Parse a decimal, `0x` hexadecimal or `0b` binary integer.
pub fn parse_literal(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()?
    } else {
        return None;
    };

    Some(if negative { -value } else { value })
}

/// The code point of a printable-ASCII character literal such as `'A'`.
pub fn char_literal(text: &str) -> Option<u8> {
    match text.as_bytes() {
        [b'\'', c, b'\''] if (0x20..=0x7E).contains(c) => Some(*c),
        _ => None,
    }
}

/// Whether a name consists of digits only.
pub fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<String> {
        tokenize(line).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("LDI r1 5 ; load"), "LDI r1 5 ");
        assert_eq!(strip_comment("; only a comment"), "");
        assert_eq!(strip_comment("LDI r1 ';' ; semicolon"), "LDI r1 ';' ");
    }

    #[test]
    fn test_tokenize_whitespace_and_commas() {
        assert_eq!(texts("  RSH r1, r2"), vec!["RSH", "r1", "r2"]);
        assert_eq!(texts("ADD\tr1,r2 ,r3"), vec!["ADD", "r1", "r2", "r3"]);
        assert!(texts("   ").is_empty());
    }

    #[test]
    fn test_tokenize_columns() {
        let tokens = tokenize("  LDI r1 x");
        assert_eq!(tokens[0].column, 2);
        assert_eq!(tokens[2].span(), (9, 1));
    }

    #[test]
    fn test_tokenize_char_literals() {
        assert_eq!(texts("LDI r1 ' '"), vec!["LDI", "r1", "' '"]);
        assert_eq!(texts("LDI r1 ','"), vec!["LDI", "r1", "','"]);
    }

    #[test]
    fn test_parse_literal_radixes() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("0x2A"), Some(42));
        assert_eq!(parse_literal("0b101010"), Some(42));
        assert_eq!(parse_literal("-3"), Some(-3));
        assert_eq!(parse_literal("r1"), None);
        assert_eq!(parse_literal("0x"), None);
        assert_eq!(parse_literal("+5"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(Operand::classify("7"), Operand::Literal(7));
        assert_eq!(Operand::classify("'A'"), Operand::Literal(65));
        assert_eq!(Operand::classify("loop"), Operand::Alias("loop".into()));
        // Not printable ASCII, so just an alias-shaped token
        assert_eq!(char_literal("'\t'"), None);
    }
}
