//! Tokenizer for stub declaration source.
//!
//! Follows the declaration language's lexical rules closely enough to
//! recover logical lines, indentation, and literal values. Input is never
//! evaluated.

use stubschema_core::{CheckResult, Diagnostic};

/// Operators and delimiters, longest first so the scan is greedy
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", ":=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

/// Width a tab advances indentation to
const TAB_SIZE: usize = 8;

/// Numeric literal
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    /// Integer literal
    Int(i64),
    /// Integer literal outside the `i64` range, as written without `_`
    BigInt(String),
    /// Floating point literal
    Float(f64),
    /// Imaginary literal (`2j`)
    Imaginary(f64),
}

/// What a string literal's prefix made of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrFlavor {
    /// Plain text string
    Text,
    /// `b"..."`
    Bytes,
    /// `f"..."`, which is not a constant
    Formatted,
}

/// Decoded string literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLiteral {
    /// Value after escape processing
    pub value: String,
    /// Literal flavor
    pub flavor: StrFlavor,
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword
    Name(String),
    /// Numeric literal
    Number(Number),
    /// String literal
    Str(StrLiteral),
    /// Operator or delimiter
    Op(&'static str),
    /// End of a logical line
    Newline,
    /// Indentation increased
    Indent,
    /// Indentation decreased
    Dedent,
    /// End of input
    EndOfFile,
}

/// Token with its 1-based source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

/// Tokenize source text
///
/// # Errors
///
/// Returns a `SyntaxError` diagnostic for malformed literals, unbalanced
/// brackets, or inconsistent indentation
pub fn tokenize(source: &str) -> CheckResult<Vec<Token>> {
    let tokens = Lexer::new(source).run()?;
    tracing::trace!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    line_start: usize,
    at_line_start: bool,
    indents: Vec<usize>,
    brackets: Vec<(char, usize, usize)>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
            at_line_start: true,
            indents: vec![0],
            brackets: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    fn error(&self, line: usize, column: usize, message: impl std::fmt::Display) -> Diagnostic {
        Diagnostic::syntax(line, column, message)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    /// Consume one line terminator (`\n`, `\r\n`, or `\r`)
    fn newline(&mut self) {
        if self.peek() == Some('\r') {
            self.pos += 1;
        }
        if self.peek() == Some('\n') {
            self.pos += 1;
        }
        self.line += 1;
        self.line_start = self.pos;
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.pos += 1;
        }
    }

    fn run(mut self) -> CheckResult<Vec<Token>> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.indentation()? {
                    break;
                }
                continue;
            }

            let Some(c) = self.peek() else { break };
            let (line, column) = (self.line, self.column());
            match c {
                ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\n' | '\r' => {
                    self.newline();
                    if self.brackets.is_empty() {
                        self.push(TokenKind::Newline, line, column);
                        self.at_line_start = true;
                    }
                }
                '\\' => match self.peek_at(1) {
                    Some('\n') | Some('\r') => {
                        self.pos += 1;
                        self.newline();
                    }
                    _ => {
                        return Err(self.error(
                            line,
                            column,
                            "unexpected character after line continuation character",
                        ))
                    }
                },
                '"' | '\'' => {
                    let kind = self.string("", line, column)?;
                    self.push(kind, line, column);
                }
                c if is_ident_start(c) => {
                    let name = self.identifier();
                    if matches!(self.peek(), Some('"') | Some('\'')) && is_string_prefix(&name) {
                        let kind = self.string(&name, line, column)?;
                        self.push(kind, line, column);
                    } else {
                        self.push(TokenKind::Name(name), line, column);
                    }
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) =>
                {
                    let number = self.number(line, column)?;
                    self.push(TokenKind::Number(number), line, column);
                }
                _ => {
                    let op = self.operator(line, column)?;
                    self.push(TokenKind::Op(op), line, column);
                }
            }
        }

        if let Some(&(open, line, column)) = self.brackets.last() {
            return Err(self.error(line, column, format!("'{}' was never closed", open)));
        }
        let (line, column) = (self.line, self.column());
        if !self.at_line_start {
            self.push(TokenKind::Newline, line, column);
        }
        for _ in 1..self.indents.len() {
            self.push(TokenKind::Dedent, line, column);
        }
        self.push(TokenKind::EndOfFile, line, column);
        Ok(self.tokens)
    }

    /// Measure indentation at the start of a line and emit INDENT/DEDENT.
    ///
    /// Returns `false` once input is exhausted. Blank and comment-only
    /// lines are consumed without producing tokens.
    fn indentation(&mut self) -> CheckResult<bool> {
        let mut width = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek() {
            None => return Ok(false),
            Some('#') => {
                self.skip_comment();
                return Ok(true);
            }
            Some('\n') | Some('\r') => {
                self.newline();
                return Ok(true);
            }
            _ => {}
        }

        self.at_line_start = false;
        let (line, column) = (self.line, self.column());
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line, column);
        } else if width < current {
            while self.indents.last().is_some_and(|&level| width < level) {
                self.indents.pop();
                self.push(TokenKind::Dedent, line, column);
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(self.error(
                    line,
                    column,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(true)
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn operator(&mut self, line: usize, column: usize) -> CheckResult<&'static str> {
        let op = OPERATORS
            .iter()
            .copied()
            .find(|op| {
                op.chars()
                    .enumerate()
                    .all(|(i, c)| self.peek_at(i) == Some(c))
            })
            .ok_or_else(|| {
                let c = self.peek().unwrap_or(' ');
                self.error(line, column, format!("invalid character '{}'", c))
            })?;
        self.pos += op.chars().count();

        match op {
            "(" | "[" | "{" => {
                let open = op.chars().next().unwrap_or('(');
                self.brackets.push((open, line, column));
            }
            ")" | "]" | "}" => {
                let close = op.chars().next().unwrap_or(')');
                match self.brackets.pop() {
                    Some((open, _, _)) if closer_of(open) == close => {}
                    Some((open, _, _)) => {
                        return Err(self.error(
                            line,
                            column,
                            format!(
                                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                                close, open
                            ),
                        ))
                    }
                    None => {
                        return Err(self.error(line, column, format!("unmatched '{}'", close)))
                    }
                }
            }
            _ => {}
        }
        Ok(op)
    }

    fn digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if accept(c) {
                out.push(c);
            } else if c != '_' {
                break;
            }
            self.pos += 1;
        }
        out
    }

    fn number(&mut self, line: usize, column: usize) -> CheckResult<Number> {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let number = if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.digits(|c| c.is_digit(radix));
            if digits.is_empty() {
                return Err(self.error(line, column, "invalid number literal"));
            }
            match i64::from_str_radix(&digits, radix) {
                Ok(value) => Number::Int(value),
                Err(_) => {
                    let prefix = match radix {
                        16 => "0x",
                        8 => "0o",
                        _ => "0b",
                    };
                    Number::BigInt(format!("{}{}", prefix, digits))
                }
            }
        } else {
            let mut text = self.digits(|c| c.is_ascii_digit());
            let mut is_float = false;
            if self.peek() == Some('.') {
                is_float = true;
                self.pos += 1;
                text.push('.');
                text.push_str(&self.digits(|c| c.is_ascii_digit()));
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_at(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    is_float = true;
                    text.push('e');
                    self.pos += 1;
                    if signed {
                        text.push(self.peek().unwrap_or('+'));
                        self.pos += 1;
                    }
                    text.push_str(&self.digits(|c| c.is_ascii_digit()));
                }
            }
            let text = if text.starts_with('.') {
                format!("0{}", text)
            } else {
                text
            };

            if matches!(self.peek(), Some('j' | 'J')) {
                self.pos += 1;
                let value = text
                    .parse::<f64>()
                    .map_err(|_| self.error(line, column, "invalid imaginary literal"))?;
                Number::Imaginary(value)
            } else if is_float {
                let value = text
                    .parse::<f64>()
                    .map_err(|_| self.error(line, column, "invalid float literal"))?;
                Number::Float(value)
            } else {
                if text.len() > 1 && text.starts_with('0') && text.chars().any(|c| c != '0') {
                    return Err(self.error(
                        line,
                        column,
                        "leading zeros in decimal integer literals are not permitted",
                    ));
                }
                match text.parse::<i64>() {
                    Ok(value) => Number::Int(value),
                    Err(_) => Number::BigInt(text),
                }
            }
        };

        if self.peek().is_some_and(is_ident_continue) {
            return Err(self.error(line, column, "invalid decimal literal"));
        }
        Ok(number)
    }

    fn string(&mut self, prefix: &str, line: usize, column: usize) -> CheckResult<TokenKind> {
        let prefix = prefix.to_ascii_lowercase();
        let raw = prefix.contains('r');
        let flavor = if prefix.contains('b') {
            StrFlavor::Bytes
        } else if prefix.contains('f') {
            StrFlavor::Formatted
        } else {
            StrFlavor::Text
        };

        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(self.error(line, column, message));
            };

            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
                value.push(c);
                self.pos += 1;
                continue;
            }

            match c {
                '\n' | '\r' if !triple => {
                    return Err(self.error(line, column, "unterminated string literal"));
                }
                '\n' | '\r' => {
                    value.push('\n');
                    self.newline();
                }
                '\\' => {
                    self.pos += 1;
                    self.escape(&mut value, raw, flavor == StrFlavor::Bytes, line, column)?;
                }
                _ => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }

        Ok(TokenKind::Str(StrLiteral { value, flavor }))
    }

    /// Decode the escape sequence after a backslash
    fn escape(
        &mut self,
        value: &mut String,
        raw: bool,
        bytes: bool,
        line: usize,
        column: usize,
    ) -> CheckResult<()> {
        let Some(c) = self.peek() else {
            return Err(self.error(line, column, "unterminated string literal"));
        };

        if c == '\n' || c == '\r' {
            if raw {
                value.push('\\');
                value.push('\n');
            }
            self.newline();
            return Ok(());
        }

        self.pos += 1;
        if raw {
            value.push('\\');
            value.push(c);
            return Ok(());
        }

        match c {
            '\\' | '\'' | '"' => value.push(c),
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'x' => value.push(self.hex_escape(2, line, column)?),
            'u' if !bytes => value.push(self.hex_escape(4, line, column)?),
            'U' if !bytes => value.push(self.hex_escape(8, line, column)?),
            _ => {
                value.push('\\');
                value.push(c);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize, line: usize, column: usize) -> CheckResult<char> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .peek()
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| self.error(line, column, "truncated escape sequence"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        char::from_u32(code)
            .ok_or_else(|| self.error(line, column, "illegal Unicode character in escape"))
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

fn closer_of(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfFile]);
    }

    #[test]
    fn test_tokenize_def_header() {
        let tokens = kinds("def f(x: int = 1) -> str: ...\n");
        assert_eq!(tokens[0], TokenKind::Name("def".to_string()));
        assert!(tokens.contains(&TokenKind::Op("->")));
        assert!(tokens.contains(&TokenKind::Op("...")));
        assert!(tokens.contains(&TokenKind::Number(Number::Int(1))));
        assert_eq!(tokens[tokens.len() - 2], TokenKind::Newline);
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = kinds("def f():\n    \"\"\"doc\"\"\"\nx = 1\n");
        let indents = tokens.iter().filter(|t| **t == TokenKind::Indent).count();
        let dedents = tokens.iter().filter(|t| **t == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let tokens = kinds("# header\n\nx = 1  # trailing\n\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Op("="),
                TokenKind::Number(Number::Int(1)),
                TokenKind::Newline,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets() {
        let tokens = kinds("f(a,\n  b)\n");
        assert_eq!(tokens.iter().filter(|t| **t == TokenKind::Newline).count(), 1);
        assert!(!tokens.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_triple_quoted_string() {
        let tokens = kinds("\"\"\"Line one.\n\n    More.\n\"\"\"\n");
        match &tokens[0] {
            TokenKind::Str(lit) => {
                assert_eq!(lit.value, "Line one.\n\n    More.\n");
                assert_eq!(lit.flavor, StrFlavor::Text);
            }
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r#"'a\tb\x41\u00e9\'' r'\n'"#);
        assert_eq!(
            tokens[0],
            TokenKind::Str(StrLiteral {
                value: "a\tbA\u{e9}'".to_string(),
                flavor: StrFlavor::Text
            })
        );
        assert_eq!(
            tokens[1],
            TokenKind::Str(StrLiteral {
                value: "\\n".to_string(),
                flavor: StrFlavor::Text
            })
        );
    }

    #[test]
    fn test_string_prefixes() {
        let tokens = kinds("b'x' f'y' rb'z'");
        let flavors: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                TokenKind::Str(lit) => Some(lit.flavor),
                _ => None,
            })
            .collect();
        assert_eq!(flavors, vec![StrFlavor::Bytes, StrFlavor::Formatted, StrFlavor::Bytes]);
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("0x1F 1_000 2.5 .5 1e3 3j");
        assert_eq!(tokens[0], TokenKind::Number(Number::Int(31)));
        assert_eq!(tokens[1], TokenKind::Number(Number::Int(1000)));
        assert_eq!(tokens[2], TokenKind::Number(Number::Float(2.5)));
        assert_eq!(tokens[3], TokenKind::Number(Number::Float(0.5)));
        assert_eq!(tokens[4], TokenKind::Number(Number::Float(1000.0)));
        assert_eq!(tokens[5], TokenKind::Number(Number::Imaginary(3.0)));
    }

    #[test]
    fn test_integers_beyond_i64() {
        let tokens = kinds("99_999_999_999_999_999_999 0xFFFF_FFFF_FFFF_FFFF_F 9223372036854775807");
        assert_eq!(
            tokens[0],
            TokenKind::Number(Number::BigInt("99999999999999999999".to_string()))
        );
        assert_eq!(
            tokens[1],
            TokenKind::Number(Number::BigInt("0xFFFFFFFFFFFFFFFFF".to_string()))
        );
        assert_eq!(tokens[2], TokenKind::Number(Number::Int(i64::MAX)));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert!(err.message.contains("unterminated string literal"));
        assert!(err.message.contains("1:5"));
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = tokenize("f(a, b\n").unwrap_err();
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn test_mismatched_bracket() {
        assert!(tokenize("f(a]\n").is_err());
        assert!(tokenize(")\n").is_err());
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = tokenize("if x:\n    a\n  b\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }

    #[test]
    fn test_line_continuation() {
        let tokens = kinds("x = 1 + \\\n    2\n");
        assert!(!tokens.contains(&TokenKind::Indent));
        assert_eq!(tokens.iter().filter(|t| **t == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn test_invalid_character() {
        assert!(tokenize("x = $\n").is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_tokenize_never_panics(source in "\\PC{0,64}") {
            let _ = tokenize(&source);
        }

        #[test]
        fn prop_tokens_end_with_eof(source in "[a-z =:()\\[\\]\n\"'#0-9.]{0,48}") {
            if let Ok(tokens) = tokenize(&source) {
                proptest::prop_assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::EndOfFile));
            }
        }
    }
}
