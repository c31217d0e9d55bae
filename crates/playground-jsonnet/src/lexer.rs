//! Tokenizer
//!
//! Turns source text into a flat list of tokens with their 1-based line and
//! column. Comments and whitespace are dropped here.

use crate::error::{JsonnetError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Dollar,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Shl,
    Shr,
    Amp,
    Caret,
    Pipe,
    AndAnd,
    OrOr,
    Assign,
    Eof,
}

impl Token {
    /// Short human form used in parser diagnostics
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Number(n) => format!("number {}", n),
            Token::Str(_) => "string literal".to_string(),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Dollar => "$",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::EqEq => "==",
            Token::Ne => "!=",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Amp => "&",
            Token::Caret => "^",
            Token::Pipe => "|",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Assign => "=",
            Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::Eof => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Tokenize a whole source text; the last token is always `Token::Eof`
pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        lexer.skip_trivia()?;
        let (line, column) = (lexer.line, lexer.column);
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(Spanned {
            token,
            line,
            column,
        });
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error_at(&self, line: usize, column: usize, message: impl Into<String>) -> JsonnetError {
        JsonnetError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> JsonnetError {
        self.error_at(self.line, self.column, message)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(self.error_at(line, column, "unterminated comment"))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };
        let token = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '.' => Token::Dot,
            ';' => Token::Semicolon,
            ':' => Token::Colon,
            '$' => Token::Dollar,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '~' => Token::Tilde,
            '^' => Token::Caret,
            '!' => self.pick('=', Token::Ne, Token::Bang),
            '=' => self.pick('=', Token::EqEq, Token::Assign),
            '&' => self.pick('&', Token::AndAnd, Token::Amp),
            '<' => match self.peek() {
                Some('=') => self.take(Token::Le),
                Some('<') => self.take(Token::Shl),
                _ => Token::Lt,
            },
            '>' => match self.peek() {
                Some('=') => self.take(Token::Ge),
                Some('>') => self.take(Token::Shr),
                _ => Token::Gt,
            },
            '|' => {
                if self.peek() == Some('|') && self.peek_at(1) == Some('|') {
                    self.bump();
                    self.bump();
                    Token::Str(self.text_block(line, column)?)
                } else {
                    self.pick('|', Token::OrOr, Token::Pipe)
                }
            }
            '"' | '\'' => Token::Str(self.quoted(c, line, column)?),
            '@' => match self.bump() {
                Some(q @ ('"' | '\'')) => Token::Str(self.verbatim(q, line, column)?),
                _ => return Err(self.error_at(line, column, "expected quote after '@'")),
            },
            c if c.is_ascii_digit() => self.number(c, line, column)?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(n) = self.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        ident.push(n);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Token::Ident(ident)
            }
            other => {
                return Err(self.error_at(line, column, format!("unexpected character '{}'", other)))
            }
        };
        Ok(token)
    }

    fn pick(&mut self, next: char, double: Token, single: Token) -> Token {
        if self.peek() == Some(next) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn take(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> Result<Token> {
        let mut text = String::from(first);
        self.digits(&mut text);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                text.push('e');
                self.bump();
                if sign {
                    if let Some(s) = self.bump() {
                        text.push(s);
                    }
                }
                self.digits(&mut text);
            } else {
                return Err(self.error_here("malformed exponent in number"));
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error_at(line, column, format!("invalid number '{}'", text)))
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(line, column, "unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.unicode_escape()?,
                        Some(other) => {
                            return Err(
                                self.error_here(format!("unknown escape sequence '\\{}'", other))
                            )
                        }
                        None => return Err(self.error_at(line, column, "unterminated string")),
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn hex4(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error_here("expected 4 hex digits in \\u escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn unicode_escape(&mut self) -> Result<char> {
        let high = self.hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if self.bump() != Some('\\') || self.bump() != Some('u') {
                return Err(self.error_here("unpaired surrogate in \\u escape"));
            }
            let low = self.hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error_here("invalid low surrogate in \\u escape"));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| self.error_here("invalid code point in \\u escape"))
    }

    fn verbatim(&mut self, quote: char, line: usize, column: usize) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(line, column, "unterminated string")),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Called right after the opening `|||`
    fn text_block(&mut self, line: usize, column: usize) -> Result<String> {
        let chomp = if self.peek() == Some('-') {
            self.bump();
            true
        } else {
            false
        };
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
        if self.bump() != Some('\n') {
            return Err(self.error_at(line, column, "text block requires a new line after |||"));
        }

        let mut out = String::new();
        while self.peek() == Some('\n') {
            out.push('\n');
            self.bump();
        }

        let mut indent = Vec::new();
        while let Some(c @ (' ' | '\t')) = self.peek_at(indent.len()) {
            indent.push(c);
        }
        if indent.is_empty() {
            return Err(self.error_at(
                line,
                column,
                "text block's first line must start with whitespace",
            ));
        }

        loop {
            if self.peek() == Some('\n') {
                out.push('\n');
                self.bump();
                continue;
            }
            let indented = indent
                .iter()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(*c));
            if indented {
                for _ in 0..indent.len() {
                    self.bump();
                }
                loop {
                    match self.bump() {
                        Some('\n') => {
                            out.push('\n');
                            break;
                        }
                        Some(c) => out.push(c),
                        None => {
                            return Err(self.error_at(line, column, "unterminated text block"))
                        }
                    }
                }
                continue;
            }
            while matches!(self.peek(), Some(' ' | '\t')) {
                self.bump();
            }
            if self.peek() == Some('|') && self.peek_at(1) == Some('|') && self.peek_at(2) == Some('|')
            {
                self.bump();
                self.bump();
                self.bump();
                break;
            }
            return Err(self.error_here("text block not terminated with |||"));
        }

        if chomp && out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_eq!(
            kinds("a <= b && c != d || !e"),
            vec![
                Token::Ident("a".into()),
                Token::Le,
                Token::Ident("b".into()),
                Token::AndAnd,
                Token::Ident("c".into()),
                Token::Ne,
                Token::Ident("d".into()),
                Token::OrOr,
                Token::Bang,
                Token::Ident("e".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("1 // line\n# hash\n/* block\n */ + 2");
        assert_eq!(
            tokens,
            vec![Token::Number(1.0), Token::Plus, Token::Number(2.0), Token::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1.5e3")[0], Token::Number(1500.0));
        assert_eq!(kinds("42")[0], Token::Number(42.0));
        assert_eq!(kinds("2E-1")[0], Token::Number(0.2));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\u00e9""#)[0],
            Token::Str("a\n\"b\u{e9}".into())
        );
        assert_eq!(kinds(r"'it\'s'")[0], Token::Str("it's".into()));
        assert_eq!(kinds(r#""\ud83d\ude00""#)[0], Token::Str("\u{1F600}".into()));
    }

    #[test]
    fn test_verbatim_string() {
        assert_eq!(kinds(r#"@"C:\dir ""x""""#)[0], Token::Str(r#"C:\dir "x""#.into()));
    }

    #[test]
    fn test_text_block() {
        let source = "|||\n  hello\n    world\n\n  end\n|||";
        assert_eq!(kinds(source)[0], Token::Str("hello\n  world\n\nend\n".into()));

        let chomped = "|||-\n  one\n|||";
        assert_eq!(kinds(chomped)[0], Token::Str("one".into()));
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unterminated_string_reports_start() {
        let err = tokenize("x + \"abc").unwrap_err();
        assert_eq!(
            err,
            JsonnetError::Syntax {
                line: 1,
                column: 5,
                message: "unterminated string".into()
            }
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("1 ? 2").is_err());
    }
}
