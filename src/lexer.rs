use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Ident(String),
    Number(f64),
    /// Any other single character, operators and punctuation alike.
    Op(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Number(value) => write!(f, "number {}", value),
            Token::Op(op) => write!(f, "'{}'", op),
        }
    }
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum LexError {
    #[error("malformed number literal '{0}'")]
    MalformedNumber(String),
}

/// Streaming lexer over a source string: one character of lookahead,
/// one token produced per call.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    chars: Peekable<Chars<'src>>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Lexer<'src> {
        Lexer {
            chars: source.chars().peekable(),
        }
    }

    /// Returns the next token, advancing past it. Once the input is
    /// exhausted every further call returns `Token::Eof`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
                self.chars.next();
            }

            let first = match self.chars.peek() {
                Some(&c) => c,
                None => return Ok(Token::Eof),
            };

            if first.is_alphabetic() {
                return Ok(self.lex_identifier());
            }

            if first.is_ascii_digit() || first == '.' {
                return self.lex_number();
            }

            if first == '#' {
                // Line comment: discard to end of line, then try again.
                while !matches!(self.chars.peek(), None | Some(&'\n') | Some(&'\r')) {
                    self.chars.next();
                }
                continue;
            }

            self.chars.next();
            return Ok(Token::Op(first));
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_alphanumeric()) {
            ident.push(self.chars.next().unwrap());
        }

        match ident.as_str() {
            "def" => Token::Def,
            "extern" => Token::Extern,
            _ => Token::Ident(ident),
        }
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        while matches!(self.chars.peek(), Some(&c) if c.is_ascii_digit() || c == '.') {
            text.push(self.chars.next().unwrap());
        }

        text.parse()
            .map(Token::Number)
            .map_err(|_| LexError::MalformedNumber(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_all(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn lex_works() {
        let input = "def add(x) x+1.0;";
        let tokenized = [
            Token::Def,
            Token::Ident("add".to_string()),
            Token::Op('('),
            Token::Ident("x".to_string()),
            Token::Op(')'),
            Token::Ident("x".to_string()),
            Token::Op('+'),
            Token::Number(1.0),
            Token::Op(';'),
            Token::Eof,
        ];
        assert_eq!(lex_all(input), tokenized);
    }

    #[test]
    fn keywords_are_reserved() {
        assert_eq!(
            lex_all("extern definition"),
            [
                Token::Extern,
                Token::Ident("definition".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments_never_reach_the_stream() {
        assert_eq!(lex_all("# comment\n1+1"), lex_all("1+1"));
    }

    #[test]
    fn comment_at_end_of_input() {
        assert_eq!(lex_all("1 # trailing"), [Token::Number(1.0), Token::Eof]);
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().unwrap(), Token::Ident("x".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn leading_dot_number() {
        assert_eq!(lex_all(".5"), [Token::Number(0.5), Token::Eof]);
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut lexer = Lexer::new("1.2.3");
        assert_eq!(
            lexer.next_token(),
            Err(LexError::MalformedNumber("1.2.3".to_string()))
        );
        // The malformed text was consumed; the stream is usable afterwards.
        assert_eq!(lexer.next_token(), Ok(Token::Eof));
    }
}
