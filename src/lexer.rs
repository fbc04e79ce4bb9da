// ABOUTME: Lexer turning Lox source text into a token stream

use crate::report::Reporter;
use crate::token::{keyword, Literal, Token, TokenType};

/// Char-cursor lexer.
///
/// Scans the whole source in one pass and always produces a usable stream:
/// unrecognized characters and unterminated strings are reported through the
/// `Reporter` and scanning continues, so the parser still gets a stream
/// ending in EOF to recover against.
pub struct Lexer<'a> {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    reporter: &'a Reporter,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, reporter: &'a Reporter) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            reporter,
        }
    }

    /// Consumes the lexer and returns the token stream, EOF-terminated.
    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenType::Eof, "", None, self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_char('/') {
                    // Line comment, discard to end of line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            _ => self
                .reporter
                .static_error(self.line, &format!("Unexpected character: {}", c)),
        }
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.reporter.static_error(self.line, "Unterminated string");
            return;
        }

        // Closing quote
        self.advance();

        // Trim the surrounding quotes for the literal value
        let value: String = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.add_token_literal(TokenType::String, Some(Literal::String(value)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Fractional part requires at least one digit after the dot
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => self.add_token_literal(TokenType::Number, Some(Literal::Number(value))),
            Err(_) => self
                .reporter
                .static_error(self.line, &format!("Invalid number literal: {}", text)),
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_literal(token_type, None);
    }

    fn add_token_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(token_type, lexeme, literal, self.line));
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        let reporter = Reporter::new();
        let tokens = Lexer::new(source, &reporter).scan_tokens();
        assert!(!reporter.had_error(), "unexpected lex error in {:?}", source);
        tokens
    }

    fn types(tokens: &[Token]) -> Vec<TokenType> {
        tokens.iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_single_char_tokens() {
        let tokens = scan("(){},.-+;*");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::Comma,
                TokenType::Dot,
                TokenType::Minus,
                TokenType::Plus,
                TokenType::Semicolon,
                TokenType::Star,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_one_or_two_char_operators() {
        let tokens = scan("! != = == < <= > >=");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_discarded_to_end_of_line() {
        let tokens = scan("1 // the rest is ignored != ==\n2");
        assert_eq!(
            types(&tokens),
            vec![TokenType::Number, TokenType::Number, TokenType::Eof]
        );
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_slash_token_still_lexes() {
        let tokens = scan("8 / 4");
        assert_eq!(tokens[1].token_type, TokenType::Slash);
    }

    #[test]
    fn test_number_literals() {
        let tokens = scan("12 3.5");
        assert_eq!(tokens[0].literal, Some(Literal::Number(12.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.5)));
    }

    #[test]
    fn test_dot_after_number_is_its_own_token() {
        // "12." is a number followed by a dot, not a fractional literal
        let tokens = scan("12.");
        assert_eq!(
            types(&tokens),
            vec![TokenType::Number, TokenType::Dot, TokenType::Eof]
        );
    }

    #[test]
    fn test_string_literal() {
        let tokens = scan("\"hello\"");
        assert_eq!(tokens[0].token_type, TokenType::String);
        assert_eq!(tokens[0].literal, Some(Literal::String("hello".to_string())));
        assert_eq!(tokens[0].lexeme, "\"hello\"");
    }

    #[test]
    fn test_multiline_string_bumps_line_counter() {
        let tokens = scan("\"one\ntwo\" x");
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("one\ntwo".to_string()))
        );
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_string_reports_and_continues() {
        let reporter = Reporter::new();
        let tokens = Lexer::new("\"open", &reporter).scan_tokens();
        assert!(reporter.had_error());
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::Eof));
    }

    #[test]
    fn test_keywords_upgrade_identifiers() {
        let tokens = scan("var language = nil;");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Nil,
                TokenType::Semicolon,
                TokenType::Eof,
            ]
        );
        assert_eq!(tokens[1].lexeme, "language");
    }

    #[test]
    fn test_underscore_identifiers() {
        let tokens = scan("_private_1");
        assert_eq!(tokens[0].token_type, TokenType::Identifier);
        assert_eq!(tokens[0].lexeme, "_private_1");
    }

    #[test]
    fn test_unexpected_character_reports_and_continues() {
        let reporter = Reporter::new();
        let tokens = Lexer::new("1 @ 2", &reporter).scan_tokens();
        assert!(reporter.had_error());
        assert_eq!(
            types(&tokens),
            vec![TokenType::Number, TokenType::Number, TokenType::Eof]
        );
    }

    #[test]
    fn test_eof_on_last_line() {
        let tokens = scan("1;\n2;\n");
        assert_eq!(tokens.last().map(|t| t.line), Some(3));
    }
}
