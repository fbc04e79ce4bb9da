// ABOUTME: Recursive-descent parser building statements from the token stream

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::ParseError;
use crate::report::Reporter;
use crate::token::{Literal, Token, TokenType};
use std::rc::Rc;

const MAX_PARAMETERS: usize = 255;

/// Token-cursor parser.
///
/// Each grammar rule is a method; precedence climbs from `expression` down
/// to `primary`. A parse error inside a declaration unwinds (as a
/// `ParseError` result) to `declaration`, which synchronizes to the next
/// statement boundary so one pass can surface several errors.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'a Reporter,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, reporter: &'a Reporter) -> Self {
        Parser {
            tokens,
            current: 0,
            reporter,
        }
    }

    /// Parses a whole program: declarations until EOF. Failed declarations
    /// are dropped after synchronization; the reporter keeps the evidence.
    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(&[TokenType::Class]) {
            self.class_declaration()
        } else if self.match_token(&[TokenType::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_token(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expected class name")?;
        self.consume(TokenType::LeftBrace, "Expected '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RightBrace, "Expected '}' after class body")?;
        Ok(Stmt::Class { name, methods })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>, ParseError> {
        let name = self.consume(TokenType::Identifier, &format!("Expected {} name", kind))?;

        self.consume(
            TokenType::LeftParen,
            &format!("Expected '(' after {} name", kind),
        )?;
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_PARAMETERS {
                    // Report but keep parsing; the stream is still coherent
                    let token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 parameters");
                }
                params.push(self.consume(TokenType::Identifier, "Expected parameter name")?);
                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expected '{{' before {} body", kind),
        )?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expected variable name")?;

        let initializer = if self.match_token(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expected ';' after variable declaration",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&[TokenType::For]) {
            return self.for_statement();
        }
        if self.match_token(&[TokenType::If]) {
            return self.if_statement();
        }
        if self.match_token(&[TokenType::Print]) {
            return self.print_statement();
        }
        if self.match_token(&[TokenType::Return]) {
            return self.return_statement();
        }
        if self.match_token(&[TokenType::While]) {
            return self.while_statement();
        }
        if self.match_token(&[TokenType::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    /// `for` is sugar: the clauses wrap the body in a while inside a block.
    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'for'")?;

        let initializer = if self.match_token(&[TokenType::Semicolon]) {
            None
        } else if self.match_token(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expected ';' after loop condition")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::Bool(true)));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenType::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    /// Parses the LHS as an ordinary expression, then rewrites it into an
    /// assignment target if an `=` follows: Variable becomes Assign, Get
    /// becomes Set. Anything else is reported without unwinding.
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.or()?;

        if self.match_token(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: ExprId::next(),
                    name,
                    value,
                }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                _ => {
                    self.error(&equals, "Invalid assignment target");
                    Ok(*value)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;

        while self.match_token(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;

        while self.match_token(&[TokenType::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;

        while self.match_token(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;

        while self.match_token(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;

        while self.match_token(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;

        while self.match_token(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&[TokenType::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&[TokenType::Dot]) {
                let name =
                    self.consume(TokenType::Identifier, "Expected property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_PARAMETERS {
                    let token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 arguments");
                }
                arguments.push(self.expression()?);
                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenType::False]) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if self.match_token(&[TokenType::True]) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if self.match_token(&[TokenType::Nil]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.match_token(&[TokenType::Number, TokenType::String]) {
            let literal = match self.previous().literal.clone() {
                Some(Literal::Number(n)) => LiteralValue::Number(n),
                Some(Literal::String(s)) => LiteralValue::String(s),
                None => LiteralValue::Nil,
            };
            return Ok(Expr::Literal(literal));
        }

        if self.match_token(&[TokenType::This]) {
            return Ok(Expr::This {
                id: ExprId::next(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_token(&[TokenType::Identifier]) {
            return Ok(Expr::Variable {
                id: ExprId::next(),
                name: self.previous().clone(),
            });
        }

        if self.match_token(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expected ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expected expression"))
    }

    // ===== Token-cursor helpers =====

    fn match_token(&mut self, token_types: &[TokenType]) -> bool {
        if token_types.iter().any(|&t| self.check(t)) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check(token_type) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        self.reporter.static_error(token.line, message);
        ParseError
    }

    /// Skips tokens until a likely statement boundary: just past a `;`, or
    /// in front of a keyword that starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Vec<Stmt> {
        let reporter = Reporter::new();
        let tokens = Lexer::new(source, &reporter).scan_tokens();
        let statements = Parser::new(tokens, &reporter).parse();
        assert!(
            !reporter.had_error(),
            "unexpected parse error in {:?}",
            source
        );
        statements
    }

    fn parse_with_errors(source: &str) -> (Vec<Stmt>, bool) {
        let reporter = Reporter::new();
        let tokens = Lexer::new(source, &reporter).scan_tokens();
        let statements = Parser::new(tokens, &reporter).parse();
        (statements, reporter.had_error())
    }

    #[test]
    fn test_precedence_shapes_the_tree() {
        let statements = parse("1 + 2 * 3;");
        let Stmt::Expression(Expr::Binary {
            operator, right, ..
        }) = &statements[0]
        else {
            panic!("expected binary expression statement");
        };
        assert_eq!(operator.lexeme, "+");
        // The multiplication binds tighter, so it hangs off the right side
        assert!(matches!(**right, Expr::Binary { .. }));
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        let statements = parse("(1 + 2) * 3;");
        let Stmt::Expression(Expr::Binary { left, operator, .. }) = &statements[0] else {
            panic!("expected binary expression statement");
        };
        assert_eq!(operator.lexeme, "*");
        assert!(matches!(**left, Expr::Grouping(_)));
    }

    #[test]
    fn test_logical_operators_parse_as_logical() {
        let statements = parse("a or b and c;");
        let Stmt::Expression(Expr::Logical { operator, .. }) = &statements[0] else {
            panic!("expected logical expression");
        };
        assert_eq!(operator.token_type, TokenType::Or);
    }

    #[test]
    fn test_assignment_rewrites_variable() {
        let statements = parse("x = 1;");
        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr::Assign { .. })
        ));
    }

    #[test]
    fn test_assignment_rewrites_get_into_set() {
        let statements = parse("point.x = 1;");
        assert!(matches!(&statements[0], Stmt::Expression(Expr::Set { .. })));
    }

    #[test]
    fn test_invalid_assignment_target_reports_without_panic() {
        let (statements, had_error) = parse_with_errors("1 = 2; print 3;");
        assert!(had_error);
        // Parsing continued past the bad assignment
        assert!(statements.iter().any(|s| matches!(s, Stmt::Print(_))));
    }

    #[test]
    fn test_for_desugars_to_while_in_block() {
        let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected enclosing block from desugaring");
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));
        assert!(matches!(outer[1], Stmt::While { .. }));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let statements = parse("for (;;) print 1;");
        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("expected bare while from desugaring");
        };
        assert!(matches!(
            condition,
            Expr::Literal(LiteralValue::Bool(true))
        ));
    }

    #[test]
    fn test_function_declaration() {
        let statements = parse("fun add(a, b) { return a + b; }");
        let Stmt::Function(declaration) = &statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(declaration.name.lexeme, "add");
        assert_eq!(declaration.params.len(), 2);
        assert!(matches!(declaration.body[0], Stmt::Return { .. }));
    }

    #[test]
    fn test_class_declaration_collects_methods() {
        let statements = parse("class Point { init(x) { this.x = x; } moved() { return this.x; } }");
        let Stmt::Class { name, methods } = &statements[0] else {
            panic!("expected class declaration");
        };
        assert_eq!(name.lexeme, "Point");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
    }

    #[test]
    fn test_call_chain_with_property_access() {
        let statements = parse("object.method(1)(2);");
        let Stmt::Expression(Expr::Call { callee, .. }) = &statements[0] else {
            panic!("expected call expression");
        };
        assert!(matches!(**callee, Expr::Call { .. }));
    }

    #[test]
    fn test_synchronize_recovers_and_finds_later_statements() {
        let (statements, had_error) = parse_with_errors("var = 1; var x = 2;");
        assert!(had_error);
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Var { .. }));
    }

    #[test]
    fn test_missing_semicolon_reports() {
        let (_, had_error) = parse_with_errors("print 1");
        assert!(had_error);
    }
}
