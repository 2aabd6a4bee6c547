use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::{Expr, Function, Item, Prototype};
use crate::lexer::{LexError, Lexer, Token};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: Token },
    #[error(transparent)]
    Lex(#[from] LexError),
}

pub type ParseResult<T> = Result<T, ParseError>;

lazy_static! {
    /// Binary operator precedence, fixed at startup. Anything absent from
    /// this table does not parse as an infix operator.
    static ref BINOP_PRECEDENCE: HashMap<char, i32> = {
        let mut table = HashMap::new();
        table.insert('<', 10);
        table.insert('+', 20);
        table.insert('-', 20);
        table.insert('*', 40);
        table
    };
}

/// Recursive-descent parser with operator-precedence climbing for
/// expressions. Holds exactly one token of lookahead.
#[derive(Debug, Clone)]
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    cur: Token,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Parser<'src>> {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token()?;
        Ok(Parser { lexer, cur })
    }

    /// Builds a parser from a lexer and an already-fetched lookahead token.
    /// A driver that recovers from lex errors while priming uses this to
    /// keep the position the lexer has reached.
    pub fn resume(lexer: Lexer<'src>, lookahead: Token) -> Parser<'src> {
        Parser {
            lexer,
            cur: lookahead,
        }
    }

    /// The token of lookahead. After any successful parse function this is
    /// the first token past what was consumed.
    pub fn current(&self) -> &Token {
        &self.cur
    }

    /// Advances the lookahead by one token. On a lex error the lookahead is
    /// left unchanged, but the bad characters have been consumed, so a
    /// subsequent call picks up at the following token.
    pub fn bump(&mut self) -> ParseResult<()> {
        self.cur = self.lexer.next_token()?;
        Ok(())
    }

    fn expect_op(&mut self, op: char, expected: &'static str) -> ParseResult<()> {
        if self.cur != Token::Op(op) {
            return Err(ParseError::UnexpectedToken {
                expected,
                found: self.cur.clone(),
            });
        }
        self.bump()
    }

    /// Parses the next top-level form, dispatching on the lookahead:
    /// `def`, `extern`, or a bare expression.
    pub fn parse_item(&mut self) -> ParseResult<Item> {
        match self.cur {
            Token::Def => Ok(Item::Definition(self.parse_definition()?)),
            Token::Extern => Ok(Item::Extern(self.parse_extern()?)),
            _ => Ok(Item::Expression(self.parse_top_level_expr()?)),
        }
    }

    /// definition ::= 'def' prototype expression
    pub fn parse_definition(&mut self) -> ParseResult<Function> {
        self.bump()?; // eat 'def'
        let proto = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function { proto, body })
    }

    /// extern ::= 'extern' prototype
    pub fn parse_extern(&mut self) -> ParseResult<Prototype> {
        self.bump()?; // eat 'extern'
        self.parse_prototype()
    }

    /// Wraps a bare expression in an anonymous zero-argument function so the
    /// driver can lower and evaluate it like any other definition.
    pub fn parse_top_level_expr(&mut self) -> ParseResult<Function> {
        let body = self.parse_expression()?;
        Ok(Function {
            proto: Prototype::anonymous(),
            body,
        })
    }

    /// prototype ::= ident '(' ident* ')'
    fn parse_prototype(&mut self) -> ParseResult<Prototype> {
        let name = match &self.cur {
            Token::Ident(name) => name.clone(),
            found => {
                return Err(ParseError::UnexpectedToken {
                    expected: "function name in prototype",
                    found: found.clone(),
                })
            }
        };
        self.bump()?;

        self.expect_op('(', "'(' in prototype")?;

        let mut params = Vec::new();
        while let Token::Ident(param) = &self.cur {
            params.push(param.clone());
            self.bump()?;
        }

        self.expect_op(')', "')' in prototype")?;

        Ok(Prototype { name, params })
    }

    /// expression ::= primary binoprhs
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_primary()?;
        self.parse_bin_op_rhs(0, lhs)
    }

    /// primary ::= identifierexpr | numberexpr | parenexpr
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.cur {
            Token::Ident(_) => self.parse_identifier_expr(),
            Token::Number(_) => self.parse_number_expr(),
            Token::Op('(') => self.parse_paren_expr(),
            ref found => Err(ParseError::UnexpectedToken {
                expected: "an expression",
                found: found.clone(),
            }),
        }
    }

    fn parse_number_expr(&mut self) -> ParseResult<Expr> {
        let value = match self.cur {
            Token::Number(value) => value,
            _ => unreachable!("parse_number_expr called off a number token"),
        };
        self.bump()?;
        Ok(Expr::Number(value))
    }

    /// parenexpr ::= '(' expression ')'
    ///
    /// Parentheses group only; the inner expression is returned unwrapped.
    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.bump()?; // eat '('
        let inner = self.parse_expression()?;
        self.expect_op(')', "')'")?;
        Ok(inner)
    }

    /// identifierexpr ::= ident | ident '(' expression (',' expression)* ')'
    fn parse_identifier_expr(&mut self) -> ParseResult<Expr> {
        let name = match &self.cur {
            Token::Ident(name) => name.clone(),
            _ => unreachable!("parse_identifier_expr called off an identifier"),
        };
        self.bump()?;

        if self.cur != Token::Op('(') {
            return Ok(Expr::Variable(name));
        }
        self.bump()?; // eat '('

        let mut args = Vec::new();
        if self.cur != Token::Op(')') {
            loop {
                args.push(self.parse_expression()?);

                if self.cur == Token::Op(')') {
                    break;
                }
                self.expect_op(',', "')' or ',' in argument list")?;
            }
        }
        self.bump()?; // eat ')'

        Ok(Expr::Call { callee: name, args })
    }

    /// binoprhs ::= (op primary)*
    ///
    /// Precedence climbing: keeps absorbing operators at or above
    /// `min_prec`. When the operator after the right-hand side binds
    /// tighter than the one just consumed, the right-hand side absorbs it
    /// first, one precedence level up, which also makes equal-precedence
    /// chains associate left.
    fn parse_bin_op_rhs(&mut self, min_prec: i32, mut lhs: Expr) -> ParseResult<Expr> {
        loop {
            let tok_prec = self.cur_precedence();
            if tok_prec < min_prec {
                return Ok(lhs);
            }

            let op = match self.cur {
                Token::Op(op) => op,
                _ => unreachable!("operator token has a precedence"),
            };
            self.bump()?;

            let mut rhs = self.parse_primary()?;

            if tok_prec < self.cur_precedence() {
                rhs = self.parse_bin_op_rhs(tok_prec + 1, rhs)?;
            }

            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// Precedence of the lookahead token; -1 for anything that is not a
    /// known infix operator, which terminates the climbing loop.
    fn cur_precedence(&self) -> i32 {
        match self.cur {
            Token::Op(op) => BINOP_PRECEDENCE.get(&op).copied().unwrap_or(-1),
            _ => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_expr(input: &str) -> Expr {
        let mut parser = Parser::new(input).unwrap();
        let expr = parser.parse_expression().unwrap();
        assert_eq!(*parser.current(), Token::Eof);
        expr
    }

    fn binary(op: char, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn precedence_shapes_the_tree() {
        // 1+2*3-4 groups as ((1+(2*3))-4)
        let expected = binary(
            '-',
            binary(
                '+',
                Expr::Number(1.0),
                binary('*', Expr::Number(2.0), Expr::Number(3.0)),
            ),
            Expr::Number(4.0),
        );
        assert_eq!(parse_expr("1+2*3-4"), expected);
    }

    #[test]
    fn equal_precedence_associates_left() {
        let expected = binary(
            '-',
            binary('-', Expr::Variable("a".to_string()), Expr::Variable("b".to_string())),
            Expr::Variable("c".to_string()),
        );
        assert_eq!(parse_expr("a-b-c"), expected);
    }

    #[test]
    fn comparison_binds_loosest() {
        let expected = binary(
            '<',
            Expr::Variable("a".to_string()),
            binary('+', Expr::Variable("b".to_string()), Expr::Number(1.0)),
        );
        assert_eq!(parse_expr("a < b+1"), expected);
    }

    #[test]
    fn parens_group_without_appearing() {
        let expected = binary(
            '*',
            binary('+', Expr::Number(1.0), Expr::Number(2.0)),
            Expr::Number(3.0),
        );
        assert_eq!(parse_expr("(1+2)*3"), expected);
    }

    #[test]
    fn call_with_arguments() {
        let expected = Expr::Call {
            callee: "foo".to_string(),
            args: vec![
                Expr::Variable("x".to_string()),
                binary('+', Expr::Number(1.0), Expr::Number(2.0)),
            ],
        };
        assert_eq!(parse_expr("foo(x, 1+2)"), expected);
    }

    #[test]
    fn call_without_arguments_is_not_a_variable() {
        assert_eq!(
            parse_expr("foo()"),
            Expr::Call {
                callee: "foo".to_string(),
                args: vec![],
            }
        );
        assert_eq!(parse_expr("foo"), Expr::Variable("foo".to_string()));
    }

    #[test]
    fn definition_parses() {
        let mut parser = Parser::new("def double(x) x*2").unwrap();
        let func = parser.parse_definition().unwrap();
        assert_eq!(
            func,
            Function {
                proto: Prototype {
                    name: "double".to_string(),
                    params: vec!["x".to_string()],
                },
                body: binary('*', Expr::Variable("x".to_string()), Expr::Number(2.0)),
            }
        );
    }

    #[test]
    fn extern_parses_prototype_only() {
        let mut parser = Parser::new("extern atan2(y x)").unwrap();
        let proto = parser.parse_extern().unwrap();
        assert_eq!(
            proto,
            Prototype {
                name: "atan2".to_string(),
                params: vec!["y".to_string(), "x".to_string()],
            }
        );
        assert_eq!(*parser.current(), Token::Eof);
    }

    #[test]
    fn top_level_expression_gets_anonymous_wrapper() {
        let mut parser = Parser::new("1+2").unwrap();
        let func = parser.parse_top_level_expr().unwrap();
        assert!(func.proto.is_anonymous());
        assert!(func.proto.params.is_empty());
        assert_eq!(func.body, binary('+', Expr::Number(1.0), Expr::Number(2.0)));
    }

    #[test]
    fn unclosed_prototype_errors_at_eof() {
        let mut parser = Parser::new("def foo(").unwrap();
        let err = parser.parse_definition().unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: "')' in prototype",
                found: Token::Eof,
            }
        );
        // The stream is at end of input, not stuck mid-statement.
        assert_eq!(*parser.current(), Token::Eof);
    }

    #[test]
    fn missing_close_paren_errors() {
        let mut parser = Parser::new("(1+2").unwrap();
        assert_eq!(
            parser.parse_expression().unwrap_err(),
            ParseError::UnexpectedToken {
                expected: "')'",
                found: Token::Eof,
            }
        );
    }

    #[test]
    fn bad_argument_separator_errors() {
        let mut parser = Parser::new("foo(1; 2)").unwrap();
        assert_eq!(
            parser.parse_expression().unwrap_err(),
            ParseError::UnexpectedToken {
                expected: "')' or ',' in argument list",
                found: Token::Op(';'),
            }
        );
    }

    #[test]
    fn item_dispatches_on_keyword() {
        let mut parser = Parser::new("extern sin(x)").unwrap();
        assert!(matches!(parser.parse_item().unwrap(), Item::Extern(_)));

        let mut parser = Parser::new("def id(x) x").unwrap();
        assert!(matches!(parser.parse_item().unwrap(), Item::Definition(_)));

        let mut parser = Parser::new("40+2").unwrap();
        assert!(matches!(parser.parse_item().unwrap(), Item::Expression(_)));
    }
}
