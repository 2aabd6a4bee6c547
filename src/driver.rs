use crate::ast::Item;
use crate::codegen::{Codegen, CodegenError};
use crate::ir::Backend;
use crate::lexer::{Lexer, Token};
use crate::parser::{ParseError, Parser};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lower(#[from] CodegenError),
}

/// What one successfully processed top-level form produced, carrying the
/// rendered IR for reporting.
#[derive(Debug, PartialEq, Clone)]
pub enum Form {
    Definition(String),
    Extern(String),
    /// A one-shot expression; its anonymous wrapper is already gone from
    /// module state by the time this is returned.
    Expression(String),
}

/// One compilation session: a parser-to-backend pipeline whose module state
/// (declarations and definitions) persists across forms. Independent
/// sessions never share state.
pub struct Session<B: Backend> {
    codegen: Codegen<B>,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Session<B> {
        Session {
            codegen: Codegen::new(backend),
        }
    }

    pub fn backend(&self) -> &B {
        self.codegen.backend()
    }

    /// Processes every top-level form in `source`, one result per form.
    /// A failed form is reported and never aborts the forms after it.
    pub fn run(&mut self, source: &str) -> Vec<Result<Form, CompileError>> {
        let mut results = Vec::new();

        // Prime the lookahead, reporting each malformed leading token as
        // its own failed form. The lexer consumes the bad characters, so
        // retrying always makes progress.
        let mut lexer = Lexer::new(source);
        let lookahead = loop {
            match lexer.next_token() {
                Ok(token) => break token,
                Err(err) => results.push(Err(ParseError::from(err).into())),
            }
        };
        let mut parser = Parser::resume(lexer, lookahead);

        loop {
            match parser.current() {
                Token::Eof => break,
                Token::Op(';') => {
                    if let Err(err) = parser.bump() {
                        results.push(Err(err.into()));
                    }
                }
                _ => match parser.parse_item() {
                    Ok(item) => results.push(self.lower_item(&item)),
                    Err(err) => {
                        results.push(Err(err.into()));
                        // Discard the offending token so a malformed form
                        // does not stall the stream. Discarding can itself
                        // hit a lex error, which is a diagnostic too.
                        if let Err(err) = parser.bump() {
                            results.push(Err(err.into()));
                        }
                    }
                },
            }
        }

        results
    }

    fn lower_item(&mut self, item: &Item) -> Result<Form, CompileError> {
        match item {
            Item::Definition(func) => {
                let handle = self.codegen.lower_function(func)?;
                Ok(Form::Definition(self.backend().print_function(&handle)))
            }
            Item::Extern(proto) => {
                let handle = self.codegen.lower_prototype(proto)?;
                Ok(Form::Extern(self.backend().print_function(&handle)))
            }
            Item::Expression(func) => {
                let handle = self.codegen.lower_function(func)?;
                let rendered = self.backend().print_function(&handle);
                // Immediate evaluation only: the wrapper never persists.
                self.codegen.backend_mut().remove_function(&handle);
                Ok(Form::Expression(rendered))
            }
        }
    }
}
