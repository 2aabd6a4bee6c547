//! Front end for a small expression-oriented language: a streaming lexer,
//! a recursive-descent parser with operator-precedence climbing, and a
//! lowering driver that emits calls against an abstract IR backend.
//!
//! The pipeline is pull-based and single-pass: the parser asks the lexer
//! for tokens on demand, and the driver lowers each top-level form as it
//! is parsed. `ir::Backend` is the seam for a real code generator;
//! `ir::TextBackend` renders the module as text instead.

pub mod ast;
pub mod codegen;
pub mod driver;
pub mod ir;
pub mod lexer;
pub mod parser;

pub use driver::{CompileError, Form, Session};
pub use ir::{Backend, TextBackend};

/// Compile a source string in a fresh session, returning one result per
/// top-level form and the accumulated module text.
pub fn compile(source: &str) -> (Vec<Result<Form, CompileError>>, String) {
    let mut session = Session::new(TextBackend::new("kscope"));
    let results = session.run(source);
    let module = session.backend().print_module();
    (results, module)
}
