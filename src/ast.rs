//! AST produced by the parser and consumed by lowering. Subtrees are
//! exclusively owned by their parent; parentheses never appear here.

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary {
        op: char,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
}

/// A function signature: name plus positional parameter names. An empty
/// name marks the synthetic wrapper around a bare top-level expression.
#[derive(Debug, PartialEq, Clone)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<String>,
}

impl Prototype {
    pub fn anonymous() -> Prototype {
        Prototype {
            name: String::new(),
            params: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// A prototype plus a single-expression body.
#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub proto: Prototype,
    pub body: Expr,
}

/// One top-level form, as dispatched by the driver.
#[derive(Debug, PartialEq, Clone)]
pub enum Item {
    Definition(Function),
    Extern(Prototype),
    /// A bare expression wrapped in an anonymous function for one-shot
    /// evaluation.
    Expression(Function),
}
