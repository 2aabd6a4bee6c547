use std::collections::HashMap;

use crate::ast::{Expr, Function, Prototype};
use crate::ir::Backend;

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum CodegenError {
    #[error("unknown variable name '{0}'")]
    UnknownVariable(String),
    #[error("invalid binary operator '{0}'")]
    InvalidOperator(char),
    #[error("unknown function referenced '{0}'")]
    UnknownFunction(String),
    #[error("incorrect number of arguments to '{name}': expected {expected}, found {found}")]
    InvalidCall {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),
    #[error("redefinition of function '{0}'")]
    Redefinition(String),
    #[error("redeclaration of '{name}' with {found} parameters, previously {expected}")]
    RedeclarationMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function '{0}' failed verification")]
    InvalidFunction(String),
}

/// Walks the AST and emits calls against the backend. The symbol scope maps
/// parameter names to value handles and is rebuilt on every function entry.
pub struct Codegen<B: Backend> {
    backend: B,
    named_values: HashMap<String, B::Value>,
}

impl<B: Backend> Codegen<B> {
    pub fn new(backend: B) -> Codegen<B> {
        Codegen {
            backend,
            named_values: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn lower_expr(&mut self, expr: &Expr) -> Result<B::Value, CodegenError> {
        match expr {
            Expr::Number(value) => Ok(self.backend.const_number(*value)),
            Expr::Variable(name) => self
                .named_values
                .get(name)
                .cloned()
                .ok_or_else(|| CodegenError::UnknownVariable(name.clone())),
            Expr::Binary { op, lhs, rhs } => {
                // Operands are lowered left to right, each exactly once.
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;

                match op {
                    '+' => Ok(self.backend.build_add(lhs, rhs)),
                    '-' => Ok(self.backend.build_sub(lhs, rhs)),
                    '*' => Ok(self.backend.build_mul(lhs, rhs)),
                    '<' => {
                        // The comparison result is widened so it can feed
                        // back into float arithmetic.
                        let cmp = self.backend.build_cmp_ult(lhs, rhs);
                        Ok(self.backend.build_bool_to_float(cmp))
                    }
                    _ => Err(CodegenError::InvalidOperator(*op)),
                }
            }
            Expr::Call { callee, args } => {
                let func = self
                    .backend
                    .get_function(callee)
                    .ok_or_else(|| CodegenError::UnknownFunction(callee.clone()))?;

                let expected = self.backend.param_count(&func);
                if expected != args.len() {
                    return Err(CodegenError::InvalidCall {
                        name: callee.clone(),
                        expected,
                        found: args.len(),
                    });
                }

                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(arg)?);
                }

                Ok(self.backend.build_call(&func, lowered))
            }
        }
    }

    /// Declares the signature in module state: one float parameter per
    /// name, float return, parameters named in declaration order.
    pub fn lower_prototype(&mut self, proto: &Prototype) -> Result<B::Function, CodegenError> {
        for (i, param) in proto.params.iter().enumerate() {
            if proto.params[..i].contains(param) {
                return Err(CodegenError::DuplicateParameter(param.clone()));
            }
        }

        Ok(self.backend.declare_function(&proto.name, &proto.params))
    }

    /// Lowers a full definition. On any failure past the declaration the
    /// function is removed from module state, so later lookups never see a
    /// half-built definition.
    pub fn lower_function(&mut self, function: &Function) -> Result<B::Function, CodegenError> {
        let proto = &function.proto;

        let func = match self.backend.get_function(&proto.name) {
            Some(existing) => {
                if self.backend.has_body(&existing) {
                    return Err(CodegenError::Redefinition(proto.name.clone()));
                }
                let expected = self.backend.param_count(&existing);
                if expected != proto.params.len() {
                    return Err(CodegenError::RedeclarationMismatch {
                        name: proto.name.clone(),
                        expected,
                        found: proto.params.len(),
                    });
                }
                existing
            }
            None => self.lower_prototype(proto)?,
        };

        // Fresh scope per function; bound from the declared parameter
        // names, which for a prior extern may differ from the definition's.
        self.named_values.clear();
        for (name, value) in self.backend.begin_body(&func) {
            self.named_values.insert(name, value);
        }

        match self.lower_expr(&function.body) {
            Ok(value) => {
                self.backend.build_return(value);
                if self.backend.verify(&func) {
                    Ok(func)
                } else {
                    self.backend.remove_function(&func);
                    Err(CodegenError::InvalidFunction(proto.name.clone()))
                }
            }
            Err(err) => {
                self.backend.remove_function(&func);
                Err(err)
            }
        }
    }
}
