//! The capability surface the lowering driver needs from an IR backend,
//! and an in-memory implementation that renders LLVM-flavoured text.
//!
//! The trait is the seam for a real code-generation backend; `TextBackend`
//! keeps the pipeline runnable and inspectable without one.

pub trait Backend {
    /// Handle to an SSA value inside the function under construction.
    type Value: Clone;
    /// Handle to a declared or defined function in module state.
    type Function: Clone;

    fn const_number(&mut self, value: f64) -> Self::Value;

    /// Declares a function with one float parameter per name and a float
    /// return type, registered in module state under `name`.
    fn declare_function(&mut self, name: &str, params: &[String]) -> Self::Function;
    fn get_function(&self, name: &str) -> Option<Self::Function>;
    fn param_count(&self, func: &Self::Function) -> usize;
    fn has_body(&self, func: &Self::Function) -> bool;

    /// Opens the entry block of `func` and returns its parameter handles
    /// paired with their declared names, in order.
    fn begin_body(&mut self, func: &Self::Function) -> Vec<(String, Self::Value)>;

    fn build_add(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn build_sub(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn build_mul(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    /// Unsigned-less-than comparison; the result is a boolean value.
    fn build_cmp_ult(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    /// Widens a boolean comparison result back to a float.
    fn build_bool_to_float(&mut self, value: Self::Value) -> Self::Value;
    fn build_call(&mut self, func: &Self::Function, args: Vec<Self::Value>) -> Self::Value;
    fn build_return(&mut self, value: Self::Value);

    /// Closes the body opened by `begin_body`; false if the function is
    /// not well formed.
    fn verify(&mut self, func: &Self::Function) -> bool;
    /// Removes `func` from module state entirely, body and declaration.
    fn remove_function(&mut self, func: &Self::Function);

    fn print_function(&self, func: &Self::Function) -> String;
    fn print_module(&self) -> String;
}

#[derive(Debug, Clone)]
struct TextFunction {
    name: String,
    params: Vec<String>,
    body: Option<Vec<String>>,
}

/// An accumulating in-memory module. Values are rendered operands,
/// functions are referenced by name.
#[derive(Debug, Clone)]
pub struct TextBackend {
    name: String,
    functions: Vec<TextFunction>,
    current: Option<usize>,
    tmp: usize,
}

impl TextBackend {
    pub fn new(name: &str) -> TextBackend {
        TextBackend {
            name: name.to_string(),
            functions: Vec::new(),
            current: None,
            tmp: 0,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    fn emit(&mut self, text: String) -> String {
        let value = format!("%{}", self.tmp);
        self.tmp += 1;
        self.push_line(format!("  {} = {}", value, text));
        value
    }

    fn push_line(&mut self, line: String) {
        let current = self.current.expect("instruction emitted outside a function body");
        self.functions[current]
            .body
            .as_mut()
            .expect("current function has an open body")
            .push(line);
    }

    fn render(&self, func: &TextFunction) -> String {
        let params = func
            .params
            .iter()
            .map(|p| format!("double %{}", p))
            .collect::<Vec<_>>()
            .join(", ");
        let header = format!("double @{}({})", symbol(&func.name), params);

        match &func.body {
            None => format!("declare {}", header),
            Some(lines) => {
                let mut out = format!("define {} {{\nentry:\n", header);
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('}');
                out
            }
        }
    }
}

/// Symbol rendering for the textual dump; the anonymous top-level wrapper
/// has an empty source name.
fn symbol(name: &str) -> &str {
    if name.is_empty() {
        "__anon_expr"
    } else {
        name
    }
}

fn float(value: f64) -> String {
    if value.is_finite() && value == value.trunc() {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl Backend for TextBackend {
    type Value = String;
    type Function = String;

    fn const_number(&mut self, value: f64) -> String {
        float(value)
    }

    fn declare_function(&mut self, name: &str, params: &[String]) -> String {
        match self.index_of(name) {
            // Re-declaration refreshes the signature; a finished
            // definition keeps its body.
            Some(index) => {
                if self.functions[index].body.is_none() {
                    self.functions[index].params = params.to_vec();
                }
            }
            None => self.functions.push(TextFunction {
                name: name.to_string(),
                params: params.to_vec(),
                body: None,
            }),
        }
        name.to_string()
    }

    fn get_function(&self, name: &str) -> Option<String> {
        self.index_of(name).map(|i| self.functions[i].name.clone())
    }

    fn param_count(&self, func: &String) -> usize {
        self.index_of(func).map_or(0, |i| self.functions[i].params.len())
    }

    fn has_body(&self, func: &String) -> bool {
        self.index_of(func)
            .map_or(false, |i| self.functions[i].body.is_some())
    }

    fn begin_body(&mut self, func: &String) -> Vec<(String, String)> {
        let index = self.index_of(func).expect("body opened on a declared function");
        self.functions[index].body = Some(Vec::new());
        self.current = Some(index);
        self.tmp = 0;
        self.functions[index]
            .params
            .iter()
            .map(|p| (p.clone(), format!("%{}", p)))
            .collect()
    }

    fn build_add(&mut self, lhs: String, rhs: String) -> String {
        self.emit(format!("fadd double {}, {}", lhs, rhs))
    }

    fn build_sub(&mut self, lhs: String, rhs: String) -> String {
        self.emit(format!("fsub double {}, {}", lhs, rhs))
    }

    fn build_mul(&mut self, lhs: String, rhs: String) -> String {
        self.emit(format!("fmul double {}, {}", lhs, rhs))
    }

    fn build_cmp_ult(&mut self, lhs: String, rhs: String) -> String {
        self.emit(format!("fcmp ult double {}, {}", lhs, rhs))
    }

    fn build_bool_to_float(&mut self, value: String) -> String {
        self.emit(format!("uitofp i1 {} to double", value))
    }

    fn build_call(&mut self, func: &String, args: Vec<String>) -> String {
        let args = args
            .into_iter()
            .map(|a| format!("double {}", a))
            .collect::<Vec<_>>()
            .join(", ");
        self.emit(format!("call double @{}({})", symbol(func), args))
    }

    fn build_return(&mut self, value: String) {
        self.push_line(format!("  ret double {}", value));
    }

    fn verify(&mut self, func: &String) -> bool {
        self.current = None;
        self.index_of(func).map_or(false, |i| {
            match &self.functions[i].body {
                Some(lines) => matches!(lines.last(), Some(l) if l.trim_start().starts_with("ret ")),
                None => false,
            }
        })
    }

    fn remove_function(&mut self, func: &String) {
        if let Some(index) = self.index_of(func) {
            self.functions.remove(index);
            self.current = None;
        }
    }

    fn print_function(&self, func: &String) -> String {
        self.index_of(func)
            .map(|i| self.render(&self.functions[i]))
            .unwrap_or_default()
    }

    fn print_module(&self) -> String {
        let mut out = format!("; ModuleID = '{}'\n", self.name);
        for func in &self.functions {
            out.push('\n');
            out.push_str(&self.render(func));
            out.push('\n');
        }
        out
    }
}
