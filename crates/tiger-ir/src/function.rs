//! Functions and local variables.

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::inst::Inst;

/// A local variable declaration.
///
/// Array-typed variables carry their static element count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub elems: Option<u32>,
}

impl Variable {
    /// Create a scalar variable.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elems: None,
        }
    }

    /// Create an array variable with the given element count.
    pub fn array(name: impl Into<String>, elems: u32) -> Self {
        Self {
            name: name.into(),
            elems: Some(elems),
        }
    }

    /// Whether this variable is array-typed.
    pub fn is_array(&self) -> bool {
        self.elems.is_some()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elems {
            Some(elems) => write!(f, "{}[{}]", self.name, elems),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A function in the IR.
///
/// A function consists of:
/// - A name
/// - An optional return marker (`returns_value`)
/// - Ordered formal parameters
/// - Ordered local variables (parameters included)
/// - An ordered instruction list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Whether the function declares a return value.
    pub returns_value: bool,
    /// Formal parameter names, in order.
    pub params: Vec<String>,
    /// Local variables, in order. Parameters appear here too.
    pub vars: Vec<Variable>,
    /// Instructions, in order.
    pub insts: Vec<Inst>,
}

impl Function {
    /// Create an empty function.
    pub fn new(name: impl Into<String>, returns_value: bool) -> Self {
        Self {
            name: name.into(),
            returns_value,
            params: Vec::new(),
            vars: Vec::new(),
            insts: Vec::new(),
        }
    }

    /// Whether `name` is a formal parameter of this function.
    pub fn is_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }

    /// Look up a local variable by name.
    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// The number of instructions in this function.
    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#start_function")?;
        let ret = if self.returns_value { "int" } else { "void" };
        write!(f, "{} {}(", ret, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "int {}", param)?;
        }
        writeln!(f, "):")?;

        write!(f, "int-list:")?;
        let locals: Vec<&Variable> = self
            .vars
            .iter()
            .filter(|v| !self.is_param(&v.name))
            .collect();
        for (i, var) in locals.iter().enumerate() {
            if i == 0 {
                write!(f, " {}", var)?;
            } else {
                write!(f, ", {}", var)?;
            }
        }
        writeln!(f)?;

        for inst in &self.insts {
            if inst.label_name().is_some() {
                writeln!(f, "{}", inst)?;
            } else {
                writeln!(f, "    {}", inst)?;
            }
        }
        writeln!(f, "#end_function")?;
        Ok(())
    }
}
