//! IR instructions and operands.

use alloc::{string::String, vec::Vec};
use core::fmt;

/// An IR opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opcode {
    /// `assign, dst, src` or the array form `assign, array, count, value`
    Assign,
    Add,
    Sub,
    Mult,
    Div,
    And,
    Or,
    /// `goto, label`
    Goto,
    Breq,
    Brneq,
    Brlt,
    Brgt,
    Brgeq,
    Brleq,
    /// `return, value`
    Return,
    /// `call, func, args...`
    Call,
    /// `callr, dst, func, args...`
    Callr,
    /// `array_store, value, array, index`
    ArrayStore,
    /// `array_load, dst, array, index`
    ArrayLoad,
    /// A label definition (written `name:` in the text format)
    Label,
}

impl Opcode {
    /// The opcode's name in the text format.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Assign => "assign",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mult => "mult",
            Opcode::Div => "div",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Goto => "goto",
            Opcode::Breq => "breq",
            Opcode::Brneq => "brneq",
            Opcode::Brlt => "brlt",
            Opcode::Brgt => "brgt",
            Opcode::Brgeq => "brgeq",
            Opcode::Brleq => "brleq",
            Opcode::Return => "return",
            Opcode::Call => "call",
            Opcode::Callr => "callr",
            Opcode::ArrayStore => "array_store",
            Opcode::ArrayLoad => "array_load",
            Opcode::Label => "label",
        }
    }

    /// Look up an opcode by its text-format name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "assign" => Opcode::Assign,
            "add" => Opcode::Add,
            "sub" => Opcode::Sub,
            "mult" => Opcode::Mult,
            "div" => Opcode::Div,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "goto" => Opcode::Goto,
            "breq" => Opcode::Breq,
            "brneq" => Opcode::Brneq,
            "brlt" => Opcode::Brlt,
            "brgt" => Opcode::Brgt,
            "brgeq" => Opcode::Brgeq,
            "brleq" => Opcode::Brleq,
            "return" => Opcode::Return,
            "call" => Opcode::Call,
            "callr" => Opcode::Callr,
            "array_store" => Opcode::ArrayStore,
            "array_load" => Opcode::ArrayLoad,
            "label" => Opcode::Label,
            _ => return None,
        })
    }

    /// Whether this is one of the six conditional branches.
    pub fn is_conditional_branch(self) -> bool {
        matches!(
            self,
            Opcode::Breq
                | Opcode::Brneq
                | Opcode::Brlt
                | Opcode::Brgt
                | Opcode::Brgeq
                | Opcode::Brleq
        )
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// A named variable reference.
    Var(String),
    /// An integer literal.
    Int(i32),
    /// A function reference (call targets).
    Func(String),
    /// A label reference (branch targets, label definitions).
    Label(String),
}

impl Operand {
    /// The variable name, if this is a variable reference.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            Operand::Var(name) => Some(name),
            _ => None,
        }
    }

    /// The integer value, if this is a literal.
    pub fn int_value(&self) -> Option<i32> {
        match self {
            Operand::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Func(name) => write!(f, "{}", name),
            Operand::Label(name) => write!(f, "{}", name),
        }
    }
}

/// An IR instruction: an opcode plus a fixed-arity operand list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Inst {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl Inst {
    /// Create an instruction.
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }

    /// The label name, if this is a label definition.
    pub fn label_name(&self) -> Option<&str> {
        if self.opcode != Opcode::Label {
            return None;
        }
        match self.operands.first() {
            Some(Operand::Label(name)) => Some(name),
            _ => None,
        }
    }

    /// The callee name, if this is a call or call-with-result.
    pub fn callee(&self) -> Option<&str> {
        let operand = match self.opcode {
            Opcode::Call => self.operands.first(),
            Opcode::Callr => self.operands.get(1),
            _ => return None,
        };
        match operand {
            Some(Operand::Func(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.label_name() {
            return write!(f, "{}:", name);
        }
        write!(f, "{}", self.opcode.name())?;
        for operand in &self.operands {
            write!(f, ", {}", operand)?;
        }
        Ok(())
    }
}
