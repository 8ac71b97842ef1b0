//! # Instructions
//!
//! The disassembly text is parsed once, at the boundary, into [Inst]s. The
//! interval passes only look at the register operands and the branch labels
//! of an instruction, and never go back to the raw text.
//!
//! A statement looks like this (the address comment and the guard are
//! optional):
//!
//! ```text
//! /*0048*/  @!P0 BRA `(BB0_3)
//! ```

use std::fmt;

use thiserror::Error;

use crate::regs::{ParseRegError, Reg};

/// The statement terminator of the disassembly.
pub const TERMINATOR: char = ';';

/// Opcodes whose bare identifier operands name a block.
const BRANCH_OPCODES: &[&str] = &[
    "BRA", "BRX", "JMP", "JMX", "CAL", "CALL", "JCAL", "SSY", "PBK", "PCNT", "BSSY",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// An operand naming one or more registers, e.g. `R2.reuse`, `-R3` or
    /// `[R4+0x10]`. The text is kept verbatim.
    Regs { text: String, regs: Vec<Reg> },
    /// A branch target, either quoted as `` `(name) `` or written bare.
    Label { name: String, bare: bool },
    /// Immediates, constant bank references, predicates, ...
    Other(String),
}

impl Operand {
    pub fn reg(reg: Reg) -> Self {
        Operand::Regs {
            text: reg.to_string(),
            regs: vec![reg],
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Operand::Label {
            name: name.into(),
            bare: false,
        }
    }

    fn classify(text: &str, is_branch: bool) -> Result<Self, ParseRegError> {
        if let Some(name) = text
            .strip_prefix("`(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Ok(Operand::Label {
                name: name.to_string(),
                bare: false,
            });
        }

        let regs = Reg::scan(text).collect::<Result<Vec<_>, _>>()?;
        if !regs.is_empty() {
            return Ok(Operand::Regs {
                text: text.to_string(),
                regs,
            });
        }

        if is_branch && is_identifier(text) {
            return Ok(Operand::Label {
                name: text.to_string(),
                bare: true,
            });
        }

        Ok(Operand::Other(text.to_string()))
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Regs { text, .. } | Operand::Other(text) => write!(f, "{}", text),
            Operand::Label { name, bare: true } => write!(f, "{}", name),
            Operand::Label { name, bare: false } => write!(f, "`({})", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseInstError {
    #[error("statement `{0}` has no opcode")]
    MissingOpcode(String),

    #[error("unterminated address comment in `{0}`")]
    UnterminatedComment(String),

    #[error(transparent)]
    InvalidReg(#[from] ParseRegError),
}

/// A single machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst {
    /// The address comment, e.g. `0048` for `/*0048*/`.
    addr: Option<String>,
    /// The guarding predicate without `@`, e.g. `!P0`.
    guard: Option<String>,
    opcode: String,
    operands: Vec<Operand>,
}

impl Inst {
    pub fn new(opcode: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            addr: None,
            guard: None,
            opcode: opcode.into(),
            operands,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Parse one statement, without its terminator.
    pub fn parse(stmt: &str) -> Result<Self, ParseInstError> {
        let mut rest = stmt.trim();

        let mut addr = None;
        if let Some(comment) = rest.strip_prefix("/*") {
            let end = comment
                .find("*/")
                .ok_or_else(|| ParseInstError::UnterminatedComment(stmt.to_string()))?;
            addr = Some(comment[..end].trim().to_string());
            rest = comment[end + 2..].trim_start();
        }

        let mut guard = None;
        if let Some(guarded) = rest.strip_prefix('@') {
            let (pred, tail) = split_word(guarded);
            guard = Some(pred.to_string());
            rest = tail;
        }

        let (opcode, tail) = split_word(rest);
        if opcode.is_empty() {
            return Err(ParseInstError::MissingOpcode(stmt.to_string()));
        }

        let is_branch = BRANCH_OPCODES.contains(&opcode.split('.').next().unwrap_or(opcode));
        let operands = tail
            .split(',')
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| Operand::classify(text, is_branch))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            addr,
            guard,
            opcode: opcode.to_string(),
            operands,
        })
    }

    pub fn opcode(&self) -> &str { &self.opcode }

    pub fn guard(&self) -> Option<&str> { self.guard.as_deref() }

    pub fn operands(&self) -> &[Operand] { &self.operands }

    /// Check if the instruction only executes under a predicate register.
    pub fn is_predicated(&self) -> bool {
        self.guard.as_deref().is_some_and(|g| {
            let pred = g.trim_start_matches('!');
            pred.starts_with('P') && pred != "PT"
        })
    }

    /// All registers mentioned by the operands, in operand order.
    pub fn regs(&self) -> impl Iterator<Item = Reg> + '_ {
        self.operands
            .iter()
            .flat_map(|op| -> &[Reg] {
                match op {
                    Operand::Regs { regs, .. } => regs,
                    Operand::Label { .. } | Operand::Other(_) => &[],
                }
            })
            .copied()
    }

    /// Redirect every branch target named `old` to `new`.
    ///
    /// Returns true if any operand was rewritten.
    pub fn rename_label(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        for op in self.operands.iter_mut() {
            if let Operand::Label { name, .. } = op {
                if name == old {
                    *name = new.to_string();
                    renamed = true;
                }
            }
        }
        renamed
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], s[end..].trim_start()),
        None => (s, ""),
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(addr) = &self.addr {
            write!(f, "/*{}*/ ", addr)?;
        }
        if let Some(guard) = &self.guard {
            write!(f, "@{} ", guard)?;
        }
        write!(f, "{}", self.opcode)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {}", op)?;
            } else {
                write!(f, ", {}", op)?;
            }
        }
        Ok(())
    }
}

/// Parse raw disassembly text into instructions.
///
/// The text is split on [TERMINATOR]; anything after the last terminator is
/// ignored. Within a statement, Graphviz line breaks (`\l`) and real line
/// breaks separate lines, and label (`BB0_1:`) or directive (`.text`) lines
/// are dropped.
pub fn parse_statements(text: &str) -> Result<Vec<Inst>, ParseInstError> {
    let mut insts = Vec::new();
    let mut pieces = text.split(TERMINATOR).collect::<Vec<_>>();
    // the tail after the last terminator is not a statement
    pieces.pop();

    for piece in pieces {
        let stmt = piece
            .split("\\l")
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.ends_with(':') && !line.starts_with('.'))
            .collect::<Vec<_>>()
            .join(" ");
        if stmt.is_empty() {
            continue;
        }
        insts.push(Inst::parse(&stmt)?);
    }

    Ok(insts)
}

/// Render instructions as terminated statements, one per line.
pub fn render(insts: &[Inst]) -> String {
    insts
        .iter()
        .map(|inst| format!("{} {}", inst, TERMINATOR))
        .collect::<Vec<_>>()
        .join("\n")
}
