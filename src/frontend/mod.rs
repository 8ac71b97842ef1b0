//! # Frontend for nvdisasm Control Flow Graphs
//!
//! `nvdisasm -cfg` prints the control flow graph of a kernel as a Graphviz
//! digraph whose nodes are *abstract* basic blocks: a record label with one
//! field per exit of the block. The frontend works in two steps:
//!
//! - [dot]: reads the Graphviz text into nodes, record ports and edges.
//! - [abb]: splits every abstract block into basic blocks (and controlling
//!   blocks), parses the instructions and connects the blocks in a
//!   [CfgContext](crate::graph::CfgContext).

pub mod abb;
pub mod dot;

use thiserror::Error;

use crate::inst::ParseInstError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character `{ch}`")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    #[error("line {line}: expected {expected}, found `{found}`")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("node `{0}` is declared twice")]
    DuplicateNode(String),

    #[error("edge `{from}` -> `{to}` refers to an unknown node")]
    UnknownNode { from: String, to: String },

    #[error("edge from `{node}` leaves through unknown port `{port}`")]
    UnknownPort { node: String, port: String },

    #[error("node `{node}`: {source}")]
    Inst {
        node: String,
        #[source]
        source: ParseInstError,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;
