//! # gedcom
//!
//! gedcom is a library for parsing GEDCOM genealogy files into a
//! cross-referenced graph of individuals and families.
//!
//! The pipeline runs in four stages: the [`Lexer`](parse::Lexer) splits text
//! into `level tag value` lines, the [`Parser`](parse::Parser) assembles
//! records, the resolver links parents, children and spouses, and
//! [`Gedcom::validate`] checks the result before it is handed out.
#![doc(html_root_url = "https://docs.rs/gedcom/0.1.0")]

mod checker;
mod model;
pub mod parse;
mod resolver;
mod tree;
pub mod utils;

pub use model::*;
pub use tree::{TreeNode, MAX_TREE_DEPTH, UNKNOWN_NAME};
