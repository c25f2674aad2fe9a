//! Parsers for the auxiliary input files of the SMV compiler: variable
//! ordering files and identifier lists.
//!
//! Both accept the same surface, newline- or whitespace-separated
//! qualified names with dotted fields, array indices and bit selectors,
//! and yield a [`NodeList`](smv_ast::NodeList) of names built through the
//! shared [`Ast`](smv_ast::Ast).

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod lexer;

mod ord;
pub use ord::ParserOrd;

mod idlist;
pub use idlist::ParserIdList;
