//! Hash-consed expression nodes and opcodes for the SMV compiler.
//!
//! The front-end produces tagged tree nodes with up to two children and a
//! line number. All nodes are interned ("hash-consed") in a caller-owned
//! [`Arena`], so structurally equal nodes are pointer-equal and can key
//! hash maps directly.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod op;
pub use op::{Op, OpRange};

mod node;
pub use node::{Arena, Ast, ConsIter, Node, NodeData, Payload};

mod node_list;
pub use node_list::NodeList;

mod word;
pub use word::{MAX_WORD_WIDTH, WordValue};
