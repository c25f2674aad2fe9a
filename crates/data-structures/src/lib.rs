//! Common data structures shared by the SMV compiler crates.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod index;
pub mod map;

mod interned;
pub use interned::Interned;

pub use smallvec;
