//! Session, options, diagnostics and string interning for the SMV compiler.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod diagnostics;

mod config;
pub use config::Opts;

mod session;
pub use session::Session;

mod symbol;
pub use symbol::Symbol;
