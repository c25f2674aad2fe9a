//! Symbol table and type checking for the SMV compiler.
//!
//! The crate is organised leaves-first:
//!
//! - [`ty`]: the interned type algebra (implicit conversions, least upper
//!   bounds, set lifting);
//! - [`symb`]: the symbol cache, layers and the [`SymbTable`] facade;
//! - [`typeck`]: the memoising recursive type checker and its per-opcode-range
//!   expression checkers;
//! - [`resolve`]/[`flatten`]: the name-resolution and flattening services the
//!   checker consumes;
//! - [`ord_groups`]: boolean-variable ordering groups for the encoders.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod ty;
pub use ty::{EnumCategory, Ty, TyKind, TypeCtx};

pub mod symb;
pub use symb::{
    InsertPolicy, LayerMut, LayerRef, NFunction, SymbCache, SymbLayer, SymbTable, SymbolKind,
    TriggerEvent,
};

pub mod resolve;
pub use resolve::Resolution;

pub mod flatten;
pub use flatten::{ContextFlattener, Flatten};

pub mod typeck;
pub use typeck::{PropertyKind, TypeChecker, TypeViolation};

pub mod ord_groups;
pub use ord_groups::OrdGroups;
