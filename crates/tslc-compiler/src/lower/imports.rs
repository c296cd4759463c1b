//! Import tracking
//!
//! Functions reached through an external namespace are declared once per
//! compilation unit, in first-use order.

use crate::ir::{Declaration, IrType};
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct ImportTracker {
    seen: FxHashSet<String>,
    entries: Vec<Declaration>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`; returns its declaration the first time only
    pub fn record(&mut self, name: &str, ret: &IrType, params: &[IrType]) -> Option<Declaration> {
        if !self.seen.insert(name.to_string()) {
            return None;
        }
        let decl = Declaration {
            name: name.to_string(),
            ret: ret.clone(),
            params: params.to_vec(),
        };
        log::debug!("import {}", decl);
        self.entries.push(decl.clone());
        Some(decl)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn entries(&self) -> &[Declaration] {
        &self.entries
    }
}
