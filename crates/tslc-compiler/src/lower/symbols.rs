//! Symbol table
//!
//! Maps in-scope names of the function being lowered to where they live.

use crate::ir::Register;
use rustc_hash::FxHashMap;

/// Signed storage location: `-(i + 1)` is parameter `i`, a non-negative value
/// is the register holding a stack slot's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageDescriptor(i64);

/// Decoded [`StorageDescriptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Param(u32),
    Slot(Register),
}

impl StorageDescriptor {
    pub fn param(index: u32) -> Self {
        Self(-(index as i64) - 1)
    }

    pub fn slot(reg: Register) -> Self {
        Self(reg.as_u32() as i64)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn storage(&self) -> Storage {
        if self.0 < 0 {
            Storage::Param((-self.0 - 1) as u32)
        } else {
            Storage::Slot(Register::new(self.0 as u32))
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<FxHashMap<String, StorageDescriptor>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Drop every binding; called at the start of each function
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.scopes.push(FxHashMap::default());
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Bind `name` in the innermost scope, shadowing outer bindings
    pub fn bind(&mut self, name: &str, descriptor: StorageDescriptor) {
        if self.scopes.is_empty() {
            self.scopes.push(FxHashMap::default());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), descriptor);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<StorageDescriptor> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}
