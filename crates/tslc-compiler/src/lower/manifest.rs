//! Module manifest
//!
//! Everything a wrapper generator needs to bind to a compiled module: what it
//! imports and which functions and classes it exposes.

use crate::ir::{Declaration, IrType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionEntry {
    pub name: String,
    pub ret: String,
    pub params: Vec<String>,
}

impl FunctionEntry {
    pub fn new(name: &str, ret: &IrType, params: &[IrType]) -> Self {
        Self {
            name: name.to_string(),
            ret: ret.to_string(),
            params: params.iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<&Declaration> for FunctionEntry {
    fn from(decl: &Declaration) -> Self {
        Self::new(&decl.name, &decl.ret, &decl.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub index: u32,
    pub getter: String,
    pub setter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassEntry {
    pub name: String,
    pub allocator: String,
    pub constructor: FunctionEntry,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleManifest {
    pub module: String,
    pub imports: Vec<FunctionEntry>,
    pub functions: Vec<FunctionEntry>,
    pub classes: Vec<ClassEntry>,
}

impl ModuleManifest {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
