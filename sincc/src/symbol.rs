//! Symbols and the scoped symbol table.

use crate::ast::Allocation;
use crate::error::CompilerError;
use crate::types::DataType;
use indexmap::IndexMap;

pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub data_type: DataType,
    pub scope_name: String,
    pub scope_level: usize,
    pub defined: bool,
    pub allocated: bool,
    pub freed: bool,
    /// Offset in words from the enclosing frame base, for locals.
    pub stack_offset: usize,
    pub struct_name: Option<String>,
    /// Ordered formal parameters; only populated for functions.
    pub formal_parameters: Vec<Allocation>,
}

impl Symbol {
    pub fn variable(name: &str, data_type: DataType, scope_name: &str, scope_level: usize) -> Self {
        Symbol {
            kind: SymbolKind::Variable,
            name: name.to_string(),
            data_type,
            scope_name: scope_name.to_string(),
            scope_level,
            defined: false,
            allocated: false,
            freed: false,
            stack_offset: 0,
            struct_name: None,
            formal_parameters: Vec::new(),
        }
    }

    pub fn function(
        name: &str,
        return_type: DataType,
        formal_parameters: Vec<Allocation>,
    ) -> Self {
        Symbol {
            kind: SymbolKind::FunctionDefinition,
            defined: true,
            formal_parameters,
            ..Symbol::variable(name, return_type, GLOBAL_SCOPE, 0)
        }
    }
}

type Key = (String, String, usize);

/// An ordered symbol table. No two symbols may share
/// `(name, scope_name, scope_level)`; lookup resolves the deepest scope
/// first and falls back to the level-0 global scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<Key, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn insert(&mut self, symbol: Symbol, line: usize) -> Result<(), CompilerError> {
        let key = (
            symbol.name.clone(),
            symbol.scope_name.clone(),
            symbol.scope_level,
        );
        if self.symbols.contains_key(&key) {
            return Err(CompilerError::DuplicateDefinition {
                name: symbol.name,
                line,
            });
        }
        self.symbols.insert(key, symbol);
        Ok(())
    }

    /// Finds the symbol `name` visible from `scope_name`: candidates live
    /// either in that scope (any level) or in the level-0 global scope,
    /// and the highest scope level wins.
    pub fn lookup(&self, name: &str, scope_name: &str) -> Option<&Symbol> {
        self.symbols
            .values()
            .filter(|s| s.name == name)
            .filter(|s| {
                s.scope_name == scope_name || (s.scope_name == GLOBAL_SCOPE && s.scope_level == 0)
            })
            .max_by_key(|s| s.scope_level)
    }

    pub fn lookup_mut(&mut self, name: &str, scope_name: &str) -> Option<&mut Symbol> {
        self.symbols
            .values_mut()
            .filter(|s| s.name == name)
            .filter(|s| {
                s.scope_name == scope_name || (s.scope_name == GLOBAL_SCOPE && s.scope_level == 0)
            })
            .max_by_key(|s| s.scope_level)
    }

    /// Drops every symbol belonging to the frame `(scope_name, level)`;
    /// called when a block ends.
    pub fn remove_scope(&mut self, scope_name: &str, level: usize) {
        self.symbols
            .retain(|_, s| !(s.scope_name == scope_name && s.scope_level == level));
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
