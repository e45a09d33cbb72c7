//! Symbol table for the assembler.
//!
//! Names are case-insensitive. Three kinds of alias can be declared:
//! - subroutines (`name:`) resolve to the index of the next instruction
//! - variables (`.name 42`) resolve to a byte address in the data segment,
//!   assigned only once the program length is known
//! - definitions (`#name 42`) are substituted literally
//!
//! `r0`-`r7` and `p0`-`p7` are reserved and pre-seeded.

use crate::asm::token::{char_literal, is_numeric};
use crate::io::PORT_COUNT;
use crate::cpu::registers::REGISTER_COUNT;
use slog::{debug, o, Discard, Logger};
use std::collections::HashMap;
use thiserror::Error;

/// Address of a variable in the data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarAddress {
    Unresolved,
    Address(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// A reserved register or port name.
    Builtin(u16),
    /// Instruction index of a label.
    Subroutine(u16),
    /// Initial byte value and data-segment address.
    Variable { value: u8, address: VarAddress },
    /// Value substituted as-is. Range-checked where it is used.
    Definition(i64),
}

/// The assembler's alias table.
pub struct Resolver {
    symbols: HashMap<String, Symbol>,
    /// Variable names in declaration order.
    variables: Vec<String>,
    log: Logger,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_logger(None)
    }

    pub fn with_logger<L: Into<Option<Logger>>>(logger: L) -> Self {
        let log = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()));

        let mut symbols = HashMap::new();
        for i in 0..REGISTER_COUNT {
            symbols.insert(format!("r{}", i), Symbol::Builtin(i as u16));
        }
        for i in 0..PORT_COUNT {
            symbols.insert(format!("p{}", i), Symbol::Builtin(i as u16));
        }

        Self {
            symbols,
            variables: Vec::new(),
            log,
        }
    }

    /// Check that `name` may be declared, returning its table key.
    fn check_name(&self, name: &str) -> Result<String, ResolveError> {
        if name.is_empty() {
            return Err(ResolveError::EmptyName);
        }
        if is_numeric(name) {
            return Err(ResolveError::NumericName(name.to_string()));
        }
        if char_literal(name).is_some() {
            return Err(ResolveError::Reserved(name.to_string()));
        }

        let key = name.to_ascii_lowercase();
        match self.symbols.get(&key) {
            Some(Symbol::Builtin(_)) => Err(ResolveError::Reserved(name.to_string())),
            Some(_) => Err(ResolveError::Duplicate(name.to_string())),
            None => Ok(key),
        }
    }

    /// Declare a label pointing at instruction `index`.
    pub fn define_subroutine(&mut self, name: &str, index: u16) -> Result<(), ResolveError> {
        let key = self.check_name(name)?;
        debug!(self.log, "subroutine"; "name" => &key, "index" => index);
        self.symbols.insert(key, Symbol::Subroutine(index));
        Ok(())
    }

    /// Declare a variable holding the byte `value`. Its address is assigned
    /// by [`Resolver::finalize_variables`].
    pub fn define_variable(&mut self, name: &str, value: i64) -> Result<(), ResolveError> {
        let key = self.check_name(name)?;
        let byte = u8::try_from(value).map_err(|_| ResolveError::VariableRange {
            name: name.to_string(),
            value,
        })?;

        debug!(self.log, "variable"; "name" => &key, "value" => byte);
        self.symbols.insert(key.clone(), Symbol::Variable {
            value: byte,
            address: VarAddress::Unresolved,
        });
        self.variables.push(key);
        Ok(())
    }

    /// Declare a definition that substitutes `value`.
    pub fn define_definition(&mut self, name: &str, value: i64) -> Result<(), ResolveError> {
        let key = self.check_name(name)?;
        if value < 0 {
            return Err(ResolveError::DefinitionRange {
                name: name.to_string(),
                value,
            });
        }

        debug!(self.log, "definition"; "name" => &key, "value" => value);
        self.symbols.insert(key, Symbol::Definition(value));
        Ok(())
    }

    /// Lay the variables out after `program_count` instructions and return
    /// the data segment bytes in declaration order.
    pub fn finalize_variables(&mut self, program_count: usize) -> Vec<u8> {
        let base = program_count << 1;
        let mut data = Vec::with_capacity(self.variables.len());

        for (ordinal, key) in self.variables.iter().enumerate() {
            if let Some(Symbol::Variable { value, address }) = self.symbols.get_mut(key) {
                let addr = (base + ordinal) as u16;
                *address = VarAddress::Address(addr);
                data.push(*value);
                debug!(self.log, "variable placed"; "name" => key, "address" => addr);
            }
        }

        data
    }

    /// Numeric value an alias stands for.
    pub fn resolve(&self, name: &str) -> Result<i64, ResolveError> {
        match self.lookup(name) {
            Some(Symbol::Builtin(v)) | Some(Symbol::Subroutine(v)) => Ok(v as i64),
            Some(Symbol::Definition(v)) => Ok(v),
            Some(Symbol::Variable { address: VarAddress::Address(a), .. }) => Ok(a as i64),
            Some(Symbol::Variable { address: VarAddress::Unresolved, .. }) => {
                Err(ResolveError::Unplaced(name.to_string()))
            }
            None => Err(ResolveError::Undefined(name.to_string())),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(&name.to_ascii_lowercase()).copied()
    }

    /// Number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// A bad alias declaration or reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("alias name is empty")]
    EmptyName,

    #[error("alias name \"{0}\" shouldn't be digits-only")]
    NumericName(String),

    #[error("\"{0}\" is a reserved name")]
    Reserved(String),

    #[error("alias \"{0}\" already defined")]
    Duplicate(String),

    #[error("undefined alias \"{0}\"")]
    Undefined(String),

    #[error("variable \"{0}\" has no address yet")]
    Unplaced(String),

    #[error("invalid value {value} for variable \"{name}\", must be 0-255")]
    VariableRange { name: String, value: i64 },

    #[error("invalid value {value} for definition \"{name}\", must not be negative")]
    DefinitionRange { name: String, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_seeded() {
        let resolver = Resolver::new();
        assert_eq!(resolver.resolve("r0"), Ok(0));
        assert_eq!(resolver.resolve("R7"), Ok(7));
        assert_eq!(resolver.resolve("p3"), Ok(3));
        assert_eq!(resolver.resolve("r8"), Err(ResolveError::Undefined("r8".into())));
    }

    #[test]
    fn test_reserved_names_cannot_be_declared() {
        let mut resolver = Resolver::new();
        assert_eq!(resolver.define_definition("R1", 3), Err(ResolveError::Reserved("R1".into())));
        assert_eq!(resolver.define_variable("p0", 3), Err(ResolveError::Reserved("p0".into())));
        assert_eq!(resolver.define_subroutine("'A'", 0), Err(ResolveError::Reserved("'A'".into())));
    }

    #[test]
    fn test_name_rules() {
        let mut resolver = Resolver::new();
        assert_eq!(resolver.define_subroutine("", 0), Err(ResolveError::EmptyName));
        assert_eq!(resolver.define_subroutine("123", 0), Err(ResolveError::NumericName("123".into())));
        assert!(resolver.define_subroutine("Loop", 4).is_ok());
        assert_eq!(resolver.define_definition("LOOP", 1), Err(ResolveError::Duplicate("LOOP".into())));
        assert_eq!(resolver.resolve("loop"), Ok(4));
    }

    #[test]
    fn test_value_ranges() {
        let mut resolver = Resolver::new();
        assert!(matches!(resolver.define_variable("v", 256), Err(ResolveError::VariableRange { .. })));
        assert!(matches!(resolver.define_variable("v", -1), Err(ResolveError::VariableRange { .. })));
        assert!(matches!(resolver.define_definition("d", -1), Err(ResolveError::DefinitionRange { .. })));
        assert!(resolver.define_definition("d", 5000).is_ok());
        assert_eq!(resolver.resolve("d"), Ok(5000));
    }

    #[test]
    fn test_variables_placed_in_declaration_order() {
        let mut resolver = Resolver::new();
        resolver.define_variable("b", 2).unwrap();
        resolver.define_variable("a", 1).unwrap();
        resolver.define_variable("c", 3).unwrap();
        assert_eq!(resolver.resolve("a"), Err(ResolveError::Unplaced("a".into())));

        let data = resolver.finalize_variables(2);
        assert_eq!(data, vec![2, 1, 3]);
        assert_eq!(resolver.resolve("b"), Ok(4));
        assert_eq!(resolver.resolve("a"), Ok(5));
        assert_eq!(resolver.resolve("c"), Ok(6));
        assert_eq!(resolver.variable_count(), 3);
    }
}
