//! The operator/function dispatch tables (spec.md §4.1, §6.2). Two
//! independent tables, one keyed by operator symbol plus a precedence
//! scale, one keyed by lower-cased function name — a flat dispatch table
//! rather than per-operator subclassing (spec.md §9).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use octofhir_fhirpath_core::FhirPathError;

use crate::function::FunctionSignature;
use crate::operation::{FhirPathOperation, FhirPathOperator};

/// `left` or `right` (spec.md §4.1); `implies` is the only right-associative
/// operator in the built-in catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Clone, Copy)]
struct OperatorMeta {
    precedence: u8,
    associativity: Associativity,
}

/// Registered operators/functions, consulted by the parser (precedence),
/// the analyzer (signatures) and the interpreter (dispatch). Registration
/// must complete before parsing begins (spec.md §5): the registry is built
/// once via `new_with_builtins` and is read-only for the lifetime of a
/// parse/analyze/evaluate cycle.
pub struct Registry {
    operators: FxHashMap<&'static str, Arc<dyn FhirPathOperator>>,
    operator_meta: FxHashMap<&'static str, OperatorMeta>,
    functions: FxHashMap<String, Arc<dyn FhirPathOperation>>,
    signatures: FxHashMap<String, FunctionSignature>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            operators: FxHashMap::default(),
            operator_meta: FxHashMap::default(),
            functions: FxHashMap::default(),
            signatures: FxHashMap::default(),
        }
    }

    /// Registers an operator at `precedence` with the given associativity
    /// (spec.md §4.1, §6.2: `precedence(tokenId) ∈ {-1} ∪ [0,255]`).
    /// Re-registering the identical `(symbol, precedence, associativity)`
    /// triple is idempotent; changing precedence or associativity for an
    /// already-registered symbol fails (spec.md §4.1 registration contract,
    /// §8 "registering operators at 0 and 255 must succeed; 256 must
    /// fail").
    pub fn register_operator(
        &mut self,
        op: Arc<dyn FhirPathOperator>,
        precedence: u8,
        associativity: Associativity,
    ) -> Result<(), FhirPathError> {
        let symbol = op.symbol();
        let meta = OperatorMeta {
            precedence,
            associativity,
        };
        if let Some(existing) = self.operator_meta.get(symbol) {
            if existing.precedence != meta.precedence || existing.associativity != meta.associativity {
                return Err(FhirPathError::operator_redefinition(symbol));
            }
        }
        self.operator_meta.insert(symbol, meta);
        self.operators.insert(symbol, op);
        Ok(())
    }

    /// Registers an operator at a `u16`/`i32`-typed precedence, validating
    /// the `[0,255]` bound before narrowing (spec.md §4.1, §8 boundary
    /// test). Prefer this over `register_operator` when the precedence
    /// comes from outside the built-in table (e.g. a future runtime
    /// extension API).
    pub fn register_operator_checked(
        &mut self,
        op: Arc<dyn FhirPathOperator>,
        precedence: i32,
        associativity: Associativity,
    ) -> Result<(), FhirPathError> {
        if !(0..=255).contains(&precedence) {
            return Err(FhirPathError::precedence_out_of_range(precedence));
        }
        self.register_operator(op, precedence as u8, associativity)
    }

    /// Registers a function under its lower-cased name (spec.md §4.1:
    /// "functions keyed by lower-cased name"). Re-registration overwrites.
    pub fn register_function(
        &mut self,
        op: Arc<dyn FhirPathOperation>,
        signature: FunctionSignature,
    ) -> Result<(), FhirPathError> {
        let key = op.name().to_ascii_lowercase();
        self.functions.insert(key.clone(), op);
        self.signatures.insert(key, signature);
        Ok(())
    }

    /// Records precedence/associativity for a symbol that the parser needs
    /// in its Pratt loop but that has no `FhirPathOperator` dispatch impl —
    /// `.` (navigation), `is`/`as` (type operators, which need the
    /// unevaluated type name rather than a right-hand value) and postfix
    /// indexing are all AST node kinds the interpreter handles directly
    /// (spec.md §3.2, §4.3). Same idempotent-or-error contract as
    /// [`Registry::register_operator`].
    pub fn register_precedence_only(
        &mut self,
        symbol: &'static str,
        precedence: u8,
        associativity: Associativity,
    ) -> Result<(), FhirPathError> {
        let meta = OperatorMeta {
            precedence,
            associativity,
        };
        if let Some(existing) = self.operator_meta.get(symbol) {
            if existing.precedence != meta.precedence || existing.associativity != meta.associativity {
                return Err(FhirPathError::operator_redefinition(symbol));
            }
        }
        self.operator_meta.insert(symbol, meta);
        Ok(())
    }

    pub fn get_operator(&self, symbol: &str) -> Option<&Arc<dyn FhirPathOperator>> {
        self.operators.get(symbol)
    }

    /// `precedence(tokenId)`: `-1` for an unregistered symbol (spec.md
    /// §6.2), else the registered `[0,255]` value.
    pub fn precedence(&self, symbol: &str) -> i32 {
        self.operator_meta
            .get(symbol)
            .map(|m| m.precedence as i32)
            .unwrap_or(-1)
    }

    pub fn associativity(&self, symbol: &str) -> Associativity {
        self.operator_meta
            .get(symbol)
            .map(|m| m.associativity)
            .unwrap_or(Associativity::Left)
    }

    pub fn is_binary_operator(&self, symbol: &str) -> bool {
        self.operators.contains_key(symbol)
    }

    pub fn get_function(&self, name: &str) -> Option<&Arc<dyn FhirPathOperation>> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    pub fn function_signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.signatures.get(&name.to_ascii_lowercase())
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    pub fn operator_symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operators.keys().copied()
    }

    /// Builds a registry with every built-in operator and function
    /// registered (spec.md §4.1 "added" catalogue).
    pub fn new_with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_all(&mut registry);
        registry
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_the_documented_function_catalogue() {
        let registry = Registry::new_with_builtins();
        for name in ["where", "select", "exists", "empty", "substring", "toInteger", "abs"] {
            assert!(
                registry.get_function(name).is_some(),
                "expected built-in `{name}` to be registered"
            );
        }
    }

    #[test]
    fn unregistered_operator_precedence_is_negative_one() {
        let registry = Registry::new();
        assert_eq!(registry.precedence("??"), -1);
    }

    #[test]
    fn precedence_bounds_are_enforced() {
        let registry = Registry::new_with_builtins();
        assert_eq!(registry.precedence("."), 100);
        assert_eq!(registry.precedence("implies"), 10);
        assert_eq!(registry.associativity("implies"), Associativity::Right);
        assert_eq!(registry.associativity("+"), Associativity::Left);
    }

    #[test]
    fn out_of_range_precedence_is_rejected() {
        struct Dummy;
        impl FhirPathOperator for Dummy {
            fn symbol(&self) -> &'static str {
                "??"
            }
            fn evaluate(
                &self,
                _left: &octofhir_fhirpath_model::Collection,
                _right: &octofhir_fhirpath_model::Collection,
            ) -> Result<octofhir_fhirpath_model::Collection, FhirPathError> {
                unreachable!()
            }
        }
        let mut registry = Registry::new();
        assert!(registry
            .register_operator_checked(Arc::new(Dummy), 256, Associativity::Left)
            .is_err());
        assert!(registry
            .register_operator_checked(Arc::new(Dummy), 255, Associativity::Left)
            .is_ok());
    }
}
