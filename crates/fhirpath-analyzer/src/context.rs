//! Analysis-time type environment: a structural-inheritance context chain
//! mirroring the interpreter's runtime context (spec.md §4.4, §4.7).
//!
//! A context only stores what it overrides and delegates everything else to
//! its parent, so deriving a child is O(1) and a parent is never mutated by
//! a child's bindings (spec.md §4.7 contracts, §9 "structural inheritance").

use std::sync::Arc;

use octofhir_fhirpath_model::TypeInfo;
use rustc_hash::FxHashMap;

/// One layer of the analyzer's environment.
#[derive(Debug, Clone)]
pub struct AnalyzeContext {
    parent: Option<Arc<AnalyzeContext>>,
    this_type: Option<TypeInfo>,
    index_type: Option<TypeInfo>,
    total_type: Option<TypeInfo>,
    variable: Option<(String, TypeInfo)>,
    variables_root: FxHashMap<String, TypeInfo>,
}

impl AnalyzeContext {
    /// Fresh root context for an analysis run (spec.md §4.7 `create`):
    /// `$this` starts bound to the overall input type, and `variables`
    /// seeds the user-variable map (`%name` forms passed in as options).
    pub fn new(input_type: TypeInfo, variables: FxHashMap<String, TypeInfo>) -> Self {
        Self {
            parent: None,
            this_type: Some(input_type),
            index_type: None,
            total_type: None,
            variable: None,
            variables_root: variables,
        }
    }

    /// Derives a child with `$this`/`$index` bound to one iteration element
    /// (spec.md §4.7 `withIterator`, §4.4.2).
    pub fn with_iterator(self: &Arc<Self>, item_type: TypeInfo, index_type: TypeInfo) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_type: Some(item_type),
            index_type: Some(index_type),
            total_type: None,
            variable: None,
            variables_root: FxHashMap::default(),
        })
    }

    /// Derives a child with `$total` bound, on top of an existing
    /// `withIterator` layer (spec.md §4.4.2 `aggregate`).
    pub fn with_total(self: &Arc<Self>, total_type: TypeInfo) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_type: None,
            index_type: None,
            total_type: Some(total_type),
            variable: None,
            variables_root: FxHashMap::default(),
        })
    }

    /// Derives a child with one shadowed user variable (spec.md §4.7
    /// `setVariable`).
    pub fn with_variable(self: &Arc<Self>, name: impl Into<String>, ty: TypeInfo) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_type: None,
            index_type: None,
            total_type: None,
            variable: Some((name.into(), ty)),
            variables_root: FxHashMap::default(),
        })
    }

    pub fn this_type(&self) -> Option<TypeInfo> {
        self.this_type
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.this_type()))
    }

    pub fn index_type(&self) -> Option<TypeInfo> {
        self.index_type
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.index_type()))
    }

    pub fn total_type(&self) -> Option<TypeInfo> {
        self.total_type
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.total_type()))
    }

    /// Resolves a variable name through the chain (spec.md §4.7
    /// `getVariable`: `%name`, `name`, `$name` forms all accepted — callers
    /// strip the sigil before calling this).
    pub fn get_variable(&self, name: &str) -> Option<TypeInfo> {
        if let Some((var_name, ty)) = &self.variable {
            if var_name == name {
                return Some(ty.clone());
            }
        }
        if let Some(ty) = self.variables_root.get(name) {
            return Some(ty.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::TypeName;

    #[test]
    fn child_variable_does_not_leak_into_parent() {
        let root = Arc::new(AnalyzeContext::new(TypeInfo::any_singleton(), FxHashMap::default()));
        let child = root.with_variable("x", TypeInfo::singleton(TypeName::Integer));
        assert!(root.get_variable("x").is_none());
        assert_eq!(child.get_variable("x").unwrap().type_name, TypeName::Integer);
    }

    #[test]
    fn this_type_is_inherited_through_a_total_only_layer() {
        let root = Arc::new(AnalyzeContext::new(TypeInfo::singleton(TypeName::Boolean), FxHashMap::default()));
        let child = root.with_total(TypeInfo::singleton(TypeName::Integer));
        assert_eq!(child.this_type().unwrap().type_name, TypeName::Boolean);
        assert_eq!(child.total_type().unwrap().type_name, TypeName::Integer);
    }

    #[test]
    fn iterator_layer_shadows_this_type_without_mutating_parent() {
        let root = Arc::new(AnalyzeContext::new(TypeInfo::collection(TypeName::Integer), FxHashMap::default()));
        let child = root.with_iterator(TypeInfo::singleton(TypeName::Integer), TypeInfo::singleton(TypeName::Integer));
        assert!(!root.this_type().unwrap().singleton);
        assert!(child.this_type().unwrap().singleton);
    }
}
