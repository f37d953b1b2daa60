//! Runtime environment: a structural-inheritance context chain mirroring
//! the analyzer's `AnalyzeContext` (spec.md §4.7), but carrying actual
//! values instead of inferred types.
//!
//! As with the analyzer's context, a layer only stores what it overrides
//! and delegates everything else to its parent, so deriving a child is
//! O(1) and a parent is never mutated by a child's bindings (spec.md §4.7
//! contracts, §9 "structural inheritance").

use std::sync::Arc;

use octofhir_fhirpath_model::{BoxedValue, Collection};
use rustc_hash::FxHashMap;

/// One layer of the interpreter's environment.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    parent: Option<Arc<RuntimeContext>>,
    this_value: Option<Collection>,
    index_value: Option<i64>,
    total_value: Option<Collection>,
    variable: Option<(String, Collection)>,
    variables_root: FxHashMap<String, Collection>,
    context_value: Option<Collection>,
    resource_value: Option<Collection>,
    root_resource_value: Option<Collection>,
}

impl RuntimeContext {
    /// Fresh root context for an evaluation run (spec.md §4.7 `create`):
    /// `$this`, `%context`, `%resource` and `%rootResource` all start bound
    /// to the overall input (spec.md §3.6); `variables` seeds the
    /// user-variable map (`%name` forms passed in as options).
    pub fn create(input: Collection, variables: FxHashMap<String, Collection>) -> Self {
        Self {
            parent: None,
            this_value: Some(input.clone()),
            index_value: None,
            total_value: None,
            variable: None,
            variables_root: variables,
            context_value: Some(input.clone()),
            resource_value: Some(input.clone()),
            root_resource_value: Some(input),
        }
    }

    /// Derives a child with `$this`/`$index` bound to one iteration element
    /// (spec.md §4.7 `withIterator`, §4.5 per-element dispatch).
    pub fn with_iterator(self: &Arc<Self>, item: Collection, index: i64) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_value: Some(item),
            index_value: Some(index),
            total_value: None,
            variable: None,
            variables_root: FxHashMap::default(),
            context_value: None,
            resource_value: None,
            root_resource_value: None,
        })
    }

    /// Derives a child with `$total` bound, on top of an existing
    /// `withIterator` layer (spec.md §4.4.2/§4.5 `aggregate`).
    pub fn with_total(self: &Arc<Self>, total: Collection) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_value: None,
            index_value: None,
            total_value: Some(total),
            variable: None,
            variables_root: FxHashMap::default(),
            context_value: None,
            resource_value: None,
            root_resource_value: None,
        })
    }

    /// Derives a child with one shadowed user variable (spec.md §4.7
    /// `setVariable`).
    pub fn with_variable(self: &Arc<Self>, name: impl Into<String>, value: Collection) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(self.clone()),
            this_value: None,
            index_value: None,
            total_value: None,
            variable: Some((name.into(), value)),
            variables_root: FxHashMap::default(),
            context_value: None,
            resource_value: None,
            root_resource_value: None,
        })
    }

    fn this_opt(&self) -> Option<Collection> {
        self.this_value
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.this_opt()))
    }

    pub fn this(&self) -> Collection {
        self.this_opt().unwrap_or_else(Collection::empty)
    }

    fn index_opt(&self) -> Option<i64> {
        self.index_value.or_else(|| self.parent.as_ref().and_then(|p| p.index_opt()))
    }

    pub fn index(&self) -> Option<i64> {
        self.index_opt()
    }

    fn total_opt(&self) -> Option<Collection> {
        self.total_value
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.total_opt()))
    }

    pub fn total(&self) -> Collection {
        self.total_opt().unwrap_or_else(Collection::empty)
    }

    fn context_opt(&self) -> Option<Collection> {
        self.context_value
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.context_opt()))
    }

    pub fn context(&self) -> Collection {
        self.context_opt().unwrap_or_else(Collection::empty)
    }

    fn resource_opt(&self) -> Option<Collection> {
        self.resource_value
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.resource_opt()))
    }

    pub fn resource(&self) -> Collection {
        self.resource_opt().unwrap_or_else(Collection::empty)
    }

    fn root_resource_opt(&self) -> Option<Collection> {
        self.root_resource_value
            .clone()
            .or_else(|| self.parent.as_ref().and_then(|p| p.root_resource_opt()))
    }

    pub fn root_resource(&self) -> Collection {
        self.root_resource_opt().unwrap_or_else(Collection::empty)
    }

    /// Resolves a user variable through the chain (spec.md §4.7
    /// `getVariable`: `%name`, `name`, `$name` forms all accepted — callers
    /// strip the sigil before calling this).
    pub fn get_variable(&self, name: &str) -> Option<Collection> {
        if let Some((var_name, value)) = &self.variable {
            if var_name == name {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.variables_root.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get_variable(name))
    }
}

#[allow(dead_code)]
fn boxed(i: i64) -> BoxedValue {
    BoxedValue::integer(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_variable_does_not_leak_into_parent() {
        let root = Arc::new(RuntimeContext::create(Collection::empty(), FxHashMap::default()));
        let child = root.with_variable("x", Collection::singleton(BoxedValue::integer(1)));
        assert!(root.get_variable("x").is_none());
        assert_eq!(child.get_variable("x").unwrap().as_singleton().unwrap().value.as_integer(), Some(1));
    }

    #[test]
    fn this_is_inherited_through_a_total_only_layer() {
        let root = Arc::new(RuntimeContext::create(
            Collection::singleton(BoxedValue::boolean(true)),
            FxHashMap::default(),
        ));
        let child = root.with_total(Collection::singleton(BoxedValue::integer(5)));
        assert_eq!(child.this().as_singleton().unwrap().value.as_bool(), Some(true));
        assert_eq!(child.total().as_singleton().unwrap().value.as_integer(), Some(5));
    }

    #[test]
    fn iterator_layer_shadows_this_without_mutating_parent() {
        let root = Arc::new(RuntimeContext::create(
            Collection::from_vec(vec![BoxedValue::integer(1), BoxedValue::integer(2)]),
            FxHashMap::default(),
        ));
        let child = root.with_iterator(Collection::singleton(BoxedValue::integer(1)), 0);
        assert_eq!(root.this().len(), 2);
        assert_eq!(child.this().len(), 1);
        assert_eq!(child.index(), Some(0));
    }

    #[test]
    fn system_variables_survive_nested_iterator_layers() {
        let input = Collection::singleton(BoxedValue::integer(7));
        let root = Arc::new(RuntimeContext::create(input.clone(), FxHashMap::default()));
        let child = root.with_iterator(Collection::singleton(BoxedValue::integer(1)), 0);
        assert_eq!(child.context(), input.clone());
        assert_eq!(child.resource(), input.clone());
        assert_eq!(child.root_resource(), input);
    }
}
