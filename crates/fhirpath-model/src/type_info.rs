//! `TypeInfo` — the analyzer's per-node type lattice (spec.md §3.3).

use serde::{Deserialize, Serialize};

/// The closed set of primitive type names the core reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Any,
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
}

impl TypeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Time => "Time",
            Self::Quantity => "Quantity",
        }
    }

    /// Integer/Decimal only.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One branch of a FHIR choice/union type (e.g. `Observation.value[x]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceType {
    pub type_name: TypeName,
    pub name: String,
    pub singleton: bool,
}

/// Opaque (to the core) context a `ModelProvider` attaches to a `TypeInfo` so
/// that later navigation can resolve FHIR schema elements, including
/// choice/union types (spec.md §3.3, §6.3).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelContext {
    pub is_union: bool,
    pub choices: Vec<ChoiceType>,
    /// FHIR schema type name this context resolves to, when known — carried
    /// opaquely by the provider and read back by the provider itself.
    pub schema_type: Option<String>,
}

/// `TypeInfo = { type, singleton, namespace?, name?, modelContext? }`
/// (spec.md §3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub type_name: TypeName,
    /// `false` means "a collection of `type_name`".
    pub singleton: bool,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub model_context: Option<ModelContext>,
}

impl TypeInfo {
    pub fn new(type_name: TypeName, singleton: bool) -> Self {
        Self {
            type_name,
            singleton,
            namespace: None,
            name: None,
            model_context: None,
        }
    }

    pub fn singleton(type_name: TypeName) -> Self {
        Self::new(type_name, true)
    }

    pub fn collection(type_name: TypeName) -> Self {
        Self::new(type_name, false)
    }

    pub fn any_singleton() -> Self {
        Self::singleton(TypeName::Any)
    }

    pub fn any_collection() -> Self {
        Self::collection(TypeName::Any)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model_context(mut self, ctx: ModelContext) -> Self {
        self.model_context = Some(ctx);
        self
    }

    pub fn as_collection(&self) -> Self {
        let mut clone = self.clone();
        clone.singleton = false;
        clone
    }

    pub fn as_singleton(&self) -> Self {
        let mut clone = self.clone();
        clone.singleton = true;
        clone
    }

    /// Result type of `a | b` (spec.md §4.4.1): the join of operand types,
    /// always a collection. Equal types join to themselves; otherwise join
    /// to `Any` (the closed `TypeName` set has no finer common ancestor).
    pub fn join(&self, other: &TypeInfo) -> TypeInfo {
        if self.type_name == other.type_name {
            TypeInfo::collection(self.type_name)
        } else {
            TypeInfo::any_collection()
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self.type_name, TypeName::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_equal_types_preserves_type() {
        let a = TypeInfo::singleton(TypeName::Integer);
        let b = TypeInfo::collection(TypeName::Integer);
        let joined = a.join(&b);
        assert_eq!(joined.type_name, TypeName::Integer);
        assert!(!joined.singleton);
    }

    #[test]
    fn join_of_different_types_is_any() {
        let a = TypeInfo::singleton(TypeName::Integer);
        let b = TypeInfo::singleton(TypeName::String);
        assert!(a.join(&b).is_any());
    }
}
