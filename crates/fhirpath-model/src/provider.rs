//! The `ModelProvider` external collaborator contract (spec.md §6.3).
//!
//! The FHIR package loader / schema cache that backs a real provider is
//! explicitly out of scope (spec.md §1); this crate only defines the seam
//! and a small built-in fallback for primitive type names so `ofType` on a
//! primitive works even with no provider configured (spec.md §4.4.1).

use async_trait::async_trait;

use crate::type_info::{TypeInfo, TypeName};

/// Resolves FHIR schema information for the analyzer. All methods may
/// involve I/O (a real provider typically fetches schema from a package
/// cache), so the trait is async; the analyzer awaits at each lookup
/// (spec.md §5 "the analyzer is cooperatively asynchronous at each
/// ModelProvider lookup").
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Resolve a root type name (e.g. `Patient`).
    async fn get_type(&self, type_name: &str) -> Option<TypeInfo>;

    /// Resolve member navigation `parentType.propertyName`, honoring
    /// inheritance and choice/union types.
    async fn get_element_type(&self, parent_type: &TypeInfo, property_name: &str) -> Option<TypeInfo>;

    /// Filter a union/choice type down to one branch; `None` if `target_type_name`
    /// is not one of the choices.
    async fn of_type(&self, type_info: &TypeInfo, target_type_name: &str) -> Option<TypeInfo>;

    /// Enumerate valid property names for completion (cursor mode, spec.md
    /// §4.3.1).
    async fn get_element_names(&self, parent_type: &TypeInfo) -> Vec<String>;
}

/// The nine FHIR primitive names the closed `TypeName` set maps onto,
/// grounded in the teacher's `FhirTypeRegistry` primitive list
/// (`fhirpath-core/src/types.rs`). Used by the analyzer to resolve
/// `ofType(Primitive)` without a `ModelProvider` (spec.md §4.4.1).
pub fn primitive_type_name_to_type_name(name: &str) -> Option<TypeName> {
    match name {
        "boolean" | "Boolean" => Some(TypeName::Boolean),
        "integer" | "Integer" | "positiveInt" | "unsignedInt" => Some(TypeName::Integer),
        "decimal" | "Decimal" => Some(TypeName::Decimal),
        "string" | "String" | "code" | "id" | "uri" | "url" | "canonical" | "markdown"
        | "base64Binary" | "oid" => Some(TypeName::String),
        "date" | "Date" => Some(TypeName::Date),
        "dateTime" | "DateTime" | "instant" => Some(TypeName::DateTime),
        "time" | "Time" => Some(TypeName::Time),
        "Quantity" => Some(TypeName::Quantity),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_primitives_resolve() {
        assert_eq!(
            primitive_type_name_to_type_name("boolean"),
            Some(TypeName::Boolean)
        );
        assert_eq!(
            primitive_type_name_to_type_name("dateTime"),
            Some(TypeName::DateTime)
        );
        assert_eq!(primitive_type_name_to_type_name("Patient"), None);
    }
}
