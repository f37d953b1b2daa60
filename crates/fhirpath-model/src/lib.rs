//! Runtime value model for FHIRPath: boxed values (spec.md §3.4), `TypeInfo`
//! (spec.md §3.3), the quantity subsystem (spec.md §3.5, §4.6) and the
//! `ModelProvider` seam (spec.md §6.3).

pub mod provider;
pub mod quantity;
pub mod type_info;
pub mod value;

pub use provider::{primitive_type_name_to_type_name, ModelProvider};
pub use quantity::Quantity;
pub use type_info::{ChoiceType, ModelContext, TypeInfo, TypeName};
pub use value::{
    BoxedValue, Collection, DatePrecision, FhirPathValue, PrecisionDate, PrecisionDateTime,
    PrecisionTime, TimePrecision,
};
