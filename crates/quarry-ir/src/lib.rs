//! Quarry Intermediate Representation (IR)
//!
//! Typed, immutable operation trees that dialect compilers lower to SQL.
//! Every node is validated on construction, carries a derived dtype and shape, and is
//! deterministically serializable for caching and distribution.

mod builders;
mod case;
mod error;
mod node;
mod ops;
mod shape;
mod types;
mod value;

pub use builders::*;
pub use case::{case, cases, ifelse, CaseBuilder, CaseState};
pub use error::IrError;
pub use node::{Node, NodeRef};
pub use ops::*;
pub use shape::{shape_of, Shape};
pub use types::*;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> NodeRef {
        table(
            "sales",
            Schema::from_pairs([
                ("region", DataType::String),
                ("amount", DataType::Float64),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let t = sales();
        let region = t.field("region").unwrap();
        let filtered = t
            .filter(vec![region.equals(&string("EU").unwrap()).unwrap()])
            .unwrap();

        let json = serde_json::to_string(&filtered).unwrap();
        let parsed: NodeRef = serde_json::from_str(&json).unwrap();

        assert_eq!(filtered, parsed);
        assert_eq!(filtered.fingerprint(), parsed.fingerprint());
    }

    #[test]
    fn test_deserialization_revalidates() {
        // A searched case whose condition is an integer literal.
        let json = r#"{
            "kind": "SearchedCase",
            "cases": [{"kind": "NonNullLiteral", "value": {"type": "Int", "value": 1}, "dtype": "Int8"}],
            "results": [{"kind": "NullLiteral", "dtype": "String"}],
            "default": {"kind": "NullLiteral", "dtype": "String"}
        }"#;
        let parsed: Result<NodeRef, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }
}
