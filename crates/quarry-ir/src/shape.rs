//! Cardinality of IR nodes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::OpKind;

/// Whether a node yields one value, one value per row, or a whole relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Scalar,
    Columnar,
    Tabular,
}

impl Shape {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Shape::Scalar)
    }

    pub fn is_columnar(&self) -> bool {
        matches!(self, Shape::Columnar)
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, Shape::Tabular)
    }

    /// Scalar if every input is scalar, columnar otherwise.
    ///
    /// A value read from a relation (a field) has one value per row, so tabular inputs
    /// count as columnar.
    pub fn combine<I>(shapes: I) -> Shape
    where
        I: IntoIterator<Item = Shape>,
    {
        if shapes.into_iter().any(|shape| !shape.is_scalar()) {
            Shape::Columnar
        } else {
            Shape::Scalar
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("scalar"),
            Shape::Columnar => f.write_str("columnar"),
            Shape::Tabular => f.write_str("tabular"),
        }
    }
}

/// Shape of an operation given the shapes of its inputs.
///
/// Reductions collapse their input to a single value and relations are always tabular;
/// every other operation follows [`Shape::combine`].
pub fn shape_of<I>(kind: OpKind, inputs: I) -> Shape
where
    I: IntoIterator<Item = Shape>,
{
    if kind.is_relation() {
        Shape::Tabular
    } else if kind.is_reduction() {
        Shape::Scalar
    } else {
        Shape::combine(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine() {
        assert_eq!(Shape::combine([]), Shape::Scalar);
        assert_eq!(Shape::combine([Shape::Scalar, Shape::Scalar]), Shape::Scalar);
        assert_eq!(Shape::combine([Shape::Scalar, Shape::Columnar]), Shape::Columnar);
        assert_eq!(Shape::combine([Shape::Tabular]), Shape::Columnar);
    }

    #[test]
    fn test_reductions_preserve_scalar() {
        assert_eq!(shape_of(OpKind::Sum, [Shape::Columnar]), Shape::Scalar);
        assert_eq!(shape_of(OpKind::Add, [Shape::Columnar]), Shape::Columnar);
        assert_eq!(shape_of(OpKind::Filter, [Shape::Tabular]), Shape::Tabular);
    }
}
