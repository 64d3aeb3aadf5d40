//! Type tags stored in the `type` column of element tables

use crate::errors::ProxyError;

/// Closed set of categories describing how a value is encoded
///
/// The numeric codes are part of the storage format and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Int,
    Float,
    Double,
    Char,
    Str,
    Bool,
    IntArray,
    FloatArray,
    DoubleArray,
    CharArray,
    StrArray,
    BoolArray,
    /// Reference to a collection table of the same namespace
    SqlCollection,
    /// Reference to a map table of the same namespace
    SqlMap,
    /// Recognised but never stored
    Exception,
    /// Collection serialized as a JSON document
    GenericCollection,
    /// Map serialized as a JSON document
    GenericMap,
}

impl TypeTag {
    /// Every tag, in code order
    pub const ALL: [TypeTag; 18] = [
        TypeTag::Null,
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::Char,
        TypeTag::Str,
        TypeTag::Bool,
        TypeTag::IntArray,
        TypeTag::FloatArray,
        TypeTag::DoubleArray,
        TypeTag::CharArray,
        TypeTag::StrArray,
        TypeTag::BoolArray,
        TypeTag::SqlCollection,
        TypeTag::SqlMap,
        TypeTag::Exception,
        TypeTag::GenericCollection,
        TypeTag::GenericMap,
    ];

    /// Storage code written to the `type` column
    pub const fn code(self) -> i64 {
        match self {
            TypeTag::Null => 0,
            TypeTag::Int => 1,
            TypeTag::Float => 2,
            TypeTag::Double => 3,
            TypeTag::Char => 4,
            TypeTag::Str => 5,
            TypeTag::Bool => 6,
            TypeTag::IntArray => 10,
            TypeTag::FloatArray => 11,
            TypeTag::DoubleArray => 12,
            TypeTag::CharArray => 13,
            TypeTag::StrArray => 14,
            TypeTag::BoolArray => 15,
            TypeTag::SqlCollection => 20,
            TypeTag::SqlMap => 21,
            TypeTag::Exception => 22,
            TypeTag::GenericCollection => 23,
            TypeTag::GenericMap => 24,
        }
    }

    /// Resolve a stored code
    pub fn from_code(code: i64) -> Result<Self, ProxyError> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.code() == code)
            .ok_or(ProxyError::UnknownTypeCode { code })
    }

    /// Short name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Char => "char",
            TypeTag::Str => "string",
            TypeTag::Bool => "bool",
            TypeTag::IntArray => "int[]",
            TypeTag::FloatArray => "float[]",
            TypeTag::DoubleArray => "double[]",
            TypeTag::CharArray => "char[]",
            TypeTag::StrArray => "string[]",
            TypeTag::BoolArray => "bool[]",
            TypeTag::SqlCollection => "collection reference",
            TypeTag::SqlMap => "map reference",
            TypeTag::Exception => "exception",
            TypeTag::GenericCollection => "generic collection",
            TypeTag::GenericMap => "generic map",
        }
    }

    /// Whether the stored string is a table identifier of the same namespace
    pub fn is_reference(self) -> bool {
        matches!(self, TypeTag::SqlMap | TypeTag::SqlCollection)
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::from_code(tag.code()).unwrap(), tag);
        }
    }

    #[test]
    fn test_storage_codes_are_stable() {
        assert_eq!(TypeTag::Null.code(), 0);
        assert_eq!(TypeTag::Str.code(), 5);
        assert_eq!(TypeTag::IntArray.code(), 10);
        assert_eq!(TypeTag::SqlCollection.code(), 20);
        assert_eq!(TypeTag::SqlMap.code(), 21);
        assert_eq!(TypeTag::GenericMap.code(), 24);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert_eq!(
            TypeTag::from_code(-1).unwrap_err(),
            ProxyError::UnknownTypeCode { code: -1 }
        );
        assert!(TypeTag::from_code(7).is_err());
        assert!(TypeTag::from_code(25).is_err());
    }
}
