//! Type lattice (C1).
//!
//! A `Type` compares by structural equality of its description, as §3
//! requires. There is no interning — class and array types are cheap enough
//! (a `String` and a `Box`) that structural `PartialEq` is simpler than a
//! table of interned handles, and nothing downstream needs pointer
//! identity.

use std::fmt;

/// A Compiscript type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Float,
    Boolean,
    String,
    Null,
    Void,
    Array(Box<Type>),
    Class(String),
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Null)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_))
    }

    /// The element type of an array type, or `None` for any other type.
    pub fn array_element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// The class name of a class type, or `None` for any other type.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Size in bytes: 4 for every non-void type, 0 for void. Arrays and
    /// class instances are represented uniformly as 4-byte heap references.
    pub fn size_of(&self) -> usize {
        match self {
            Type::Void => 0,
            _ => 4,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Float => write!(f, "float"),
            Type::Boolean => write!(f, "boolean"),
            Type::String => write!(f, "string"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
            Type::Array(elem) => write!(f, "array<{elem}>"),
            Type::Class(name) => write!(f, "class<{name}>"),
        }
    }
}

/// `compatible(expected, actual)`: true iff (a) equal, (b) both numeric, or
/// (c) `actual` is `null`. Note this is intentionally asymmetric only in
/// name — `null` is compatible as an actual value assigned to any expected
/// type, never the other way around (an expected type of `null` does not
/// occur in this language).
pub fn compatible(expected: &Type, actual: &Type) -> bool {
    if expected == actual {
        return true;
    }
    if expected.is_numeric() && actual.is_numeric() {
        return true;
    }
    if actual.is_null() {
        return true;
    }
    false
}

/// Result type of a binary arithmetic operator applied to two numeric
/// operands: `integer` only if both sides are `integer`, else `float`.
/// Panics if either side is not numeric; callers must check `is_numeric`
/// first (the semantic analyzer always does, emitting E101 otherwise).
pub fn arithmetic_result(lhs: &Type, rhs: &Type) -> Type {
    debug_assert!(lhs.is_numeric() && rhs.is_numeric());
    if lhs.is_integer() && rhs.is_integer() {
        Type::Integer
    } else {
        Type::Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_float_are_mutually_compatible() {
        assert!(compatible(&Type::Integer, &Type::Float));
        assert!(compatible(&Type::Float, &Type::Integer));
    }

    #[test]
    fn null_is_compatible_with_anything() {
        assert!(compatible(&Type::Class("Foo".into()), &Type::Null));
        assert!(compatible(&Type::array_of(Type::Integer), &Type::Null));
        assert!(compatible(&Type::Void, &Type::Null));
    }

    #[test]
    fn unrelated_types_are_incompatible() {
        assert!(!compatible(&Type::String, &Type::Integer));
        assert!(!compatible(
            &Type::Class("A".into()),
            &Type::Class("B".into())
        ));
    }

    #[test]
    fn size_of_is_four_except_void() {
        assert_eq!(Type::Integer.size_of(), 4);
        assert_eq!(Type::array_of(Type::Boolean).size_of(), 4);
        assert_eq!(Type::Class("Foo".into()).size_of(), 4);
        assert_eq!(Type::Void.size_of(), 0);
    }

    #[test]
    fn arithmetic_result_is_integer_only_when_both_are() {
        assert_eq!(arithmetic_result(&Type::Integer, &Type::Integer), Type::Integer);
        assert_eq!(arithmetic_result(&Type::Integer, &Type::Float), Type::Float);
        assert_eq!(arithmetic_result(&Type::Float, &Type::Float), Type::Float);
    }

    #[test]
    fn array_element_and_class_name_accessors() {
        let arr = Type::array_of(Type::Integer);
        assert_eq!(arr.array_element(), Some(&Type::Integer));
        assert_eq!(arr.class_name(), None);

        let cls = Type::Class("Point".into());
        assert_eq!(cls.class_name(), Some("Point"));
        assert_eq!(cls.array_element(), None);
    }
}
