/* Type and method signature model used as interning keys by the builder. */
/* Descriptors are stored in the DEX native (also JNI) format e.g. Ljava/lang/Object; */

use crate::dex::error::DexError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A Java type identified by its descriptor
///
/// Equality and hashing only look at the descriptor string, the wide flag is derived data.
///
/// # Examples
///
/// ```
///  use dexbuilder::types::TypeDescriptor;
///
///  let t = TypeDescriptor::from_classname("com.basic.Test");
///  assert_eq!(t.descriptor(), "Lcom/basic/Test;");
///  assert!(t.is_object());
///  assert_eq!(TypeDescriptor::from_descriptor("J"), TypeDescriptor::LONG);
/// ```
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    descriptor: Cow<'static, str>,
    wide: bool,
}

impl PartialEq<Self> for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

const fn primitive(descriptor: &'static str, wide: bool) -> TypeDescriptor {
    TypeDescriptor {
        descriptor: Cow::Borrowed(descriptor),
        wide,
    }
}

static UNBOX_MAP: Lazy<HashMap<TypeDescriptor, TypeDescriptor>> = Lazy::new(|| {
    HashMap::from([
        (TypeDescriptor::OBJECT_INT, TypeDescriptor::INT),
        (TypeDescriptor::OBJECT_BOOLEAN, TypeDescriptor::BOOLEAN),
        (TypeDescriptor::OBJECT_BYTE, TypeDescriptor::BYTE),
        (TypeDescriptor::OBJECT_CHAR, TypeDescriptor::CHAR),
        (TypeDescriptor::OBJECT_DOUBLE, TypeDescriptor::DOUBLE),
        (TypeDescriptor::OBJECT_FLOAT, TypeDescriptor::FLOAT),
        (TypeDescriptor::OBJECT_LONG, TypeDescriptor::LONG),
        (TypeDescriptor::OBJECT_SHORT, TypeDescriptor::SHORT),
    ])
});

// Accessor on each wrapper class that yields the primitive value.
static VALUE_METHOD_MAP: Lazy<HashMap<TypeDescriptor, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (TypeDescriptor::OBJECT_INT, "intValue"),
        (TypeDescriptor::OBJECT_BOOLEAN, "booleanValue"),
        (TypeDescriptor::OBJECT_BYTE, "byteValue"),
        (TypeDescriptor::OBJECT_CHAR, "charValue"),
        (TypeDescriptor::OBJECT_DOUBLE, "doubleValue"),
        (TypeDescriptor::OBJECT_FLOAT, "floatValue"),
        (TypeDescriptor::OBJECT_LONG, "longValue"),
        (TypeDescriptor::OBJECT_SHORT, "shortValue"),
    ])
});

impl TypeDescriptor {
    pub const INT: TypeDescriptor = primitive("I", false);
    pub const VOID: TypeDescriptor = primitive("V", false);
    pub const BOOLEAN: TypeDescriptor = primitive("Z", false);
    pub const BYTE: TypeDescriptor = primitive("B", false);
    pub const CHAR: TypeDescriptor = primitive("C", false);
    pub const DOUBLE: TypeDescriptor = primitive("D", true);
    pub const FLOAT: TypeDescriptor = primitive("F", false);
    pub const LONG: TypeDescriptor = primitive("J", true);
    pub const SHORT: TypeDescriptor = primitive("S", false);

    pub const OBJECT: TypeDescriptor = primitive("Ljava/lang/Object;", false);
    pub const STRING: TypeDescriptor = primitive("Ljava/lang/String;", false);
    pub const OBJECT_INT: TypeDescriptor = primitive("Ljava/lang/Integer;", false);
    pub const OBJECT_BOOLEAN: TypeDescriptor = primitive("Ljava/lang/Boolean;", false);
    pub const OBJECT_BYTE: TypeDescriptor = primitive("Ljava/lang/Byte;", false);
    pub const OBJECT_CHAR: TypeDescriptor = primitive("Ljava/lang/Character;", false);
    pub const OBJECT_DOUBLE: TypeDescriptor = primitive("Ljava/lang/Double;", false);
    pub const OBJECT_FLOAT: TypeDescriptor = primitive("Ljava/lang/Float;", false);
    pub const OBJECT_LONG: TypeDescriptor = primitive("Ljava/lang/Long;", false);
    pub const OBJECT_SHORT: TypeDescriptor = primitive("Ljava/lang/Short;", false);

    /// Builds an object (or array) type from a dotted Java class name.
    pub fn from_classname(name: &str) -> TypeDescriptor {
        TypeDescriptor {
            descriptor: Cow::Owned(dot_to_descriptor(name)),
            wide: false,
        }
    }

    /// Maps a single descriptor character; anything that is not a primitive or `V` is
    /// treated as `java.lang.Object`.
    pub fn from_descriptor_char(descriptor: char) -> TypeDescriptor {
        match descriptor {
            'I' => Self::INT,
            'Z' => Self::BOOLEAN,
            'C' => Self::CHAR,
            'J' => Self::LONG,
            'S' => Self::SHORT,
            'F' => Self::FLOAT,
            'D' => Self::DOUBLE,
            'B' => Self::BYTE,
            'V' => Self::VOID,
            _ => Self::OBJECT,
        }
    }

    /// Single-character primitive codes map to their constants, anything else is kept verbatim as
    /// an object or array descriptor. An empty string yields `java.lang.Object`.
    pub fn from_descriptor(descriptor: &str) -> TypeDescriptor {
        match descriptor.chars().next() {
            Some(c) if descriptor.len() == 1 && "IZCJSFDBV".contains(c) => Self::from_descriptor_char(c),
            Some(_) => TypeDescriptor {
                descriptor: Cow::Owned(descriptor.to_string()),
                wide: false,
            },
            None => Self::OBJECT,
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Two-slot type (long or double).
    pub fn is_wide(&self) -> bool {
        self.wide
    }

    pub fn is_object(&self) -> bool {
        matches!(self.descriptor.as_bytes().first(), Some(b'L') | Some(b'['))
    }

    pub fn is_array(&self) -> bool {
        self.descriptor.starts_with('[')
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_object()
    }

    pub fn is_void(&self) -> bool {
        *self == Self::VOID
    }

    /// Single character category used in shorty descriptors; arrays fold into `L`.
    pub fn short_descriptor(&self) -> char {
        match self.descriptor.chars().next() {
            Some('[') | None => 'L',
            Some(c) => c,
        }
    }

    /// The `java.lang` wrapper class of a primitive type.
    pub fn to_box_type(&self) -> Result<TypeDescriptor, DexError> {
        if !self.is_primitive() {
            fail!(InvariantViolation, "cannot box non-primitive type {}", self);
        }
        match self.short_descriptor() {
            'I' => Ok(Self::OBJECT_INT),
            'Z' => Ok(Self::OBJECT_BOOLEAN),
            'C' => Ok(Self::OBJECT_CHAR),
            'J' => Ok(Self::OBJECT_LONG),
            'S' => Ok(Self::OBJECT_SHORT),
            'F' => Ok(Self::OBJECT_FLOAT),
            'D' => Ok(Self::OBJECT_DOUBLE),
            'B' => Ok(Self::OBJECT_BYTE),
            _ => Err(err!(InvariantViolation, "type {} has no box type", self)),
        }
    }

    /// The primitive type wrapped by a `java.lang` box class.
    pub fn to_unbox_type(&self) -> Result<TypeDescriptor, DexError> {
        if !self.is_object() {
            fail!(InvariantViolation, "cannot unbox non-object type {}", self);
        }
        UNBOX_MAP
            .get(self)
            .cloned()
            .ok_or_else(|| err!(InvariantViolation, "type {} is not a box type", self))
    }

    /// Name of the accessor returning the primitive held by a box type, e.g. `intValue`.
    pub fn value_method(&self) -> Result<&'static str, DexError> {
        VALUE_METHOD_MAP
            .get(self)
            .copied()
            .ok_or_else(|| err!(InvariantViolation, "type {} is not a box type", self))
    }
}

fn dot_to_descriptor(class_name: &str) -> String {
    let descriptor = class_name.replace('.', "/");
    if !descriptor.is_empty() && !descriptor.starts_with('[') {
        format!("L{};", descriptor)
    } else {
        descriptor
    }
}

/// A method signature: return type plus ordered parameter types
///
/// # Examples
///
/// ```
///  use dexbuilder::types::{Prototype, TypeDescriptor};
///
///  let p = Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]);
///  assert_eq!(p.shorty(), "IL");
///  assert_eq!(p.to_jni(), "(Ljava/lang/String;)I");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prototype {
    return_type: TypeDescriptor,
    param_types: Vec<TypeDescriptor>,
}

impl Prototype {
    pub fn new(return_type: TypeDescriptor, param_types: Vec<TypeDescriptor>) -> Prototype {
        Prototype {
            return_type,
            param_types,
        }
    }

    pub fn returning(return_type: TypeDescriptor) -> Prototype {
        Prototype::new(return_type, Vec::new())
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub fn param_types(&self) -> &[TypeDescriptor] {
        &self.param_types
    }

    pub fn arg_type(&self, index: usize) -> Result<&TypeDescriptor, DexError> {
        self.param_types.get(index).ok_or_else(|| {
            err!(
                InvariantViolation,
                "argument {} out of range for prototype {}",
                index,
                self.to_jni()
            )
        })
    }

    /// Number of register slots the parameters occupy, wide types counting twice.
    pub fn param_slots(&self) -> usize {
        self.param_types
            .iter()
            .map(|t| if t.is_wide() { 2 } else { 1 })
            .sum()
    }

    pub fn shorty(&self) -> String {
        let mut shorty = String::with_capacity(self.param_types.len() + 1);
        shorty.push(self.return_type.short_descriptor());
        for t in &self.param_types {
            shorty.push(t.short_descriptor());
        }
        shorty
    }

    pub fn to_jni(&self) -> String {
        let mut s = String::from("(");
        for t in &self.param_types {
            s.push_str(t.descriptor());
        }
        s.push(')');
        s.push_str(self.return_type.descriptor());
        s
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_jni())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMITIVES: [TypeDescriptor; 8] = [
        TypeDescriptor::INT,
        TypeDescriptor::BOOLEAN,
        TypeDescriptor::BYTE,
        TypeDescriptor::CHAR,
        TypeDescriptor::DOUBLE,
        TypeDescriptor::FLOAT,
        TypeDescriptor::LONG,
        TypeDescriptor::SHORT,
    ];

    #[test]
    fn classname_to_descriptor() {
        assert_eq!(
            TypeDescriptor::from_classname("java.lang.String"),
            TypeDescriptor::STRING
        );
        let arr = TypeDescriptor::from_classname("[Ljava.lang.String;");
        assert_eq!(arr.descriptor(), "[Ljava/lang/String;");
        assert!(arr.is_array());
        assert_eq!(arr.short_descriptor(), 'L');
    }

    #[test]
    fn descriptor_parsing() {
        assert_eq!(TypeDescriptor::from_descriptor("D"), TypeDescriptor::DOUBLE);
        assert!(TypeDescriptor::from_descriptor("D").is_wide());
        assert_eq!(TypeDescriptor::from_descriptor("V"), TypeDescriptor::VOID);
        assert_eq!(
            TypeDescriptor::from_descriptor("Lpkg/Foo;").descriptor(),
            "Lpkg/Foo;"
        );
        assert_eq!(TypeDescriptor::from_descriptor_char('Q'), TypeDescriptor::OBJECT);
        assert_eq!(TypeDescriptor::from_descriptor(""), TypeDescriptor::OBJECT);
    }

    #[test]
    fn unknown_descriptors_are_kept_as_given() {
        let odd = TypeDescriptor::from_descriptor("Qfoo;");
        assert_eq!(odd.descriptor(), "Qfoo;");
        assert!(!odd.is_wide());
        assert_ne!(odd, TypeDescriptor::OBJECT);
        assert_eq!(TypeDescriptor::from_descriptor("[J").descriptor(), "[J");
        assert!(!TypeDescriptor::from_descriptor("[J").is_wide());
    }

    #[test]
    fn equality_ignores_wide_flag() {
        let a = TypeDescriptor::from_descriptor("Lpkg/A;");
        let b = TypeDescriptor::from_classname("pkg.A");
        assert_eq!(a, b);
        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn box_unbox_round_trip() {
        for t in PRIMITIVES {
            let boxed = t.to_box_type().unwrap();
            assert!(boxed.is_object());
            assert_eq!(boxed.to_unbox_type().unwrap(), t);
            assert!(boxed.value_method().unwrap().ends_with("Value"));
        }
    }

    #[test]
    fn boxing_wrong_category_is_an_invariant_violation() {
        assert!(TypeDescriptor::STRING
            .to_box_type()
            .unwrap_err()
            .is_invariant_violation());
        assert!(TypeDescriptor::INT
            .to_unbox_type()
            .unwrap_err()
            .is_invariant_violation());
        assert!(TypeDescriptor::VOID.to_box_type().is_err());
        assert!(TypeDescriptor::STRING.to_unbox_type().is_err());
    }

    #[test]
    fn shorty_folds_arrays_into_objects() {
        let p = Prototype::new(
            TypeDescriptor::VOID,
            vec![
                TypeDescriptor::from_descriptor("[I"),
                TypeDescriptor::LONG,
                TypeDescriptor::OBJECT,
                TypeDescriptor::BOOLEAN,
            ],
        );
        assert_eq!(p.shorty(), "VLJLZ");
        assert_eq!(p.param_slots(), 5);
        assert_eq!(p.to_jni(), "([IJLjava/lang/Object;Z)V");
    }

    #[test]
    fn prototype_equality_and_arg_lookup() {
        let a = Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::STRING]);
        let b = Prototype::new(
            TypeDescriptor::INT,
            vec![TypeDescriptor::from_classname("java.lang.String")],
        );
        assert_eq!(a, b);
        assert_ne!(a, Prototype::returning(TypeDescriptor::INT));
        assert_eq!(a.arg_type(0).unwrap(), &TypeDescriptor::STRING);
        assert!(a.arg_type(1).is_err());
    }
}
