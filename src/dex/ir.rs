//! Index-addressed nodes owned by a [`DexBuilder`](crate::dex::builder::DexBuilder).
//!
//! Every cross reference between nodes is one of the id newtypes below. An id is the dense,
//! zero-based position of its node in the owning pool, assigned in allocation order.

use crate::dex::dex_file::{AccessFlags, CodeItem};
use std::fmt;

macro_rules! pool_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> u32 {
                self.0
            }

            pub(crate) fn from_index(index: usize) -> Self {
                $name(index as u32)
            }

            pub(crate) fn slot(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}@{}", stringify!($name), self.0)
            }
        }
    };
}

pool_id!(StringId);
pool_id!(TypeId);
pool_id!(ProtoId);
pool_id!(FieldId);
pool_id!(MethodId);
pool_id!(
    /// Position of a class definition in the module, not a pool index.
    ClassId
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub value: String,
    /// The `string_data_item` bytes: utf16 length, modified UTF-8 and a terminating zero.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub descriptor: StringId,
    /// Set once the type is defined by a class of this module.
    pub class_def: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoEntry {
    pub shorty: StringId,
    pub return_type: TypeId,
    /// `None` for a method without parameters.
    pub param_types: Option<Vec<TypeId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub parent: TypeId,
    pub name: StringId,
    pub field_type: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub parent: TypeId,
    pub name: StringId,
    pub prototype: ProtoId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField {
    pub decl: FieldId,
    pub access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMethod {
    pub decl: MethodId,
    pub access_flags: AccessFlags,
    pub code: Option<CodeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub class_type: TypeId,
    pub super_class: TypeId,
    pub access_flags: AccessFlags,
    pub source_file: Option<StringId>,
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDef {
    pub(crate) fn new(class_type: TypeId, super_class: TypeId) -> ClassDef {
        ClassDef {
            class_type,
            super_class,
            access_flags: AccessFlags::PUBLIC,
            source_file: None,
            static_fields: Vec::new(),
            instance_fields: Vec::new(),
            direct_methods: Vec::new(),
            virtual_methods: Vec::new(),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &EncodedMethod> {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }

    pub fn fields(&self) -> impl Iterator<Item = &EncodedField> {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }
}
