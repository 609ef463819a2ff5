use crate::dex::dex_file::encode_string_data;
use crate::dex::ir::{
    ClassId, FieldDecl, FieldId, MethodDecl, MethodId, ProtoEntry, ProtoId, StringEntry, StringId,
    TypeEntry, TypeId,
};
use crate::types::{Prototype, TypeDescriptor};
use log::{debug, warn};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;

/// Identity of a declared method: defining type, name and prototype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub class: TypeDescriptor,
    pub name: String,
    pub prototype: Prototype,
}

/// Interning pools of a module
///
/// Each pool is append only. A key is allocated once, given the next dense index of its pool,
/// and every later lookup of an equal key returns that same index.
#[derive(Debug, Default)]
pub struct DexPools {
    strings: Vec<StringEntry>,
    types: Vec<TypeEntry>,
    protos: Vec<ProtoEntry>,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,

    string_ids: HashMap<String, StringId>,
    type_ids: HashMap<TypeDescriptor, TypeId>,
    proto_ids: HashMap<Prototype, ProtoId>,
    // Keyed on (parent, name) only: a redeclaration with another type resolves to the first one.
    field_ids: HashMap<(TypeDescriptor, String), FieldId>,
    method_ids: HashMap<MethodKey, MethodId>,
    method_keys: Vec<MethodKey>,
}

impl DexPools {
    pub fn new() -> DexPools {
        DexPools::default()
    }

    /// Get or insert a string, stored in its `string_data_item` encoding
    pub fn get_or_add_string<'a, S: Into<Cow<'a, str>>>(&mut self, value: S) -> StringId {
        let cow = value.into();
        if let Some(id) = self.string_ids.get::<str>(cow.borrow()) {
            return *id;
        }

        let owned = cow.into_owned();
        let id = StringId::from_index(self.strings.len());
        debug!("interned string {:?} as {}", owned, id);
        self.strings.push(StringEntry {
            data: encode_string_data(&owned),
            value: owned.clone(),
        });
        self.string_ids.insert(owned, id);
        id
    }

    /// Get or insert a type; its descriptor string is interned first.
    pub fn get_or_add_type(&mut self, ty: &TypeDescriptor) -> TypeId {
        if let Some(id) = self.type_ids.get(ty) {
            return *id;
        }

        let descriptor = self.get_or_add_string(ty.descriptor());
        let id = TypeId::from_index(self.types.len());
        debug!("interned type {} as {}", ty, id);
        self.types.push(TypeEntry {
            descriptor,
            class_def: None,
        });
        self.type_ids.insert(ty.clone(), id);
        id
    }

    pub fn get_or_add_field(
        &mut self,
        parent: &TypeDescriptor,
        name: &str,
        field_type: &TypeDescriptor,
    ) -> FieldId {
        let key = (parent.clone(), name.to_string());
        if let Some(id) = self.field_ids.get(&key) {
            let declared = self.fields[id.slot()].field_type;
            if self.type_ids.get(field_type) != Some(&declared) {
                warn!(
                    "field {}->{} redeclared as {}, keeping the first declaration",
                    parent, name, field_type
                );
            }
            return *id;
        }

        let parent_id = self.get_or_add_type(parent);
        let name_id = self.get_or_add_string(name);
        let type_id = self.get_or_add_type(field_type);
        let id = FieldId::from_index(self.fields.len());
        debug!("declared field {}->{}:{} as {}", parent, name, field_type, id);
        self.fields.push(FieldDecl {
            parent: parent_id,
            name: name_id,
            field_type: type_id,
        });
        self.field_ids.insert(key, id);
        id
    }

    pub fn get_or_add_method(
        &mut self,
        parent: &TypeDescriptor,
        name: &str,
        prototype: &Prototype,
    ) -> MethodId {
        let key = MethodKey {
            class: parent.clone(),
            name: name.to_string(),
            prototype: prototype.clone(),
        };
        if let Some(id) = self.method_ids.get(&key) {
            return *id;
        }

        let parent_id = self.get_or_add_type(parent);
        let name_id = self.get_or_add_string(name);
        let proto_id = self.get_or_encode_proto(prototype);
        let id = MethodId::from_index(self.methods.len());
        debug!("declared method {}->{}{} as {}", parent, name, prototype, id);
        self.methods.push(MethodDecl {
            parent: parent_id,
            name: name_id,
            prototype: proto_id,
        });
        self.method_keys.push(key.clone());
        self.method_ids.insert(key, id);
        id
    }

    pub fn get_or_encode_proto(&mut self, prototype: &Prototype) -> ProtoId {
        if let Some(id) = self.proto_ids.get(prototype) {
            return *id;
        }

        let entry = prototype.encode(self);
        let id = ProtoId::from_index(self.protos.len());
        debug!("interned prototype {} as {}", prototype, id);
        self.protos.push(entry);
        self.proto_ids.insert(prototype.clone(), id);
        id
    }

    /// The prototype a method was declared with, `None` for an id this pool never handed out.
    pub fn get_prototype_by_method_id(&self, id: MethodId) -> Option<Prototype> {
        self.method_keys.get(id.slot()).map(|key| key.prototype.clone())
    }

    pub fn method_key(&self, id: MethodId) -> Option<&MethodKey> {
        self.method_keys.get(id.slot())
    }

    pub(crate) fn link_class(&mut self, ty: TypeId, class: ClassId) {
        self.types[ty.slot()].class_def = Some(class);
    }

    pub fn string(&self, id: StringId) -> &StringEntry {
        &self.strings[id.slot()]
    }

    pub fn type_entry(&self, id: TypeId) -> &TypeEntry {
        &self.types[id.slot()]
    }

    pub fn type_descriptor(&self, id: TypeId) -> &str {
        &self.string(self.type_entry(id).descriptor).value
    }

    pub fn proto(&self, id: ProtoId) -> &ProtoEntry {
        &self.protos[id.slot()]
    }

    pub fn field(&self, id: FieldId) -> &FieldDecl {
        &self.fields[id.slot()]
    }

    pub fn method(&self, id: MethodId) -> &MethodDecl {
        &self.methods[id.slot()]
    }

    pub fn strings(&self) -> &[StringEntry] {
        &self.strings
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn protos(&self) -> &[ProtoEntry] {
        &self.protos
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }
}

impl Prototype {
    /// Interns the shorty, the return type and the parameter list (absent when empty).
    pub(crate) fn encode(&self, pools: &mut DexPools) -> ProtoEntry {
        let shorty = pools.get_or_add_string(self.shorty());
        let return_type = pools.get_or_add_type(self.return_type());
        let param_types = if self.param_types().is_empty() {
            None
        } else {
            Some(
                self.param_types()
                    .iter()
                    .map(|t| pools.get_or_add_type(t))
                    .collect(),
            )
        };
        ProtoEntry {
            shorty,
            return_type,
            param_types,
        }
    }
}
