use crate::dex::{write_u1, write_u2, write_u4, write_uleb128, write_x};
use bitflags::bitflags;
use cesu8::to_java_cesu8;
#[cfg(test)]
use crate::dex::error::DexError;
#[cfg(test)]
use crate::dex::{read_u1, read_u2, read_u4, read_uleb128, read_x};
#[cfg(test)]
use cesu8::from_java_cesu8;
#[cfg(test)]
use log::warn;

pub const DEX_FILE_MAGIC: [u8; 8] = [ 0x64, 0x65, 0x78, 0x0a, 0x30, 0x33, 0x35, 0x00 ];
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const NO_INDEX: u32 = 0xffffffff;
pub const HEADER_SIZE: u32 = 0x70;

bitflags! {
    /// `access_flags` values shared by classes, fields and methods.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags
{
    /// Methods invoked without virtual dispatch live in the `direct_methods` list.
    pub fn is_direct_method(&self) -> bool
    {
        self.intersects(AccessFlags::STATIC | AccessFlags::PRIVATE | AccessFlags::CONSTRUCTOR)
    }
}

/// Encodes a `string_data_item`: utf16 length, modified UTF-8 bytes and a trailing NUL.
pub fn encode_string_data(s: &str) -> Vec<u8>
{
    let encoded = to_java_cesu8(s);
    // Continuation bytes never start a code unit so the rest count utf16 units.
    let utf16_size = encoded.iter().filter(|b| (**b & 0xc0) != 0x80).count();
    let mut bytes = Vec::with_capacity(encoded.len() + 6);
    write_uleb128(&mut bytes, utf16_size as u32);
    write_x(&mut bytes, &encoded);
    write_u1(&mut bytes, 0);
    bytes
}

#[cfg(test)]
pub(crate) fn read_string_data(bytes: &[u8], ix: &mut usize) -> Result<String, DexError>
{
    let utf16_size = read_uleb128(bytes, ix)?;
    let mut v = vec![];
    loop
    {
        let u = read_u1(bytes, ix)?;
        if u != 0 { v.push(u); }
        else { break; }
    }

    match from_java_cesu8(v.as_slice())
    {
        Ok(s) => {
            if s.encode_utf16().count() != utf16_size as usize {
                warn!("string_data_item length {} does not match contents {:?}", utf16_size, s);
            }
            Ok(s.into_owned())
        },
        Err(_) => Err(DexError::new("string_data_item is not valid modified UTF-8")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeList(pub Vec<u16>);

impl TypeList
{
    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u4(bytes, self.0.len() as u32);
        for i in &self.0 { c += write_u2(bytes, *i); }
        c
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProtoIdItem {
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    pub parameters_off: u32,
}

impl ProtoIdItem
{
    #[cfg(test)]
    pub(crate) fn read(bytes: &[u8], ix: &mut usize) -> Result<ProtoIdItem, DexError>
    {
        Ok(ProtoIdItem {
            shorty_idx: read_u4(bytes, ix)?,
            return_type_idx: read_u4(bytes, ix)?,
            parameters_off: read_u4(bytes, ix)?,
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u4(bytes, self.shorty_idx);
        c += write_u4(bytes, self.return_type_idx);
        c += write_u4(bytes, self.parameters_off);
        c
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldIdItem {
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
}

impl FieldIdItem
{
    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u2(bytes, self.class_idx);
        c += write_u2(bytes, self.type_idx);
        c += write_u4(bytes, self.name_idx);
        c
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MethodIdItem {
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
}

impl MethodIdItem
{
    #[cfg(test)]
    pub(crate) fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodIdItem, DexError>
    {
        Ok(MethodIdItem {
            class_idx: read_u2(bytes, ix)?,
            proto_idx: read_u2(bytes, ix)?,
            name_idx: read_u4(bytes, ix)?,
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u2(bytes, self.class_idx);
        c += write_u2(bytes, self.proto_idx);
        c += write_u4(bytes, self.name_idx);
        c
    }
}

/// Register frame and instruction stream of one method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeItem
{
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub insns: Vec<u16>,
}

impl CodeItem
{
    #[cfg(test)]
    pub(crate) fn read(bytes: &[u8], ix: &mut usize) -> Result<CodeItem, DexError>
    {
        let registers_size = read_u2(bytes, ix)?;
        let ins_size = read_u2(bytes, ix)?;
        let outs_size = read_u2(bytes, ix)?;
        let tries_size = read_u2(bytes, ix)?;
        if tries_size != 0 {
            fail!(Format, "code_item with {} try blocks is not supported", tries_size);
        }
        let _debug_info_off = read_u4(bytes, ix)?;
        let insns_size = read_u4(bytes, ix)?;
        let mut insns = Vec::with_capacity(insns_size as usize);
        for _ in 0..insns_size { insns.push(read_u2(bytes, ix)?); }
        Ok(CodeItem { registers_size, ins_size, outs_size, insns })
    }

    // Written to the data section. No tries and no debug info are produced.
    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u2(bytes, self.registers_size);
        c += write_u2(bytes, self.ins_size);
        c += write_u2(bytes, self.outs_size);
        c += write_u2(bytes, 0);
        c += write_u4(bytes, 0);
        c += write_u4(bytes, self.insns.len() as u32);
        for i in &self.insns { c += write_u2(bytes, *i); }
        c
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFieldItem
{
    pub field_idx: u32,
    pub access_flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMethodItem
{
    pub method_idx: u32,
    pub access_flags: u32,
    pub code_off: u32,
}

/// Member lists of a class, each sorted by pool index as the indices are delta-encoded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassDataItem {
    pub static_fields: Vec<EncodedFieldItem>,
    pub instance_fields: Vec<EncodedFieldItem>,
    pub direct_methods: Vec<EncodedMethodItem>,
    pub virtual_methods: Vec<EncodedMethodItem>,
}

impl ClassDataItem
{
    #[cfg(test)]
    pub(crate) fn read(bytes: &[u8], ix: &mut usize) -> Result<ClassDataItem, DexError>
    {
        let static_field_size = read_uleb128(bytes, ix)?;
        let instance_field_size = read_uleb128(bytes, ix)?;
        let direct_method_size = read_uleb128(bytes, ix)?;
        let virtual_method_size = read_uleb128(bytes, ix)?;

        let read_fields = |count: u32, ix: &mut usize| -> Result<Vec<EncodedFieldItem>, DexError> {
            let mut offset = 0;
            let mut fields = vec![];
            for _ in 0..count {
                offset += read_uleb128(bytes, ix)?;
                fields.push(EncodedFieldItem { field_idx: offset, access_flags: read_uleb128(bytes, ix)? });
            }
            Ok(fields)
        };
        let read_methods = |count: u32, ix: &mut usize| -> Result<Vec<EncodedMethodItem>, DexError> {
            let mut offset = 0;
            let mut methods = vec![];
            for _ in 0..count {
                offset += read_uleb128(bytes, ix)?;
                let access_flags = read_uleb128(bytes, ix)?;
                let code_off = read_uleb128(bytes, ix)?;
                methods.push(EncodedMethodItem { method_idx: offset, access_flags, code_off });
            }
            Ok(methods)
        };

        let static_fields = read_fields(static_field_size, ix)?;
        let instance_fields = read_fields(instance_field_size, ix)?;
        let direct_methods = read_methods(direct_method_size, ix)?;
        let virtual_methods = read_methods(virtual_method_size, ix)?;

        Ok(ClassDataItem { static_fields, instance_fields, direct_methods, virtual_methods })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_uleb128(bytes, self.static_fields.len() as u32);
        c += write_uleb128(bytes, self.instance_fields.len() as u32);
        c += write_uleb128(bytes, self.direct_methods.len() as u32);
        c += write_uleb128(bytes, self.virtual_methods.len() as u32);

        for list in [&self.static_fields, &self.instance_fields] {
            let mut last = 0;
            for i in list {
                c += write_uleb128(bytes, i.field_idx - last);
                last = i.field_idx;
                c += write_uleb128(bytes, i.access_flags);
            }
        }

        for list in [&self.direct_methods, &self.virtual_methods] {
            let mut last = 0;
            for i in list {
                c += write_uleb128(bytes, i.method_idx - last);
                last = i.method_idx;
                c += write_uleb128(bytes, i.access_flags);
                c += write_uleb128(bytes, i.code_off);
            }
        }

        c
    }

    pub fn is_empty(&self) -> bool
    {
        self.static_fields.is_empty()
            && self.instance_fields.is_empty()
            && self.direct_methods.is_empty()
            && self.virtual_methods.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefItem {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub source_file_idx: u32,
}

impl ClassDefItem
{
    /// Write a `class_def_item` using provided offsets for referenced sections.
    /// This does not serialize the referenced sections themselves.
    pub fn write_with_offsets(
        &self,
        bytes: &mut Vec<u8>,
        interfaces_off: u32,
        annotations_off: u32,
        class_data_off: u32,
        static_values_off: u32,
    ) -> usize {
        let mut c = 0;
        c += write_u4(bytes, self.class_idx);
        c += write_u4(bytes, self.access_flags);
        c += write_u4(bytes, self.superclass_idx);
        c += write_u4(bytes, interfaces_off);
        c += write_u4(bytes, self.source_file_idx);
        c += write_u4(bytes, annotations_off);
        c += write_u4(bytes, class_data_off);
        c += write_u4(bytes, static_values_off);
        c
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header
{
    #[cfg(test)]
    pub(crate) fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError>
    {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(DexError::new("Not enough bytes for header"));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&read_x(bytes, ix, 8)?);
        if magic[0] != 0x64 || magic[1] != 0x65 || magic[2] != 0x78 { return Err(DexError::new("Invalid magic value")); }
        let checksum = read_u4(bytes, ix)?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(&read_x(bytes, ix, 20)?);

        Ok(Header {
            magic,
            checksum,
            signature,
            file_size: read_u4(bytes, ix)?,
            header_size: read_u4(bytes, ix)?,
            endian_tag: read_u4(bytes, ix)?,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_x(bytes, &self.magic);
        c += write_u4(bytes, self.checksum);
        c += write_x(bytes, &self.signature);
        c += write_u4(bytes, self.file_size);
        c += write_u4(bytes, self.header_size);
        c += write_u4(bytes, self.endian_tag);
        c += write_u4(bytes, self.link_size);
        c += write_u4(bytes, self.link_off);
        c += write_u4(bytes, self.map_off);
        c += write_u4(bytes, self.string_ids_size);
        c += write_u4(bytes, self.string_ids_off);
        c += write_u4(bytes, self.type_ids_size);
        c += write_u4(bytes, self.type_ids_off);
        c += write_u4(bytes, self.proto_ids_size);
        c += write_u4(bytes, self.proto_ids_off);
        c += write_u4(bytes, self.field_ids_size);
        c += write_u4(bytes, self.field_ids_off);
        c += write_u4(bytes, self.method_ids_size);
        c += write_u4(bytes, self.method_ids_off);
        c += write_u4(bytes, self.class_defs_size);
        c += write_u4(bytes, self.class_defs_off);
        c += write_u4(bytes, self.data_size);
        c += write_u4(bytes, self.data_off);
        c
    }
}
