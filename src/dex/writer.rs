//! Layout and serialization of a module into a DEX 035 image.
//!
//! Pools are interned in insertion order while building, the image wants them sorted. The writer
//! computes the sorted order of every pool, rewrites the indices embedded in the method bodies and
//! then lays the file out as header, id sections and data section (string data, type lists, code
//! items, class data and finally the map list).

use crate::dex::dex_file::{
    ClassDataItem, ClassDefItem, CodeItem, EncodedFieldItem, EncodedMethodItem,
    FieldIdItem, Header, MethodIdItem, ProtoIdItem, TypeList, DEX_FILE_MAGIC, ENDIAN_CONSTANT,
    HEADER_SIZE, NO_INDEX,
};
use crate::dex::error::DexError;
use crate::dex::ir::{ClassDef, EncodedField};
use crate::dex::opcodes::{opcode, ReferenceType};
use crate::dex::pool::DexPools;
use crate::dex::{write_u2, write_u4};
use adler::adler32_slice;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const TYPE_HEADER_ITEM: u16 = 0x0000;
pub const TYPE_STRING_ID_ITEM: u16 = 0x0001;
pub const TYPE_TYPE_ID_ITEM: u16 = 0x0002;
pub const TYPE_PROTO_ID_ITEM: u16 = 0x0003;
pub const TYPE_FIELD_ID_ITEM: u16 = 0x0004;
pub const TYPE_METHOD_ID_ITEM: u16 = 0x0005;
pub const TYPE_CLASS_DEF_ITEM: u16 = 0x0006;
pub const TYPE_MAP_LIST: u16 = 0x1000;
pub const TYPE_TYPE_LIST: u16 = 0x1001;
pub const TYPE_CLASS_DATA_ITEM: u16 = 0x2000;
pub const TYPE_CODE_ITEM: u16 = 0x2001;
pub const TYPE_STRING_DATA_ITEM: u16 = 0x2002;

/// Largest type, proto, field and method pools addressable by 16-bit indices.
pub const MAX_INDEXED_ITEMS: usize = 65536;

/// Knobs of [`write_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Fill in the Adler-32 checksum of the header.
    pub checksum: bool,
    /// Fill in the SHA-1 signature of the header.
    pub signature: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            checksum: true,
            signature: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionInfo {
    pub count: u32,
    pub offset: u32,
}

#[derive(Debug)]
pub struct SectionOffsets {
    pub string_ids: SectionInfo,
    pub type_ids: SectionInfo,
    pub proto_ids: SectionInfo,
    pub field_ids: SectionInfo,
    pub method_ids: SectionInfo,
    pub class_defs: SectionInfo,
    pub data_off: u32,
}

impl SectionOffsets {
    const STRING_ID_ITEM_SIZE: u32 = 4;
    const TYPE_ID_ITEM_SIZE: u32 = 4;
    const PROTO_ID_ITEM_SIZE: u32 = 12;
    const FIELD_ID_ITEM_SIZE: u32 = 8;
    const METHOD_ID_ITEM_SIZE: u32 = 8;
    const CLASS_DEF_ITEM_SIZE: u32 = 32;

    fn layout(pools: &DexPools, class_count: usize) -> SectionOffsets {
        let cursor = HEADER_SIZE;
        let (string_ids, cursor) = Self::section(cursor, pools.strings().len() as u32, Self::STRING_ID_ITEM_SIZE);
        let (type_ids, cursor) = Self::section(cursor, pools.types().len() as u32, Self::TYPE_ID_ITEM_SIZE);
        let (proto_ids, cursor) = Self::section(cursor, pools.protos().len() as u32, Self::PROTO_ID_ITEM_SIZE);
        let (field_ids, cursor) = Self::section(cursor, pools.fields().len() as u32, Self::FIELD_ID_ITEM_SIZE);
        let (method_ids, cursor) = Self::section(cursor, pools.methods().len() as u32, Self::METHOD_ID_ITEM_SIZE);
        let (class_defs, cursor) = Self::section(cursor, class_count as u32, Self::CLASS_DEF_ITEM_SIZE);

        SectionOffsets {
            string_ids,
            type_ids,
            proto_ids,
            field_ids,
            method_ids,
            class_defs,
            data_off: cursor,
        }
    }

    fn section(base: u32, count: u32, item_size: u32) -> (SectionInfo, u32) {
        if count == 0 {
            (SectionInfo::default(), base)
        } else {
            (SectionInfo { count, offset: base }, base + count * item_size)
        }
    }
}

#[derive(Debug)]
struct MapItem {
    type_code: u16,
    size: u32,
    offset: u32,
}

impl MapItem {
    fn new(type_code: u16, size: u32, offset: u32) -> Self {
        MapItem {
            type_code,
            size,
            offset,
        }
    }
}

/// Sorted order of one pool: `order[new] = old` and `remap[old] = new`.
#[derive(Debug, Default)]
struct PoolOrder {
    order: Vec<usize>,
    remap: Vec<u32>,
}

impl PoolOrder {
    fn sorted_by<F>(count: usize, mut compare: F) -> PoolOrder
    where
        F: FnMut(usize, usize) -> Ordering,
    {
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|a, b| compare(*a, *b));
        let mut remap = vec![0u32; count];
        for (new, old) in order.iter().enumerate() {
            remap[*old] = new as u32;
        }
        PoolOrder { order, remap }
    }

    fn get(&self, old: usize) -> u32 {
        self.remap[old]
    }

    /// Remaps an index read back from encoded code, which may be anything.
    fn lookup(&self, old: u16, what: &str) -> Result<u16, DexError> {
        match self.remap.get(old as usize) {
            Some(new) if *new <= u16::MAX as u32 => Ok(*new as u16),
            Some(new) => Err(err!(Format, "{} index {} does not fit the 16-bit operand", what, new)),
            None => Err(err!(Format, "{} index {} is not in the pool", what, old)),
        }
    }
}

/// Final index of every pool entry.
#[derive(Debug)]
struct IndexRemap {
    strings: PoolOrder,
    types: PoolOrder,
    protos: PoolOrder,
    fields: PoolOrder,
    methods: PoolOrder,
}

impl IndexRemap {
    fn new(pools: &DexPools) -> IndexRemap {
        let values = pools.strings();
        let strings = PoolOrder::sorted_by(values.len(), |a, b| {
            values[a].value.encode_utf16().cmp(values[b].value.encode_utf16())
        });

        let entries = pools.types();
        let types = PoolOrder::sorted_by(entries.len(), |a, b| {
            strings
                .get(entries[a].descriptor.slot())
                .cmp(&strings.get(entries[b].descriptor.slot()))
        });

        let proto_keys: Vec<(u32, Vec<u32>)> = pools
            .protos()
            .iter()
            .map(|proto| {
                let params = proto
                    .param_types
                    .iter()
                    .flatten()
                    .map(|t| types.get(t.slot()))
                    .collect();
                (types.get(proto.return_type.slot()), params)
            })
            .collect();
        let protos = PoolOrder::sorted_by(proto_keys.len(), |a, b| cmp_proto_keys(&proto_keys[a], &proto_keys[b]));

        let field_keys: Vec<(u32, u32, u32)> = pools
            .fields()
            .iter()
            .map(|f| (types.get(f.parent.slot()), strings.get(f.name.slot()), types.get(f.field_type.slot())))
            .collect();
        let fields = PoolOrder::sorted_by(field_keys.len(), |a, b| field_keys[a].cmp(&field_keys[b]));

        let method_keys: Vec<(u32, u32, u32)> = pools
            .methods()
            .iter()
            .map(|m| (types.get(m.parent.slot()), strings.get(m.name.slot()), protos.get(m.prototype.slot())))
            .collect();
        let methods = PoolOrder::sorted_by(method_keys.len(), |a, b| method_keys[a].cmp(&method_keys[b]));

        IndexRemap {
            strings,
            types,
            protos,
            fields,
            methods,
        }
    }

    /// Rewrites the pool index operand of every referencing instruction.
    fn remap_code(&self, insns: &[u16]) -> Result<Vec<u16>, DexError> {
        let mut out = insns.to_vec();
        let mut pc = 0;
        while pc < out.len() {
            let value = (out[pc] & 0xff) as u8;
            let op = opcode(value).ok_or_else(|| err!(Format, "unknown opcode {:#04x} at {}", value, pc))?;
            if op.reference_type != ReferenceType::None {
                let slot = out
                    .get_mut(pc + 1)
                    .ok_or_else(|| err!(Format, "{} at {} is truncated", op.name, pc))?;
                *slot = match op.reference_type {
                    ReferenceType::String => self.strings.lookup(*slot, "string")?,
                    ReferenceType::Type => self.types.lookup(*slot, "type")?,
                    ReferenceType::Field => self.fields.lookup(*slot, "field")?,
                    ReferenceType::Method => self.methods.lookup(*slot, "method")?,
                    ReferenceType::None => *slot,
                };
            }
            pc += op.format.units();
        }
        if pc != out.len() {
            fail!(Format, "last instruction runs past the end of the code");
        }
        Ok(out)
    }
}

/// Orders prototypes by return type, then parameter lists lexicographically.
fn cmp_proto_keys(a: &(u32, Vec<u32>), b: &(u32, Vec<u32>)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| cmp_proto_parameters(&a.1, &b.1))
}

fn cmp_proto_parameters(a: &[u32], b: &[u32]) -> Ordering {
    for (lhs, rhs) in a.iter().zip(b.iter()) {
        match lhs.cmp(rhs) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    InProgress,
    Done,
}

/// Class definitions with every superclass defined in the module ahead of its subclasses.
fn order_class_defs(pools: &DexPools, classes: &[ClassDef]) -> Result<Vec<usize>, DexError> {
    fn visit(
        slot: usize,
        pools: &DexPools,
        classes: &[ClassDef],
        state: &mut [Visit],
        order: &mut Vec<usize>,
    ) -> Result<(), DexError> {
        match state[slot] {
            Visit::Done => return Ok(()),
            Visit::InProgress => fail!(
                Format,
                "class hierarchy of {} is circular",
                pools.type_descriptor(classes[slot].class_type)
            ),
            Visit::New => {}
        }
        state[slot] = Visit::InProgress;
        if let Some(parent) = pools.type_entry(classes[slot].super_class).class_def {
            visit(parent.slot(), pools, classes, state, order)?;
        }
        state[slot] = Visit::Done;
        order.push(slot);
        Ok(())
    }

    let mut state = vec![Visit::New; classes.len()];
    let mut order = Vec::with_capacity(classes.len());
    for slot in 0..classes.len() {
        visit(slot, pools, classes, &mut state, &mut order)?;
    }
    Ok(order)
}

fn check_pool_limits(pools: &DexPools) -> Result<(), DexError> {
    for (what, count) in [
        ("type", pools.types().len()),
        ("proto", pools.protos().len()),
        ("field", pools.fields().len()),
        ("method", pools.methods().len()),
    ] {
        if count > MAX_INDEXED_ITEMS {
            fail!(Format, "{} {} ids exceed the limit of {}", count, what, MAX_INDEXED_ITEMS);
        }
    }
    Ok(())
}

fn align_to(value: u32, alignment: u32) -> u32 {
    if alignment <= 1 {
        return value;
    }
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Data section under construction; offsets handed out are absolute file offsets.
struct DataSection {
    base: u32,
    bytes: Vec<u8>,
}

impl DataSection {
    fn offset(&self) -> u32 {
        self.base + self.bytes.len() as u32
    }

    fn align(&mut self, alignment: u32) -> u32 {
        let aligned = align_to(self.offset(), alignment);
        self.bytes.resize((aligned - self.base) as usize, 0);
        aligned
    }
}

/// Offsets of the data items referenced from the id sections.
#[derive(Debug, Default)]
struct DataLayout {
    string_data: Vec<u32>,
    proto_parameters: Vec<u32>,
    class_data: Vec<u32>,
    type_list_count: u32,
    type_list_off: u32,
    code_item_count: u32,
    code_item_off: u32,
    class_data_count: u32,
    class_data_off: u32,
}

fn write_data(
    pools: &DexPools,
    classes: &[ClassDef],
    class_order: &[usize],
    remap: &IndexRemap,
    data: &mut DataSection,
) -> Result<DataLayout, DexError> {
    let mut layout = DataLayout {
        string_data: vec![0; pools.strings().len()],
        proto_parameters: vec![0; pools.protos().len()],
        class_data: vec![0; classes.len()],
        ..DataLayout::default()
    };

    for old in &remap.strings.order {
        layout.string_data[*old] = data.offset();
        data.bytes.extend_from_slice(&pools.strings()[*old].data);
    }

    let mut type_lists: HashMap<Vec<u16>, u32> = HashMap::new();
    for old in &remap.protos.order {
        let params = match &pools.protos()[*old].param_types {
            Some(params) if !params.is_empty() => params,
            _ => continue,
        };
        let list: Vec<u16> = params.iter().map(|t| remap.types.get(t.slot()) as u16).collect();
        let offset = match type_lists.get(&list) {
            Some(offset) => *offset,
            None => {
                let offset = data.align(4);
                TypeList(list.clone()).write(&mut data.bytes);
                if layout.type_list_count == 0 {
                    layout.type_list_off = offset;
                }
                layout.type_list_count += 1;
                type_lists.insert(list, offset);
                offset
            }
        };
        layout.proto_parameters[*old] = offset;
    }

    let mut code_offsets: HashMap<(usize, usize), u32> = HashMap::new();
    for slot in class_order {
        for (position, method) in classes[*slot].methods().enumerate() {
            let code = match &method.code {
                Some(code) => code,
                None => continue,
            };
            let insns = remap.remap_code(&code.insns).map_err(|e| match pools.method_key(method.decl) {
                Some(key) => DexError::with_context(e, format!("method {}->{}{}", key.class, key.name, key.prototype)),
                None => DexError::with_context(e, format!("method {}", method.decl)),
            })?;
            let offset = data.align(4);
            CodeItem {
                registers_size: code.registers_size,
                ins_size: code.ins_size,
                outs_size: code.outs_size,
                insns,
            }
            .write(&mut data.bytes);
            if layout.code_item_count == 0 {
                layout.code_item_off = offset;
            }
            layout.code_item_count += 1;
            code_offsets.insert((*slot, position), offset);
        }
    }

    for slot in class_order {
        let class = &classes[*slot];
        let field_item = |f: &EncodedField| EncodedFieldItem {
            field_idx: remap.fields.get(f.decl.slot()),
            access_flags: f.access_flags.bits(),
        };
        let mut item = ClassDataItem {
            static_fields: class.static_fields.iter().map(&field_item).collect(),
            instance_fields: class.instance_fields.iter().map(&field_item).collect(),
            ..ClassDataItem::default()
        };
        for (position, method) in class.methods().enumerate() {
            let encoded = EncodedMethodItem {
                method_idx: remap.methods.get(method.decl.slot()),
                access_flags: method.access_flags.bits(),
                code_off: code_offsets.get(&(*slot, position)).copied().unwrap_or(0),
            };
            if position < class.direct_methods.len() {
                item.direct_methods.push(encoded);
            } else {
                item.virtual_methods.push(encoded);
            }
        }
        if item.is_empty() {
            continue;
        }
        item.static_fields.sort_by_key(|f| f.field_idx);
        item.instance_fields.sort_by_key(|f| f.field_idx);
        item.direct_methods.sort_by_key(|m| m.method_idx);
        item.virtual_methods.sort_by_key(|m| m.method_idx);

        let offset = data.offset();
        item.write(&mut data.bytes);
        if layout.class_data_count == 0 {
            layout.class_data_off = offset;
        }
        layout.class_data_count += 1;
        layout.class_data[*slot] = offset;
    }

    Ok(layout)
}

fn build_map_items(sections: &SectionOffsets, layout: &DataLayout, remap: &IndexRemap, map_off: u32) -> Vec<MapItem> {
    let mut items = vec![MapItem::new(TYPE_HEADER_ITEM, 1, 0)];
    let mut rest = Vec::new();
    for (type_code, info) in [
        (TYPE_STRING_ID_ITEM, sections.string_ids),
        (TYPE_TYPE_ID_ITEM, sections.type_ids),
        (TYPE_PROTO_ID_ITEM, sections.proto_ids),
        (TYPE_FIELD_ID_ITEM, sections.field_ids),
        (TYPE_METHOD_ID_ITEM, sections.method_ids),
        (TYPE_CLASS_DEF_ITEM, sections.class_defs),
    ] {
        if info.count > 0 {
            rest.push(MapItem::new(type_code, info.count, info.offset));
        }
    }
    if let Some(first) = remap.strings.order.first() {
        rest.push(MapItem::new(
            TYPE_STRING_DATA_ITEM,
            layout.string_data.len() as u32,
            layout.string_data[*first],
        ));
    }
    if layout.type_list_count > 0 {
        rest.push(MapItem::new(TYPE_TYPE_LIST, layout.type_list_count, layout.type_list_off));
    }
    if layout.code_item_count > 0 {
        rest.push(MapItem::new(TYPE_CODE_ITEM, layout.code_item_count, layout.code_item_off));
    }
    if layout.class_data_count > 0 {
        rest.push(MapItem::new(TYPE_CLASS_DATA_ITEM, layout.class_data_count, layout.class_data_off));
    }
    rest.push(MapItem::new(TYPE_MAP_LIST, 1, map_off));
    rest.sort_by_key(|item| item.offset);
    items.extend(rest);
    items
}

fn write_map_list(bytes: &mut Vec<u8>, entries: &[MapItem]) {
    write_u4(bytes, entries.len() as u32);
    for item in entries {
        write_u2(bytes, item.type_code);
        write_u2(bytes, 0);
        write_u4(bytes, item.size);
        write_u4(bytes, item.offset);
    }
}

fn write_ids(
    file: &mut Vec<u8>,
    pools: &DexPools,
    classes: &[ClassDef],
    class_order: &[usize],
    remap: &IndexRemap,
    layout: &DataLayout,
) {
    for old in &remap.strings.order {
        write_u4(file, layout.string_data[*old]);
    }
    for old in &remap.types.order {
        write_u4(file, remap.strings.get(pools.types()[*old].descriptor.slot()));
    }
    for old in &remap.protos.order {
        let proto = &pools.protos()[*old];
        ProtoIdItem {
            shorty_idx: remap.strings.get(proto.shorty.slot()),
            return_type_idx: remap.types.get(proto.return_type.slot()),
            parameters_off: layout.proto_parameters[*old],
        }
        .write(file);
    }
    for old in &remap.fields.order {
        let field = &pools.fields()[*old];
        FieldIdItem {
            class_idx: remap.types.get(field.parent.slot()) as u16,
            type_idx: remap.types.get(field.field_type.slot()) as u16,
            name_idx: remap.strings.get(field.name.slot()),
        }
        .write(file);
    }
    for old in &remap.methods.order {
        let method = &pools.methods()[*old];
        MethodIdItem {
            class_idx: remap.types.get(method.parent.slot()) as u16,
            proto_idx: remap.protos.get(method.prototype.slot()) as u16,
            name_idx: remap.strings.get(method.name.slot()),
        }
        .write(file);
    }
    for slot in class_order {
        let class = &classes[*slot];
        ClassDefItem {
            class_idx: remap.types.get(class.class_type.slot()),
            access_flags: class.access_flags.bits(),
            superclass_idx: remap.types.get(class.super_class.slot()),
            source_file_idx: class.source_file.map_or(NO_INDEX, |s| remap.strings.get(s.slot())),
        }
        .write_with_offsets(file, 0, 0, layout.class_data[*slot], 0);
    }
}

fn overwrite_header(buf: &mut [u8], header: &Header) {
    let mut header_bytes = Vec::with_capacity(HEADER_SIZE as usize);
    header.write(&mut header_bytes);
    buf[..HEADER_SIZE as usize].copy_from_slice(&header_bytes);
}

fn compute_sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

/// Serializes pools and class definitions into a complete DEX image.
pub fn write_image(pools: &DexPools, classes: &[ClassDef], options: &ImageOptions) -> Result<Vec<u8>, DexError> {
    check_pool_limits(pools)?;
    let remap = IndexRemap::new(pools);
    let class_order = order_class_defs(pools, classes)?;
    let sections = SectionOffsets::layout(pools, classes.len());

    let mut data = DataSection {
        base: sections.data_off,
        bytes: Vec::new(),
    };
    let layout = write_data(pools, classes, &class_order, &remap, &mut data)?;
    let map_off = data.align(4);
    let map_items = build_map_items(&sections, &layout, &remap, map_off);
    write_map_list(&mut data.bytes, &map_items);
    trace!("data section at {:#x}, map list at {:#x}", sections.data_off, map_off);

    let mut file = vec![0u8; HEADER_SIZE as usize];
    write_ids(&mut file, pools, classes, &class_order, &remap, &layout);
    if file.len() != sections.data_off as usize {
        fail!(Format, "id sections end at {:#x}, expected {:#x}", file.len(), sections.data_off);
    }
    file.extend_from_slice(&data.bytes);

    let mut header = Header {
        magic: DEX_FILE_MAGIC,
        checksum: 0,
        signature: [0; 20],
        file_size: file.len() as u32,
        header_size: HEADER_SIZE,
        endian_tag: ENDIAN_CONSTANT,
        link_size: 0,
        link_off: 0,
        map_off,
        string_ids_size: sections.string_ids.count,
        string_ids_off: sections.string_ids.offset,
        type_ids_size: sections.type_ids.count,
        type_ids_off: sections.type_ids.offset,
        proto_ids_size: sections.proto_ids.count,
        proto_ids_off: sections.proto_ids.offset,
        field_ids_size: sections.field_ids.count,
        field_ids_off: sections.field_ids.offset,
        method_ids_size: sections.method_ids.count,
        method_ids_off: sections.method_ids.offset,
        class_defs_size: sections.class_defs.count,
        class_defs_off: sections.class_defs.offset,
        data_size: data.bytes.len() as u32,
        data_off: sections.data_off,
    };

    overwrite_header(&mut file, &header);
    if options.signature {
        header.signature = compute_sha1(&file[32..]);
        overwrite_header(&mut file, &header);
    }
    if options.checksum {
        header.checksum = adler32_slice(&file[12..]);
        overwrite_header(&mut file, &header);
    }

    debug!(
        "wrote image of {} bytes: {} strings, {} types, {} protos, {} fields, {} methods, {} classes",
        file.len(),
        sections.string_ids.count,
        sections.type_ids.count,
        sections.proto_ids.count,
        sections.field_ids.count,
        sections.method_ids.count,
        sections.class_defs.count
    );
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::builder::DexBuilder;
    use crate::dex::dex_file::read_string_data;
    use crate::dex::instructions::{Instruction, Op, Value};
    use crate::dex::{read_u2, read_u4};
    use crate::types::{Prototype, TypeDescriptor};

    fn header(image: &[u8]) -> Header {
        let mut ix = 0;
        Header::read(image, &mut ix).unwrap()
    }

    fn strings(image: &[u8]) -> Vec<String> {
        let h = header(image);
        (0..h.string_ids_size)
            .map(|i| {
                let mut ix = (h.string_ids_off + 4 * i) as usize;
                let mut data = read_u4(image, &mut ix).unwrap() as usize;
                read_string_data(image, &mut data).unwrap()
            })
            .collect()
    }

    fn method_names(image: &[u8]) -> Vec<String> {
        let h = header(image);
        let strings = strings(image);
        (0..h.method_ids_size)
            .map(|i| {
                let mut ix = (h.method_ids_off + 8 * i) as usize;
                let item = MethodIdItem::read(image, &mut ix).unwrap();
                strings[item.name_idx as usize].clone()
            })
            .collect()
    }

    fn map_list(image: &[u8]) -> Vec<(u16, u32, u32)> {
        let h = header(image);
        let mut ix = h.map_off as usize;
        let count = read_u4(image, &mut ix).unwrap();
        (0..count)
            .map(|_| {
                let type_code = read_u2(image, &mut ix).unwrap();
                read_u2(image, &mut ix).unwrap();
                let size = read_u4(image, &mut ix).unwrap();
                let offset = read_u4(image, &mut ix).unwrap();
                (type_code, size, offset)
            })
            .collect()
    }

    fn caller_module() -> DexBuilder {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Caller");
        let zeta = class.dex().get_or_declare_method(
            &TypeDescriptor::from_classname("pkg.Target"),
            "zeta",
            &Prototype::returning(TypeDescriptor::VOID),
        );
        let alpha = class.dex().get_or_declare_method(
            &TypeDescriptor::from_classname("pkg.Target"),
            "alpha",
            &Prototype::new(TypeDescriptor::VOID, vec![TypeDescriptor::INT]),
        );
        let mut method = class.create_method("call", Prototype::returning(TypeDescriptor::VOID));
        let r = method.alloc_register();
        let r: Value = (&r).into();
        method
            .add_instruction(Instruction::invoke_static(zeta, None, &[]))
            .add_instruction(Instruction::op_with_args(Op::Move, Some(r), &[Value::Immediate(3)]))
            .add_instruction(Instruction::invoke_static(alpha, None, &[r]))
            .add_instruction(Instruction::return_void());
        method.encode().unwrap();
        dex
    }

    #[test]
    fn empty_module() {
        let image = DexBuilder::new().create_image(true).unwrap();
        let h = header(&image);
        assert_eq!(h.file_size as usize, image.len());
        assert_eq!(h.string_ids_off, 0);
        assert_eq!(h.class_defs_off, 0);
        assert_eq!(h.data_off, HEADER_SIZE);
        assert_eq!(h.map_off, HEADER_SIZE);
        assert_eq!(image.len(), HEADER_SIZE as usize + 4 + 2 * 12);
        assert_eq!(map_list(&image), vec![(TYPE_HEADER_ITEM, 1, 0), (TYPE_MAP_LIST, 1, HEADER_SIZE)]);
    }

    #[test]
    fn header_integrity() {
        let image = caller_module().create_image(true).unwrap();
        let h = header(&image);
        assert_eq!(&image[..8], b"dex\n035\0");
        assert_eq!(h.file_size as usize, image.len());
        assert_eq!(h.header_size, 0x70);
        assert_eq!(h.endian_tag, ENDIAN_CONSTANT);
        assert_eq!(h.data_off + h.data_size, h.file_size);
        assert_eq!(h.map_off % 4, 0);
        assert_eq!(h.checksum, adler32_slice(&image[12..]));
        assert_eq!(h.signature, compute_sha1(&image[32..]));
    }

    #[test]
    fn checksum_and_signature_are_optional() {
        let dex = caller_module();
        let image = dex
            .create_image_with(&ImageOptions {
                checksum: false,
                signature: false,
            })
            .unwrap();
        let h = header(&image);
        assert_eq!(h.checksum, 0);
        assert_eq!(h.signature, [0; 20]);

        let without_checksum = dex.create_image(false).unwrap();
        assert_eq!(header(&without_checksum).checksum, 0);
        assert_ne!(header(&without_checksum).signature, [0; 20]);
        assert_eq!(&without_checksum[32..], &dex.create_image(true).unwrap()[32..]);
    }

    #[test]
    fn pools_are_sorted_and_code_is_remapped() {
        let image = caller_module().create_image(true).unwrap();
        let strings = strings(&image);
        let mut sorted = strings.clone();
        sorted.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
        assert_eq!(strings, sorted);
        assert!(strings.contains(&"zeta".to_string()));

        let names = method_names(&image);
        assert_eq!(names, vec!["call", "alpha", "zeta"]);

        let h = header(&image);
        let code_item = map_list(&image)
            .into_iter()
            .find(|(type_code, _, _)| *type_code == TYPE_CODE_ITEM)
            .unwrap();
        assert_eq!(code_item.1, 1);
        let mut ix = code_item.2 as usize;
        let code = CodeItem::read(&image, &mut ix).unwrap();
        // invoke-static {} zeta; const/4 v0, 3; invoke-static {v0} alpha; return-void
        assert_eq!(code.insns, vec![0x0071, 2, 0x0000, 0x3012, 0x1071, 1, 0x0000, 0x000e]);
        assert!(code_item.2 >= h.data_off);
    }

    #[test]
    fn map_list_is_ordered_by_offset() {
        let image = caller_module().create_image(true).unwrap();
        let items = map_list(&image);
        assert_eq!(items[0], (TYPE_HEADER_ITEM, 1, 0));
        assert!(items.windows(2).all(|w| w[0].2 < w[1].2));
        let codes: Vec<u16> = items.iter().map(|i| i.0).collect();
        assert_eq!(
            codes,
            vec![
                TYPE_HEADER_ITEM,
                TYPE_STRING_ID_ITEM,
                TYPE_TYPE_ID_ITEM,
                TYPE_PROTO_ID_ITEM,
                TYPE_METHOD_ID_ITEM,
                TYPE_CLASS_DEF_ITEM,
                TYPE_STRING_DATA_ITEM,
                TYPE_TYPE_LIST,
                TYPE_CODE_ITEM,
                TYPE_CLASS_DATA_ITEM,
                TYPE_MAP_LIST,
            ]
        );
    }

    #[test]
    fn type_lists_are_shared() {
        let mut dex = DexBuilder::new();
        dex.get_or_encode_proto(&Prototype::new(TypeDescriptor::VOID, vec![TypeDescriptor::INT]));
        dex.get_or_encode_proto(&Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::INT]));
        dex.get_or_encode_proto(&Prototype::new(TypeDescriptor::INT, vec![TypeDescriptor::LONG]));
        dex.get_or_encode_proto(&Prototype::returning(TypeDescriptor::INT));
        let image = dex.create_image(true).unwrap();
        let type_list = map_list(&image)
            .into_iter()
            .find(|(type_code, _, _)| *type_code == TYPE_TYPE_LIST)
            .unwrap();
        assert_eq!(type_list.1, 2);

        let h = header(&image);
        let mut offsets = vec![];
        for i in 0..h.proto_ids_size {
            let mut ix = (h.proto_ids_off + 12 * i) as usize;
            offsets.push(ProtoIdItem::read(&image, &mut ix).unwrap().parameters_off);
        }
        // Return types sort I before V, parameterless protos come first.
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[1], offsets[3]);
        assert_ne!(offsets[1], offsets[2]);
    }

    #[test]
    fn superclasses_come_first() {
        let mut dex = DexBuilder::new();
        dex.make_class("pkg.Child")
            .set_super_class(&TypeDescriptor::from_classname("pkg.Base"));
        dex.make_class("pkg.Base");
        let image = dex.create_image(true).unwrap();
        let h = header(&image);
        let strings = strings(&image);
        let mut type_names = vec![];
        for i in 0..h.type_ids_size {
            let mut ix = (h.type_ids_off + 4 * i) as usize;
            type_names.push(strings[read_u4(&image, &mut ix).unwrap() as usize].clone());
        }
        let mut defined = vec![];
        for i in 0..h.class_defs_size {
            let mut ix = (h.class_defs_off + 32 * i) as usize;
            defined.push(type_names[read_u4(&image, &mut ix).unwrap() as usize].clone());
        }
        assert_eq!(defined, vec!["Lpkg/Base;", "Lpkg/Child;"]);
    }

    #[test]
    fn circular_hierarchy_is_rejected() {
        let mut dex = DexBuilder::new();
        dex.make_class("pkg.A")
            .set_super_class(&TypeDescriptor::from_classname("pkg.B"));
        dex.make_class("pkg.B")
            .set_super_class(&TypeDescriptor::from_classname("pkg.A"));
        let err = dex.create_image(true).unwrap_err();
        assert_eq!(err.kind(), crate::dex::error::DexErrorKind::Format);
    }

    #[test]
    fn too_many_types() {
        let mut dex = DexBuilder::new();
        for i in 0..=MAX_INDEXED_ITEMS {
            dex.get_or_add_type(&TypeDescriptor::from_classname(&format!("p.C{}", i)));
        }
        let err = dex.create_image(true).unwrap_err();
        assert_eq!(err.kind(), crate::dex::error::DexErrorKind::Format);
    }

    #[test]
    fn class_data_lists_members() {
        let mut dex = DexBuilder::new();
        let mut class = dex.make_class("pkg.Members");
        class.create_field("b", TypeDescriptor::INT).encode().unwrap();
        class.create_field("a", TypeDescriptor::INT).encode().unwrap();
        let mut method = class.create_method("m", Prototype::returning(TypeDescriptor::VOID));
        method.add_instruction(Instruction::return_void());
        method.encode().unwrap();
        let image = dex.create_image(true).unwrap();

        let class_data = map_list(&image)
            .into_iter()
            .find(|(type_code, _, _)| *type_code == TYPE_CLASS_DATA_ITEM)
            .unwrap();
        let mut ix = class_data.2 as usize;
        let item = ClassDataItem::read(&image, &mut ix).unwrap();
        assert_eq!(item.static_fields.len(), 2);
        assert!(item.static_fields[0].field_idx < item.static_fields[1].field_idx);
        assert_eq!(item.direct_methods.len(), 1);
        assert_ne!(item.direct_methods[0].code_off, 0);
        assert!(item.virtual_methods.is_empty());
    }
}
