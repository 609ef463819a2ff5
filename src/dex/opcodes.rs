use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Instruction layouts emitted by the method encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Format10x,
    Format11n,
    Format11x,
    Format21c,
    Format21s,
    Format21t,
    Format22c,
    Format23x,
    Format31i,
    Format32x,
    Format35c,
    Format3rc,
}

impl Format {
    /// Returns the size of the format in 16-bit code units.
    pub const fn units(&self) -> usize {
        match self {
            Format::Format10x | Format::Format11n | Format::Format11x => 1,

            Format::Format21c
            | Format::Format21s
            | Format::Format21t
            | Format::Format22c
            | Format::Format23x => 2,

            Format::Format31i | Format::Format32x | Format::Format35c | Format::Format3rc => 3,
        }
    }
}

/// Represents different types of references used by opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    None,
    String,
    Type,
    Field,
    Method,
}

/// Represents an opcode with its associated properties.
#[derive(Debug)]
pub struct Opcode {
    pub value: u8,
    pub name: &'static str,
    pub reference_type: ReferenceType,
    pub format: Format,
}

impl Opcode {
    const fn new(value: u8, name: &'static str, reference_type: ReferenceType, format: Format) -> Opcode {
        Opcode { value, name, reference_type, format }
    }
}

pub const MOVE_16: u8 = 0x03;
pub const MOVE_WIDE_16: u8 = 0x06;
pub const MOVE_OBJECT_16: u8 = 0x09;
pub const MOVE_RESULT: u8 = 0x0a;
pub const MOVE_RESULT_WIDE: u8 = 0x0b;
pub const MOVE_RESULT_OBJECT: u8 = 0x0c;
pub const RETURN_VOID: u8 = 0x0e;
pub const RETURN: u8 = 0x0f;
pub const RETURN_WIDE: u8 = 0x10;
pub const RETURN_OBJECT: u8 = 0x11;
pub const CONST_4: u8 = 0x12;
pub const CONST_16: u8 = 0x13;
pub const CONST: u8 = 0x14;
pub const CONST_WIDE_16: u8 = 0x16;
pub const CONST_WIDE_32: u8 = 0x17;
pub const CONST_STRING: u8 = 0x1a;
pub const CHECK_CAST: u8 = 0x1f;
pub const NEW_INSTANCE: u8 = 0x22;
pub const NEW_ARRAY: u8 = 0x23;
pub const IF_EQZ: u8 = 0x38;
pub const IF_NEZ: u8 = 0x39;
pub const APUT_OBJECT: u8 = 0x4d;
pub const IGET: u8 = 0x52;
pub const IGET_OBJECT: u8 = 0x54;
pub const IPUT: u8 = 0x59;
pub const IPUT_OBJECT: u8 = 0x5b;
pub const SGET: u8 = 0x60;
pub const SGET_OBJECT: u8 = 0x62;
pub const SPUT: u8 = 0x67;
pub const SPUT_OBJECT: u8 = 0x69;
pub const INVOKE_VIRTUAL: u8 = 0x6e;
pub const INVOKE_DIRECT: u8 = 0x70;
pub const INVOKE_STATIC: u8 = 0x71;
pub const INVOKE_INTERFACE: u8 = 0x72;
pub const INVOKE_VIRTUAL_RANGE: u8 = 0x74;
pub const INVOKE_DIRECT_RANGE: u8 = 0x76;
pub const INVOKE_STATIC_RANGE: u8 = 0x77;
pub const INVOKE_INTERFACE_RANGE: u8 = 0x78;

static OPCODES: Lazy<Vec<Opcode>> = Lazy::new(|| {
    use Format::*;
    vec![
        Opcode::new(MOVE_16, "move/16", ReferenceType::None, Format32x),
        Opcode::new(MOVE_WIDE_16, "move-wide/16", ReferenceType::None, Format32x),
        Opcode::new(MOVE_OBJECT_16, "move-object/16", ReferenceType::None, Format32x),
        Opcode::new(MOVE_RESULT, "move-result", ReferenceType::None, Format11x),
        Opcode::new(MOVE_RESULT_WIDE, "move-result-wide", ReferenceType::None, Format11x),
        Opcode::new(MOVE_RESULT_OBJECT, "move-result-object", ReferenceType::None, Format11x),
        Opcode::new(RETURN_VOID, "return-void", ReferenceType::None, Format10x),
        Opcode::new(RETURN, "return", ReferenceType::None, Format11x),
        Opcode::new(RETURN_WIDE, "return-wide", ReferenceType::None, Format11x),
        Opcode::new(RETURN_OBJECT, "return-object", ReferenceType::None, Format11x),
        Opcode::new(CONST_4, "const/4", ReferenceType::None, Format11n),
        Opcode::new(CONST_16, "const/16", ReferenceType::None, Format21s),
        Opcode::new(CONST, "const", ReferenceType::None, Format31i),
        Opcode::new(CONST_WIDE_16, "const-wide/16", ReferenceType::None, Format21s),
        Opcode::new(CONST_WIDE_32, "const-wide/32", ReferenceType::None, Format31i),
        Opcode::new(CONST_STRING, "const-string", ReferenceType::String, Format21c),
        Opcode::new(CHECK_CAST, "check-cast", ReferenceType::Type, Format21c),
        Opcode::new(NEW_INSTANCE, "new-instance", ReferenceType::Type, Format21c),
        Opcode::new(NEW_ARRAY, "new-array", ReferenceType::Type, Format22c),
        Opcode::new(IF_EQZ, "if-eqz", ReferenceType::None, Format21t),
        Opcode::new(IF_NEZ, "if-nez", ReferenceType::None, Format21t),
        Opcode::new(APUT_OBJECT, "aput-object", ReferenceType::None, Format23x),
        Opcode::new(IGET, "iget", ReferenceType::Field, Format22c),
        Opcode::new(IGET_OBJECT, "iget-object", ReferenceType::Field, Format22c),
        Opcode::new(IPUT, "iput", ReferenceType::Field, Format22c),
        Opcode::new(IPUT_OBJECT, "iput-object", ReferenceType::Field, Format22c),
        Opcode::new(SGET, "sget", ReferenceType::Field, Format21c),
        Opcode::new(SGET_OBJECT, "sget-object", ReferenceType::Field, Format21c),
        Opcode::new(SPUT, "sput", ReferenceType::Field, Format21c),
        Opcode::new(SPUT_OBJECT, "sput-object", ReferenceType::Field, Format21c),
        Opcode::new(INVOKE_VIRTUAL, "invoke-virtual", ReferenceType::Method, Format35c),
        Opcode::new(INVOKE_DIRECT, "invoke-direct", ReferenceType::Method, Format35c),
        Opcode::new(INVOKE_STATIC, "invoke-static", ReferenceType::Method, Format35c),
        Opcode::new(INVOKE_INTERFACE, "invoke-interface", ReferenceType::Method, Format35c),
        Opcode::new(INVOKE_VIRTUAL_RANGE, "invoke-virtual/range", ReferenceType::Method, Format3rc),
        Opcode::new(INVOKE_DIRECT_RANGE, "invoke-direct/range", ReferenceType::Method, Format3rc),
        Opcode::new(INVOKE_STATIC_RANGE, "invoke-static/range", ReferenceType::Method, Format3rc),
        Opcode::new(INVOKE_INTERFACE_RANGE, "invoke-interface/range", ReferenceType::Method, Format3rc),
    ]
});

static OPCODES_BY_VALUE: Lazy<HashMap<u8, &'static Opcode>> =
    Lazy::new(|| OPCODES.iter().map(|op| (op.value, op)).collect());

/// Looks up an opcode emitted by this crate from its byte value.
pub fn opcode(value: u8) -> Option<&'static Opcode> {
    OPCODES_BY_VALUE.get(&value).copied()
}

pub fn opcode_name(value: u8) -> &'static str {
    opcode(value).map(|op| op.name).unwrap_or("unknown")
}
