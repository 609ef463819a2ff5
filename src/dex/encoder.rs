//! Bit-exact packing of instruction formats into 16-bit code units.
//!
//! Naming follows the Dalvik format ids: the first digit is the size in code units, the second
//! the number of registers and the letter the kind of extra operand.

use crate::dex::error::DexError;
use crate::dex::opcodes::opcode_name;

fn check_unsigned(op: u8, what: &str, value: usize, bits: u32) -> Result<u16, DexError> {
    if value >> bits != 0 {
        fail!(
            InvariantViolation,
            "{} {} does not fit in {} bits for {}",
            what,
            value,
            bits,
            opcode_name(op)
        );
    }
    Ok(value as u16)
}

fn check_signed(op: u8, what: &str, value: i64, bits: u32) -> Result<u16, DexError> {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if value < min || value > max {
        fail!(
            InvariantViolation,
            "{} {} does not fit in {} signed bits for {}",
            what,
            value,
            bits,
            opcode_name(op)
        );
    }
    Ok((value as u16) & (((1u32 << bits) - 1) as u16))
}

pub(crate) fn encode_10x(buffer: &mut Vec<u16>, op: u8) {
    buffer.push(op as u16);
}

pub(crate) fn encode_11x(buffer: &mut Vec<u16>, op: u8, a: usize) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    buffer.push(op as u16 | (a << 8));
    Ok(())
}

pub(crate) fn encode_11n(buffer: &mut Vec<u16>, op: u8, a: usize, b: i64) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 4)?;
    let b = check_signed(op, "literal", b, 4)?;
    buffer.push(op as u16 | (a << 8) | (b << 12));
    Ok(())
}

pub(crate) fn encode_21s(buffer: &mut Vec<u16>, op: u8, a: usize, b: i64) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    let b = check_signed(op, "literal", b, 16)?;
    buffer.push(op as u16 | (a << 8));
    buffer.push(b);
    Ok(())
}

/// Branch offsets are signed code units relative to the branch instruction.
pub(crate) fn encode_21t(buffer: &mut Vec<u16>, op: u8, a: usize, offset: i64) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    let offset = check_signed(op, "branch offset", offset, 16)?;
    buffer.push(op as u16 | (a << 8));
    buffer.push(offset);
    Ok(())
}

pub(crate) fn encode_21c(buffer: &mut Vec<u16>, op: u8, a: usize, index: u32) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    let index = check_unsigned(op, "index", index as usize, 16)?;
    buffer.push(op as u16 | (a << 8));
    buffer.push(index);
    Ok(())
}

pub(crate) fn encode_22c(buffer: &mut Vec<u16>, op: u8, a: usize, b: usize, index: u32) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 4)?;
    let b = check_unsigned(op, "register", b, 4)?;
    let index = check_unsigned(op, "index", index as usize, 16)?;
    buffer.push(op as u16 | (a << 8) | (b << 12));
    buffer.push(index);
    Ok(())
}

pub(crate) fn encode_23x(buffer: &mut Vec<u16>, op: u8, a: usize, b: usize, c: usize) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    let b = check_unsigned(op, "register", b, 8)?;
    let c = check_unsigned(op, "register", c, 8)?;
    buffer.push(op as u16 | (a << 8));
    buffer.push(b | (c << 8));
    Ok(())
}

pub(crate) fn encode_31i(buffer: &mut Vec<u16>, op: u8, a: usize, b: i64) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 8)?;
    if b < i32::MIN as i64 || b > i32::MAX as i64 {
        fail!(InvariantViolation, "literal {} does not fit in 32 bits for {}", b, opcode_name(op));
    }
    let b = b as i32 as u32;
    buffer.push(op as u16 | (a << 8));
    buffer.push(b as u16);
    buffer.push((b >> 16) as u16);
    Ok(())
}

pub(crate) fn encode_32x(buffer: &mut Vec<u16>, op: u8, a: usize, b: usize) -> Result<(), DexError> {
    let a = check_unsigned(op, "register", a, 16)?;
    let b = check_unsigned(op, "register", b, 16)?;
    buffer.push(op as u16);
    buffer.push(a);
    buffer.push(b);
    Ok(())
}

/// Up to five 4-bit argument registers, count in the high nibble of the first unit.
pub(crate) fn encode_35c(buffer: &mut Vec<u16>, op: u8, index: u32, args: &[usize]) -> Result<(), DexError> {
    if args.len() > 5 {
        fail!(InvariantViolation, "{} arguments exceed the 5 allowed by {}", args.len(), opcode_name(op));
    }
    let mut regs = [0u16; 5];
    for (slot, arg) in regs.iter_mut().zip(args) {
        *slot = check_unsigned(op, "argument register", *arg, 4)?;
    }
    let index = check_unsigned(op, "index", index as usize, 16)?;
    let count = args.len() as u16;
    buffer.push(op as u16 | (regs[4] << 8) | (count << 12));
    buffer.push(index);
    buffer.push(regs[0] | (regs[1] << 4) | (regs[2] << 8) | (regs[3] << 12));
    Ok(())
}

/// `count` consecutive registers starting at `first`.
pub(crate) fn encode_3rc(buffer: &mut Vec<u16>, op: u8, index: u32, count: usize, first: usize) -> Result<(), DexError> {
    let count = check_unsigned(op, "argument count", count, 8)?;
    let index = check_unsigned(op, "index", index as usize, 16)?;
    let first = check_unsigned(op, "first register", first, 16)?;
    buffer.push(op as u16 | (count << 8));
    buffer.push(index);
    buffer.push(first);
    Ok(())
}
