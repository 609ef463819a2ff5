/// Appends `value` as unsigned LEB128, returning the number of bytes written.
pub(crate) fn encode_uleb128_into(buffer: &mut Vec<u8>, value: u32) -> usize {
    let start = buffer.len();
    let mut remaining = value;
    loop {
        let byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining == 0 {
            buffer.push(byte);
            break;
        }
        buffer.push(byte | 0x80);
    }
    buffer.len() - start
}

pub(crate) fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::with_capacity(5);
    encode_uleb128_into(&mut result, value);
    result
}

#[cfg(test)]
/// Decodes an unsigned LEB128 value, returning it with the number of bytes consumed.
///
/// Values are 32-bit in DEX so at most five bytes are read.
pub(crate) fn decode_uleb128(encoded: &[u8]) -> (u32, usize) {
    let mut value: u32 = 0;
    let mut count: usize = 0;

    for (i, &byte) in encoded.iter().take(5).enumerate() {
        count += 1;
        value |= ((byte & 0x7f) as u32).wrapping_shl(7 * i as u32);
        if byte & 0x80 == 0 {
            break;
        }
    }

    (value, count)
}
