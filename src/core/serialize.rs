// Canonical byte encoding helpers
//
// Every length is a Bitcoin CompactSize varint. Signing and block hashing
// both depend on these exact bytes.

/// Write a variable-length integer (VarInt)
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => {
            buf.push(value as u8);
        }
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffffffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Write a UTF-8 string with length prefix
pub fn write_var_str(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

/// Write a counted list of strings, preserving order
pub fn write_str_list<S: AsRef<str>>(buf: &mut Vec<u8>, items: &[S]) {
    write_varint(buf, items.len() as u64);
    for item in items {
        write_var_str(buf, item.as_ref());
    }
}
