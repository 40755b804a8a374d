use std::fmt::Write;

/// Classic hex dump: offset, 16 hex bytes, ASCII column.
pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let mut hexs = String::with_capacity(48);
        for b in chunk {
            let _ = write!(hexs, "{b:02x} ");
        }
        let ascii: String = chunk
            .iter()
            .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '.' })
            .collect();
        let _ = writeln!(out, "{offs:08x}  {hexs:<48}  |{ascii}|");
    }
    out
}
