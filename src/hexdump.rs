use std::fmt::Write;

use itertools::Itertools;

const BYTES_PER_LINE: usize = 16;

/// Render bytes in the canonical hex+ASCII layout, 16 bytes per line:
///
/// ```text
/// 00000000  47 6f 20 69 73 20 61 6e  20 6f 70 65 6e 20 73 6f  |Go is an open so|
/// ```
pub fn dump(bytes: &[u8]) -> String {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(index, line)| dump_line(index * BYTES_PER_LINE, line))
        .join("\n")
}

fn dump_line(offset: usize, line: &[u8]) -> String {
    let mut out = format!("{offset:08x} ");

    for column in 0..BYTES_PER_LINE {
        if column == BYTES_PER_LINE / 2 {
            out.push(' ');
        }

        match line.get(column) {
            // Writing to a String cannot fail.
            Some(byte) => {
                let _ = write!(out, " {byte:02x}");
            }
            None => out.push_str("   "),
        }
    }

    out.push_str("  |");
    out.extend(line.iter().map(|&byte| {
        if (0x20..=0x7e).contains(&byte) {
            byte as char
        } else {
            '.'
        }
    }));
    out.push('|');

    out
}
