use crate::bits::reader::{read_u32, read_u64};

/// Parse a box header from a byte slice advancing the cursor.
/// Returns the box name and its total size including the header.
pub fn parse_box_header(data: &[u8], pos: &mut usize) -> Option<(String, u64)> {
    if *pos + 8 > data.len() {
        return None;
    }
    let size = read_u32(data, pos)? as u64;
    let name = &data[*pos..*pos + 4];
    *pos += 4;
    let mut real_size = size;
    if size == 1 {
        if *pos + 8 > data.len() {
            return None;
        }
        real_size = read_u64(data, pos)?;
    }
    Some((std::str::from_utf8(name).ok()?.to_string(), real_size))
}

/// Write a box header to a vector
pub fn write_box_header(output: &mut Vec<u8>, name: &str, size: u32) {
    output.extend_from_slice(&size.to_be_bytes());
    output.extend_from_slice(name.as_bytes());
}

/// Find a box among the children of `data` and return the contained slice
pub fn find_box<'a>(data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let (_, start, end) = find_box_range(data, name)?;
    Some(&data[start..end])
}

/// Find a box and return the start and end indices of its payload
pub fn find_box_range(data: &[u8], name: &str) -> Option<(usize, usize, usize)> {
    let mut pos = 0usize;
    let mut iterations = 0; // safety counter against corrupt size fields

    while pos + 8 <= data.len() && iterations < 10000 {
        let start = pos;
        let (box_name, size) = parse_box_header(data, &mut pos)?;

        if size == 0 {
            iterations += 1;
            continue;
        }

        if size < 8 {
            return None;
        }

        if size as usize > data.len() - start {
            return None;
        }

        let payload_start = pos;
        let payload_end = start + size as usize;

        if box_name == name {
            return Some((start, payload_start, payload_end));
        }

        pos = payload_end;
        iterations += 1;

        if pos <= start {
            return None;
        }
    }
    None
}
