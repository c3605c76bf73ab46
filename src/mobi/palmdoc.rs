/// PalmDOC LZ77 decompression
///
/// Each input byte is one of:
/// - `0x01..=0x08`: copy the next `n` bytes literally
/// - `0x00`, `0x09..=0x7F`: literal byte
/// - `0x80..=0xBF`: back-reference, combined with the next byte:
///   distance = `(pair & 0x3FFF) >> 3`, length = `(pair & 7) + 3`
/// - `0xC0..=0xFF`: space followed by `byte ^ 0x80`
pub fn decompress(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut i = 0;

    while i < input.len() {
        let c = input[i];
        i += 1;

        match c {
            0x01..=0x08 => {
                let end = (i + c as usize).min(input.len());
                output.extend_from_slice(&input[i..end]);
                i = end;
            }
            0x00 | 0x09..=0x7F => output.push(c),
            0xC0..=0xFF => {
                output.push(b' ');
                output.push(c ^ 0x80);
            }
            _ => {
                let Some(&next) = input.get(i) else {
                    break;
                };
                i += 1;

                let pair = u16::from_be_bytes([c, next]);
                let distance = usize::from((pair & 0x3FFF) >> 3);
                let length = usize::from(pair & 7) + 3;

                if distance == 0 || distance > output.len() {
                    continue;
                }
                // Byte by byte: the copy may overlap what it produces.
                for _ in 0..length {
                    output.push(output[output.len() - distance]);
                }
            }
        }
    }

    output
}
