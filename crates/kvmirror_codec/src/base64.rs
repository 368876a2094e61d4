//! Standard padded base64 (RFC 4648 section 4).

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: u8 = b'=';

/// Encodes `bytes` with padding.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);
        let triple = (u32::from(b0) << 16) | (u32::from(b1) << 8) | u32::from(b2);

        out.push(sextet(triple >> 18));
        out.push(sextet(triple >> 12));
        out.push(if chunk.len() > 1 {
            sextet(triple >> 6)
        } else {
            PAD as char
        });
        out.push(if chunk.len() > 2 {
            sextet(triple)
        } else {
            PAD as char
        });
    }
    out
}

fn sextet(bits: u32) -> char {
    ALPHABET[(bits & 0x3f) as usize] as char
}

fn value_of(symbol: u8) -> Option<u32> {
    let value = match symbol {
        b'A'..=b'Z' => symbol - b'A',
        b'a'..=b'z' => symbol - b'a' + 26,
        b'0'..=b'9' => symbol - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u32::from(value))
}

/// Decodes padded base64, returning a description of the first problem.
pub fn decode(text: &str) -> Result<Vec<u8>, String> {
    let input = text.as_bytes();
    if input.len() % 4 != 0 {
        return Err(format!("base64 length {} is not a multiple of 4", input.len()));
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let quads = input.len() / 4;
    for (index, quad) in input.chunks(4).enumerate() {
        let padding = quad.iter().rev().take_while(|&&b| b == PAD).count();
        if padding > 2 || (padding > 0 && index + 1 != quads) {
            return Err("misplaced base64 padding".to_string());
        }

        let mut triple = 0u32;
        for (offset, &symbol) in quad[..4 - padding].iter().enumerate() {
            let value = value_of(symbol)
                .ok_or_else(|| format!("invalid base64 symbol {:?}", symbol as char))?;
            triple |= value << (18 - 6 * offset);
        }

        out.push((triple >> 16) as u8);
        if padding < 2 {
            out.push((triple >> 8) as u8);
        }
        if padding < 1 {
            out.push(triple as u8);
        }
    }
    Ok(out)
}
