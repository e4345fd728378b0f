/// Parse a numeric literal using the shared assembler grammar.
///
/// Recognised forms, checked in this order:
/// - trailing `H`/`h`: hexadecimal (`0FFH`)
/// - `0x`/`0X` prefix: hexadecimal
/// - trailing `B`/`b`: binary (`1010B`)
/// - anything else: `radix` (10 on the 8086, 16 on the 8051)
///
/// A leading `-` yields the two's-complement value. Returns `None` when the
/// digits do not belong to the selected radix.
pub fn parse(text: &str, radix: u32) -> Option<i64> {
    let t = text.trim();
    let (neg, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, t),
    };
    if t.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = t.strip_suffix(|c: char| c == 'H' || c == 'h') {
        (hex, 16)
    } else if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = t.strip_suffix(|c: char| c == 'B' || c == 'b') {
        (bin, 2)
    } else {
        (t, radix)
    };
    // from_str_radix would accept a second sign here
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let v = i64::from_str_radix(digits, radix).ok()?;
    Some(if neg { -v } else { v })
}

/// Same as [`parse`] but strips an optional leading `#` immediate marker.
pub fn parse_operand(text: &str, radix: u32) -> Option<i64> {
    let t = text.trim();
    parse(t.strip_prefix('#').unwrap_or(t), radix)
}

/// Bit count of `value` within its low byte, used by both parity conventions.
pub fn low_byte_ones(value: u32) -> u32 {
    (value & 0xFF).count_ones()
}
