//! 4-state logic values and numeric literal parsing.
//!
//! Directive arguments that are numeric literals (`3`, `-1`, `8'b1101_x001`, `'hff`) are parsed into a
//! [`LogicValue`] so the renderer can reproduce the front end's display rules, including the rules for values
//! that carry unknown (`x`) or high-impedance (`z`) bits.

use std::fmt;

/// One 4-state bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
    X,
    Z,
}

impl Bit {
    fn is_known(self) -> bool {
        matches!(self, Bit::Zero | Bit::One)
    }
}

/// A packed 4-state value. Bits are stored most significant first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicValue {
    bits: Vec<Bit>,
    signed: bool,
}

/// Width of an unsized integer literal.
pub const INTEGER_WIDTH: usize = 32;

/// Widest literal accepted, the minimum every IEEE 1800 tool must support.
pub const MAX_LITERAL_WIDTH: usize = 1 << 16;

/// Errors from numeric literal parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    Empty,
    InvalidSize(String),
    /// Declared size, or digit count, past [`MAX_LITERAL_WIDTH`].
    TooWide(String),
    InvalidBase(char),
    InvalidDigit { digit: char, base: u32 },
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::Empty => write!(f, "empty numeric literal"),
            LiteralError::InvalidSize(size) => write!(f, "invalid literal size '{}'", size),
            LiteralError::TooWide(size) => {
                write!(f, "literal size '{}' exceeds the {}-bit limit", size, MAX_LITERAL_WIDTH)
            }
            LiteralError::InvalidBase(base) => write!(f, "invalid literal base '{}'", base),
            LiteralError::InvalidDigit { digit, base } => {
                write!(f, "digit '{}' is not valid in base {}", digit, base)
            }
        }
    }
}

impl std::error::Error for LiteralError {}

impl LogicValue {
    /// Build a value from explicit bits (most significant first).
    pub fn from_bits(bits: Vec<Bit>, signed: bool) -> Self {
        let bits = if bits.is_empty() { vec![Bit::Zero] } else { bits };
        Self { bits, signed }
    }

    /// Build a known, unsigned value of `width` bits from an integer.
    pub fn from_u128(value: u128, width: usize) -> Self {
        let bits = (0..width)
            .rev()
            .map(|i| if i < 128 && (value >> i) & 1 == 1 { Bit::One } else { Bit::Zero })
            .collect();
        Self::from_bits(bits, false)
    }

    /// Build a signed 32-bit integer value, the type of an unsized decimal literal.
    pub fn from_i64(value: i64) -> Self {
        let raw = value as i128 as u128;
        let mut v = Self::from_u128(raw, INTEGER_WIDTH.max(bits_needed(value)));
        v.signed = true;
        v
    }

    /// Pack a byte string the way a string literal is packed into an integral value (8 bits per byte).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|b| (0..8).rev().map(move |i| if (b >> i) & 1 == 1 { Bit::One } else { Bit::Zero }))
            .collect();
        Self::from_bits(bits, false)
    }

    /// Parse a numeric literal as written in HDL source.
    ///
    /// Accepts unsized decimals (`42`, `-7`, `1_000`), based literals with an optional size and sign flag
    /// (`8'b1101_x001`, `'hFF`, `4'sd3`, `16'hx`) and the unbased fill literals `'0`, `'1`, `'x`, `'z`.
    pub fn parse(text: &str) -> Result<Self, LiteralError> {
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if text.is_empty() {
            return Err(LiteralError::Empty);
        }

        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.as_str()),
        };

        let Some(tick) = body.find('\'') else {
            let value = parse_unsized_decimal(body)?;
            return Ok(if negative {
                Self::from_i64(-value)
            } else {
                Self::from_i64(value)
            });
        };

        let (size_text, rest) = body.split_at(tick);
        let rest = &rest[1..];
        let size = if size_text.is_empty() {
            None
        } else {
            let digits: String = size_text.chars().filter(|c| *c != '_').collect();
            match digits.parse::<usize>() {
                Ok(n) if n > MAX_LITERAL_WIDTH => return Err(LiteralError::TooWide(size_text.to_string())),
                Ok(0) => return Err(LiteralError::InvalidSize(size_text.to_string())),
                Ok(n) => Some(n),
                Err(_) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                    return Err(LiteralError::TooWide(size_text.to_string()));
                }
                Err(_) => return Err(LiteralError::InvalidSize(size_text.to_string())),
            }
        };

        let mut chars = rest.chars().peekable();
        let mut signed = false;
        if matches!(chars.peek(), Some('s' | 'S')) {
            signed = true;
            chars.next();
        }

        let Some(base_char) = chars.next() else {
            return Err(LiteralError::Empty);
        };

        // Unbased unsized fill literal: '0, '1, 'x, 'z
        if size.is_none() && !signed && chars.peek().is_none() {
            if let Some(bit) = fill_bit(base_char) {
                return Ok(Self::from_bits(vec![bit], false));
            }
        }

        let base = match base_char.to_ascii_lowercase() {
            'b' => 2,
            'o' => 8,
            'd' => 10,
            'h' => 16,
            other => return Err(LiteralError::InvalidBase(other)),
        };

        let digits: String = chars.filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(LiteralError::Empty);
        }
        let bits_per_digit = if base == 16 { 4 } else if base == 2 { 1 } else { 3 };
        if digits.chars().count().saturating_mul(bits_per_digit) > MAX_LITERAL_WIDTH {
            return Err(LiteralError::TooWide(format!("{} digits", digits.chars().count())));
        }

        let mut bits = if base == 10 {
            decimal_digits_to_bits(&digits)?
        } else {
            radix_digits_to_bits(&digits, base)?
        };

        let width = size.unwrap_or_else(|| bits.len().max(INTEGER_WIDTH));
        bits = resize(bits, width);

        let mut value = Self::from_bits(bits, signed);
        if negative {
            value = value.negate();
        }
        Ok(value)
    }

    /// Number of bits in the value.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Bits, most significant first.
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// Whether the value is signed.
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Whether every bit is 0 or 1.
    pub fn is_known(&self) -> bool {
        self.bits.iter().all(|b| b.is_known())
    }

    /// Whether the value is signed and its sign bit is set.
    pub fn is_negative(&self) -> bool {
        self.signed && self.bits.first() == Some(&Bit::One)
    }

    /// Two's complement negation. Unknown bits make the whole result unknown.
    pub fn negate(&self) -> Self {
        if !self.is_known() {
            return Self::from_bits(vec![Bit::X; self.bits.len()], self.signed);
        }
        let mut bits: Vec<Bit> = self
            .bits
            .iter()
            .map(|b| if *b == Bit::One { Bit::Zero } else { Bit::One })
            .collect();
        for bit in bits.iter_mut().rev() {
            if *bit == Bit::Zero {
                *bit = Bit::One;
                break;
            }
            *bit = Bit::Zero;
        }
        Self::from_bits(bits, self.signed)
    }

    /// Render as decimal following the display rules for unknown bits.
    ///
    /// - all bits `x` → `x`, all bits `z` → `z`
    /// - some bits `x` → `X`, otherwise some bits `z` → `Z`
    pub fn to_decimal(&self) -> String {
        if !self.is_known() {
            return unknown_digit(&self.bits, 'x', 'X', 'z', 'Z').to_string();
        }
        if self.is_negative() {
            format!("-{}", magnitude_to_decimal(self.negate().bits()))
        } else {
            magnitude_to_decimal(&self.bits)
        }
    }

    /// Render in a power-of-two radix (2, 8 or 16) without leading zeros.
    pub fn to_radix(&self, bits_per_digit: usize) -> String {
        let pad = (bits_per_digit - self.bits.len() % bits_per_digit) % bits_per_digit;
        let mut padded = vec![Bit::Zero; pad];
        padded.extend_from_slice(&self.bits);

        let digits: String = padded
            .chunks(bits_per_digit)
            .map(|group| {
                if group.iter().all(|b| b.is_known()) {
                    let value = group.iter().fold(0u32, |acc, b| (acc << 1) | u32::from(*b == Bit::One));
                    char::from_digit(value, 1 << bits_per_digit).unwrap_or('?')
                } else {
                    unknown_digit(group, 'x', 'X', 'z', 'Z')
                }
            })
            .collect();

        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
    }

    /// Interpret the value as packed 8-bit characters, dropping leading NUL bytes.
    ///
    /// Returns `None` when any bit is unknown.
    pub fn to_packed_string(&self) -> Option<String> {
        if !self.is_known() {
            return None;
        }
        let pad = (8 - self.bits.len() % 8) % 8;
        let mut padded = vec![Bit::Zero; pad];
        padded.extend_from_slice(&self.bits);
        let bytes: Vec<u8> = padded
            .chunks(8)
            .map(|group| group.iter().fold(0u8, |acc, b| (acc << 1) | u8::from(*b == Bit::One)))
            .skip_while(|b| *b == 0)
            .collect();
        Some(bytes.iter().map(|b| char::from(*b)).collect())
    }

    /// Low 8 bits as a character; `None` when any of them is unknown.
    pub fn low_byte_char(&self) -> Option<char> {
        let start = self.bits.len().saturating_sub(8);
        let low = &self.bits[start..];
        if !low.iter().all(|b| b.is_known()) {
            return None;
        }
        let byte = low.iter().fold(0u8, |acc, b| (acc << 1) | u8::from(*b == Bit::One));
        Some(char::from(byte))
    }
}

fn bits_needed(value: i64) -> usize {
    (i64::BITS - value.unsigned_abs().leading_zeros()) as usize + 1
}

fn fill_bit(c: char) -> Option<Bit> {
    match c {
        '0' => Some(Bit::Zero),
        '1' => Some(Bit::One),
        'x' | 'X' => Some(Bit::X),
        'z' | 'Z' | '?' => Some(Bit::Z),
        _ => None,
    }
}

fn unknown_digit(bits: &[Bit], all_x: char, some_x: char, all_z: char, some_z: char) -> char {
    if bits.iter().all(|b| *b == Bit::X) {
        all_x
    } else if bits.iter().all(|b| *b == Bit::Z) {
        all_z
    } else if bits.contains(&Bit::X) {
        some_x
    } else {
        some_z
    }
}

fn parse_unsized_decimal(text: &str) -> Result<i64, LiteralError> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() {
        return Err(LiteralError::Empty);
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_digit()) {
        return Err(LiteralError::InvalidDigit { digit: bad, base: 10 });
    }
    digits
        .parse::<i64>()
        .map_err(|_| LiteralError::InvalidSize(text.to_string()))
}

fn radix_digits_to_bits(digits: &str, base: u32) -> Result<Vec<Bit>, LiteralError> {
    let per_digit = match base {
        2 => 1,
        8 => 3,
        _ => 4,
    };
    let mut bits = Vec::with_capacity(digits.len() * per_digit);
    for c in digits.chars() {
        if let Some(fill) = fill_bit(c).filter(|b| !b.is_known()) {
            bits.extend(std::iter::repeat_n(fill, per_digit));
            continue;
        }
        let value = c.to_digit(base).ok_or(LiteralError::InvalidDigit { digit: c, base })?;
        bits.extend((0..per_digit).rev().map(|i| if (value >> i) & 1 == 1 { Bit::One } else { Bit::Zero }));
    }
    Ok(bits)
}

fn decimal_digits_to_bits(digits: &str) -> Result<Vec<Bit>, LiteralError> {
    // A based decimal literal is either all digits or a single x/z digit.
    if digits.chars().count() == 1 {
        if let Some(fill) = digits.chars().next().and_then(fill_bit).filter(|b| !b.is_known()) {
            return Ok(vec![fill]);
        }
    }
    // Accumulate in base 2^32 limbs, least significant first.
    let mut limbs: Vec<u32> = vec![0];
    for c in digits.chars() {
        let digit = c.to_digit(10).ok_or(LiteralError::InvalidDigit { digit: c, base: 10 })?;
        let mut carry = u64::from(digit);
        for limb in limbs.iter_mut() {
            let acc = u64::from(*limb) * 10 + carry;
            *limb = acc as u32;
            carry = acc >> 32;
        }
        if carry > 0 {
            limbs.push(carry as u32);
        }
    }
    let mut bits: Vec<Bit> = limbs
        .iter()
        .rev()
        .flat_map(|limb| (0..32).rev().map(move |i| if (limb >> i) & 1 == 1 { Bit::One } else { Bit::Zero }))
        .skip_while(|b| *b == Bit::Zero)
        .collect();
    if bits.is_empty() {
        bits.push(Bit::Zero);
    }
    Ok(bits)
}

/// Truncate (keep low bits) or extend to `width`. Extension repeats a leading `x`/`z`, otherwise zero-fills.
fn resize(bits: Vec<Bit>, width: usize) -> Vec<Bit> {
    if bits.len() >= width {
        return bits[bits.len() - width..].to_vec();
    }
    let fill = match bits.first() {
        Some(Bit::X) => Bit::X,
        Some(Bit::Z) => Bit::Z,
        _ => Bit::Zero,
    };
    let mut out = vec![fill; width - bits.len()];
    out.extend(bits);
    out
}

/// Decimal text of an unsigned, fully known bit vector (any width).
fn magnitude_to_decimal(bits: &[Bit]) -> String {
    let mut limbs: Vec<u32> = Vec::new();
    for chunk in bits.rchunks(32) {
        limbs.push(chunk.iter().fold(0u32, |acc, b| (acc << 1) | u32::from(*b == Bit::One)));
    }
    // limbs is least significant first
    let mut digits = Vec::new();
    while limbs.iter().any(|l| *l != 0) {
        let mut rem = 0u64;
        for limb in limbs.iter_mut().rev() {
            let acc = (rem << 32) | u64::from(*limb);
            *limb = (acc / 10) as u32;
            rem = acc % 10;
        }
        digits.push(char::from(b'0' + rem as u8));
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().collect()
}
