//! Constant arithmetic and literal decoding
//!
//! Values are exact for integers up to 128 bits. Floats use f64, which is
//! plenty for the enum-style constants generators care about.

use crate::types::{BasicKind, Constant};

pub type ConstResult<T> = std::result::Result<T, String>;

/// Decode an integer literal: decimal, `0x`, `0o`, `0b`, legacy octal, `_` separators
pub fn parse_int(text: &str) -> Option<i128> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    i128::from_str_radix(digits, radix).ok()
}

pub fn parse_float(text: &str) -> Option<f64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    clean.parse().ok()
}

/// Decode a rune literal such as `'a'`, `'\n'` or `'é'`
pub fn parse_rune(text: &str) -> Option<i128> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let decoded = unescape(inner, '\'')?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c as i128)
}

/// Decode an interpreted (`"..."`) or raw (`` `...` ``) string literal
pub fn unquote(text: &str) -> Option<String> {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Some(raw.replace('\r', ""));
    }
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    unescape(inner, '"')
}

fn unescape(s: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars.next()?;
        let decoded = match esc {
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0b}',
            '\\' => '\\',
            c if c == quote => c,
            'x' => hex_char(&mut chars, 2)?,
            'u' => hex_char(&mut chars, 4)?,
            'U' => hex_char(&mut chars, 8)?,
            '0'..='7' => {
                let mut value = esc.to_digit(8)?;
                for _ in 0..2 {
                    value = value * 8 + chars.next()?.to_digit(8)?;
                }
                char::from_u32(value)?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, width: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..width {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

/// Untyped constant kind a literal value defaults to
pub fn default_kind(value: &Constant) -> BasicKind {
    match value {
        Constant::Bool(_) => BasicKind::UntypedBool,
        Constant::String(_) => BasicKind::UntypedString,
        Constant::Int(_) => BasicKind::UntypedInt,
        Constant::Float(_) => BasicKind::UntypedFloat,
    }
}

/// Apply a binary operator. Comparisons yield `Bool`.
pub fn binary_op(op: &str, x: &Constant, y: &Constant) -> ConstResult<Constant> {
    use Constant::*;
    match (x, y) {
        (Int(a), Int(b)) => int_op(op, *a, *b),
        (Int(_), Float(_)) | (Float(_), Int(_)) | (Float(_), Float(_)) => {
            let a = x.as_float().unwrap_or_default();
            let b = y.as_float().unwrap_or_default();
            if matches!(op, "<<" | ">>") {
                return match (x.as_int(), y.as_int()) {
                    (Some(a), Some(b)) => int_op(op, a, b),
                    _ => Err(format!("invalid shift of {} by {}", x, y)),
                };
            }
            float_op(op, a, b)
        }
        (String(a), String(b)) => match op {
            "+" => Ok(String(format!("{}{}", a, b))),
            _ => compare(op, a.cmp(b)).map(Bool),
        },
        (Bool(a), Bool(b)) => match op {
            "&&" => Ok(Bool(*a && *b)),
            "||" => Ok(Bool(*a || *b)),
            "==" => Ok(Bool(a == b)),
            "!=" => Ok(Bool(a != b)),
            _ => Err(format!("operator {} not defined on bool", op)),
        },
        _ => Err(format!("mismatched constant operands {} {} {}", x, op, y)),
    }
}

fn int_op(op: &str, a: i128, b: i128) -> ConstResult<Constant> {
    let overflow = || format!("constant overflow in {} {} {}", a, op, b);
    let value = match op {
        "+" => a.checked_add(b).ok_or_else(overflow)?,
        "-" => a.checked_sub(b).ok_or_else(overflow)?,
        "*" => a.checked_mul(b).ok_or_else(overflow)?,
        "/" | "%" if b == 0 => return Err("division by zero".to_string()),
        "/" => a.checked_div(b).ok_or_else(overflow)?,
        "%" => a.checked_rem(b).ok_or_else(overflow)?,
        "&" => a & b,
        "|" => a | b,
        "^" => a ^ b,
        "&^" => a & !b,
        "<<" => {
            let shift = u32::try_from(b).map_err(|_| format!("invalid shift count {}", b))?;
            a.checked_shl(shift)
                .filter(|v| v >> shift == a)
                .ok_or_else(overflow)?
        }
        ">>" => {
            let shift = u32::try_from(b).map_err(|_| format!("invalid shift count {}", b))?;
            if shift >= 128 { if a < 0 { -1 } else { 0 } } else { a >> shift }
        }
        _ => return compare(op, a.cmp(&b)).map(Constant::Bool),
    };
    Ok(Constant::Int(value))
}

fn float_op(op: &str, a: f64, b: f64) -> ConstResult<Constant> {
    let value = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b == 0.0 => return Err("division by zero".to_string()),
        "/" => a / b,
        _ => {
            let ordering = a
                .partial_cmp(&b)
                .ok_or_else(|| format!("cannot compare {} and {}", a, b))?;
            return compare(op, ordering).map(Constant::Bool);
        }
    };
    Ok(Constant::Float(value))
}

fn compare(op: &str, ordering: std::cmp::Ordering) -> ConstResult<bool> {
    use std::cmp::Ordering::*;
    Ok(match op {
        "==" => ordering == Equal,
        "!=" => ordering != Equal,
        "<" => ordering == Less,
        "<=" => ordering != Greater,
        ">" => ordering == Greater,
        ">=" => ordering != Less,
        _ => return Err(format!("operator {} not defined on constant", op)),
    })
}

pub fn is_comparison(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=")
}

pub fn unary_op(op: &str, x: &Constant) -> ConstResult<Constant> {
    match (op, x) {
        ("+", Constant::Int(_) | Constant::Float(_)) => Ok(x.clone()),
        ("-", Constant::Int(v)) => v.checked_neg().map(Constant::Int).ok_or_else(|| "constant overflow".to_string()),
        ("-", Constant::Float(v)) => Ok(Constant::Float(-v)),
        ("^", Constant::Int(v)) => Ok(Constant::Int(!v)),
        ("!", Constant::Bool(v)) => Ok(Constant::Bool(!v)),
        _ => Err(format!("operator {} not defined on {}", op, x)),
    }
}

fn int_range(kind: BasicKind) -> Option<(i128, i128)> {
    let range = match kind {
        BasicKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
        BasicKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
        BasicKind::Int32 | BasicKind::UntypedRune => (i32::MIN as i128, i32::MAX as i128),
        BasicKind::Int | BasicKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
        BasicKind::Uint8 => (0, u8::MAX as i128),
        BasicKind::Uint16 => (0, u16::MAX as i128),
        BasicKind::Uint32 => (0, u32::MAX as i128),
        BasicKind::Uint | BasicKind::Uint64 | BasicKind::Uintptr => (0, u64::MAX as i128),
        _ => return None,
    };
    Some(range)
}

/// Convert a constant to a basic kind, checking representability
pub fn convert(value: &Constant, kind: BasicKind) -> ConstResult<Constant> {
    if kind.is_integer() {
        let v = value
            .as_int()
            .ok_or_else(|| format!("cannot convert {} to {}", value, kind))?;
        if let Some((lo, hi)) = int_range(kind) {
            if v < lo || v > hi {
                return Err(format!("constant {} overflows {}", v, kind));
            }
        }
        return Ok(Constant::Int(v));
    }
    if kind.is_float() {
        return value
            .as_float()
            .map(Constant::Float)
            .ok_or_else(|| format!("cannot convert {} to {}", value, kind));
    }
    if kind.is_string() {
        return match value {
            Constant::String(_) => Ok(value.clone()),
            Constant::Int(v) => {
                let c = u32::try_from(*v).ok().and_then(char::from_u32).unwrap_or('\u{fffd}');
                Ok(Constant::String(c.to_string()))
            }
            _ => Err(format!("cannot convert {} to {}", value, kind)),
        };
    }
    if kind.is_bool() {
        return match value {
            Constant::Bool(_) => Ok(value.clone()),
            _ => Err(format!("cannot convert {} to {}", value, kind)),
        };
    }
    Err(format!("cannot convert {} to {}", value, kind))
}

/// Kind of the result of combining two untyped operands
pub fn untyped_rank(a: BasicKind, b: BasicKind) -> BasicKind {
    let rank = |k: BasicKind| match k {
        BasicKind::UntypedInt => 1,
        BasicKind::UntypedRune => 2,
        BasicKind::UntypedFloat => 3,
        _ => 0,
    };
    if rank(a) >= rank(b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x_FF"), Some(255));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b1010"), Some(10));
        assert_eq!(parse_int("1_000_000"), Some(1_000_000));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_float("1.5e3"), Some(1500.0));
    }

    #[test]
    fn test_strings_and_runes() {
        assert_eq!(unquote("\"foo\"").as_deref(), Some("foo"));
        assert_eq!(unquote("\"a\\tb\\\"c\"").as_deref(), Some("a\tb\"c"));
        assert_eq!(unquote("`json:\"x\"`").as_deref(), Some("json:\"x\""));
        assert_eq!(unquote("\"\\u00e9\\x41\"").as_deref(), Some("éA"));
        assert_eq!(parse_rune("'a'"), Some(97));
        assert_eq!(parse_rune("'\\n'"), Some(10));
        assert_eq!(parse_rune("'\\''"), Some(39));
        assert_eq!(unquote("foo"), None);
    }

    #[test]
    fn test_binary_ops() {
        use Constant::*;
        assert_eq!(binary_op("+", &Int(1), &Int(2)), Ok(Int(3)));
        assert_eq!(binary_op("/", &Int(7), &Int(2)), Ok(Int(3)));
        assert_eq!(binary_op("/", &Float(7.0), &Int(2)), Ok(Float(3.5)));
        assert_eq!(binary_op("<<", &Int(1), &Int(4)), Ok(Int(16)));
        assert_eq!(binary_op("&^", &Int(0b111), &Int(0b010)), Ok(Int(0b101)));
        assert_eq!(binary_op("+", &String("a".into()), &String("b".into())), Ok(String("ab".into())));
        assert_eq!(binary_op("<", &Int(1), &Int(2)), Ok(Bool(true)));
        assert_eq!(binary_op("&&", &Bool(true), &Bool(false)), Ok(Bool(false)));
        assert!(binary_op("/", &Int(1), &Int(0)).is_err());
        assert!(binary_op("+", &Int(1), &String("x".into())).is_err());
    }

    #[test]
    fn test_unary_and_convert() {
        use Constant::*;
        assert_eq!(unary_op("-", &Int(5)), Ok(Int(-5)));
        assert_eq!(unary_op("^", &Int(0)), Ok(Int(-1)));
        assert_eq!(unary_op("!", &Bool(true)), Ok(Bool(false)));
        assert_eq!(convert(&Int(3), BasicKind::Float64), Ok(Float(3.0)));
        assert_eq!(convert(&Float(2.0), BasicKind::Int), Ok(Int(2)));
        assert!(convert(&Float(2.5), BasicKind::Int).is_err());
        assert!(convert(&Int(300), BasicKind::Uint8).is_err());
        assert!(convert(&Int(-1), BasicKind::Uint).is_err());
        assert_eq!(convert(&Int(65), BasicKind::String), Ok(String("A".into())));
        assert!(convert(&String("x".into()), BasicKind::Int).is_err());
    }

    #[test]
    fn test_untyped_rank() {
        assert_eq!(untyped_rank(BasicKind::UntypedInt, BasicKind::UntypedFloat), BasicKind::UntypedFloat);
        assert_eq!(untyped_rank(BasicKind::UntypedRune, BasicKind::UntypedInt), BasicKind::UntypedRune);
    }
}
