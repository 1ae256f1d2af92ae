//! Value decoding
//!
//! [`Decode`] is the inverse of [`Encode`](crate::Encode): read the type
//! code, verify it matches what the target type requires, read the payload.
//! A code mismatch is fatal for the whole buffer — the format carries no
//! resynchronization points. Every step returns `Result`; errors propagate
//! with the byte offset they occurred at.

use crate::registry::Codec;
use crate::wire::{Reader, TypeCode};
use sheaf_core::{Result, SheafError};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A value reconstructible from its wire representation.
pub trait Decode: Sized {
    /// Read one encoded value from `r`.
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self>;
}

macro_rules! decode_int {
    ($($ty:ty => $code:ident / $n:literal),+ $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
                    r.expect_code(TypeCode::$code)?;
                    let bytes = r.take($n, stringify!($ty))?;
                    let mut raw = [0u8; $n];
                    raw.copy_from_slice(bytes);
                    Ok(<$ty>::from_le_bytes(raw))
                }
            }
        )+
    };
}

decode_int! {
    i8 => I8 / 1,
    i16 => I16 / 2,
    i32 => I32 / 4,
    i64 => I64 / 8,
    u8 => U8 / 1,
    u16 => U16 / 2,
    u32 => U32 / 4,
    u64 => U64 / 8,
    f32 => F32 / 4,
    f64 => F64 / 8,
}

// Native-width integers accept both promoted widths, so buffers written on
// 32-bit targets read back on 64-bit targets and vice versa.
impl Decode for isize {
    fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
        let offset = r.offset();
        let code = r.take_code()?;
        let value = match TypeCode::from_u8(code) {
            Some(TypeCode::I32) => {
                let bytes = r.take(4, "isize")?;
                i64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            Some(TypeCode::I64) => {
                let bytes = r.take(8, "isize")?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                i64::from_le_bytes(raw)
            }
            _ => {
                return Err(SheafError::UnexpectedTypeCode {
                    offset,
                    expected: TypeCode::I64 as u8,
                    found: code,
                })
            }
        };
        Ok(value as isize)
    }
}

impl Decode for usize {
    fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
        let offset = r.offset();
        let code = r.take_code()?;
        let value = match TypeCode::from_u8(code) {
            Some(TypeCode::U32) => {
                let bytes = r.take(4, "usize")?;
                u64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            Some(TypeCode::U64) => {
                let bytes = r.take(8, "usize")?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                u64::from_le_bytes(raw)
            }
            _ => {
                return Err(SheafError::UnexpectedTypeCode {
                    offset,
                    expected: TypeCode::U64 as u8,
                    found: code,
                })
            }
        };
        Ok(value as usize)
    }
}

impl Decode for bool {
    fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Bool)?;
        let byte = r.take(1, "bool")?[0];
        Ok(byte != 0)
    }
}

impl Decode for String {
    fn decode(r: &mut Reader<'_>, _codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Str)?;
        let len = r.take_len()?;
        let offset = r.offset();
        let bytes = r.take(len, "string data")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SheafError::Decode(format!("invalid utf-8 at offset {offset}: {e}")))
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        Ok(Box::new(T::decode(r, codec)?))
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        if r.peek_code()? == TypeCode::Nil as u8 {
            r.take_code()?;
            return Ok(None);
        }
        Ok(Some(T::decode(r, codec)?))
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Seq)?;
        let len = r.take_len()?;
        let mut out = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            out.push(T::decode(r, codec)?);
        }
        Ok(out)
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Seq)?;
        let offset = r.offset();
        let len = r.take_len()?;
        if len != N {
            return Err(SheafError::Decode(format!(
                "sequence of {len} elements at offset {offset} does not fit [_; {N}]"
            )));
        }
        let mut out = Vec::with_capacity(N);
        for _ in 0..N {
            out.push(T::decode(r, codec)?);
        }
        // Cannot fail: exactly N elements were pushed.
        out.try_into()
            .map_err(|_| SheafError::Decode("fixed-size array conversion".into()))
    }
}

impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Map)?;
        let len = r.take_len()?;
        let mut out = HashMap::with_capacity(len.min(4096));
        for _ in 0..len {
            let key = K::decode(r, codec)?;
            let value = V::decode(r, codec)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(r: &mut Reader<'_>, codec: &Codec) -> Result<Self> {
        r.expect_code(TypeCode::Map)?;
        let len = r.take_len()?;
        let mut out = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(r, codec)?;
            let value = V::decode(r, codec)?;
            out.insert(key, value);
        }
        Ok(out)
    }
}
