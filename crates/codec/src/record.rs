//! Struct codegen
//!
//! [`record_codec!`] emits the [`Encode`](crate::Encode)/
//! [`Decode`](crate::Decode) pair for a named struct: code 13, then every
//! listed field in order, each encoded recursively. The wire carries
//! neither field names nor a field count, so the field list is part of the
//! format — adding, removing or reordering fields breaks compatibility
//! with previously written buffers silently. Fields left off the list do
//! not travel and must be `Default`-constructible if the struct is to be
//! decoded (list them after a `;`).

/// Generate the wire codec for a struct over the listed fields, in order.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Reading {
///     taken_at: DateTime<Utc>,
///     kind: String,
///     value: f64,
/// }
/// record_codec!(Reading { taken_at, kind, value });
/// ```
///
/// Fields named after a semicolon are skipped on the wire and filled from
/// `Default` on decode:
///
/// ```ignore
/// record_codec!(Cache { key, bytes; hits });
/// ```
#[macro_export]
macro_rules! record_codec {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        $crate::record_codec!($ty { $($field),+ ; });
    };
    ($ty:ty { $($field:ident),+ $(,)? ; $($skipped:ident),* $(,)? }) => {
        impl $crate::Encode for $ty {
            fn encode(
                &self,
                buf: &mut ::std::vec::Vec<u8>,
                codec: &$crate::Codec,
            ) -> $crate::Result<()> {
                $crate::wire::put_code(buf, $crate::wire::TypeCode::Struct);
                $($crate::Encode::encode(&self.$field, buf, codec)?;)+
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::Decode for $ty {
            fn decode(
                r: &mut $crate::wire::Reader<'_>,
                codec: &$crate::Codec,
            ) -> $crate::Result<Self> {
                r.expect_code($crate::wire::TypeCode::Struct)?;
                ::std::result::Result::Ok(Self {
                    $($field: $crate::Decode::decode(r, codec)?,)+
                    $($skipped: ::std::default::Default::default(),)*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::wire::Reader;
    use crate::{Codec, Decode, Encode};

    #[derive(Debug, Clone, PartialEq)]
    struct Flagged {
        a: i32,
        b: bool,
    }
    record_codec!(Flagged { a, b });

    #[derive(Debug, Clone, PartialEq)]
    struct Mixed {
        a: i64,
        b: i32,
        c: i16,
        d: i8,
        e: String,
        f: isize,
    }
    record_codec!(Mixed { a, b, c, d, e, f });

    #[derive(Debug, Clone, PartialEq)]
    struct Linked {
        value: i32,
        next: Option<Box<Linked>>,
    }
    record_codec!(Linked { value, next });

    fn round_trip<T: Encode + Decode>(value: &T) -> T {
        let codec = Codec::new();
        let mut buf = Vec::new();
        value.encode(&mut buf, &codec).unwrap();
        let mut r = Reader::new(&buf);
        let out = T::decode(&mut r, &codec).unwrap();
        assert!(r.is_at_end());
        out
    }

    #[test]
    fn struct_encoding_is_byte_exact() {
        let codec = Codec::new();
        let mut buf = Vec::new();
        Flagged { a: 1025, b: true }.encode(&mut buf, &codec).unwrap();
        assert_eq!(buf, [0x0d, 0x04, 0x01, 0x04, 0x00, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn nil_boxed_field_is_one_sentinel_byte() {
        let codec = Codec::new();
        let mut buf = Vec::new();
        Linked {
            value: 1025,
            next: None,
        }
        .encode(&mut buf, &codec)
        .unwrap();
        assert_eq!(buf, [0x0d, 0x04, 0x01, 0x04, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn structs_round_trip() {
        let value = Mixed {
            a: 1025,
            b: 1026,
            c: 1027,
            d: 88,
            e: "Hello World".into(),
            f: 32768,
        };
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn nested_boxed_structs_round_trip() {
        let value = Linked {
            value: 1,
            next: Some(Box::new(Linked {
                value: 2,
                next: None,
            })),
        };
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn struct_sequences_round_trip() {
        let values: Vec<Flagged> = (0..10)
            .map(|i| Flagged {
                a: i * 10,
                b: i % 2 == 0,
            })
            .collect();
        assert_eq!(round_trip(&values), values);
    }

    #[test]
    fn skipped_fields_do_not_travel() {
        #[derive(Debug, Clone, PartialEq)]
        struct Cache {
            key: String,
            hits: u64,
        }
        record_codec!(Cache { key; hits });

        let codec = Codec::new();
        let mut buf = Vec::new();
        Cache {
            key: "k".into(),
            hits: 99,
        }
        .encode(&mut buf, &codec)
        .unwrap();

        let mut r = Reader::new(&buf);
        let out = Cache::decode(&mut r, &codec).unwrap();
        assert_eq!(out.key, "k");
        assert_eq!(out.hits, 0);
    }
}
