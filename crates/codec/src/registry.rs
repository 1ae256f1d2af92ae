//! Polymorphic type registry
//!
//! Structural values encode without any registration. Values reached
//! through a trait object need one: the wire carries a small integer tag
//! (code 16, then a 4-byte tag) instead of a type name, and the [`Codec`]
//! maps tags back to concrete decoders. Tags are registration positions, so
//! encoder and decoder must register the same types in the same order.
//!
//! The tag's high bit records that the value was held by pointer. Trait
//! objects here are always boxed, so the encoder always sets it; the
//! decoder masks it off and accepts either form.
//!
//! ## Wiring a trait
//!
//! ```ignore
//! use sheaf_codec::{poly_codec, record_codec, register_dyn, Codec, PolyValue};
//!
//! trait Shape: PolyValue {
//!     fn area(&self) -> f64;
//! }
//! poly_codec!(Shape); // Encode/Decode for Box<dyn Shape>
//!
//! let codec = Codec::new();
//! let codec = register_dyn!(codec, Circle => Shape);
//! let codec = register_dyn!(codec, Square => Shape);
//! ```

use crate::encode::Encode;
use crate::wire::{self, Reader, TypeCode, POINTER_BIT};
use sheaf_core::{Result, SheafError};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Decoder for one registered concrete type viewed as one trait object.
///
/// The produced `Box<dyn Any>` wraps the finished trait object (a
/// `Box<Box<dyn Trait>>` once erased); [`poly_codec!`](crate::poly_codec)
/// generates the matching downcast.
pub type ViewDecodeFn = fn(&mut Reader<'_>, &Codec) -> Result<Box<dyn Any>>;

struct TypeEntry {
    name: &'static str,
    views: HashMap<TypeId, ViewDecodeFn>,
}

/// Per-instance registry of polymorphic types.
///
/// Cheap to build, never mutated after construction; share one per
/// persistence back-end. A codec with no registrations handles every purely
/// structural value.
#[derive(Default)]
pub struct Codec {
    entries: Vec<TypeEntry>,
    by_id: HashMap<TypeId, u32>,
}

impl Codec {
    /// An empty registry.
    pub fn new() -> Self {
        Codec::default()
    }

    /// Register `T` as decodable into the trait-object view identified by
    /// `view`. First registration of `T` assigns the next tag; later calls
    /// add further views to the same tag. Use through
    /// [`register_dyn!`](crate::register_dyn), which builds the matching
    /// `decode` glue.
    pub fn register_as<T: Any>(mut self, view: TypeId, decode: ViewDecodeFn) -> Self {
        let id = TypeId::of::<T>();
        let tag = match self.by_id.get(&id).copied() {
            Some(tag) => tag,
            None => {
                let tag = self.entries.len() as u32;
                self.entries.push(TypeEntry {
                    name: std::any::type_name::<T>(),
                    views: HashMap::new(),
                });
                self.by_id.insert(id, tag);
                tag
            }
        };
        self.entries[tag as usize].views.insert(view, decode);
        self
    }

    /// Number of registered concrete types.
    pub fn registered(&self) -> usize {
        self.entries.len()
    }

    fn tag_for(&self, id: TypeId, name: &'static str) -> Result<u32> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(SheafError::UnregisteredType { name })
    }

    /// Encode a polymorphic value: code 16, tag with the pointer bit, then
    /// the concrete value. Fails if the concrete type was never registered.
    pub fn encode_dyn<T: PolyValue + ?Sized>(&self, value: &T, buf: &mut Vec<u8>) -> Result<()> {
        let tag = self.tag_for(value.as_any().type_id(), value.wire_name())?;
        wire::put_dyn_header(buf, tag);
        value.encode_value(buf, self)
    }

    /// Decode a polymorphic value into the trait-object view identified by
    /// `view`. Returns the erased trait object produced by the registered
    /// [`ViewDecodeFn`].
    pub fn decode_dyn(&self, r: &mut Reader<'_>, view: TypeId) -> Result<Box<dyn Any>> {
        r.expect_code(TypeCode::Dyn)?;
        let tag = r.take_u32()? & !POINTER_BIT;
        let entry = self
            .entries
            .get(tag as usize)
            .ok_or(SheafError::UnknownTypeTag { tag })?;
        let decode = entry
            .views
            .get(&view)
            .ok_or_else(|| SheafError::UnregisteredView {
                name: entry.name.to_string(),
            })?;
        decode(r, self)
    }
}

/// Object-safe face every polymorphic value presents to the registry.
///
/// Blanket-implemented for every `Encode + Any` type; user traits opt in by
/// declaring it as a supertrait (`trait Shape: PolyValue { .. }`).
pub trait PolyValue: Any {
    /// Diagnostic name used in registry-miss errors.
    fn wire_name(&self) -> &'static str;

    /// The value as `Any`, for concrete-type identification.
    fn as_any(&self) -> &dyn Any;

    /// Encode the concrete value (tag header already written).
    fn encode_value(&self, buf: &mut Vec<u8>, codec: &Codec) -> Result<()>;
}

impl<T: Encode + Any> PolyValue for T {
    fn wire_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn encode_value(&self, buf: &mut Vec<u8>, codec: &Codec) -> Result<()> {
        self.encode(buf, codec)
    }
}

/// Generate [`Encode`]/[`Decode`](crate::Decode) for `Box<dyn Trait>`.
///
/// The trait must declare [`PolyValue`] as a supertrait. Concrete types are
/// wired in at codec construction with [`register_dyn!`](crate::register_dyn).
#[macro_export]
macro_rules! poly_codec {
    ($trait:path) => {
        // Encode lives on the unsized `dyn Trait` itself; `&dyn Trait`,
        // `Box<dyn Trait>` and containers of them pick it up through the
        // pointer-transparent blanket impls.
        impl $crate::Encode for dyn $trait {
            fn encode(
                &self,
                buf: &mut ::std::vec::Vec<u8>,
                codec: &$crate::Codec,
            ) -> $crate::Result<()> {
                codec.encode_dyn(self, buf)
            }
        }

        impl $crate::Decode for ::std::boxed::Box<dyn $trait> {
            fn decode(
                r: &mut $crate::wire::Reader<'_>,
                codec: &$crate::Codec,
            ) -> $crate::Result<Self> {
                let erased = codec
                    .decode_dyn(r, ::std::any::TypeId::of::<::std::boxed::Box<dyn $trait>>())?;
                erased
                    .downcast::<::std::boxed::Box<dyn $trait>>()
                    .map(|boxed| *boxed)
                    .map_err(|_| {
                        $crate::SheafError::Decode(
                            "registered decoder produced a different trait object".into(),
                        )
                    })
            }
        }
    };
}

/// Register a concrete type as one trait's wire representative:
/// `let codec = register_dyn!(codec, Circle => Shape);`
///
/// Evaluates to the extended codec, so registrations chain by rebinding.
#[macro_export]
macro_rules! register_dyn {
    ($codec:expr, $ty:ty => $trait:path) => {
        $codec.register_as::<$ty>(
            ::std::any::TypeId::of::<::std::boxed::Box<dyn $trait>>(),
            |r, codec| {
                let value = <$ty as $crate::Decode>::decode(r, codec)?;
                ::std::result::Result::Ok(::std::boxed::Box::new(
                    ::std::boxed::Box::new(value) as ::std::boxed::Box<dyn $trait>,
                ) as ::std::boxed::Box<dyn ::std::any::Any>)
            },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record_codec, Decode};

    trait Labeled: PolyValue + std::fmt::Debug {
        fn label(&self) -> String;
    }
    crate::poly_codec!(Labeled);

    #[derive(Debug, Clone, PartialEq)]
    struct Word {
        v: String,
    }
    record_codec!(Word { v });

    impl Labeled for Word {
        fn label(&self) -> String {
            self.v.clone()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Ratio {
        v: f64,
    }
    record_codec!(Ratio { v });

    impl Labeled for Ratio {
        fn label(&self) -> String {
            format!("{:.5}", self.v)
        }
    }

    fn labeled_codec() -> Codec {
        let codec = Codec::new();
        let codec = register_dyn!(codec, Word => Labeled);
        register_dyn!(codec, Ratio => Labeled)
    }

    #[test]
    fn trait_object_sequences_round_trip() {
        let codec = labeled_codec();
        let values: Vec<Box<dyn Labeled>> = vec![
            Box::new(Word { v: "Hello".into() }),
            Box::new(Ratio {
                v: std::f64::consts::PI,
            }),
        ];

        let mut buf = Vec::new();
        values.encode(&mut buf, &codec).unwrap();

        let mut r = Reader::new(&buf);
        let out: Vec<Box<dyn Labeled>> = Vec::decode(&mut r, &codec).unwrap();
        assert!(r.is_at_end());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label(), "Hello");
        assert_eq!(out[1].label(), "3.14159");
    }

    #[test]
    fn tags_are_registration_positions() {
        let codec = labeled_codec();
        let value: Box<dyn Labeled> = Box::new(Ratio { v: 1.0 });
        let mut buf = Vec::new();
        value.encode(&mut buf, &codec).unwrap();

        // Seq-less single value: code 16, then the tag for Ratio (second
        // registration => 1) with the pointer bit set.
        assert_eq!(buf[0], TypeCode::Dyn as u8);
        let raw = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(raw, 1 | POINTER_BIT);
    }

    #[test]
    fn decoder_accepts_tags_without_the_pointer_bit() {
        let codec = labeled_codec();
        let value: Box<dyn Labeled> = Box::new(Word { v: "x".into() });
        let mut buf = Vec::new();
        value.encode(&mut buf, &codec).unwrap();
        // Clear the pointer bit in place; the value form must decode too.
        let raw = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) & !POINTER_BIT;
        buf[1..5].copy_from_slice(&raw.to_le_bytes());

        let mut r = Reader::new(&buf);
        let out: Box<dyn Labeled> = Decode::decode(&mut r, &codec).unwrap();
        assert_eq!(out.label(), "x");
    }

    #[test]
    fn encoding_an_unregistered_type_fails() {
        let codec = Codec::new();
        let value: Box<dyn Labeled> = Box::new(Word { v: "x".into() });
        let mut buf = Vec::new();
        let err = value.encode(&mut buf, &codec).unwrap_err();
        assert!(matches!(err, SheafError::UnregisteredType { .. }));
    }

    #[test]
    fn unknown_tags_fail_decoding() {
        let codec = labeled_codec();
        let mut buf = Vec::new();
        wire::put_dyn_header(&mut buf, 9);
        let mut r = Reader::new(&buf);
        let err = <Box<dyn Labeled>>::decode(&mut r, &codec).unwrap_err();
        assert!(matches!(err, SheafError::UnknownTypeTag { tag: 9 }));
    }

    #[test]
    fn a_type_registered_for_another_trait_is_an_unregistered_view() {
        trait Other: PolyValue + std::fmt::Debug {}
        crate::poly_codec!(Other);
        impl Other for Word {}

        // Word is registered for Labeled only.
        let codec = labeled_codec();
        let value: Box<dyn Labeled> = Box::new(Word { v: "x".into() });
        let mut buf = Vec::new();
        value.encode(&mut buf, &codec).unwrap();

        let mut r = Reader::new(&buf);
        let err = <Box<dyn Other>>::decode(&mut r, &codec).unwrap_err();
        assert!(matches!(err, SheafError::UnregisteredView { .. }));
    }

    #[test]
    fn re_registration_keeps_the_original_tag() {
        let codec = labeled_codec();
        let codec = register_dyn!(codec, Word => Labeled);
        assert_eq!(codec.registered(), 2);
    }
}
