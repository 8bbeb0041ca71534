//! Pre-flight check for values headed to JSON.
//!
//! JSON writes two kinds of value as `null` that cannot be read back as
//! themselves: non-finite floats, and a `None` (or unit) sitting directly
//! inside `Some`. Walking the value through the serde data model finds both
//! before anything is stored.

use serde::Serialize;
use serde::ser;

use crate::error::{RedwrapError, RedwrapResult};

/// Fail if `value` would not survive a JSON round trip.
pub(crate) fn check_json_shape<T: ?Sized + Serialize>(value: &T) -> RedwrapResult<()> {
    value.serialize(ShapeCheck::default())
}

#[derive(Debug, Clone, Copy, Default)]
struct ShapeCheck {
    inside_some: bool,
}

impl ShapeCheck {
    fn float(self, v: f64) -> RedwrapResult<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(RedwrapError::serialization(format!("{v} has no JSON representation")))
        }
    }

    fn null(self, what: &str) -> RedwrapResult<()> {
        if self.inside_some {
            Err(RedwrapError::serialization(format!(
                "{what} inside Some is written as null and reads back as None"
            )))
        } else {
            Ok(())
        }
    }
}

impl ser::Serializer for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> RedwrapResult<()> {
        self.float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> RedwrapResult<()> {
        self.float(v)
    }

    fn serialize_char(self, _: char) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> RedwrapResult<()> {
        Ok(())
    }

    fn serialize_none(self) -> RedwrapResult<()> {
        self.null("None")
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> RedwrapResult<()> {
        value.serialize(ShapeCheck { inside_some: true })
    }

    fn serialize_unit(self) -> RedwrapResult<()> {
        self.null("()")
    }

    fn serialize_unit_struct(self, name: &'static str) -> RedwrapResult<()> {
        self.null(name)
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> RedwrapResult<()> {
        Ok(())
    }

    // newtype structs are transparent in JSON, so the Some context carries through
    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _: &'static str, value: &T) -> RedwrapResult<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn serialize_seq(self, _: Option<usize>) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_tuple(self, _: usize) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_tuple_variant(self, _: &'static str, _: u32, _: &'static str, _: usize) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_map(self, _: Option<usize>) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> RedwrapResult<Self> {
        Ok(Self::default())
    }

    fn serialize_struct_variant(self, _: &'static str, _: u32, _: &'static str, _: usize) -> RedwrapResult<Self> {
        Ok(Self::default())
    }
}

impl ser::SerializeSeq for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeTuple for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeMap for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> RedwrapResult<()> {
        check_json_shape(key)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeStruct for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for ShapeCheck {
    type Ok = ();
    type Error = RedwrapError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> RedwrapResult<()> {
        check_json_shape(value)
    }

    fn end(self) -> RedwrapResult<()> {
        Ok(())
    }
}
