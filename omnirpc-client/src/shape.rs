//! Argument and result shape checks for HTTP calls
//!
//! The HTTP envelope carries named-field objects, so HTTP calls require both
//! the argument and the result type to be structs. The checks run a value (or
//! a type) through a serializer or deserializer that only records which entry
//! point serde chose, without producing any output or touching the network.
//!
//! Newtype wrappers are looked through; maps, sequences, scalars, options,
//! enums and unit structs are rejected.
//!
//! Structs with `#[serde(flatten)]` fields are driven through serde's map
//! entry points instead of the struct ones. They still count as structs: on
//! the serializing side they open a map of unknown length, and on the
//! deserializing side their visitor expects `struct Name`.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{self, Impossible, Serialize, Serializer};
use std::fmt;

#[derive(Debug)]
enum Shape {
    /// serde reached `serialize_struct` / `deserialize_struct`
    Struct,
    NotStruct(String),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Struct => f.write_str("struct"),
            Shape::NotStruct(kind) => f.write_str(kind),
        }
    }
}

impl std::error::Error for Shape {}

impl ser::Error for Shape {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Shape::NotStruct(msg.to_string())
    }
}

impl de::Error for Shape {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Shape::NotStruct(msg.to_string())
    }
}

/// Describe why `value` is not a struct, or `None` if it is one
pub fn value_shape_error<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    match value.serialize(ShapeSerializer) {
        Err(Shape::Struct) => None,
        Err(Shape::NotStruct(kind)) => Some(kind),
        Ok(()) => Some("value".to_string()),
    }
}

/// Describe why `T` does not deserialize from a struct, or `None` if it does
pub fn type_shape_error<T: de::DeserializeOwned>() -> Option<String> {
    match T::deserialize(ShapeDeserializer) {
        Err(Shape::Struct) => None,
        Err(Shape::NotStruct(kind)) => Some(kind),
        Ok(_) => Some("value".to_string()),
    }
}

struct ShapeSerializer;

fn not_struct(kind: &str) -> Shape {
    Shape::NotStruct(kind.to_string())
}

impl Serializer for ShapeSerializer {
    type Ok = ();
    type Error = Shape;
    type SerializeSeq = Impossible<(), Shape>;
    type SerializeTuple = Impossible<(), Shape>;
    type SerializeTupleStruct = Impossible<(), Shape>;
    type SerializeTupleVariant = Impossible<(), Shape>;
    type SerializeMap = Impossible<(), Shape>;
    type SerializeStruct = Impossible<(), Shape>;
    type SerializeStructVariant = Impossible<(), Shape>;

    fn serialize_bool(self, _: bool) -> Result<(), Shape> {
        Err(not_struct("bool"))
    }

    fn serialize_i8(self, _: i8) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_i16(self, _: i16) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_i32(self, _: i32) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_i64(self, _: i64) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_u8(self, _: u8) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_u16(self, _: u16) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_u32(self, _: u32) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_u64(self, _: u64) -> Result<(), Shape> {
        Err(not_struct("integer"))
    }

    fn serialize_f32(self, _: f32) -> Result<(), Shape> {
        Err(not_struct("float"))
    }

    fn serialize_f64(self, _: f64) -> Result<(), Shape> {
        Err(not_struct("float"))
    }

    fn serialize_char(self, _: char) -> Result<(), Shape> {
        Err(not_struct("char"))
    }

    fn serialize_str(self, _: &str) -> Result<(), Shape> {
        Err(not_struct("string"))
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<(), Shape> {
        Err(not_struct("bytes"))
    }

    fn serialize_none(self) -> Result<(), Shape> {
        Err(not_struct("option"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<(), Shape> {
        Err(not_struct("option"))
    }

    fn serialize_unit(self) -> Result<(), Shape> {
        Err(not_struct("unit"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<(), Shape> {
        Err(not_struct("unit struct"))
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result<(), Shape> {
        Err(not_struct("enum"))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Shape> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<(), Shape> {
        Err(not_struct("enum"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Shape> {
        Err(not_struct("sequence"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Shape> {
        Err(not_struct("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Shape> {
        Err(not_struct("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Shape> {
        Err(not_struct("enum"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Shape> {
        // Derived flatten structs cannot know their field count up front.
        match len {
            None => Err(Shape::Struct),
            Some(_) => Err(not_struct("map")),
        }
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeStruct, Shape> {
        Err(Shape::Struct)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Shape> {
        Err(not_struct("enum"))
    }
}

struct ShapeDeserializer;

impl<'de> Deserializer<'de> for ShapeDeserializer {
    type Error = Shape;

    fn deserialize_any<V: Visitor<'de>>(self, _: V) -> Result<V::Value, Shape> {
        Err(not_struct("non-struct type"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _: &'static str,
        _: &'static [&'static str],
        _: V,
    ) -> Result<V::Value, Shape> {
        Err(Shape::Struct)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Shape> {
        let expected: &dyn de::Expected = &visitor;
        if expected.to_string().starts_with("struct ") {
            Err(Shape::Struct)
        } else {
            Err(not_struct("map"))
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _: &'static str,
        visitor: V,
    ) -> Result<V::Value, Shape> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple tuple_struct enum
        identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(serde::Serialize, Deserialize)]
    struct Args {
        a: i32,
        b: i32,
    }

    #[derive(serde::Serialize, Deserialize)]
    struct Wrapped(Args);

    #[derive(serde::Serialize, Deserialize)]
    struct Pair(i32, i32);

    #[derive(serde::Serialize, Deserialize)]
    struct Meta {
        trace: String,
    }

    #[derive(serde::Serialize, Deserialize)]
    struct Flattened {
        a: i32,
        #[serde(flatten)]
        meta: Meta,
    }

    #[derive(serde::Serialize, Deserialize)]
    struct WithExtras {
        a: i32,
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    }

    #[test]
    fn test_struct_values_pass() {
        assert!(value_shape_error(&Args { a: 1, b: 2 }).is_none());
        assert!(value_shape_error(&Wrapped(Args { a: 1, b: 2 })).is_none());
    }

    #[test]
    fn test_non_struct_values_fail() {
        assert_eq!(value_shape_error(&5).as_deref(), Some("integer"));
        assert_eq!(value_shape_error("text").as_deref(), Some("string"));
        assert_eq!(value_shape_error(&vec![1, 2]).as_deref(), Some("sequence"));
        assert_eq!(value_shape_error(&HashMap::<String, i32>::new()).as_deref(), Some("map"));
        assert_eq!(value_shape_error(&Pair(1, 2)).as_deref(), Some("tuple struct"));
        assert!(value_shape_error(&Some(Args { a: 1, b: 2 })).is_some());
        assert!(value_shape_error(&serde_json::json!({"a": 1})).is_some());
    }

    #[test]
    fn test_struct_types_pass() {
        assert!(type_shape_error::<Args>().is_none());
        assert!(type_shape_error::<Wrapped>().is_none());
    }

    #[test]
    fn test_non_struct_types_fail() {
        assert!(type_shape_error::<i64>().is_some());
        assert!(type_shape_error::<String>().is_some());
        assert!(type_shape_error::<Vec<Args>>().is_some());
        assert!(type_shape_error::<Option<Args>>().is_some());
        assert!(type_shape_error::<serde_json::Value>().is_some());
        assert!(type_shape_error::<Pair>().is_some());
        assert_eq!(type_shape_error::<HashMap<String, i32>>().as_deref(), Some("map"));
    }

    #[test]
    fn test_flattened_structs_pass() {
        let flattened = Flattened {
            a: 1,
            meta: Meta { trace: "t-1".to_string() },
        };
        assert!(value_shape_error(&flattened).is_none());
        assert!(value_shape_error(&WithExtras { a: 1, extra: HashMap::new() }).is_none());
        assert!(type_shape_error::<Flattened>().is_none());
        assert!(type_shape_error::<WithExtras>().is_none());
    }
}
