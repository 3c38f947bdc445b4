//! Values exchanged with statements

use crate::Number;
use chrono::NaiveDateTime;

/// A single bind argument or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDateTime),
    Number(Number),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer value. Floats without a fractional part are accepted too.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(val) => Some(val),
            Value::Float(val) if val.fract() == 0.0 && val.abs() < 9.2e18 => Some(val as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(val) => Some(val),
            Value::Int(val) => Some(val as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(val) => Some(val.as_str()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match *self {
            Value::Date(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(val) => Some(val.as_slice()),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),+) => {
        $(
            impl From<$t> for Value {
                fn from(val: $t) -> Self {
                    Value::$variant(val.into())
                }
            }
        )+
    };
}

impl_from!{
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
    NaiveDateTime => Date,
    Number => Number,
    Vec<u8> => Bytes
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_view_of_floats() {
        assert_eq!(Value::Float(12.0).as_int(), Some(12));
        assert_eq!(Value::Float(12.5).as_int(), None);
        assert_eq!(Value::Int(7).as_float(), Some(7.0));
        assert_eq!(Value::Text("7".into()).as_int(), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(5), Value::Int(5));
        assert_eq!(Value::from("abc"), Value::Text(String::from("abc")));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(2.5)), Value::Float(2.5));
        assert!(Value::from(None::<&str>).is_null());
    }
}
