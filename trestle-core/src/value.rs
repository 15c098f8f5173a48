use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A bound SQL value.
///
/// Every typed variant carries an `Option` so a NULL keeps the column type
/// it belongs to; the bare `Null` variant is for values with no type
/// information at all.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// The integral content, for scalar results like counts and keys.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => v.map(i64::from),
            Value::Int64(v) => *v,
            _ => None,
        }
    }
}

/// Conversion of Rust values into [`Value`] for parameter binding.
pub trait AsValue {
    fn as_value(self) -> Value;
}

impl AsValue for Value {
    fn as_value(self) -> Value {
        self
    }
}

macro_rules! impl_as_value {
    ($type:ty, $variant:ident) => {
        impl AsValue for $type {
            fn as_value(self) -> Value {
                Value::$variant(Some(self.into()))
            }
        }
        impl AsValue for Option<$type> {
            fn as_value(self) -> Value {
                Value::$variant(self.map(Into::into))
            }
        }
    };
}

impl_as_value!(bool, Boolean);
impl_as_value!(i32, Int32);
impl_as_value!(i64, Int64);
impl_as_value!(f64, Float64);
impl_as_value!(Decimal, Decimal);
impl_as_value!(String, Varchar);
impl_as_value!(&str, Varchar);
impl_as_value!(Vec<u8>, Blob);
impl_as_value!(Date, Date);
impl_as_value!(Time, Time);
impl_as_value!(PrimitiveDateTime, Timestamp);
impl_as_value!(Uuid, Uuid);
