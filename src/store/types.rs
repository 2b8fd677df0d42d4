//! Value types held by posting stores
//!
//! Every scalar field type maps onto one Rust value type. Raw JSON input is
//! coerced leniently: anything that does not fit the target type yields
//! `None` and is dropped by the caller.

use ordered_float::OrderedFloat;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt::Debug;
use std::hash::Hash;

/// Dense per-index document identifier, allocated by the caller
pub type DocumentId = u32;

/// A value that can be stored in a posting store
pub trait FieldValue:
    Ord + Eq + Hash + Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Coerce a raw JSON value, returning `None` when it does not fit
    fn coerce(raw: &Value) -> Option<Self>;

    /// Render the value back to JSON (bucket keys, min/max values)
    fn to_json(&self) -> Value;
}

impl FieldValue for bool {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

/// Coerce to a signed 64-bit integer; narrower kinds range-check afterwards
fn coerce_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.is_u64() {
                None
            } else {
                n.as_f64().and_then(integral_f64_to_i64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64_to_i64))
        }
        _ => None,
    }
}

fn integral_f64_to_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn integral_f64_to_u64(f: f64) -> Option<u64> {
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < 18_446_744_073_709_551_616.0 {
        Some(f as u64)
    } else {
        None
    }
}

macro_rules! impl_signed_value {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn coerce(raw: &Value) -> Option<Self> {
                    coerce_i64(raw).and_then(|i| <$ty>::try_from(i).ok())
                }

                fn to_json(&self) -> Value {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

impl_signed_value!(i8, i16, i32, i64);

impl FieldValue for u64 {
    fn coerce(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| if n.is_i64() { None } else { n.as_f64().and_then(integral_f64_to_u64) }),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_f64_to_u64))
            }
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::Number(Number::from(*self))
    }
}

fn coerce_f64(raw: &Value) -> Option<f64> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

impl FieldValue for OrderedFloat<f64> {
    fn coerce(raw: &Value) -> Option<Self> {
        coerce_f64(raw).map(OrderedFloat)
    }

    fn to_json(&self) -> Value {
        Number::from_f64(self.0).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl FieldValue for OrderedFloat<f32> {
    fn coerce(raw: &Value) -> Option<Self> {
        let f = coerce_f64(raw)? as f32;
        f.is_finite().then_some(OrderedFloat(f))
    }

    fn to_json(&self) -> Value {
        // Go through the shortest decimal form so 0.1f32 renders as 0.1
        self.0
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
