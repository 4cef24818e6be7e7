//! Coordinate scaling
//!
//! Geometry is stored at a logical scale and converted on the way in and
//! out. `set_scale` multiplies every number in a value, `restore_scale`
//! divides it back. Scales are finite and nonzero; configuration enforces
//! this before a scale reaches this module. A number whose scaled result
//! is not finite is left as it was.

use serde_json::{Number, Value};

use crate::core::{Bounds, Point};

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Something whose numeric content can be scaled
pub trait Scale {
    /// Multiply every number by `scale`
    fn set_scale(&self, scale: f64) -> Self;

    /// Divide every number by `scale`
    fn restore_scale(&self, scale: f64) -> Self;
}

impl Scale for f64 {
    fn set_scale(&self, scale: f64) -> Self {
        self * scale
    }

    fn restore_scale(&self, scale: f64) -> Self {
        self / scale
    }
}

impl Scale for Point {
    fn set_scale(&self, scale: f64) -> Self {
        Point::new(self.x * scale, self.y * scale)
    }

    fn restore_scale(&self, scale: f64) -> Self {
        Point::new(self.x / scale, self.y / scale)
    }
}

impl Scale for Bounds {
    fn set_scale(&self, scale: f64) -> Self {
        Bounds::new(
            self.x * scale,
            self.y * scale,
            self.width * scale,
            self.height * scale,
        )
    }

    fn restore_scale(&self, scale: f64) -> Self {
        Bounds::new(
            self.x / scale,
            self.y / scale,
            self.width / scale,
            self.height / scale,
        )
    }
}

impl<T: Scale> Scale for Vec<T> {
    fn set_scale(&self, scale: f64) -> Self {
        self.iter().map(|item| item.set_scale(scale)).collect()
    }

    fn restore_scale(&self, scale: f64) -> Self {
        self.iter().map(|item| item.restore_scale(scale)).collect()
    }
}

impl<T: Scale> Scale for Option<T> {
    fn set_scale(&self, scale: f64) -> Self {
        self.as_ref().map(|value| value.set_scale(scale))
    }

    fn restore_scale(&self, scale: f64) -> Self {
        self.as_ref().map(|value| value.restore_scale(scale))
    }
}

/// Numbers anywhere in the value are scaled; everything else is copied
impl Scale for Value {
    fn set_scale(&self, scale: f64) -> Self {
        map_numbers(self, &|n| n * scale)
    }

    fn restore_scale(&self, scale: f64) -> Self {
        map_numbers(self, &|n| n / scale)
    }
}

/// Scale every number in a value
pub fn set_scale(value: &Value, scale: f64) -> Value {
    value.set_scale(scale)
}

/// Undo [`set_scale`]
pub fn restore_scale(value: &Value, scale: f64) -> Value {
    value.restore_scale(scale)
}

fn map_numbers(value: &Value, f: &dyn Fn(f64) -> f64) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(x) => number_value(f(x)).unwrap_or_else(|| value.clone()),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| map_numbers(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), map_numbers(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Integral results are written back as integers; `None` when not finite
fn number_value(x: f64) -> Option<Value> {
    if x.fract() == 0.0 && x.abs() < MAX_EXACT_INTEGER {
        return Some(Value::Number(Number::from(x as i64)));
    }
    Number::from_f64(x).map(Value::Number)
}
