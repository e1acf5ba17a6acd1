use typeconv_api::{ConvertContext, Converter, Diagnostic, Type, Value};

use crate::hex_digits;

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

/// Converter for one integer type, described by its range and byte width.
///
/// Every input is widened to `i128`, then range-checked. Signed targets
/// produce `Value::Int`, unsigned ones `Value::UInt`.
pub struct IntConverter {
    ty: Type,
    min: i128,
    max: i128,
    width: usize,
}

impl IntConverter {
    pub fn new(ty: Type, min: i128, max: i128, width: usize) -> Self {
        Self { ty, min, max, width }
    }

    fn signed(&self) -> bool {
        self.min < 0
    }

    fn narrow(&self, wide: i128) -> Result<Value, Diagnostic> {
        if wide < self.min || wide > self.max {
            return Err(Diagnostic::overflow(
                &self.ty,
                format!("{wide} is out of range for {}", self.ty),
            ));
        }
        if self.signed() {
            Ok(Value::Int(wide as i64))
        } else {
            Ok(Value::UInt(wide as u64))
        }
    }

    fn parse(&self, text: &str) -> Result<i128, Diagnostic> {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i128>() {
            return Ok(n);
        }
        if let Some(raw) = hex_digits(trimmed).and_then(|d| u128::from_str_radix(d, 16).ok()) {
            return Ok(self.from_hex(raw));
        }
        Err(Diagnostic::parse(
            &self.ty,
            format!("'{text}' is not a valid {}", self.ty),
        ))
    }

    /// Hex text is a bit pattern. For signed targets a pattern that fits the
    /// width is read as two's complement, so `0xff` is `-1` for `i8`.
    fn from_hex(&self, raw: u128) -> i128 {
        let bits = self.width * 8;
        if self.signed() && bits < 128 && raw >> bits == 0 {
            let shift = 128 - bits;
            return ((raw << shift) as i128) >> shift;
        }
        i128::try_from(raw).unwrap_or(i128::MAX)
    }

    fn from_float(&self, f: f64) -> Result<Value, Diagnostic> {
        if !f.is_finite() {
            return Err(Diagnostic::overflow(
                &self.ty,
                format!("{f} is out of range for {}", self.ty),
            ));
        }
        // Saturating cast; anything past i128 still fails the range check.
        self.narrow(f.trunc() as i128)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<i128, Diagnostic> {
        if bytes.len() != self.width {
            return Err(Diagnostic::unsupported(
                &self.ty,
                format!("{} takes exactly {} bytes, got {}", self.ty, self.width, bytes.len()),
            ));
        }
        let raw = bytes
            .iter()
            .rev()
            .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
        if self.signed() {
            let shift = 128 - self.width * 8;
            Ok(((raw << shift) as i128) >> shift)
        } else {
            Ok(raw as i128)
        }
    }
}

impl Converter for IntConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        input: &Value,
        _output: &Type,
    ) -> Result<Value, Diagnostic> {
        let wide = match input {
            Value::Int(i) => i128::from(*i),
            Value::UInt(u) => i128::from(*u),
            Value::Bool(b) => i128::from(*b),
            Value::Float(f) => return self.from_float(*f),
            Value::Str(s) => self.parse(s)?,
            Value::Bytes(bytes) => self.from_bytes(bytes)?,
            other => {
                return Err(Diagnostic::unsupported(
                    &self.ty,
                    format!("cannot convert {} to {}", other.kind_name(), self.ty),
                ));
            }
        };
        self.narrow(wide)
    }
}

// ---------------------------------------------------------------------------
// Floats
// ---------------------------------------------------------------------------

/// Converter for `f32` or `f64`. Both produce `Value::Float`; `f32` values
/// are rounded to single precision.
pub struct FloatConverter {
    ty: Type,
    single: bool,
}

impl FloatConverter {
    pub fn single() -> Self {
        Self { ty: Type::f32(), single: true }
    }

    pub fn double() -> Self {
        Self { ty: Type::f64(), single: false }
    }

    fn parse(&self, text: &str) -> Result<f64, Diagnostic> {
        let trimmed = text.trim();
        if let Ok(f) = trimmed.parse::<f64>() {
            return Ok(f);
        }
        if let Some(n) = hex_digits(trimmed).and_then(|d| u128::from_str_radix(d, 16).ok()) {
            return Ok(n as f64);
        }
        Err(Diagnostic::parse(
            &self.ty,
            format!("'{text}' is not a valid {}", self.ty),
        ))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<f64, Diagnostic> {
        match (self.single, bytes.len()) {
            (true, 4) => Ok(f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
            (false, 8) => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Ok(f64::from_le_bytes(buf))
            }
            (single, len) => Err(Diagnostic::unsupported(
                &self.ty,
                format!(
                    "{} takes exactly {} bytes, got {len}",
                    self.ty,
                    if single { 4 } else { 8 }
                ),
            )),
        }
    }
}

impl Converter for FloatConverter {
    fn output_type(&self) -> &Type {
        &self.ty
    }

    fn try_convert(
        &self,
        _ctx: &mut ConvertContext<'_>,
        input: &Value,
        _output: &Type,
    ) -> Result<Value, Diagnostic> {
        let f = match input {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::UInt(u) => *u as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Str(s) => self.parse(s)?,
            Value::Bytes(bytes) => self.from_bytes(bytes)?,
            other => {
                return Err(Diagnostic::unsupported(
                    &self.ty,
                    format!("cannot convert {} to {}", other.kind_name(), self.ty),
                ));
            }
        };
        if !self.single {
            return Ok(Value::Float(f));
        }
        if f.is_finite() && f.abs() > f64::from(f32::MAX) {
            return Err(Diagnostic::overflow(
                &self.ty,
                format!("{f} is out of range for f32"),
            ));
        }
        Ok(Value::Float(f64::from(f as f32)))
    }
}
