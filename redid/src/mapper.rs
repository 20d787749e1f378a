//! Scalar values and the mapper pipeline that annotates them.
//!
//! A mapper never touches [`Scalar::actual`]; it only fills in the symbol,
//! description, unit or display format. Numeric mappers work on the current
//! symbol when it is a number, so `[Div(100.0), Add(1)]` computes `raw / 100 + 1`.
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Actual {
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Symbol {
    Str(Cow<'static, str>),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

impl Symbol {
    pub const fn text(s: &'static str) -> Self {
        Symbol::Str(Cow::Borrowed(s))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Symbol::Uint(v) => Some(*v as f64),
            Symbol::Float(v) => Some(*v),
            Symbol::Str(_) | Symbol::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Symbol::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Str(s) => write!(f, "{}", s),
            Symbol::Uint(v) => write!(f, "{}", v),
            Symbol::Float(v) => write!(f, "{}", v),
            Symbol::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    #[default]
    Decimal,
    Hex,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub actual: Actual,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sym: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub format: NumberFormat,
}

impl Scalar {
    pub fn new(actual: Actual) -> Self {
        Scalar {
            actual,
            sym: None,
            description: None,
            unit: None,
            format: NumberFormat::Decimal,
        }
    }

    pub fn uint(v: u64) -> Self {
        Self::new(Actual::Uint(v))
    }

    pub fn float(v: f64) -> Self {
        Self::new(Actual::Float(v))
    }

    pub fn key(&self) -> Option<u64> {
        match self.actual {
            Actual::Uint(v) => Some(v),
            Actual::Bool(b) => Some(b as u64),
            _ => None,
        }
    }

    /// The value numeric mappers build on: a numeric symbol if one is set, else the actual.
    pub fn number(&self) -> Option<Number> {
        match &self.sym {
            Some(Symbol::Uint(v)) => return Some(Number::Int(*v)),
            Some(Symbol::Float(v)) => return Some(Number::Float(*v)),
            _ => {}
        }
        match self.actual {
            Actual::Uint(v) => Some(Number::Int(v)),
            Actual::Float(v) => Some(Number::Float(v)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(u64),
    Float(f64),
}

impl Number {
    fn add(self, n: i64) -> Symbol {
        match self {
            Number::Int(v) => match v.checked_add_signed(n) {
                Some(r) => Symbol::Uint(r),
                None => Symbol::Float(v as f64 + n as f64),
            },
            Number::Float(v) => Symbol::Float(v + n as f64),
        }
    }

    fn mul(self, n: u64) -> Symbol {
        match self {
            Number::Int(v) => Symbol::Uint(v.saturating_mul(n)),
            Number::Float(v) => Symbol::Float(v * n as f64),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl Display for Actual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actual::Uint(v) => write!(f, "{}", v),
            Actual::Float(v) => write!(f, "{}", v),
            Actual::Bool(v) => write!(f, "{}", v),
            Actual::Str(s) => write!(f, "\"{}\"", s),
            Actual::Bytes(b) => {
                let shown = b.len().min(16);
                for (i, byte) in b[..shown].iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                if b.len() > shown {
                    write!(f, " ... ({} bytes)", b.len())?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.actual, self.format) {
            (Actual::Uint(v), NumberFormat::Hex) => write!(f, "0x{:02x}", v)?,
            (actual, _) => write!(f, "{}", actual)?,
        }
        if let Some(sym) = &self.sym {
            write!(f, " ({})", sym)?;
        }
        if let Some(unit) = self.unit {
            write!(f, " {}", unit)?;
        }
        if let Some(desc) = &self.description {
            write!(f, " \"{}\"", desc)?;
        }
        Ok(())
    }
}

/// One row of a lookup table. Missing keys leave the value unmapped.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: u64,
    pub sym: Option<Symbol>,
    pub description: Option<&'static str>,
}

impl MapEntry {
    pub const fn sym(key: u64, sym: &'static str) -> Self {
        MapEntry {
            key,
            sym: Some(Symbol::text(sym)),
            description: None,
        }
    }

    pub const fn desc(key: u64, description: &'static str) -> Self {
        MapEntry {
            key,
            sym: None,
            description: Some(description),
        }
    }

    pub const fn uint_desc(key: u64, sym: u64, description: &'static str) -> Self {
        MapEntry {
            key,
            sym: Some(Symbol::Uint(sym)),
            description: Some(description),
        }
    }

    pub const fn flag(key: u64, sym: bool) -> Self {
        MapEntry {
            key,
            sym: Some(Symbol::Bool(sym)),
            description: None,
        }
    }
}

/// Returned by a mapper that cannot annotate the value; carries the scalar back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Unmapped(pub Scalar);

pub type MapResult = std::result::Result<Scalar, Unmapped>;

#[derive(Debug, Clone)]
pub enum Mapper {
    /// Table lookup on the actual value.
    Lookup(&'static [MapEntry]),
    Unit(&'static str),
    Add(i64),
    Mul(u64),
    Div(f64),
    Hex,
    Formula(fn(Scalar) -> MapResult),
}

impl Mapper {
    pub fn apply(&self, mut s: Scalar) -> MapResult {
        match self {
            Mapper::Lookup(table) => {
                let Some(entry) = s.key().and_then(|k| table.iter().find(|e| e.key == k)) else {
                    return Err(Unmapped(s));
                };
                if let Some(sym) = &entry.sym {
                    s.sym = Some(sym.clone());
                }
                if let Some(desc) = entry.description {
                    s.description = Some(Cow::Borrowed(desc));
                }
                Ok(s)
            }
            Mapper::Unit(unit) => {
                s.unit = Some(unit);
                Ok(s)
            }
            Mapper::Add(n) => match s.number() {
                Some(v) => {
                    s.sym = Some(v.add(*n));
                    Ok(s)
                }
                None => Err(Unmapped(s)),
            },
            Mapper::Mul(n) => match s.number() {
                Some(v) => {
                    s.sym = Some(v.mul(*n));
                    Ok(s)
                }
                None => Err(Unmapped(s)),
            },
            Mapper::Div(d) => match s.number() {
                Some(v) if *d != 0.0 => {
                    s.sym = Some(Symbol::Float(v.as_f64() / d));
                    Ok(s)
                }
                _ => Err(Unmapped(s)),
            },
            Mapper::Hex => {
                s.format = NumberFormat::Hex;
                Ok(s)
            }
            Mapper::Formula(f) => f(s),
        }
    }
}

/// Fold `mappers` over `scalar` left to right.
///
/// The first mapper that cannot handle the value stops the pipeline; the
/// annotations gathered before it are kept.
pub fn apply_all(scalar: Scalar, mappers: &[Mapper]) -> Scalar {
    match mappers.iter().try_fold(scalar, |s, m| m.apply(s)) {
        Ok(s) => s,
        Err(Unmapped(s)) => {
            tracing::trace!(actual = %s.actual, "value left unmapped");
            s
        }
    }
}
