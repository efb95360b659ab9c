use std::fmt::{self, Display, Write};

use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Runtime type tag of a [`Value`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Blob,
    Date,
    Timestamp,
    Array,
    Struct,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::Bool => "BOOLEAN",
            Self::Integer => "BIGINT",
            Self::Float => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Blob => "VARBINARY",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Array => "ARRAY",
            Self::Struct => "STRUCT",
        };
        write!(f, "{name}")
    }
}

/// A tagged SQL value as handed to `FORMAT`. Scalars map to the usual
/// SQL types (`Integer` is BIGINT, `Float` is DOUBLE, `Text` is VARCHAR,
/// `Blob` is VARBINARY); `Array` and `Struct` are the container shapes
/// `%p`/`%P` accept.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn build_text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::Text,
            Self::Blob(_) => ValueType::Blob,
            Self::Date(_) => ValueType::Date,
            Self::Timestamp(_) => ValueType::Timestamp,
            Self::Array(_) => ValueType::Array,
            Self::Struct(_) => ValueType::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Rendering as a re-parseable SQL literal of an equal-or-widened
    /// type, with no casts. The `%T` printer. Non-finite doubles have no
    /// literal form and come out as the bare `inf`/`-inf`/`nan` tokens.
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(v) => float_display(*v),
            Self::Text(text) => format!("'{}'", text.replace('\'', "''")),
            Self::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for b in bytes {
                    write!(out, "{b:02X}")
                        .expect("write! to a String cannot fail; it panics on OOM");
                }
                out.push('\'');
                out
            }
            Self::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
            Self::Timestamp(ts) => format!("TIMESTAMP '{}'", timestamp_display(ts)),
            Self::Array(items) => {
                let inner: Vec<String> = items.iter().map(Value::sql_literal).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Struct(fields) => {
                let inner: Vec<String> = fields.iter().map(|(_, v)| v.sql_literal()).collect();
                format!("({})", inner.join(", "))
            }
        }
    }

    /// Multi-line rendering for containers, used by `%P`. Scalars fall
    /// back to their display form.
    pub fn pretty_multiline(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        match self {
            Self::Array(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    indent(out, depth + 1);
                    item.pretty_into(out, depth + 1);
                    if i + 1 < items.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                indent(out, depth);
                out.push(']');
            }
            Self::Struct(fields) => {
                if fields.is_empty() {
                    out.push_str("()");
                    return;
                }
                out.push_str("(\n");
                for (i, (name, value)) in fields.iter().enumerate() {
                    indent(out, depth + 1);
                    out.push_str(name);
                    out.push_str(": ");
                    value.pretty_into(out, depth + 1);
                    if i + 1 < fields.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                indent(out, depth);
                out.push(')');
            }
            scalar => {
                write!(out, "{scalar}").expect("write! to a String cannot fail; it panics on OOM")
            }
        }
    }
}

/// Natural human-readable form, the `%t`/`%p` printer.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&float_display(*v)),
            Self::Text(text) => f.write_str(text),
            Self::Blob(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(ts) => f.write_str(&timestamp_display(ts)),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Struct(fields) => {
                f.write_str("(")?;
                for (i, (_, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// SQL REAL display form. Whole doubles keep a trailing `.0` so the text
/// still reads (and re-parses) as a double, not an integer.
pub(crate) fn float_display(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v.is_sign_negative() { "-inf" } else { "inf" }.to_string();
    }
    let mut out = format!("{v}");
    if !out.contains(['.', 'e', 'E']) {
        out.push_str(".0");
    }
    out
}

fn timestamp_display(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
