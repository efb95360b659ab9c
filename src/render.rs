use crate::bind::BoundCall;
use crate::template::{Conversion, Flags};
use crate::value::Value;
use crate::{FormatError, Result};

/// Renders one bound specifier. `Ok(None)` is the overall-NULL marker
/// the assembler propagates: a NULL value under any conversion other
/// than `%t`/`%T`, or a NULL `*` width/precision argument.
pub fn render(call: &BoundCall<'_>) -> Result<Option<String>> {
    if call.star_null {
        return Ok(None);
    }
    let spec = call.spec;
    let mut flags = spec.flags;
    let width = match call.width {
        // Negative width from a `*` argument means left-align at |w|.
        Some(w) if w < 0 => {
            flags.left_align = true;
            Some(w.unsigned_abs() as usize)
        }
        Some(w) => Some(w as usize),
        None => None,
    };
    let precision = match call.precision {
        Some(p) if p >= 0 => Some(p as usize),
        _ => None,
    };

    if call.value.is_null() {
        return Ok(match spec.conversion {
            Conversion::AnyDisplay | Conversion::AnyLiteral => {
                Some(pad_str("NULL".to_string(), &flags, width, precision))
            }
            _ => None,
        });
    }

    let rendered = match spec.conversion {
        Conversion::Decimal => render_decimal(int_arg(call)?, &flags, width, precision),
        Conversion::Octal | Conversion::HexLower | Conversion::HexUpper => {
            render_radix(int_arg(call)?, spec.conversion, &flags, width, precision)
        }
        Conversion::FixedLower | Conversion::FixedUpper => render_fixed(
            float_arg(call)?,
            spec.conversion.is_upper(),
            &flags,
            width,
            precision,
        ),
        Conversion::SciLower | Conversion::SciUpper => render_sci(
            float_arg(call)?,
            spec.conversion.is_upper(),
            &flags,
            width,
            precision,
        ),
        Conversion::ShortestLower | Conversion::ShortestUpper => render_shortest(
            float_arg(call)?,
            spec.conversion.is_upper(),
            &flags,
            width,
            precision,
        ),
        Conversion::Str => {
            let Value::Text(text) = call.value else {
                return Err(mismatch(call));
            };
            pad_str(text.clone(), &flags, width, precision)
        }
        Conversion::AnyDisplay => pad_str(call.value.to_string(), &flags, width, precision),
        Conversion::AnyLiteral => pad_str(call.value.sql_literal(), &flags, width, precision),
        Conversion::PrettyLine | Conversion::PrettyBlock => {
            if !matches!(call.value, Value::Array(_) | Value::Struct(_)) {
                return Err(mismatch(call));
            }
            let text = if spec.conversion == Conversion::PrettyBlock {
                call.value.pretty_multiline()
            } else {
                call.value.to_string()
            };
            pad_str(text, &flags, width, precision)
        }
    };
    Ok(Some(rendered))
}

fn mismatch(call: &BoundCall<'_>) -> FormatError {
    FormatError::TypeMismatch {
        conversion: call.spec.conversion.ch(),
        value_type: call.value.value_type(),
    }
}

fn int_arg(call: &BoundCall<'_>) -> Result<i64> {
    match call.value {
        Value::Integer(i) => Ok(*i),
        _ => Err(mismatch(call)),
    }
}

fn float_arg(call: &BoundCall<'_>) -> Result<f64> {
    match call.value {
        Value::Float(v) => Ok(*v),
        _ => Err(mismatch(call)),
    }
}

/// Truncates to `precision` leading code points, then pads to `width`
/// code points. Right-aligned unless `-` is set.
fn pad_str(mut text: String, flags: &Flags, width: Option<usize>, precision: Option<usize>) -> String {
    if let Some(p) = precision {
        if let Some((idx, _)) = text.char_indices().nth(p) {
            text.truncate(idx);
        }
    }
    pad_width(text, flags, width)
}

fn pad_width(text: String, flags: &Flags, width: Option<usize>) -> String {
    let Some(w) = width else { return text };
    let len = text.chars().count();
    if len >= w {
        return text;
    }
    let pad = " ".repeat(w - len);
    if flags.left_align {
        text + &pad
    } else {
        pad + &text
    }
}

/// Assembles sign + prefix + digits, distributing any width padding.
/// Zero fill goes between the prefix and the digits; the `-` flag and
/// (for integers) an explicit precision both disable it.
fn finish_numeric(
    sign: &str,
    prefix: &str,
    digits: String,
    flags: &Flags,
    width: Option<usize>,
    zero_pad_blocked: bool,
) -> String {
    let body = format!("{sign}{prefix}{digits}");
    let Some(w) = width else { return body };
    let len = body.chars().count();
    if len >= w {
        return body;
    }
    if flags.zero_pad && !flags.left_align && !zero_pad_blocked {
        let fill = "0".repeat(w - len);
        format!("{sign}{prefix}{fill}{digits}")
    } else {
        pad_width(body, flags, Some(w))
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn render_decimal(v: i64, flags: &Flags, width: Option<usize>, precision: Option<usize>) -> String {
    let mut digits = if precision == Some(0) && v == 0 {
        String::new()
    } else {
        v.unsigned_abs().to_string()
    };
    if let Some(p) = precision {
        if digits.len() < p {
            digits = format!("{digits:0>p$}");
        }
    }
    if flags.group_comma {
        digits = group_thousands(&digits);
    }
    let sign = if v < 0 {
        "-"
    } else if flags.sign {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    };
    finish_numeric(sign, "", digits, flags, width, precision.is_some())
}

/// Octal and hex render the two's-complement bit pattern, unsigned, the
/// way classic `%x` treats a negative operand.
fn render_radix(
    v: i64,
    conversion: Conversion,
    flags: &Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> String {
    let bits = v as u64;
    let mut digits = if precision == Some(0) && bits == 0 {
        String::new()
    } else {
        match conversion {
            Conversion::Octal => format!("{bits:o}"),
            Conversion::HexLower => format!("{bits:x}"),
            _ => format!("{bits:X}"),
        }
    };
    if let Some(p) = precision {
        if digits.len() < p {
            digits = format!("{digits:0>p$}");
        }
    }
    let prefix = if flags.alternate {
        match conversion {
            Conversion::Octal if !digits.starts_with('0') => "0",
            Conversion::HexLower if bits != 0 => "0x",
            Conversion::HexUpper if bits != 0 => "0X",
            _ => "",
        }
    } else {
        ""
    };
    finish_numeric("", prefix, digits, flags, width, precision.is_some())
}

fn sign_of(v: f64, flags: &Flags) -> &'static str {
    if v.is_sign_negative() {
        "-"
    } else if flags.sign {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    }
}

fn nonfinite(v: f64, upper: bool) -> String {
    let token = if v.is_nan() {
        "nan"
    } else if v.is_sign_negative() {
        "-inf"
    } else {
        "inf"
    };
    if upper {
        token.to_uppercase()
    } else {
        token.to_string()
    }
}

fn render_fixed(
    v: f64,
    upper: bool,
    flags: &Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> String {
    if !v.is_finite() {
        return pad_width(nonfinite(v, upper), flags, width);
    }
    let p = precision.unwrap_or(6);
    let magnitude = v.abs();
    let mut body = format!("{magnitude:.p$}");
    if flags.alternate && p == 0 {
        body.push('.');
    }
    finish_numeric(sign_of(v, flags), "", body, flags, width, false)
}

/// `{:e}` prints exponents as `e2`; classic printf wants a signed,
/// at-least-two-digit `e+02`. Formats the mantissa at `p` fractional
/// digits and rewrites the exponent.
fn scientific(magnitude: f64, p: usize, upper: bool) -> String {
    let formatted = format!("{magnitude:.p$e}");
    let (mantissa, exp) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{exp:+03}")
}

/// Decimal exponent of `magnitude` as seen at `p` mantissa digits after
/// the point. Drives the `%g` fixed-vs-scientific choice.
fn decimal_exponent(magnitude: f64, p: usize) -> i32 {
    let formatted = format!("{magnitude:.p$e}");
    formatted
        .split_once('e')
        .and_then(|(_, exp)| exp.parse().ok())
        .unwrap_or(0)
}

fn render_sci(
    v: f64,
    upper: bool,
    flags: &Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> String {
    if !v.is_finite() {
        return pad_width(nonfinite(v, upper), flags, width);
    }
    let p = precision.unwrap_or(6);
    let mut body = scientific(v.abs(), p, upper);
    if flags.alternate && p == 0 {
        if let Some(epos) = body.find(['e', 'E']) {
            body.insert(epos, '.');
        }
    }
    finish_numeric(sign_of(v, flags), "", body, flags, width, false)
}

fn strip_fixed_zeros(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn strip_sci_zeros(text: String) -> String {
    let Some(epos) = text.find(['e', 'E']) else {
        return text;
    };
    let (mantissa, tail) = text.split_at(epos);
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{tail}")
}

/// `%g`: with effective precision p, pick fixed notation iff the decimal
/// exponent x satisfies -4 <= x < p; scientific otherwise. Trailing
/// fractional zeros are stripped unless `#` is set.
fn render_shortest(
    v: f64,
    upper: bool,
    flags: &Flags,
    width: Option<usize>,
    precision: Option<usize>,
) -> String {
    if !v.is_finite() {
        return pad_width(nonfinite(v, upper), flags, width);
    }
    let p = match precision {
        Some(p) if p >= 1 => p,
        Some(_) => 1,
        None => 6,
    };
    let magnitude = v.abs();
    let x = decimal_exponent(magnitude, p - 1);
    let body = if x < -4 || x >= p as i32 {
        let s = scientific(magnitude, p - 1, upper);
        if flags.alternate {
            s
        } else {
            strip_sci_zeros(s)
        }
    } else {
        let q = (p as i32 - 1 - x) as usize;
        let s = format!("{magnitude:.q$}");
        if flags.alternate {
            s
        } else {
            strip_fixed_zeros(s)
        }
    };
    finish_numeric(sign_of(v, flags), "", body, flags, width, false)
}
