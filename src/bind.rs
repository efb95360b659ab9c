use crate::template::{
    FormatProgram, PrecisionSpec, ProgramElement, Specifier, WidthSpec, MAX_WIDTH,
};
use crate::value::Value;
use crate::{FormatError, Result};

/// One specifier with its `*` slots resolved against the live argument
/// list and its value assigned. Built per call, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCall<'a> {
    pub spec: &'a Specifier,
    /// Resolved width. Negative values (only reachable through `*`)
    /// mean left-alignment at the absolute width.
    pub width: Option<i64>,
    /// Resolved precision. Negative values mean "no precision".
    pub precision: Option<i64>,
    /// A `*` width or precision argument was NULL; the call collapses
    /// to overall NULL at render time.
    pub star_null: bool,
    pub value: &'a Value,
}

/// Walks the program in order, consuming arguments left to right. For a
/// single specifier the order is `*` width, then `*` precision, then the
/// value. The slot count must match the argument count exactly.
pub fn bind<'a>(program: &'a FormatProgram, args: &'a [Value]) -> Result<Vec<BoundCall<'a>>> {
    let expected = program.arg_slots();
    if expected != args.len() {
        return Err(FormatError::ArityMismatch {
            expected,
            supplied: args.len(),
        });
    }

    let mut calls = Vec::with_capacity(args.len());
    let mut next = 0usize;
    for element in program.elements() {
        let ProgramElement::Spec(spec) = element else {
            continue;
        };
        let mut star_null = false;

        let width = match spec.width {
            WidthSpec::None => None,
            WidthSpec::Fixed(w) => Some(i64::from(w)),
            WidthSpec::FromArg => {
                let resolved = resolve_star(&args[next], spec, &mut star_null)?;
                next += 1;
                resolved
            }
        };
        let precision = match spec.precision {
            PrecisionSpec::None => None,
            PrecisionSpec::Fixed(p) => Some(i64::from(p)),
            PrecisionSpec::FromArg => {
                let resolved = resolve_star(&args[next], spec, &mut star_null)?;
                next += 1;
                resolved
            }
        };

        let value = &args[next];
        next += 1;
        calls.push(BoundCall {
            spec,
            width,
            precision,
            star_null,
            value,
        });
    }
    debug_assert_eq!(next, args.len());
    Ok(calls)
}

/// A `*` slot takes an integer within the same bound the parser puts on
/// fixed widths (negative magnitudes included: a negative width means
/// left-alignment, a negative precision means none). Anything else is a
/// `TypeMismatch`: the argument is not usable as a width or precision.
fn resolve_star(
    arg: &Value,
    spec: &Specifier,
    star_null: &mut bool,
) -> Result<Option<i64>> {
    match arg {
        Value::Null => {
            *star_null = true;
            Ok(None)
        }
        Value::Integer(i) if i.unsigned_abs() <= u64::from(MAX_WIDTH) => Ok(Some(*i)),
        other => Err(FormatError::TypeMismatch {
            conversion: spec.conversion.ch(),
            value_type: other.value_type(),
        }),
    }
}
