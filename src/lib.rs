//! A typed, SQL-embedded value-formatting engine: the implementation
//! behind a `FORMAT(template, value...)` scalar function. A template of
//! `%`-specifiers is parsed once into an immutable [`FormatProgram`],
//! bound against a typed argument list, rendered per conversion, and
//! stitched back together, or collapsed to NULL per the two-level NULL
//! rules.

mod bind;
mod cache;
mod error;
mod render;
mod template;
mod value;

pub use bind::{bind, BoundCall};
pub use cache::ProgramCache;
pub use error::FormatError;
pub use render::render;
pub use template::{
    Conversion, Flags, FormatProgram, PrecisionSpec, ProgramElement, Specifier, WidthSpec,
};
pub use value::{Value, ValueType};

pub type Result<T, E = FormatError> = std::result::Result<T, E>;

/// Concatenates literal segments and rendered fragments in program
/// order. Any `None` fragment (the overall-NULL marker from a non-`t`/
/// `T` specifier with a NULL binding) collapses the whole call to
/// `None`, discarding partial output.
pub fn assemble(program: &FormatProgram, fragments: Vec<Option<String>>) -> Option<String> {
    let mut fragments = fragments.into_iter();
    let mut out = String::new();
    for element in program.elements() {
        match element {
            ProgramElement::Literal(text) => out.push_str(text),
            ProgramElement::Spec(_) => match fragments.next() {
                Some(Some(fragment)) => out.push_str(&fragment),
                _ => return None,
            },
        }
    }
    Some(out)
}

/// The SQL-facing entry point: `FORMAT(template, value...)`.
///
/// `args[0]` is the template; the rest are the values it consumes. A
/// NULL template short-circuits to NULL before any parsing or argument
/// inspection. Non-text templates are coerced through their display
/// form, the way `PRINTF` treats a numeric first argument.
pub fn exec_format(args: &[Value]) -> Result<Value> {
    let Some((template, rest)) = args.split_first() else {
        return Err(FormatError::ArityMismatch {
            expected: 1,
            supplied: 0,
        });
    };
    let coerced;
    let template = match template {
        Value::Null => return Ok(Value::Null),
        Value::Text(text) => text.as_str(),
        other => {
            coerced = other.to_string();
            coerced.as_str()
        }
    };
    let program = FormatProgram::parse(template)?;
    run(&program, rest)
}

/// [`exec_format`], but resolving the program through a shared cache so
/// repeated templates parse once.
pub fn exec_format_cached(cache: &ProgramCache, args: &[Value]) -> Result<Value> {
    let Some((template, rest)) = args.split_first() else {
        return Err(FormatError::ArityMismatch {
            expected: 1,
            supplied: 0,
        });
    };
    let coerced;
    let template = match template {
        Value::Null => return Ok(Value::Null),
        Value::Text(text) => text.as_str(),
        other => {
            coerced = other.to_string();
            coerced.as_str()
        }
    };
    let program = cache.get_or_parse(template)?;
    run(&program, rest)
}

fn run(program: &FormatProgram, args: &[Value]) -> Result<Value> {
    tracing::trace!(args = args.len(), "executing format program");
    let calls = bind(program, args)?;
    let mut fragments = Vec::with_capacity(calls.len());
    for call in &calls {
        fragments.push(render(call)?);
    }
    match assemble(program, fragments) {
        Some(text) => Ok(Value::build_text(text)),
        None => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Value {
        Value::build_text(value)
    }

    fn integer(value: i64) -> Value {
        Value::Integer(value)
    }

    fn float(value: f64) -> Value {
        Value::Float(value)
    }

    #[test]
    fn test_format_literal_only() {
        assert_eq!(
            exec_format(&[text("No substitutions")]).unwrap(),
            text("No substitutions")
        );
        assert_eq!(exec_format(&[text("")]).unwrap(), text(""));
        assert_eq!(exec_format(&[text("100%% done")]).unwrap(), text("100% done"));
        // zero consuming slots means zero arguments, strictly
        assert_eq!(
            exec_format(&[text("plain"), integer(1)]).unwrap_err(),
            FormatError::ArityMismatch {
                expected: 0,
                supplied: 1
            }
        );
    }

    #[test]
    fn test_format_null_template_short_circuits() {
        // even arguments that could never match any specifier
        assert_eq!(
            exec_format(&[Value::Null, text("x"), Value::Blob(vec![1])]).unwrap(),
            Value::Null
        );
        assert_eq!(exec_format(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_format_null_argument_rules() {
        assert_eq!(exec_format(&[text("%d"), Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            exec_format(&[text("%t"), Value::Null]).unwrap(),
            text("NULL")
        );
        assert_eq!(
            exec_format(&[text("%T"), Value::Null]).unwrap(),
            text("NULL")
        );
        // one NULL specifier discards the whole output
        assert_eq!(
            exec_format(&[text("a %s b %d c"), text("x"), Value::Null]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_format_spec_examples() {
        let test_cases = vec![
            (
                vec![text("%'d"), integer(123456789)],
                text("123,456,789"),
            ),
            (vec![text("|%10d|"), integer(11)], text("|        11|")),
            (vec![text("+%010d+"), integer(12)], text("+0000000012+")),
            (
                vec![text("%f %E"), float(1.1), float(2.2)],
                text("1.100000 2.200000E+00"),
            ),
            (vec![text("%.*i"), integer(4), integer(7)], text("0007")),
            (
                vec![text("%s scored %d (%g%%)"), text("ana"), integer(9), float(97.5)],
                text("ana scored 9 (97.5%)"),
            ),
        ];
        for (input, expected) in test_cases {
            assert_eq!(exec_format(&input).unwrap(), expected);
        }
    }

    #[test]
    fn test_format_error_cases() {
        assert!(matches!(
            exec_format(&[text("%")]).unwrap_err(),
            FormatError::InvalidSpecifier { .. }
        ));
        assert!(matches!(
            exec_format(&[text("%s"), integer(1)]).unwrap_err(),
            FormatError::TypeMismatch {
                conversion: 's',
                ..
            }
        ));
        assert!(matches!(
            exec_format(&[text("%d %d"), integer(1)]).unwrap_err(),
            FormatError::ArityMismatch {
                expected: 2,
                supplied: 1
            }
        ));
        assert!(matches!(
            exec_format(&[]).unwrap_err(),
            FormatError::ArityMismatch { .. }
        ));
    }

    #[test]
    fn test_format_literal_round_trip() {
        // %T output re-parses to an equal value of the same shape
        for v in [0.1, -2.5, 3.0, 2.5e17] {
            let out = exec_format(&[text("%T"), float(v)]).unwrap();
            let Value::Text(rendered) = out else { panic!() };
            assert_eq!(rendered.parse::<f64>().unwrap(), v, "{rendered}");
        }
        for i in [0i64, -7, i64::MAX, i64::MIN] {
            let out = exec_format(&[text("%T"), integer(i)]).unwrap();
            let Value::Text(rendered) = out else { panic!() };
            assert_eq!(rendered.parse::<i64>().unwrap(), i, "{rendered}");
        }
    }

    #[test]
    fn test_format_huge_star_width_is_rejected() {
        // a BIGINT of any magnitude is a valid argument; it must fail
        // cleanly as a width instead of driving an enormous allocation
        let err = exec_format(&[text("%*d"), integer(i64::MIN), integer(5)]).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TypeMismatch {
                conversion: 'd',
                ..
            }
        ));
        let err = exec_format(&[text("%.*s"), integer(i64::MAX), text("x")]).unwrap_err();
        assert!(matches!(err, FormatError::TypeMismatch { .. }));
    }

    #[test]
    fn test_format_numeric_template_coerces_like_printf() {
        assert_eq!(exec_format(&[integer(1)]).unwrap(), text("1"));
    }

    #[test]
    fn test_format_cached_matches_uncached() {
        let cache = ProgramCache::new();
        let args = vec![text("%-6s|%05.1f"), text("id"), float(3.25)];
        assert_eq!(
            exec_format_cached(&cache, &args).unwrap(),
            exec_format(&args).unwrap()
        );
        assert_eq!(cache.len(), 1);
        // NULL template never touches the cache
        assert_eq!(
            exec_format_cached(&cache, &[Value::Null, integer(1)]).unwrap(),
            Value::Null
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_assemble_propagates_null_fragment() {
        let program = FormatProgram::parse("a%db").unwrap();
        assert_eq!(
            assemble(&program, vec![Some("1".to_string())]),
            Some("a1b".to_string())
        );
        assert_eq!(assemble(&program, vec![None]), None);
    }

    #[test]
    fn test_format_program_is_reusable_across_calls() {
        let program = FormatProgram::parse("%s=%d").unwrap();
        for (name, n) in [("a", 1i64), ("b", 2)] {
            let args = vec![text(name), integer(n)];
            let result = run(&program, &args).unwrap();
            assert_eq!(result, text(format!("{name}={n}").as_str()));
        }
    }
}
