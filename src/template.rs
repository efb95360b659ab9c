use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::FormatError;
use crate::Result;

/// Largest accepted width or precision, whether written in the template
/// or resolved from a `*` argument. The binder enforces the same bound
/// as the parser so a `*` argument cannot request an output the engine
/// would never produce for a fixed width.
pub(crate) const MAX_WIDTH: u32 = 1_000_000;

/// The `%` specifier flags. Stored as a set: duplicates in the template
/// collapse, and a flag irrelevant to a conversion is ignored at render
/// time, never rejected at parse time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// `-`
    pub left_align: bool,
    /// `0`
    pub zero_pad: bool,
    /// `+`
    pub sign: bool,
    /// ` `
    pub space: bool,
    /// `#`
    pub alternate: bool,
    /// `'`
    pub group_comma: bool,
}

impl Flags {
    /// Records `c` if it is a flag character. Returns false (untouched)
    /// otherwise.
    fn set(&mut self, c: char) -> bool {
        match c {
            '-' => self.left_align = true,
            '0' => self.zero_pad = true,
            '+' => self.sign = true,
            ' ' => self.space = true,
            '#' => self.alternate = true,
            '\'' => self.group_comma = true,
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthSpec {
    None,
    Fixed(u32),
    /// `*`: one extra leading integer argument carries the width.
    FromArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionSpec {
    None,
    Fixed(u32),
    /// `.*`: one extra leading integer argument carries the precision.
    FromArg,
}

/// The closed set of conversion characters. `%%` never reaches this
/// enum; the parser folds it into literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `%d` / `%i`
    Decimal,
    /// `%o`
    Octal,
    /// `%x`
    HexLower,
    /// `%X`
    HexUpper,
    /// `%f`
    FixedLower,
    /// `%F`
    FixedUpper,
    /// `%e`
    SciLower,
    /// `%E`
    SciUpper,
    /// `%g`
    ShortestLower,
    /// `%G`
    ShortestUpper,
    /// `%s`
    Str,
    /// `%t`: display form of any value, NULL renders as `NULL`
    AnyDisplay,
    /// `%T`: re-parseable SQL literal of any value, NULL renders as `NULL`
    AnyLiteral,
    /// `%p`: one-line container rendering
    PrettyLine,
    /// `%P`: multi-line container rendering
    PrettyBlock,
}

impl Conversion {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'd' | 'i' => Self::Decimal,
            'o' => Self::Octal,
            'x' => Self::HexLower,
            'X' => Self::HexUpper,
            'f' => Self::FixedLower,
            'F' => Self::FixedUpper,
            'e' => Self::SciLower,
            'E' => Self::SciUpper,
            'g' => Self::ShortestLower,
            'G' => Self::ShortestUpper,
            's' => Self::Str,
            't' => Self::AnyDisplay,
            'T' => Self::AnyLiteral,
            'p' => Self::PrettyLine,
            'P' => Self::PrettyBlock,
            _ => return None,
        })
    }

    /// Canonical conversion character, used in error reports.
    pub fn ch(self) -> char {
        match self {
            Self::Decimal => 'd',
            Self::Octal => 'o',
            Self::HexLower => 'x',
            Self::HexUpper => 'X',
            Self::FixedLower => 'f',
            Self::FixedUpper => 'F',
            Self::SciLower => 'e',
            Self::SciUpper => 'E',
            Self::ShortestLower => 'g',
            Self::ShortestUpper => 'G',
            Self::Str => 's',
            Self::AnyDisplay => 't',
            Self::AnyLiteral => 'T',
            Self::PrettyLine => 'p',
            Self::PrettyBlock => 'P',
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(
            self,
            Self::HexUpper | Self::FixedUpper | Self::SciUpper | Self::ShortestUpper
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specifier {
    pub flags: Flags,
    pub width: WidthSpec,
    pub precision: PrecisionSpec,
    pub conversion: Conversion,
}

impl Specifier {
    /// Arguments this specifier consumes, counting `*` extras.
    pub fn arg_slots(&self) -> usize {
        1 + usize::from(self.width == WidthSpec::FromArg)
            + usize::from(self.precision == PrecisionSpec::FromArg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgramElement {
    /// Verbatim template text between specifiers. `%%` decodes into this.
    Literal(String),
    Spec(Specifier),
}

/// A parsed template: literal runs and specifiers in template order.
/// Immutable after parse, safe to share across threads and reuse across
/// calls with different argument lists.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatProgram {
    elements: Vec<ProgramElement>,
}

impl FormatProgram {
    /// Parses a format template. Pure: the same template always yields a
    /// structurally identical program.
    pub fn parse(template: &str) -> Result<Self> {
        tracing::trace!(template, "parsing format template");
        let mut elements = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            if let Some(&(_, '%')) = chars.peek() {
                chars.next();
                literal.push('%');
                continue;
            }
            if !literal.is_empty() {
                elements.push(ProgramElement::Literal(std::mem::take(&mut literal)));
            }
            let spec = parse_specifier(template, start, &mut chars)?;
            elements.push(ProgramElement::Spec(spec));
        }
        if !literal.is_empty() {
            elements.push(ProgramElement::Literal(literal));
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[ProgramElement] {
        &self.elements
    }

    /// Total consuming slots: one per specifier plus one per `*` width
    /// or precision. Must equal the argument count at bind time.
    pub fn arg_slots(&self) -> usize {
        self.elements
            .iter()
            .map(|e| match e {
                ProgramElement::Literal(_) => 0,
                ProgramElement::Spec(spec) => spec.arg_slots(),
            })
            .sum()
    }
}

enum Scanned {
    None,
    Value(u32),
    Overflow,
}

fn scan_number(chars: &mut Peekable<CharIndices<'_>>) -> Scanned {
    let mut seen = false;
    let mut overflow = false;
    let mut n: u32 = 0;
    while let Some(&(_, c)) = chars.peek() {
        let Some(d) = c.to_digit(10) else { break };
        chars.next();
        seen = true;
        n = match n.checked_mul(10).and_then(|n| n.checked_add(d)) {
            Some(n) => n,
            None => {
                overflow = true;
                0
            }
        };
    }
    if overflow {
        Scanned::Overflow
    } else if seen {
        Scanned::Value(n)
    } else {
        Scanned::None
    }
}

fn invalid(
    template: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
    reason: impl Into<String>,
) -> FormatError {
    let end = chars.peek().map_or(template.len(), |&(i, _)| i);
    FormatError::invalid_specifier(start, end - start, reason)
}

fn parse_specifier(
    template: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<Specifier> {
    let mut flags = Flags::default();
    while let Some(&(_, c)) = chars.peek() {
        if !flags.set(c) {
            break;
        }
        chars.next();
    }

    let width = if let Some(&(_, '*')) = chars.peek() {
        chars.next();
        WidthSpec::FromArg
    } else {
        match scan_number(chars) {
            Scanned::None => WidthSpec::None,
            Scanned::Value(n) if n <= MAX_WIDTH => WidthSpec::Fixed(n),
            _ => return Err(invalid(template, start, chars, "width out of range")),
        }
    };

    let precision = if let Some(&(_, '.')) = chars.peek() {
        chars.next();
        if let Some(&(_, '*')) = chars.peek() {
            chars.next();
            PrecisionSpec::FromArg
        } else {
            match scan_number(chars) {
                Scanned::Value(n) if n <= MAX_WIDTH => PrecisionSpec::Fixed(n),
                Scanned::None => {
                    return Err(invalid(
                        template,
                        start,
                        chars,
                        "precision expects digits or `*` after `.`",
                    ))
                }
                _ => return Err(invalid(template, start, chars, "precision out of range")),
            }
        }
    } else {
        PrecisionSpec::None
    };

    let conversion = match chars.next() {
        Some((_, c)) => Conversion::from_char(c).ok_or_else(|| {
            invalid(
                template,
                start,
                chars,
                format!("unknown conversion character `{c}`"),
            )
        })?,
        None => return Err(invalid(template, start, chars, "unterminated format specifier")),
    };

    Ok(Specifier {
        flags,
        width,
        precision,
        conversion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &FormatProgram, index: usize) -> &Specifier {
        let specs: Vec<&Specifier> = program
            .elements()
            .iter()
            .filter_map(|e| match e {
                ProgramElement::Spec(s) => Some(s),
                ProgramElement::Literal(_) => None,
            })
            .collect();
        specs[index]
    }

    #[test]
    fn test_parse_plain_literal() {
        let program = FormatProgram::parse("no specifiers here").unwrap();
        assert_eq!(
            program.elements(),
            &[ProgramElement::Literal("no specifiers here".to_string())]
        );
        assert_eq!(program.arg_slots(), 0);
    }

    #[test]
    fn test_parse_percent_escape_folds_into_literal() {
        let program = FormatProgram::parse("100%% complete").unwrap();
        assert_eq!(
            program.elements(),
            &[ProgramElement::Literal("100% complete".to_string())]
        );
        let program = FormatProgram::parse("%%%%").unwrap();
        assert_eq!(program.elements(), &[ProgramElement::Literal("%%".to_string())]);
    }

    #[test]
    fn test_parse_full_specifier() {
        let program = FormatProgram::parse("x=%-+10.3f!").unwrap();
        assert_eq!(program.elements().len(), 3);
        let s = spec(&program, 0);
        assert!(s.flags.left_align && s.flags.sign);
        assert!(!s.flags.zero_pad);
        assert_eq!(s.width, WidthSpec::Fixed(10));
        assert_eq!(s.precision, PrecisionSpec::Fixed(3));
        assert_eq!(s.conversion, Conversion::FixedLower);
    }

    #[test]
    fn test_parse_flags_collapse_and_order() {
        let a = FormatProgram::parse("%--0'5d").unwrap();
        let b = FormatProgram::parse("%0-'5d").unwrap();
        assert_eq!(a, b);
        let s = spec(&a, 0);
        assert!(s.flags.left_align && s.flags.zero_pad && s.flags.group_comma);
    }

    #[test]
    fn test_parse_star_width_and_precision() {
        let program = FormatProgram::parse("%*.*s").unwrap();
        let s = spec(&program, 0);
        assert_eq!(s.width, WidthSpec::FromArg);
        assert_eq!(s.precision, PrecisionSpec::FromArg);
        assert_eq!(s.arg_slots(), 3);
        assert_eq!(program.arg_slots(), 3);
    }

    #[test]
    fn test_parse_zero_flag_vs_width_digits() {
        let s_program = FormatProgram::parse("%010d").unwrap();
        let s = spec(&s_program, 0);
        assert!(s.flags.zero_pad);
        assert_eq!(s.width, WidthSpec::Fixed(10));
    }

    #[test]
    fn test_parse_conversion_characters() {
        let cases = vec![
            ("%d", Conversion::Decimal),
            ("%i", Conversion::Decimal),
            ("%o", Conversion::Octal),
            ("%x", Conversion::HexLower),
            ("%X", Conversion::HexUpper),
            ("%f", Conversion::FixedLower),
            ("%F", Conversion::FixedUpper),
            ("%e", Conversion::SciLower),
            ("%E", Conversion::SciUpper),
            ("%g", Conversion::ShortestLower),
            ("%G", Conversion::ShortestUpper),
            ("%s", Conversion::Str),
            ("%t", Conversion::AnyDisplay),
            ("%T", Conversion::AnyLiteral),
            ("%p", Conversion::PrettyLine),
            ("%P", Conversion::PrettyBlock),
        ];
        for (template, expected) in cases {
            let program = FormatProgram::parse(template).unwrap();
            assert_eq!(spec(&program, 0).conversion, expected, "{template}");
        }
    }

    #[test]
    fn test_parse_errors() {
        let error_cases = vec![
            // lone trailing percent
            "incomplete %",
            // digits then end of template
            "%5",
            // unknown conversion character
            "%z",
            // precision present but empty
            "%.s",
            "%5.",
            // width and precision beyond the accepted bound
            "%99999999999d",
            "%2000000d",
            "%.2000000f",
        ];
        for template in error_cases {
            let err = FormatProgram::parse(template).unwrap_err();
            assert!(
                matches!(err, FormatError::InvalidSpecifier { .. }),
                "{template}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_error_span_points_at_specifier() {
        let err = FormatProgram::parse("abc%qd").unwrap_err();
        let FormatError::InvalidSpecifier { span, .. } = err else {
            panic!("expected InvalidSpecifier");
        };
        assert_eq!(span.offset(), 3);
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn test_parse_idempotent() {
        let template = "a %-5.2f b %% c %*.*X %t";
        assert_eq!(
            FormatProgram::parse(template).unwrap(),
            FormatProgram::parse(template).unwrap()
        );
    }
}
