use crate::value::ValueType;

/// Errors raised by the formatting engine.
///
/// All three abort the whole call; no partial output is ever produced.
/// NULL templates and NULL arguments are not errors, they follow the
/// NULL-propagation rules instead.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, miette::Diagnostic, thiserror::Error)]
#[diagnostic()]
pub enum FormatError {
    /// Malformed `%`-construct in the template. Parse-time only,
    /// independent of the argument list.
    #[error("invalid format specifier at {span:?}: {reason}")]
    InvalidSpecifier {
        #[label("here")]
        span: miette::SourceSpan,
        reason: String,
    },
    /// The template's consuming slots (specifiers plus `*`-driven width
    /// and precision slots) do not line up with the supplied arguments.
    #[error("format template consumes {expected} arguments but {supplied} were supplied")]
    ArityMismatch { expected: usize, supplied: usize },
    /// A bound value's runtime type is incompatible with its conversion.
    #[error("%{conversion} cannot format a {value_type} value")]
    TypeMismatch {
        conversion: char,
        value_type: ValueType,
    },
}

impl FormatError {
    pub(crate) fn invalid_specifier(
        offset: usize,
        len: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSpecifier {
            span: (offset, len).into(),
            reason: reason.into(),
        }
    }
}
