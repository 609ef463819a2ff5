use std::fmt;

macro_rules! err {
    ($kind:ident, $msg:literal) => {
        $crate::dex::error::DexError::of($crate::dex::error::DexErrorKind::$kind, $msg)
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        $crate::dex::error::DexError::of(
            $crate::dex::error::DexErrorKind::$kind,
            &format!($fmtstr, $($args)*),
        )
    };
}

macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        return Err(err!($kind, $msg))
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        return Err(err!($kind, $fmtstr, $($args)*))
    };
}

/// Broad failure category.
///
/// `InvariantViolation` is a programmer error in the way the builder was driven (binding a
/// label twice, an operand that does not fit its instruction format, ...). `Unsupported`
/// marks legal input this builder has no encoding for yet. `Format` covers problems found
/// while laying out the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DexErrorKind {
    InvariantViolation,
    Unsupported,
    Format,
}

impl fmt::Display for DexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexErrorKind::InvariantViolation => write!(f, "invariant violation"),
            DexErrorKind::Unsupported => write!(f, "unsupported"),
            DexErrorKind::Format => write!(f, "format error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexError
{
    kind: DexErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn of(kind: DexErrorKind, msg: &str) -> Self
    {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn new(msg: &str) -> Self
    {
        DexError::of(DexErrorKind::Format, msg)
    }

    pub(crate) fn with_context(base: DexError, context: String) -> Self
    {
        let mut contexts = base.contexts;
        contexts.push(context);
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    pub fn kind(&self) -> DexErrorKind
    {
        self.kind
    }

    pub fn message(&self) -> &str
    {
        &self.msg
    }

    pub fn is_invariant_violation(&self) -> bool
    {
        self.kind == DexErrorKind::InvariantViolation
    }

    pub fn is_unsupported(&self) -> bool
    {
        self.kind == DexErrorKind::Unsupported
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}: {}", self.kind, self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}
