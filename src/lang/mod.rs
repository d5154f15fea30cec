//! # Language Module
//!
//! Language specific operations such as (de)tokenization are in the submodules.
//! At present there is one language, Locomotive BASIC, in `lang::locomotive`.
//!
//! Decoding of program images is meant to be forgiving.  Rather than failing, the
//! detokenizer records a `Diagnostic` and keeps going, so that a damaged program
//! taken from an old disk can still be listed.

pub mod locomotive;

use std::fmt;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum Error {
    #[error("Syntax error")]
    Syntax,
    #[error("Invalid Line Number")]
    LineNumber,
    #[error("Line too long")]
    LineTooLong,
    #[error("Tokenization error")]
    Tokenization
}

/// Kinds of trouble found while decoding a program image
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub enum DiagnosticKind {
    /// token byte has no table entry
    UnrecognizedToken(u8),
    /// extended token (after 0xFF) has no table entry
    UnrecognizedExtendedToken(u8),
    /// operand bytes ran past the end of the line
    TruncatedOperand,
    /// bit 7 terminated name ran to the end of the line
    Unterminated,
    /// line length field is not consistent with the buffer
    BadLineLength(u16),
    /// line extends past the end of the buffer
    LineOverrun
}

/// A problem found at a given offset into the decoded buffer
#[derive(PartialEq,Eq,Clone,Copy,Debug)]
pub struct Diagnostic {
    pub offset: usize,
    pub kind: DiagnosticKind
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedToken(b) => write!(f,"unrecognized token {:02X}",b),
            Self::UnrecognizedExtendedToken(b) => write!(f,"unrecognized token FF {:02X}",b),
            Self::TruncatedOperand => write!(f,"operand truncated by end of line"),
            Self::Unterminated => write!(f,"missing terminator before end of line"),
            Self::BadLineLength(len) => write!(f,"bad line length {}",len),
            Self::LineOverrun => write!(f,"line runs past end of data")
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{} at offset {}",self.kind,self.offset)
    }
}
