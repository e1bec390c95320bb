use miette::Diagnostic;
use thiserror::Error;

use crate::constants::Address;
use crate::runtime::Mnemonic;

/// An error stopping the assembly, with the 1-based line it happened on
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
#[diagnostic(forward(kind))]
pub struct AssemblyError {
    pub line: usize,
    pub kind: AssemblyErrorKind,
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum AssemblyErrorKind {
    #[error("unknown instruction {0:?}")]
    #[diagnostic(
        code(ab8::assembler::unknown_mnemonic),
        help("directives are STR and HEX, labels are defined with `name:`")
    )]
    UnknownMnemonic(String),

    #[error("{0} expects an operand")]
    #[diagnostic(code(ab8::assembler::missing_operand))]
    MissingOperand(Mnemonic),

    #[error("unexpected operand {operand:?} for {mnemonic}")]
    #[diagnostic(code(ab8::assembler::unexpected_operand))]
    UnexpectedOperand { mnemonic: Mnemonic, operand: String },

    #[error("could not parse operand {0:?}")]
    #[diagnostic(
        code(ab8::assembler::malformed_operand),
        help("operands are two hexadecimal digits, like `0A`, or a label reference, like `:loop`")
    )]
    MalformedOperand(String),

    #[error("invalid hexadecimal data {0:?}")]
    #[diagnostic(
        code(ab8::assembler::invalid_hex),
        help("HEX expects pairs of hexadecimal digits")
    )]
    InvalidHex(String),

    #[error("invalid escape sequence in {0:?}")]
    #[diagnostic(
        code(ab8::assembler::invalid_escape),
        help(r#"supported escapes are \\, \", \', \n, \t, \r, \a, \b, \f, \v, \ooo (octal), \xHH, \uHHHH and \UHHHHHHHH"#)
    )]
    InvalidEscape(String),

    #[error("invalid label name {0:?}")]
    #[diagnostic(
        code(ab8::assembler::invalid_label),
        help("label names start with a letter or an underscore, followed by letters, digits or underscores")
    )]
    InvalidLabel(String),

    #[error("label {0} defined twice")]
    #[diagnostic(code(ab8::assembler::duplicate_label))]
    DuplicateLabel(String),

    #[error("could not resolve label {0}")]
    #[diagnostic(code(ab8::assembler::unresolved_label))]
    UnresolvedLabel(String),

    #[error("label {label} is at offset {offset}, which does not fit in an operand")]
    #[diagnostic(
        code(ab8::assembler::label_out_of_range),
        help("labels can only point to the first 256 bytes of a program")
    )]
    LabelOutOfRange { label: String, offset: Address },

    #[error("program is too large for a memory of {size} bytes")]
    #[diagnostic(code(ab8::assembler::program_too_large))]
    ProgramTooLarge { size: usize },
}

impl AssemblyErrorKind {
    pub(crate) fn at(self, line: usize) -> AssemblyError {
        AssemblyError { line, kind: self }
    }
}
