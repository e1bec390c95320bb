//! Two-pass assembler
//!
//! The first pass goes through the source line by line, emitting machine
//! code and recording label definitions. Label references get a zero
//! placeholder byte and are patched once every line was processed.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::constants as C;
use crate::runtime::{MachineConfig, Mnemonic};

mod errors;
mod line;
mod literal;

pub use self::errors::{AssemblyError, AssemblyErrorKind};
pub use self::literal::parse_literal;

use self::line::{parse_line, parse_operand, LineContent, LineError, Operand};

/// Holds informations about the assembly
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    /// Map of labels to offsets in the program
    pub labels: BTreeMap<String, C::Address>,
}

/// A label reference waiting to be patched
#[derive(Debug)]
struct Reference {
    label: String,
    offset: C::Address,
    line: usize,
}

/// Assembles one program
///
/// An assembler is consumed by [`Assembler::finish`] (or
/// [`Assembler::assemble_text`]), so its state never leaks from one program to
/// another.
#[derive(Debug)]
pub struct Assembler {
    memory_size: usize,
    program: Vec<C::Byte>,
    labels: HashMap<String, C::Address>,
    references: Vec<Reference>,
    line: usize,
}

impl Assembler {
    /// Create an assembler for a machine with `memory_size` bytes of memory
    #[must_use]
    pub fn new(memory_size: usize) -> Self {
        Self {
            memory_size,
            program: Vec::new(),
            labels: HashMap::new(),
            references: Vec::new(),
            line: 0,
        }
    }

    #[must_use]
    pub fn for_config(config: &MachineConfig) -> Self {
        Self::new(config.memory_size())
    }

    /// Number of lines processed so far
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Machine code emitted so far, with label references not patched yet
    #[must_use]
    pub fn program(&self) -> &[C::Byte] {
        &self.program
    }

    fn write(&mut self, byte: C::Byte) -> Result<(), AssemblyErrorKind> {
        if self.program.len() >= self.memory_size {
            return Err(AssemblyErrorKind::ProgramTooLarge {
                size: self.memory_size,
            });
        }

        self.program.push(byte);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[C::Byte]) -> Result<(), AssemblyErrorKind> {
        bytes.iter().try_for_each(|&byte| self.write(byte))
    }

    fn define_label(&mut self, label: &str) -> Result<(), AssemblyErrorKind> {
        let label = label.to_lowercase();
        if self.labels.contains_key(&label) {
            return Err(AssemblyErrorKind::DuplicateLabel(label));
        }

        trace!(%label, offset = self.program.len(), "Defining label");
        self.labels.insert(label, self.program.len());
        Ok(())
    }

    fn write_operand(&mut self, operand: Operand) -> Result<(), AssemblyErrorKind> {
        match operand {
            Operand::Byte(byte) => self.write(byte),
            Operand::Label(label) => {
                self.references.push(Reference {
                    label: label.to_lowercase(),
                    offset: self.program.len(),
                    line: self.line,
                });
                self.write(0)
            }
        }
    }

    fn write_instruction(
        &mut self,
        mnemonic: &str,
        operands: &[&str],
    ) -> Result<(), AssemblyErrorKind> {
        let instruction = Mnemonic::from_name(mnemonic)
            .ok_or_else(|| AssemblyErrorKind::UnknownMnemonic(mnemonic.to_string()))?;

        let expected = usize::from(instruction.has_operand());
        if let Some(extra) = operands.get(expected) {
            return Err(AssemblyErrorKind::UnexpectedOperand {
                mnemonic: instruction,
                operand: (*extra).to_string(),
            });
        }

        self.write(instruction.opcode())?;

        if instruction.has_operand() {
            let raw = operands
                .first()
                .ok_or(AssemblyErrorKind::MissingOperand(instruction))?;
            let operand = parse_operand(raw)
                .ok_or_else(|| AssemblyErrorKind::MalformedOperand((*raw).to_string()))?;
            self.write_operand(operand)?;
        }

        Ok(())
    }

    fn write_content(&mut self, content: &LineContent) -> Result<(), AssemblyErrorKind> {
        match content {
            LineContent::Str(text) => {
                let string = literal::decode_string(text)
                    .ok_or_else(|| AssemblyErrorKind::InvalidEscape((*text).to_string()))?;
                self.write_all(string.as_bytes())?;
                self.write(0)
            }

            LineContent::Hex(data) => {
                let bytes = literal::decode_hex(data)
                    .ok_or_else(|| AssemblyErrorKind::InvalidHex((*data).to_string()))?;
                self.write_all(&bytes)
            }

            LineContent::Instruction { mnemonic, operands } => {
                self.write_instruction(mnemonic, operands)
            }
        }
    }

    /// Assemble one line of source
    ///
    /// # Errors
    ///
    /// Fails if the line is malformed, redefines a label or makes the program
    /// larger than the memory.
    pub fn assemble_line(&mut self, source: &str) -> Result<(), AssemblyError> {
        self.line += 1;
        let line = self.line;
        let start = self.program.len();

        let parsed = parse_line(source).map_err(|e| match e {
            LineError::InvalidLabel(label) => {
                AssemblyErrorKind::InvalidLabel(label.to_string()).at(line)
            }
        })?;

        if let Some(label) = parsed.label {
            self.define_label(label).map_err(|e| e.at(line))?;
        }

        if let Some(content) = &parsed.content {
            self.write_content(content).map_err(|e| e.at(line))?;
        }

        trace!(line, bytes = self.program.len() - start, "Assembled line");
        Ok(())
    }

    /// Patch every label reference and return the machine code
    ///
    /// # Errors
    ///
    /// Fails if a label was never defined, or is too far in the program to be
    /// used as an operand.
    pub fn finish(self) -> Result<(Vec<C::Byte>, DebugInfo), AssemblyError> {
        let Self {
            mut program,
            labels,
            references,
            ..
        } = self;

        for reference in references {
            let offset = *labels.get(&reference.label).ok_or_else(|| {
                AssemblyErrorKind::UnresolvedLabel(reference.label.clone()).at(reference.line)
            })?;

            let operand = C::Byte::try_from(offset).map_err(|_| {
                AssemblyErrorKind::LabelOutOfRange {
                    label: reference.label.clone(),
                    offset,
                }
                .at(reference.line)
            })?;

            trace!(label = %reference.label, offset, at = reference.offset, "Patching label reference");
            program[reference.offset] = operand;
        }

        debug!(size = program.len(), labels = labels.len(), "Assembled program");
        let debug_info = DebugInfo {
            labels: labels.into_iter().collect(),
        };

        Ok((program, debug_info))
    }

    /// Assemble a whole source text
    ///
    /// # Errors
    ///
    /// Fails on the first invalid line, or if a label reference can not be
    /// resolved.
    pub fn assemble_text(self, source: &str) -> Result<Vec<C::Byte>, AssemblyError> {
        self.assemble_text_with_debug_info(source)
            .map(|(program, _)| program)
    }

    /// Same as [`Assembler::assemble_text`], also returning the label offsets
    ///
    /// # Errors
    ///
    /// See [`Assembler::assemble_text`].
    #[tracing::instrument(skip_all)]
    pub fn assemble_text_with_debug_info(
        mut self,
        source: &str,
    ) -> Result<(Vec<C::Byte>, DebugInfo), AssemblyError> {
        debug!(memory_size = self.memory_size, "Assembling program");
        for line in source.lines() {
            self.assemble_line(line)?;
        }
        self.finish()
    }
}

/// Assemble a source text for a machine with `memory_size` bytes of memory
///
/// # Errors
///
/// See [`Assembler::assemble_text`].
pub fn assemble(source: &str, memory_size: usize) -> Result<Vec<C::Byte>, AssemblyError> {
    Assembler::new(memory_size).assemble_text(source)
}
