//! Two-pass assembler for TRC3 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! #limit 10       ; Definition, substituted literally
//! .count 0        ; Variable, a byte in the data segment after the program
//! loop:           ; Subroutine label for the next instruction
//!     LDI r1 limit
//!     REA r0 0 r2 ; a imm c
//!     RSH r1 r1   ; shorthand for RSH r1 0 r1
//!     BNE loop
//!     HLT
//! ```
//!
//! Pass one classifies every line and numbers the instructions. Variables are
//! then placed after the program, and pass two resolves operands. Syntax errors
//! are collected rather than returned on first sight; any error suppresses
//! output.

use crate::asm::encoder::{encode_program, AssembledInstruction};
use crate::asm::image::{Image, ImageError};
use crate::asm::resolver::{ResolveError, Resolver};
use crate::asm::token::{tokenize, Operand, Token};
use crate::isa::{EncodeError, Opcode, MAX_INSTRUCTIONS};
use slog::{debug, error, info, o, Discard, Logger};
use miette::SourceSpan;
use thiserror::Error;

/// Assemble source code to a binary image.
pub fn assemble(source: &str) -> Result<Image, AssemblerError> {
    assemble_with_logger(source, None)
}

/// Assemble source code, logging each stage to `logger`.
pub fn assemble_with_logger<L>(source: &str, logger: L) -> Result<Image, AssemblerError>
where
    L: Into<Option<Logger>>,
{
    let mut session = AssemblerSession::with_logger(logger);
    session.feed(source);
    session.finish()
}

/// What a source line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Instruction,
    Variable,
    Subroutine,
    Definition,
    /// Blank, comment-only, or rejected. Never touched again.
    Invalid,
}

/// One line of source and what pass one learned about it.
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
    pub tokens: Vec<Token>,
    pub kind: LineKind,
    pub opcode: Option<Opcode>,
    /// Instruction index, for instruction lines.
    pub index: Option<u16>,
}

impl SourceLine {
    /// Span of the code part of the line, for whole-line diagnostics.
    fn code_span(&self) -> Option<(usize, usize)> {
        let first = self.tokens.first()?;
        let last = self.tokens.last()?;
        Some((first.column, last.column + last.text.len() - first.column))
    }
}

/// A positional syntax error.
///
/// The source code attached to the report is the offending line, and the
/// label points at the offending token (byte offsets into that line).
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
#[error("line {line}: {message}")]
#[diagnostic(code(trc3::asm::syntax))]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: usize,
    /// The offending source line.
    #[source_code]
    pub text: String,
    #[label("here")]
    pub span: Option<SourceSpan>,
    pub message: String,
}

/// State threaded through one assembly run.
pub struct AssemblerSession {
    resolver: Resolver,
    lines: Vec<SourceLine>,
    instruction_count: usize,
    diagnostics: Vec<Diagnostic>,
    log: Logger,
}

impl AssemblerSession {
    pub fn new() -> Self {
        Self::with_logger(None)
    }

    pub fn with_logger<L: Into<Option<Logger>>>(logger: L) -> Self {
        let log = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "assembly"));

        Self {
            resolver: Resolver::with_logger(log.new(o!("pass" => "symbols"))),
            lines: Vec::new(),
            instruction_count: 0,
            diagnostics: Vec::new(),
            log,
        }
    }

    /// Pass one over every line of `source`.
    pub fn feed(&mut self, source: &str) {
        for text in source.lines() {
            let number = self.lines.len() + 1;
            self.classify(number, text);
        }
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Lines classified so far.
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    fn syntax_error(&mut self, line: &SourceLine, span: Option<(usize, usize)>, message: String) {
        let diagnostic = Diagnostic {
            line: line.number,
            text: line.text.clone(),
            span: span.or_else(|| line.code_span()).map(SourceSpan::from),
            message,
        };
        error!(self.log, "syntax error"; "line" => line.number, "message" => &diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    fn classify(&mut self, number: usize, text: &str) {
        let mut line = SourceLine {
            number,
            text: text.to_string(),
            tokens: tokenize(text),
            kind: LineKind::Invalid,
            opcode: None,
            index: None,
        };

        line.kind = match line.tokens.first().map(|t| t.text.clone()) {
            None => LineKind::Invalid,
            Some(first) if line.tokens.last().map_or(false, |t| t.text.ends_with(':')) => {
                self.classify_subroutine(&line, &first)
            }
            Some(first) if first.starts_with('.') => self.classify_alias(&line, LineKind::Variable),
            Some(first) if first.starts_with('#') => self.classify_alias(&line, LineKind::Definition),
            Some(_) => self.classify_instruction(&mut line),
        };

        self.lines.push(line);
    }

    fn classify_subroutine(&mut self, line: &SourceLine, first: &str) -> LineKind {
        if line.tokens.len() != 1 {
            self.syntax_error(line, None, "Invalid number of tokens in alias definition!".into());
            return LineKind::Invalid;
        }

        let name = first.trim_end_matches(':');
        // Labels past the last slot could never be reached
        let index = self.instruction_count.min(MAX_INSTRUCTIONS - 1) as u16;
        match self.resolver.define_subroutine(name, index) {
            Ok(()) => LineKind::Subroutine,
            Err(e) => {
                self.syntax_error(line, Some(line.tokens[0].span()), e.to_string());
                LineKind::Invalid
            }
        }
    }

    /// Variables (`.name value`) and definitions (`#name value`).
    fn classify_alias(&mut self, line: &SourceLine, kind: LineKind) -> LineKind {
        if line.tokens.len() != 2 {
            self.syntax_error(line, None, "Invalid number of tokens in alias definition!".into());
            return LineKind::Invalid;
        }

        let name = &line.tokens[0].text[1..];
        let literal = &line.tokens[1];
        let value = match Operand::classify(&literal.text) {
            Operand::Literal(v) => v,
            Operand::Alias(_) => {
                self.syntax_error(
                    line,
                    Some(literal.span()),
                    format!("Invalid numeric literal \"{}\" when defining \"{}\"!", literal.text, name),
                );
                return LineKind::Invalid;
            }
        };

        let result = match kind {
            LineKind::Variable => self.resolver.define_variable(name, value),
            _ => self.resolver.define_definition(name, value),
        };

        match result {
            Ok(()) => kind,
            Err(e) => {
                let span = match e {
                    ResolveError::VariableRange { .. } | ResolveError::DefinitionRange { .. } => literal.span(),
                    _ => line.tokens[0].span(),
                };
                self.syntax_error(line, Some(span), e.to_string());
                LineKind::Invalid
            }
        }
    }

    fn classify_instruction(&mut self, line: &mut SourceLine) -> LineKind {
        let mnemonic = &line.tokens[0];
        let opcode = match Opcode::from_mnemonic(&mnemonic.text) {
            Some(op) => op,
            None => {
                let message = format!("No opcode found for \"{}\"!", mnemonic.text);
                self.syntax_error(line, Some(mnemonic.span()), message);
                return LineKind::Invalid;
            }
        };

        let expected = opcode.format().operand_count();
        let found = line.tokens.len() - 1;
        let valid = match opcode {
            Opcode::Rsh => found == 2 || found == 3,
            Opcode::Pas => found == 1 || found == 2,
            _ => found == expected,
        };
        if !valid {
            let message = format!(
                "Wrong number of operands for {}! Should be {}, found {}.",
                opcode, expected, found
            );
            self.syntax_error(line, None, message);
            return LineKind::Invalid;
        }

        line.opcode = Some(opcode);
        line.index = Some(self.instruction_count as u16);
        self.instruction_count += 1;
        LineKind::Instruction
    }

    /// Resolve one instruction line's operands.
    fn resolve_line(&self, line: &SourceLine, opcode: Opcode) -> Result<Vec<u16>, Diagnostic> {
        let diagnostic = |span: (usize, usize), message: String| Diagnostic {
            line: line.number,
            text: line.text.clone(),
            span: Some(span.into()),
            message,
        };

        let mut values: Vec<(i64, (usize, usize))> = Vec::with_capacity(3);
        for token in &line.tokens[1..] {
            let value = match Operand::classify(&token.text) {
                Operand::Literal(v) => v,
                Operand::Alias(name) => self
                    .resolver
                    .resolve(&name)
                    .map_err(|e| diagnostic(token.span(), e.to_string()))?,
            };
            values.push((value, token.span()));
        }

        // Shorthand forms: RSH a c => RSH a 0 c, PAS b => PAS 0 b
        let fields = opcode.format().fields();
        if values.len() < fields.len() {
            let at = match opcode {
                Opcode::Rsh => 1,
                _ => 0,
            };
            let span = line.tokens[0].span();
            values.insert(at, (0, span));
        }

        fields
            .iter()
            .zip(values)
            .map(|(field, (value, span))| {
                if value < 0 {
                    return Err(diagnostic(span, format!("Operand {} must not be negative!", value)));
                }
                if value > field.max() as i64 {
                    return Err(diagnostic(
                        span,
                        format!("Operand {} overflows its {}-bit field (max {})!", value, field.width, field.max()),
                    ));
                }
                Ok(value as u16)
            })
            .collect()
    }

    /// Place variables, run pass two and encode.
    pub fn finish(mut self) -> Result<Image, AssemblerError> {
        let data = self.resolver.finalize_variables(self.instruction_count);

        let mut instructions = Vec::with_capacity(self.instruction_count);
        let mut failures = Vec::new();

        for line in &self.lines {
            let (Some(opcode), Some(index)) = (line.opcode, line.index) else {
                continue;
            };
            if line.kind != LineKind::Instruction {
                continue;
            }

            match self.resolve_line(line, opcode) {
                Ok(operands) => instructions.push(AssembledInstruction {
                    opcode,
                    operands,
                    index,
                    line: line.number,
                }),
                Err(diagnostic) => failures.push(diagnostic),
            }
        }

        for diagnostic in &failures {
            error!(self.log, "syntax error"; "line" => diagnostic.line, "message" => &diagnostic.message);
        }
        self.diagnostics.extend(failures);

        if !self.diagnostics.is_empty() {
            self.diagnostics.sort_by_key(|d| d.line);
            return Err(AssemblerError::Syntax {
                count: self.diagnostics.len(),
                diagnostics: self.diagnostics,
            });
        }

        let bytes = encode_program(&instructions, &data)?;

        for instr in &instructions {
            let words = &bytes[(instr.index as usize) << 1..];
            debug!(self.log, "assembled";
                "index" => instr.index,
                "address" => format!("{:#06x}", (instr.index as usize) << 1),
                "word" => format!("{:08b} {:08b}", words[1], words[0]),
                "source" => self.lines[instr.line - 1].text.trim());
        }

        info!(self.log, "assembly complete";
            "instructions" => instructions.len(),
            "variables" => data.len(),
            "bytes" => bytes.len());

        Image::assembled(bytes, instructions.len(), data.len()).map_err(|e| match e {
            ImageError::TooLarge { size, available } => AssemblerError::ImageTooLarge { size, available },
            other => AssemblerError::Image(other),
        })
    }
}

impl Default for AssemblerSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("{count} error(s) occurred, no output will be written")]
    Syntax { count: usize, diagnostics: Vec<Diagnostic> },

    #[error("encoder contract violation: {0}")]
    Encode(#[from] EncodeError),

    #[error("program of {size} bytes does not fit in {available} bytes of memory")]
    ImageTooLarge { size: usize, available: usize },

    #[error("image error: {0}")]
    Image(ImageError),
}

impl AssemblerError {
    /// Diagnostics for syntax errors, empty for fatal errors.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AssemblerError::Syntax { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Whether this is a user error in the source rather than a broken invariant.
    pub fn is_syntax(&self) -> bool {
        matches!(self, AssemblerError::Syntax { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_errors(source: &str) -> Vec<Diagnostic> {
        match assemble(source) {
            Err(AssemblerError::Syntax { diagnostics, .. }) => diagnostics,
            other => panic!("expected syntax errors, got {:?}", other),
        }
    }

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LDI r1 5
            LDI r2 10
            ADD r1 r2 r3
            HLT
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.len(), 8);
        assert_eq!(image.instruction_count(), 4);
        let opcodes: Vec<u8> = image.bytes().chunks(2).map(|w| w[1] >> 3).collect();
        assert_eq!(opcodes, vec![12, 12, 2, 1]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        start:
            LDI r1 3
        loop:
            ADI r1 255
            BNE loop
            JMP end
            NOP
        end:
            HLT
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.instruction_count(), 6);
        // BNE loop => target 1
        assert_eq!(image.bytes()[4..6], [0b0000_0010, 0b01111_000]);
        // JMP end => target 5
        assert_eq!(image.bytes()[6..8], [0b0000_1010, 0b01101_000]);
    }

    #[test]
    fn test_variable_resolves_to_data_address() {
        let image = assemble(".x 42\nLDI r1 x\nHLT").unwrap();
        assert_eq!(image.bytes().len(), 5);
        assert_eq!(image.bytes()[4], 42);
        // LDI r1 4
        assert_eq!(image.bytes()[0..2], [0b00100_001, 0b01100_000]);
        assert_eq!(image.variable_count(), Some(1));
    }

    #[test]
    fn test_definition_is_literal() {
        let image = assemble("#port 5\n#val 0x20\nLDI r1 val\nGPO r1 port\nHLT").unwrap();
        assert_eq!(image.len(), 6);
        assert_eq!(image.bytes()[0..2], [0x01, 0x61]);
    }

    #[test]
    fn test_large_definition_checked_at_use() {
        let image = assemble("#big 5000\nHLT").unwrap();
        assert_eq!(image.bytes(), &[0x00, 0x08]);

        let errors = syntax_errors("#big 5000\nLDI r1 big");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
    }

    #[test]
    fn test_shorthand_forms() {
        assert_eq!(
            assemble("RSH r1 r2").unwrap().bytes(),
            assemble("RSH r1 0 r2").unwrap().bytes()
        );
        assert_eq!(
            assemble("PAS r3").unwrap().bytes(),
            assemble("PAS 0 r3").unwrap().bytes()
        );
    }

    #[test]
    fn test_char_literals_and_commas() {
        let a = assemble("LDI r1, 'A'").unwrap();
        let b = assemble("LDI r1 65").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            assemble("Foo:\nldi R1 5\njmp FOO").unwrap(),
            assemble("foo:\nLDI r1 5\nJMP foo").unwrap()
        );
    }

    #[test]
    fn test_errors_are_all_reported() {
        let diagnostics = syntax_errors("FOO r1\nLDI r1\nLDI r1 256\nJMP nowhere\nHLT");
        let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_duplicate_and_bad_aliases() {
        let diagnostics = syntax_errors("a:\n.a 1\n#12 3\n.v 300\n#d -1\nr1:\nHLT");
        assert_eq!(diagnostics.len(), 5);
        assert!(diagnostics[0].message.contains("already defined"));
    }

    #[test]
    fn test_operand_range_checks() {
        assert_eq!(syntax_errors("ADD r1 r2 8").len(), 1);
        assert_eq!(syntax_errors("GPI 8 r1").len(), 1);
        assert_eq!(syntax_errors("JMP 1024").len(), 1);
        assert_eq!(syntax_errors("LDI r1 -1").len(), 1);
        assert!(assemble("JMP 1023\nLDI r7 255\nGPO r1 p7").is_ok());
    }

    #[test]
    fn test_blank_and_comment_lines_are_silent() {
        let image = assemble("\n   \n; nothing here\nHLT ; stop\n").unwrap();
        assert_eq!(image.bytes(), &[0x00, 0x08]);
    }

    #[test]
    fn test_diagnostic_points_at_token() {
        let diagnostics = syntax_errors("  LDI r1 nope");
        let d = &diagnostics[0];
        assert_eq!(d.to_string(), "line 1: undefined alias \"nope\"");
        assert_eq!(d.span, Some(SourceSpan::from((9, 4))));
        assert_eq!(&d.text[9..13], "nope");
    }

    #[test]
    fn test_diagnostic_span_is_byte_offset() {
        let diagnostics = syntax_errors("#\u{e9} 1\nADD \u{e9} r1 nope");
        let d = &diagnostics[0];
        assert_eq!(d.line, 2);
        let span = d.span.unwrap();
        assert_eq!(&d.text[span.offset()..span.offset() + span.len()], "nope");
    }

    #[test]
    fn test_diagnostic_renders_with_label() {
        use miette::{GraphicalReportHandler, GraphicalTheme};

        let diagnostics = syntax_errors("LDI r1 nope");
        let mut out = String::new();
        GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor())
            .render_report(&mut out, &diagnostics[0])
            .unwrap();
        assert!(out.contains("LDI r1 nope"));
        assert!(out.contains("here"));
        assert!(out.contains("undefined alias"));
    }

    #[test]
    fn test_image_too_large() {
        let source = "NOP\n".repeat(1024) + ".v 1\n";
        assert!(matches!(
            assemble(&source),
            Err(AssemblerError::ImageTooLarge { size: 2049, .. })
        ));
    }
}
