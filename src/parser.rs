//! Line-oriented parser for bot assembly source.
//!
//! Grammar per line: an optional label prefix (`name:`, `@hex:`,
//! `name@hex:`) followed by an optional instruction (`mnemonic op, op, ...`)
//! or data directive (`.data 12 34`). `;` starts a comment. A failed line is
//! skipped to its end and parsing continues, so
//! one report covers as many mistakes as possible; errors are capped and the
//! overflow is flagged instead of collected.

use std::fmt;

use thiserror::Error;

use crate::isa::Mnemonic;
use crate::reg::Reg;
use crate::text::{SourceText, Span};

/// Cap on collected parse errors; past it only `truncated` is set.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("malformed operand `{0}`")]
    BadOperand(String),
    #[error("numeric literal out of range: `{0}`")]
    NumberOverflow(String),
    #[error("malformed label")]
    BadLabel,
    #[error("label address out of range: `{0}`")]
    AddressOverflow(String),
    #[error("`.data` expects two-digit hex bytes, got `{0}`")]
    BadDataByte(String),
    #[error("`.data` needs at least one byte")]
    EmptyData,
    #[error("expected operand")]
    ExpectedOperand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.kind)
    }
}

/// Collected parse diagnostics for one source file.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub errors: Vec<ParseError>,
    /// More errors occurred than [`MAX_ERRORS`].
    pub truncated: bool,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.truncated
    }

    fn record(&mut self, err: ParseError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(err);
        } else {
            self.truncated = true;
        }
    }
}

/// A parsed operand. Immediates keep their full parsed value; the assembler
/// narrows them against the matched opcode's field width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg, Span),
    Imm(i64, Span),
    Label(String, Span),
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Reg(_, s) | Operand::Imm(_, s) | Operand::Label(_, s) => *s,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AsmLine {
    Label {
        name: Option<String>,
        addr: Option<u16>,
        span: Span,
    },
    Instr {
        mnemonic: Mnemonic,
        operands: Vec<Operand>,
        span: Span,
    },
    Data {
        bytes: Vec<u8>,
        span: Span,
    },
}

impl AsmLine {
    pub fn span(&self) -> Span {
        match self {
            AsmLine::Label { span, .. }
            | AsmLine::Instr { span, .. }
            | AsmLine::Data { span, .. } => *span,
        }
    }
}

/// The in-memory program: ordered lines, blank/comment lines dropped.
#[derive(Debug, Default)]
pub struct AssemblyProgram {
    pub lines: Vec<AsmLine>,
}

/// Parse a whole source file. Always returns whatever could be parsed, plus
/// the diagnostics; the caller decides whether errors are fatal.
pub fn parse(src: &SourceText) -> (AssemblyProgram, Diagnostics) {
    let mut prog = AssemblyProgram::default();
    let mut diags = Diagnostics::default();
    for (line_no, raw) in src.lines() {
        if let Err(err) = parse_line(line_no as u32, raw, &mut prog.lines) {
            diags.record(err);
        }
    }
    tracing::debug!(
        lines = prog.lines.len(),
        errors = diags.errors.len(),
        "parsed source"
    );
    (prog, diags)
}

fn parse_line(line_no: u32, raw: &str, out: &mut Vec<AsmLine>) -> Result<(), ParseError> {
    // Comments run to end of line; the grammar has no string literals, so a
    // bare find is enough.
    let code = match raw.find(';') {
        Some(at) => &raw[..at],
        None => raw,
    };
    let body = code.trim_end();
    let indent = body.len() - body.trim_start().len();
    let body = body.trim_start();
    if body.is_empty() {
        return Ok(());
    }
    let span = Span::on_line(line_no, indent as u32, (indent + body.len()) as u32);

    // A label prefix is the first token when it ends in `:`; the rest of the
    // line, if any, is an ordinary statement.
    if let Some(colon) = body.find(':') {
        if !body[..colon].contains(char::is_whitespace) {
            let label_span =
                Span::on_line(line_no, indent as u32, (indent + colon + 1) as u32);
            out.push(parse_label(&body[..colon], label_span)?);
            let rest = &body[colon + 1..];
            let trimmed = rest.trim_start();
            if !trimmed.is_empty() {
                let at = indent + colon + 1 + (rest.len() - trimmed.len());
                let rest_span =
                    Span::on_line(line_no, at as u32, (indent + body.len()) as u32);
                out.push(parse_stmt(trimmed, at, rest_span)?);
            }
            return Ok(());
        }
    }
    out.push(parse_stmt(body, indent, span)?);
    Ok(())
}

fn parse_stmt(body: &str, body_at: usize, span: Span) -> Result<AsmLine, ParseError> {
    if let Some(rest) = data_directive(body) {
        return parse_data(rest, body_at + 5, span);
    }
    parse_instr(body, body_at, span)
}

/// `.data` match on raw bytes, so a multi-byte character in column five
/// cannot split a char. The directive must be followed by whitespace or end
/// of line.
fn data_directive(body: &str) -> Option<&str> {
    let bytes = body.as_bytes();
    if bytes.len() >= 5
        && bytes[..5].eq_ignore_ascii_case(b".data")
        && bytes.get(5).is_none_or(|b| b.is_ascii_whitespace())
    {
        Some(&body[5..])
    } else {
        None
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_label(body: &str, span: Span) -> Result<AsmLine, ParseError> {
    let bad = |kind| ParseError { kind, span };
    let (name_part, addr_part) = match body.find('@') {
        Some(at) => (body[..at].trim(), Some(body[at + 1..].trim())),
        None => (body.trim(), None),
    };
    let name = if name_part.is_empty() {
        None
    } else if is_name(name_part) {
        Some(name_part.to_string())
    } else {
        return Err(bad(ParseErrorKind::BadLabel));
    };
    let addr = match addr_part {
        None | Some("") => None,
        Some(text) => {
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .unwrap_or(text);
            let val = u32::from_str_radix(digits, 16)
                .map_err(|_| bad(ParseErrorKind::BadLabel))?;
            if val > 0xFFFF {
                return Err(bad(ParseErrorKind::AddressOverflow(text.to_string())));
            }
            Some(val as u16)
        }
    };
    if name.is_none() && addr.is_none() {
        return Err(bad(ParseErrorKind::BadLabel));
    }
    Ok(AsmLine::Label { name, addr, span })
}

fn parse_data(rest: &str, rest_at: usize, span: Span) -> Result<AsmLine, ParseError> {
    let line = span.start.line;
    let mut bytes = Vec::new();
    for (off, tok) in split_words(rest) {
        let tok_span = word_span(line, rest_at + off, tok);
        if tok.len() != 2 || !tok.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError {
                kind: ParseErrorKind::BadDataByte(tok.to_string()),
                span: tok_span,
            });
        }
        bytes.push(u8::from_str_radix(tok, 16).expect("checked hex"));
    }
    if bytes.is_empty() {
        return Err(ParseError { kind: ParseErrorKind::EmptyData, span });
    }
    Ok(AsmLine::Data { bytes, span })
}

fn parse_instr(body: &str, body_at: usize, span: Span) -> Result<AsmLine, ParseError> {
    let line = span.start.line;
    let word_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let word = &body[..word_end];
    let mnemonic: Mnemonic = word.parse().map_err(|_| ParseError {
        kind: ParseErrorKind::UnknownMnemonic(word.to_string()),
        span: word_span(line, body_at, word),
    })?;

    let rest = &body[word_end..];
    let rest_at = body_at + word_end;
    let mut operands = Vec::new();
    if !rest.trim().is_empty() {
        let mut from = 0;
        loop {
            let to = rest[from..].find(',').map(|i| from + i);
            let piece = &rest[from..to.unwrap_or(rest.len())];
            operands.push(parse_operand(piece, rest_at + from, line)?);
            match to {
                Some(comma) => from = comma + 1,
                None => break,
            }
        }
    }
    Ok(AsmLine::Instr { mnemonic, operands, span })
}

fn parse_operand(piece: &str, piece_at: usize, line: u32) -> Result<Operand, ParseError> {
    let lead = piece.len() - piece.trim_start().len();
    let tok = piece.trim();
    let span = word_span(line, piece_at + lead, tok);
    let err = |kind| ParseError { kind, span };
    if tok.is_empty() {
        return Err(err(ParseErrorKind::ExpectedOperand));
    }
    if let Some(reg) = tok.strip_prefix('$') {
        let r: Reg = reg
            .parse()
            .map_err(|_| err(ParseErrorKind::UnknownRegister(reg.to_string())))?;
        return Ok(Operand::Reg(r, span));
    }
    if let Some(name) = tok.strip_prefix('@') {
        if !is_name(name) {
            return Err(err(ParseErrorKind::BadLabel));
        }
        return Ok(Operand::Label(name.to_string(), span));
    }
    let value = parse_number(tok).map_err(|kind| err(kind))?;
    Ok(Operand::Imm(value, span))
}

/// Hex literals are unsigned and capped at 32 bits; decimal literals are
/// signed and capped at the i32 range. Anything wider is an error here, not
/// a silent truncation; per-opcode narrowing happens in the assembler.
fn parse_number(tok: &str) -> Result<i64, ParseErrorKind> {
    if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseErrorKind::BadOperand(tok.to_string()));
        }
        return u32::from_str_radix(hex, 16)
            .map(i64::from)
            .map_err(|_| ParseErrorKind::NumberOverflow(tok.to_string()));
    }
    let digits = tok
        .strip_prefix('-')
        .or_else(|| tok.strip_prefix('+'))
        .unwrap_or(tok);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseErrorKind::BadOperand(tok.to_string()));
    }
    tok.parse::<i32>()
        .map(i64::from)
        .map_err(|_| ParseErrorKind::NumberOverflow(tok.to_string()))
}

fn split_words(s: &str) -> impl Iterator<Item = (usize, &str)> {
    s.split_whitespace()
        .map(move |w| (w.as_ptr() as usize - s.as_ptr() as usize, w))
}

fn word_span(line: u32, col: usize, word: &str) -> Span {
    Span::on_line(line, col as u32, (col + word.len()) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::SourceText;
    use pretty_assertions::assert_eq;

    fn parse_str(text: &str) -> (AssemblyProgram, Diagnostics) {
        parse(&SourceText::new(text))
    }

    #[test]
    fn comments_and_blanks_vanish() {
        let (prog, diags) = parse_str("; header\n\n  nop ; trailing\n");
        assert!(diags.is_clean());
        assert_eq!(prog.lines.len(), 1);
    }

    #[test]
    fn label_forms() {
        let (prog, diags) = parse_str("main:\n@1F00:\nbuf@0xE000:\n");
        assert!(diags.is_clean());
        match &prog.lines[0] {
            AsmLine::Label { name, addr, .. } => {
                assert_eq!(name.as_deref(), Some("main"));
                assert_eq!(*addr, None);
            }
            other => panic!("{other:?}"),
        }
        match &prog.lines[1] {
            AsmLine::Label { name, addr, .. } => {
                assert_eq!(*name, None);
                assert_eq!(*addr, Some(0x1F00));
            }
            other => panic!("{other:?}"),
        }
        match &prog.lines[2] {
            AsmLine::Label { name, addr, .. } => {
                assert_eq!(name.as_deref(), Some("buf"));
                assert_eq!(*addr, Some(0xE000));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn label_prefix_shares_a_line_with_a_statement() {
        let (prog, diags) = parse_str("x: nop\nbuf@0x0100: .data 12\n");
        assert!(diags.is_clean(), "{:?}", diags.errors);
        assert_eq!(prog.lines.len(), 4);
        assert!(
            matches!(&prog.lines[0], AsmLine::Label { name: Some(n), .. } if n == "x")
        );
        assert!(matches!(&prog.lines[1], AsmLine::Instr { mnemonic: Mnemonic::Nop, .. }));
        assert!(
            matches!(&prog.lines[2], AsmLine::Label { addr: Some(0x0100), .. })
        );
        assert!(matches!(&prog.lines[3], AsmLine::Data { bytes, .. } if bytes == &[0x12]));
    }

    #[test]
    fn non_ascii_lines_become_diagnostics() {
        let (prog, diags) = parse_str("€€€\n.data ££\n");
        assert_eq!(diags.errors.len(), 2);
        assert!(matches!(diags.errors[0].kind, ParseErrorKind::UnknownMnemonic(_)));
        assert!(matches!(diags.errors[1].kind, ParseErrorKind::BadDataByte(_)));
        assert!(prog.lines.is_empty());
    }

    #[test]
    fn data_directive_needs_a_separator() {
        let (_, diags) = parse_str(".data12 34\n");
        assert_eq!(diags.errors.len(), 1);
        assert!(matches!(diags.errors[0].kind, ParseErrorKind::UnknownMnemonic(_)));
    }

    #[test]
    fn bare_colon_is_an_error() {
        let (_, diags) = parse_str(":\n");
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].kind, ParseErrorKind::BadLabel);
    }

    #[test]
    fn operand_kinds_and_case() {
        let (prog, diags) = parse_str("SET $X0, -42\nstw $x1, @dest\n");
        assert!(diags.is_clean(), "{:?}", diags.errors);
        match &prog.lines[0] {
            AsmLine::Instr { mnemonic, operands, .. } => {
                assert_eq!(*mnemonic, Mnemonic::Set);
                assert!(matches!(operands[0], Operand::Reg(Reg::X0, _)));
                assert!(matches!(operands[1], Operand::Imm(-42, _)));
            }
            other => panic!("{other:?}"),
        }
        match &prog.lines[1] {
            AsmLine::Instr { operands, .. } => {
                assert!(matches!(&operands[1], Operand::Label(n, _) if n == "dest"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn numeric_overflow_is_an_error_not_truncation() {
        let (_, diags) = parse_str("set $x0, 0x1ffffffff\nset $x0, 3000000000\n");
        assert_eq!(diags.errors.len(), 2);
        assert!(matches!(diags.errors[0].kind, ParseErrorKind::NumberOverflow(_)));
        assert!(matches!(diags.errors[1].kind, ParseErrorKind::NumberOverflow(_)));
    }

    #[test]
    fn hex_at_u32_max_is_accepted() {
        let (prog, diags) = parse_str("set $x0, 0xFFFFFFFF\n");
        assert!(diags.is_clean());
        match &prog.lines[0] {
            AsmLine::Instr { operands, .. } => {
                assert!(matches!(operands[1], Operand::Imm(0xFFFF_FFFF, _)));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn data_bytes() {
        let (prog, diags) = parse_str(".data 12 34 ff\n.data zz\n.data\n");
        assert_eq!(diags.errors.len(), 2);
        assert!(matches!(diags.errors[0].kind, ParseErrorKind::BadDataByte(_)));
        assert_eq!(diags.errors[1].kind, ParseErrorKind::EmptyData);
        match &prog.lines[0] {
            AsmLine::Data { bytes, .. } => assert_eq!(bytes, &[0x12, 0x34, 0xFF]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn recovery_continues_past_bad_lines() {
        let (prog, diags) = parse_str("bogus $x0\nnop\nset $nope, 1\nnop\n");
        assert_eq!(diags.errors.len(), 2);
        assert_eq!(prog.lines.len(), 2);
    }

    #[test]
    fn error_cap_sets_truncated() {
        let text = "bogus\n".repeat(MAX_ERRORS + 5);
        let (_, diags) = parse_str(&text);
        assert_eq!(diags.errors.len(), MAX_ERRORS);
        assert!(diags.truncated);
    }

    #[test]
    fn spans_point_into_the_line() {
        let (_, diags) = parse_str("  set $x0, $bad\n");
        let err = &diags.errors[0];
        assert_eq!(err.span.start.line, 0);
        assert_eq!(err.span.start.col, 11);
        assert_eq!(err.to_string(), "1:12: unknown register `bad`");
    }
}
