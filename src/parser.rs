use std::{iter::Peekable, vec::IntoIter};

use miette::{bail, miette, LabeledSpan, Report, Result, Severity};

use crate::{
    cell::Value,
    error::ConstructionError,
    lexer::{tokenize, LiteralKind, Token, TokenKind},
    program::{InstrKind, Instruction, Operand, Program, MAX_OPERAND_DEPTH},
    span::Span,
    symbol::SymbolKey,
};

/// Transforms source text into a [`Program`].
///
/// Reports carry labelled spans but no source code; attach it with
/// [`Report::with_source_code`] before printing.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Peekable iterator over tokens, without whitespace or comments
    toks: Peekable<IntoIter<Token>>,
    instrs: Vec<Instruction>,
    /// Source location of each instruction in `instrs`
    spans: Vec<Span>,
    /// Last consumed token
    last: Option<Token>,
}

impl<'a> AsmParser<'a> {
    /// Lex `src`. Fails on characters that can't start any token.
    pub fn new(src: &'a str) -> Result<Self> {
        let mut toks = Vec::new();
        for tok in tokenize(src).filter(|tok| !tok.kind.is_trivia()) {
            if tok.kind == TokenKind::Unknown {
                bail!(
                    severity = Severity::Error,
                    code = "lex::unknown",
                    help = "integer literals start with `#`, hex literals with `#x`",
                    labels = vec![LabeledSpan::at(tok.span, "unknown token")],
                    "Encountered an unknown token",
                )
            }
            toks.push(tok);
        }
        Ok(AsmParser {
            src,
            toks: toks.into_iter().peekable(),
            instrs: Vec::new(),
            spans: Vec::new(),
            last: None,
        })
    }

    /// Parse every statement and validate the result.
    pub fn parse(mut self) -> Result<Program> {
        while let Some(tok) = self.toks.next() {
            self.last = Some(tok);
            match tok.kind {
                TokenKind::Label => {
                    let text = self.text(tok);
                    let name = text.strip_suffix(':').unwrap_or(text);
                    let symbol = encode(name, tok.span)?;
                    self.push(Instruction::Label(symbol), tok.span);
                }
                TokenKind::Ident => {
                    let kind = self.text(tok).parse::<InstrKind>().map_err(|err| {
                        miette!(
                            severity = Severity::Error,
                            code = "parse::unknown_instr",
                            help = format!("available instructions are: {}", mnemonic_list()),
                            labels = vec![LabeledSpan::at(tok.span, "unknown instruction")],
                            "{err}",
                        )
                    })?;
                    self.parse_instr(kind, tok)?;
                }
                unexpected => bail!(
                    severity = Severity::Error,
                    code = "parse::unexpected_token",
                    help = "lines should start with an instruction or a label.",
                    labels = vec![LabeledSpan::at(tok.span, "unexpected token")],
                    "Unexpected token of type {}",
                    unexpected
                ),
            }
        }

        let spans = self.spans;
        Program::new(self.instrs).map_err(|err| match err {
            ConstructionError::NotAssignable { index, .. } => miette!(
                severity = Severity::Error,
                code = "parse::not_assignable",
                help = "only memory cells can be written to, try wrapping it in `[...]`",
                labels = vec![LabeledSpan::at(spans[index], "destination is not a cell")],
                "{err}",
            ),
            other => miette!("{other}"),
        })
    }

    /// Process the operands following a mnemonic.
    fn parse_instr(&mut self, kind: InstrKind, first: Token) -> Result<()> {
        let stmt = match kind {
            InstrKind::Declare => {
                let symbol = self.expect_symbol()?;
                let init = self.expect_lit()?;
                Instruction::Declare { symbol, init }
            }
            InstrKind::Jump => Instruction::Jump(self.expect_symbol()?),
            InstrKind::JumpIfZero => Instruction::JumpIfZero(self.expect_symbol()?),
            InstrKind::JumpIfSign => Instruction::JumpIfSign(self.expect_symbol()?),
            InstrKind::Increment => Instruction::Increment(self.operand()?),
            InstrKind::Decrement => Instruction::Decrement(self.operand()?),
            InstrKind::Not => Instruction::Not(self.operand()?),
            InstrKind::Move => Instruction::Move(self.operand()?, self.operand()?),
            InstrKind::Add => Instruction::Add(self.operand()?, self.operand()?),
            InstrKind::Subtract => Instruction::Subtract(self.operand()?, self.operand()?),
            InstrKind::And => Instruction::And(self.operand()?, self.operand()?),
            InstrKind::Or => Instruction::Or(self.operand()?, self.operand()?),
            InstrKind::Compare => Instruction::Compare(self.operand()?, self.operand()?),
            // Written as `name:`, never as a mnemonic
            InstrKind::Label => unreachable!(),
        };
        let span = match self.last {
            Some(last) => first.span.join(last.span),
            None => first.span,
        };
        self.push(stmt, span);
        Ok(())
    }

    fn push(&mut self, instr: Instruction, span: Span) {
        self.instrs.push(instr);
        self.spans.push(span);
    }

    fn text(&self, tok: Token) -> &'a str {
        &self.src[tok.span.as_range()]
    }

    fn next(&mut self) -> Result<Token> {
        match self.toks.next() {
            Some(tok) => {
                self.last = Some(tok);
                Ok(tok)
            }
            None => Err(self.eof()),
        }
    }

    /// Immediate, symbol address, or bracketed cell.
    fn operand(&mut self) -> Result<Operand> {
        self.nested_operand(0)
    }

    /// Operand inside `depth` brackets.
    fn nested_operand(&mut self, depth: usize) -> Result<Operand> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Lit(kind) => Ok(Operand::Immediate(self.literal(tok, kind)?)),
            TokenKind::Ident => Ok(Operand::SymbolAddress(self.symbol(tok)?)),
            TokenKind::OpenBracket if depth == MAX_OPERAND_DEPTH => bail!(
                severity = Severity::Error,
                code = "parse::too_deep",
                help = format!("cells can be nested at most {MAX_OPERAND_DEPTH} deep"),
                labels = vec![LabeledSpan::at(tok.span, "too many brackets")],
                "Operand is nested too deeply",
            ),
            TokenKind::OpenBracket => {
                let addr = self.nested_operand(depth + 1)?;
                self.expect(TokenKind::CloseBracket)?;
                Ok(Operand::cell(addr))
            }
            unexpected => bail!(
                severity = Severity::Error,
                code = "parse::unexpected_token",
                help = "operands are literals like `#1`, symbols like `a`, or cells like `[a]`",
                labels = vec![LabeledSpan::at(tok.span, "unexpected token")],
                "Expected an operand, found {}",
                unexpected
            ),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        let tok = self.next()?;
        if tok.kind == expected {
            return Ok(tok);
        }
        bail!(
            severity = Severity::Error,
            code = "parse::unexpected_token",
            help = "check the operands for this instruction",
            labels = vec![LabeledSpan::at(tok.span, "unexpected token")],
            "Expected token of type {}, found {}",
            expected,
            tok.kind
        )
    }

    fn expect_symbol(&mut self) -> Result<SymbolKey> {
        let tok = self.expect(TokenKind::Ident)?;
        self.symbol(tok)
    }

    fn expect_lit(&mut self) -> Result<Value> {
        let tok = self.next()?;
        match tok.kind {
            TokenKind::Lit(kind) => self.literal(tok, kind),
            unexpected => bail!(
                severity = Severity::Error,
                code = "parse::unexpected_token",
                help = "declarations are initialized with a literal like `#0`",
                labels = vec![LabeledSpan::at(tok.span, "unexpected token")],
                "Expected token of type numeric literal, found {}",
                unexpected
            ),
        }
    }

    fn symbol(&self, tok: Token) -> Result<SymbolKey> {
        let name = self.text(tok);
        if name.parse::<InstrKind>().is_ok() {
            bail!(
                severity = Severity::Error,
                code = "parse::reserved",
                help = "the previous instruction may be missing an operand",
                labels = vec![LabeledSpan::at(tok.span, "instruction name")],
                "Instruction names cannot be used as symbols",
            )
        }
        encode(name, tok.span)
    }

    fn literal(&self, tok: Token, kind: LiteralKind) -> Result<Value> {
        let text = self.text(tok);
        // Skip '#'
        let body = &text[1..];
        let parsed = match kind {
            LiteralKind::Dec => body.parse::<Value>(),
            LiteralKind::Hex => {
                let (negative, digits) = match body.strip_prefix('-') {
                    Some(rest) => (true, &rest[1..]),
                    None => (false, &body[1..]),
                };
                Value::from_str_radix(digits, 16).map(|val| if negative { -val } else { val })
            }
        };
        let val = parsed.map_err(|e| {
            miette!(
                severity = Severity::Error,
                code = "parse::bad_lit",
                help = "write decimals as `#-12` and hex as `#x1F`",
                labels = vec![LabeledSpan::at(tok.span, "incorrect literal")],
                "Encountered an invalid literal: {e}",
            )
        })?;
        if !(i64::MIN as Value..=u64::MAX as Value).contains(&val) {
            bail!(
                severity = Severity::Error,
                code = "parse::bad_lit",
                help = "literals range from -2^63 to 2^64 - 1",
                labels = vec![LabeledSpan::at(tok.span, "out-of-range literal")],
                "Found numeric literal {val} that does not fit in 64 bits",
            )
        }
        Ok(val)
    }

    fn eof(&self) -> Report {
        miette!(
            severity = Severity::Error,
            code = "parse::unexpected_eof",
            help = "you may be missing operands in your last statement",
            labels = vec![LabeledSpan::at_offset(
                self.src.len().saturating_sub(1),
                "unexpected end of file"
            )],
            "Unexpected end of file",
        )
    }
}

fn encode(name: &str, span: Span) -> Result<SymbolKey> {
    SymbolKey::encode(name).map_err(|err| {
        miette!(
            severity = Severity::Error,
            code = "parse::bad_ident",
            help = "names are 1 to 6 letters or digits",
            labels = vec![LabeledSpan::at(span, "invalid identifier")],
            "{err}",
        )
    })
}

fn mnemonic_list() -> String {
    InstrKind::MNEMONICS
        .iter()
        .map(|kind| kind.mnemonic())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SymbolKey {
        SymbolKey::encode(s).unwrap()
    }

    fn parse(src: &str) -> Result<Program> {
        AsmParser::new(src)?.parse()
    }

    fn code(src: &str) -> String {
        let err = parse(src).unwrap_err();
        err.code().map(|code| code.to_string()).unwrap_or_default()
    }

    #[test]
    fn parse_multiplication() {
        let program = parse(
            r#"
            ; multiply a by b into c
                decl a #5
                decl b, #10
                decl c #0
            loop:
                add [c] [b]
                dec [a]
                jz stop
                jmp loop
            stop:
            "#,
        )
        .unwrap();
        assert_eq!(program.len(), 9);
        assert_eq!(
            program.get(0),
            Some(&Instruction::Declare {
                symbol: key("a"),
                init: 5
            })
        );
        assert_eq!(program.get(3), Some(&Instruction::Label(key("loop"))));
        assert_eq!(
            program.get(4),
            Some(&Instruction::Add(
                Operand::var(key("c")),
                Operand::var(key("b"))
            ))
        );
        assert_eq!(program.get(6), Some(&Instruction::JumpIfZero(key("stop"))));
        assert_eq!(program.get(8), Some(&Instruction::Label(key("stop"))));
    }

    #[test]
    fn parse_operands() {
        let program = parse("MOV [[#x10]] a\ncmp #-3, [#0]").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Instruction::Move(
                Operand::cell(Operand::cell(Operand::imm(16))),
                Operand::SymbolAddress(key("a"))
            ))
        );
        assert_eq!(
            program.get(1),
            Some(&Instruction::Compare(
                Operand::imm(-3),
                Operand::cell(Operand::imm(0))
            ))
        );
    }

    #[test]
    fn parse_label_on_same_line() {
        let program = parse("top: inc [#0] js top").unwrap();
        assert_eq!(
            program.iter().map(Instruction::kind).collect::<Vec<_>>(),
            vec![InstrKind::Label, InstrKind::Increment, InstrKind::JumpIfSign]
        );
    }

    #[test]
    fn empty_source() {
        assert_eq!(parse("").unwrap(), Program::default());
        assert_eq!(parse("  ; nothing\n").unwrap(), Program::default());
    }

    #[test]
    fn round_trips_through_display() {
        let src = "    decl a #-5\nloop:\n    add [[#0]], a\n    js loop\n";
        assert_eq!(parse(src).unwrap().to_string(), src);
    }

    #[test]
    fn unknown_instruction() {
        assert_eq!(code("mul [#0] #2"), "parse::unknown_instr");
    }

    #[test]
    fn invalid_identifiers() {
        assert_eq!(code("decl too_long #1"), "parse::bad_ident");
        assert_eq!(code("jmp abcdefg"), "parse::bad_ident");
        assert_eq!(code("my_lbl:"), "parse::bad_ident");
    }

    #[test]
    fn not_assignable() {
        assert_eq!(code("mov #1 #2"), "parse::not_assignable");
        assert_eq!(code("inc a"), "parse::not_assignable");
    }

    #[test]
    fn missing_operand() {
        assert_eq!(code("inc"), "parse::unexpected_eof");
        assert_eq!(code("inc\nadd [#0] #1"), "parse::reserved");
        assert_eq!(code("mov [#0"), "parse::unexpected_eof");
        assert_eq!(code("mov [#0 #1"), "parse::unexpected_token");
    }

    #[test]
    fn bad_literals() {
        assert_eq!(code("decl a #"), "parse::bad_lit");
        assert_eq!(code("decl a #18446744073709551616"), "parse::bad_lit");
        assert!(parse("decl a #18446744073709551615").is_ok());
        assert!(parse("decl a #-9223372036854775808").is_ok());
        assert_eq!(code("decl a b"), "parse::unexpected_token");
    }

    #[test]
    fn unknown_token() {
        assert_eq!(code("mov [#0] @"), "lex::unknown");
    }

    #[test]
    fn lines_start_with_instruction() {
        assert_eq!(code("#4"), "parse::unexpected_token");
    }

    #[test]
    fn hex_literals() {
        let program = parse("mov [#0] #xff\nmov [#1] #-X10").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Instruction::Move(Operand::cell(Operand::imm(0)), Operand::imm(255)))
        );
        assert_eq!(
            program.get(1),
            Some(&Instruction::Move(Operand::cell(Operand::imm(1)), Operand::imm(-16)))
        );
        assert_eq!(code("mov [#0] #xg"), "parse::bad_lit");
        assert_eq!(code("mov [#0] #x"), "parse::bad_lit");
    }

    #[test]
    fn hex_shaped_identifiers() {
        let program = parse("decl xa #3\nx1:\ninc [xa]\njz x1\njmp xff\nxff:").unwrap();
        assert_eq!(
            program.get(0),
            Some(&Instruction::Declare {
                symbol: key("xa"),
                init: 3
            })
        );
        assert_eq!(program.get(1), Some(&Instruction::Label(key("x1"))));
        assert_eq!(program.get(2), Some(&Instruction::Increment(Operand::var(key("xa")))));
        assert_eq!(program.get(3), Some(&Instruction::JumpIfZero(key("x1"))));
        assert_eq!(program.get(4), Some(&Instruction::Jump(key("xff"))));
    }

    #[test]
    fn long_literal_keeps_its_value() {
        let src = format!("mov [#0] #{}7", "0".repeat(65_536));
        let program = parse(&src).unwrap();
        assert_eq!(
            program.get(0),
            Some(&Instruction::Move(Operand::cell(Operand::imm(0)), Operand::imm(7)))
        );
    }

    #[test]
    fn long_label_is_rejected() {
        let src = format!("{}:", "a".repeat(65_535));
        assert_eq!(code(&src), "parse::bad_ident");
    }

    #[test]
    fn nesting_limit() {
        let nested = |depth: usize| format!("mov [#0] {}#0{}", "[".repeat(depth), "]".repeat(depth));
        let program = parse(&nested(MAX_OPERAND_DEPTH)).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(code(&nested(MAX_OPERAND_DEPTH + 1)), "parse::too_deep");
        assert_eq!(code(&nested(200_000)), "parse::too_deep");
    }
}
