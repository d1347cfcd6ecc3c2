//! Indentation-aware lexer (spec §4.B).
//!
//! Converts a source buffer into a flat `Vec<Token>`, tracking an
//! indentation stack so that a change in leading whitespace becomes a
//! virtual `Indent`/`Dedent` token rather than requiring the parser to
//! look at column numbers itself. Lexical errors become a single `Error`
//! token and scanning resumes at the next line, so one pass can surface
//! more than one mistake (spec §4.B, §7).

use crate::token::{LiteralValue, Token, TokenKind, keyword_kind};
use std::path::PathBuf;
use std::rc::Rc;

pub struct Lexer<'src> {
    source: &'src str,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    file: Rc<PathBuf>,
    indent_stack: Vec<usize>,
    tokens: Vec<Token>,
    /// `true` at the start of a physical line, before any non-whitespace
    /// character has been seen; indentation is only measured there.
    at_line_start: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file: PathBuf) -> Lexer<'src> {
        Lexer {
            source,
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            file: Rc::new(file),
            indent_stack: vec![0],
            tokens: Vec::new(),
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn push(&mut self, kind: TokenKind, text: &str) {
        self.tokens
            .push(Token::new(kind, text, self.line, self.file.clone()));
    }

    fn push_tok(&mut self, tok: Token) {
        self.tokens.push(tok);
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.tokens
            .push(Token::error(message, self.line, self.file.clone()));
    }

    /// Tokenize the whole buffer.
    pub fn tokenize(mut self) -> Vec<Token> {
        while self.pos < self.chars.len() {
            if self.at_line_start {
                if !self.measure_indent() {
                    // Blank or comment-only line: stays at line start.
                    continue;
                }
            }
            self.scan_token();
        }
        self.close_line();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, "");
        }
        self.push(TokenKind::Eof, "");
        self.tokens
    }

    /// Measures leading whitespace of a physical line, consuming it and
    /// emitting Indent/Dedent tokens. Returns `false` if the line was blank
    /// (only whitespace, or immediately a newline) so the caller should
    /// keep looking for the next real line without emitting Indent/Dedent
    /// for a line that carries no tokens.
    fn measure_indent(&mut self) -> bool {
        let mut width = 0usize;
        let mut saw_tab = false;
        let mut saw_space = false;
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                ' ' => {
                    saw_space = true;
                    width += 1;
                    self.pos += 1;
                }
                '\t' => {
                    saw_tab = true;
                    width += 1;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if saw_tab && saw_space {
            self.push_error(format!(
                "inconsistent indentation: mixed tabs and spaces at line {}",
                self.line + 1
            ));
        }
        match self.peek() {
            None => {
                self.pos = start;
                return false;
            }
            Some('\n') | Some('\r') => {
                // Blank line: consume it, stay in line-start mode.
                self.consume_newline();
                return false;
            }
            _ => {}
        }
        self.at_line_start = false;
        let current = *self.indent_stack.last().unwrap();
        if width > current {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, "");
        } else {
            while width < *self.indent_stack.last().unwrap() {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, "");
            }
            if *self.indent_stack.last().unwrap() != width {
                self.push_error(format!(
                    "indentation does not match any enclosing block at line {}",
                    self.line + 1
                ));
                self.indent_stack.push(width);
            }
        }
        true
    }

    fn consume_newline(&mut self) {
        if self.peek() == Some('\r') {
            self.pos += 1;
        }
        if self.peek() == Some('\n') {
            self.pos += 1;
        }
        self.line += 1;
        self.at_line_start = true;
    }

    fn close_line(&mut self) {
        self.push(TokenKind::Newline, "");
    }

    fn scan_token(&mut self) {
        let Some(c) = self.peek() else { return };
        match c {
            '\r' | '\n' => {
                self.close_line();
                self.consume_newline();
            }
            ' ' | '\t' => {
                self.pos += 1;
            }
            '0'..='9' => self.scan_number(),
            '"' => self.scan_string(),
            '\'' => self.scan_char(),
            '$' if self.peek_at(1) == Some('"') => {
                self.pos += 1;
                self.scan_interpolated_string();
            }
            '$' if self.peek_at(1) == Some('|') => {
                let base_indent = *self.indent_stack.last().unwrap();
                self.pos += 2;
                self.scan_pipe_block(base_indent);
            }
            '|' => {
                let base_indent = *self.indent_stack.last().unwrap();
                self.pos += 1;
                self.scan_pipe_block(base_indent);
            }
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),
            _ => self.scan_operator(),
        }
    }

    fn scan_identifier(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match keyword_kind(&text) {
            Some(kind) => self.push(kind, &text),
            None => self.push(TokenKind::Identifier, &text),
        }
    }

    fn scan_operator(&mut self) {
        use TokenKind::*;
        let c = self.advance().unwrap();
        macro_rules! two {
            ($next:expr, $two:expr, $one:expr) => {
                if self.peek() == Some($next) {
                    self.pos += 1;
                    self.push($two, "");
                } else {
                    self.push($one, "");
                }
            };
        }
        match c {
            '+' => {
                if self.peek() == Some('+') {
                    self.pos += 1;
                    self.push(PlusPlus, "++");
                } else {
                    two!('=', PlusEq, Plus)
                }
            }
            '-' => {
                if self.peek() == Some('-') {
                    self.pos += 1;
                    self.push(MinusMinus, "--");
                } else {
                    two!('=', MinusEq, Minus)
                }
            }
            '*' => two!('=', StarEq, Star),
            '/' => two!('=', SlashEq, Slash),
            '%' => two!('=', PercentEq, Percent),
            '=' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    self.push(EqEq, "==");
                } else if self.peek() == Some('>') {
                    self.pos += 1;
                    self.push(Arrow, "=>");
                } else {
                    self.push(Assign, "=");
                }
            }
            '!' => two!('=', NotEq, NotKw),
            '<' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    self.push(Lte, "<=");
                } else if self.peek() == Some('<') {
                    self.pos += 1;
                    self.push(Shl, "<<");
                } else {
                    self.push(Lt, "<");
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.pos += 1;
                    self.push(Gte, ">=");
                } else if self.peek() == Some('>') {
                    self.pos += 1;
                    self.push(Shr, ">>");
                } else {
                    self.push(Gt, ">");
                }
            }
            '&' => self.push(Amp, "&"),
            '|' => self.push(Pipe, "|"),
            '^' => self.push(Caret, "^"),
            '~' => self.push(Tilde, "~"),
            '.' => {
                if self.peek() == Some('.') {
                    self.pos += 1;
                    if self.peek() == Some('.') {
                        self.pos += 1;
                        self.push(DotDotDot, "...");
                    } else {
                        self.push(DotDot, "..");
                    }
                } else {
                    self.push(Dot, ".");
                }
            }
            ':' => self.push(Colon, ":"),
            ',' => self.push(Comma, ","),
            '(' => self.push(LParen, "("),
            ')' => self.push(RParen, ")"),
            '[' => self.push(LBracket, "["),
            ']' => self.push(RBracket, "]"),
            '{' => self.push(LBrace, "{"),
            '}' => self.push(RBrace, "}"),
            other => self.push_error(format!("unexpected character '{other}'")),
        }
    }

    // -- numbers --------------------------------------------------------

    fn scan_number(&mut self) {
        let start = self.pos;
        let mut is_float = false;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            return self.finish_int_literal(start, 16);
        }
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('b' | 'B')) {
            self.pos += 2;
            while matches!(self.peek(), Some('0' | '1')) {
                self.pos += 1;
            }
            return self.finish_int_literal(start, 2);
        }
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('o' | 'O')) {
            self.pos += 2;
            while matches!(self.peek(), Some('0'..='7')) {
                self.pos += 1;
            }
            return self.finish_int_literal(start, 8);
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let digits_end = self.pos;
        let suffix_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..digits_end].iter().collect();
        let suffix: String = self.chars[suffix_start..self.pos].iter().collect();
        let text: String = self.chars[start..self.pos].iter().collect();

        if is_float || matches!(suffix.as_str(), "f" | "F" | "d" | "D") {
            let value: f64 = match digits.parse() {
                Ok(v) => v,
                Err(_) => return self.push_error(format!("invalid floating literal '{text}'")),
            };
            let kind = if matches!(suffix.as_str(), "f" | "F") {
                TokenKind::FloatLiteral
            } else {
                TokenKind::DoubleLiteral
            };
            return self.push_tok(
                Token::new(kind, text, self.line, self.file.clone())
                    .with_literal(LiteralValue::Double(value)),
            );
        }

        let value: i64 = match digits.parse() {
            Ok(v) => v,
            Err(_) => return self.push_error(format!("invalid integer literal '{text}'")),
        };
        self.finish_suffixed_int(text, value, &suffix);
    }

    fn finish_int_literal(&mut self, start: usize, radix: u32) {
        let suffix_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start + 2..suffix_start].iter().collect();
        let suffix: String = self.chars[suffix_start..self.pos].iter().collect();
        let text: String = self.chars[start..self.pos].iter().collect();
        if digits.is_empty() {
            return self.push_error(format!("empty numeric literal '{text}'"));
        }
        let value = match i64::from_str_radix(&digits, radix) {
            Ok(v) => v,
            Err(_) => return self.push_error(format!("invalid numeric literal '{text}'")),
        };
        self.finish_suffixed_int(text, value, &suffix);
    }

    /// Applies spec §4.B's suffix table and range-checks `byte`/`uint32`/
    /// `int32` as the spec requires.
    fn finish_suffixed_int(&mut self, text: String, value: i64, suffix: &str) {
        let kind = match suffix {
            "" => TokenKind::IntLiteral,
            "l" | "L" => TokenKind::LongLiteral,
            "b" | "B" => {
                if !(0..=255).contains(&value) {
                    return self.push_error(format!(
                        "byte literal '{text}' out of range 0..=255"
                    ));
                }
                TokenKind::IntLiteral
            }
            "u" | "U" => TokenKind::UintLiteral,
            "u32" | "U32" => {
                if !(0..=u32::MAX as i64).contains(&value) {
                    return self.push_error(format!("uint32 literal '{text}' out of range"));
                }
                TokenKind::Uint32Literal
            }
            "i32" | "I32" => {
                if !(i32::MIN as i64..=i32::MAX as i64).contains(&value) {
                    return self.push_error(format!("int32 literal '{text}' out of range"));
                }
                TokenKind::Int32Literal
            }
            "f" | "F" => TokenKind::FloatLiteral,
            "d" | "D" => TokenKind::DoubleLiteral,
            other => return self.push_error(format!("unknown numeric suffix '{other}'")),
        };
        self.push_tok(
            Token::new(kind, text, self.line, self.file.clone())
                .with_literal(LiteralValue::Int(value)),
        );
    }

    // -- strings/chars ----------------------------------------------------

    /// Consumes one escape sequence after a `\` has already been eaten,
    /// returning the decoded character (spec §4.B escape set).
    fn scan_escape(&mut self) -> Result<char, String> {
        match self.advance() {
            Some('\\') => Ok('\\'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('"') => Ok('"'),
            Some('0') => Ok('\0'),
            Some('x') => {
                let hi = self.advance().ok_or("truncated \\x escape")?;
                let lo = self.advance().ok_or("truncated \\x escape")?;
                let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16)
                    .map_err(|_| "invalid \\x escape".to_string())?;
                Ok(byte as char)
            }
            Some(other) => Err(format!("unknown escape '\\{other}'")),
            None => Err("unterminated escape".to_string()),
        }
    }

    fn scan_string(&mut self) {
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return self.push_error("unterminated string literal");
                }
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.scan_escape() {
                        Ok(c) => out.push(c),
                        Err(e) => return self.push_error(e),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        self.push_tok(
            Token::new(TokenKind::StringLiteral, out.clone(), self.line, self.file.clone())
                .with_literal(LiteralValue::Str(Rc::from(out.as_str()))),
        );
    }

    fn scan_char(&mut self) {
        self.pos += 1; // opening quote
        let c = match self.peek() {
            Some('\'') => {
                return self.push_error("empty character literal");
            }
            Some('\\') => {
                self.pos += 1;
                match self.scan_escape() {
                    Ok(c) => c,
                    Err(e) => return self.push_error(e),
                }
            }
            Some(c) => {
                self.pos += 1;
                c
            }
            None => return self.push_error("unterminated character literal"),
        };
        if self.peek() != Some('\'') {
            return self.push_error("character literal must contain exactly one character");
        }
        self.pos += 1;
        self.push_tok(
            Token::new(TokenKind::CharLiteral, c.to_string(), self.line, self.file.clone())
                .with_literal(LiteralValue::Char(c)),
        );
    }

    /// `$"...{expr}..."`, tracking brace depth and nested-string depth so
    /// that `$"…{$"…{x}"}…"` tokenizes correctly (spec §4.B). Emits
    /// `InterpStringStart`, then alternating `InterpStringPart` and
    /// (`InterpExprStart` .. tokens of the nested expression .. possibly an
    /// `InterpFormatSpec` .. `InterpExprEnd`), ending with
    /// `InterpStringEnd`.
    fn scan_interpolated_string(&mut self) {
        self.pos += 1; // opening quote
        self.push(TokenKind::InterpStringStart, "");
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return self.push_error("unterminated interpolated string");
                }
                Some('"') => {
                    self.pos += 1;
                    self.flush_interp_part(&mut out);
                    self.push(TokenKind::InterpStringEnd, "");
                    return;
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.scan_escape() {
                        Ok(c) => out.push(c),
                        Err(e) => return self.push_error(e),
                    }
                }
                Some('{') => {
                    self.pos += 1;
                    self.flush_interp_part(&mut out);
                    self.scan_interp_expr();
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn flush_interp_part(&mut self, out: &mut String) {
        if !out.is_empty() {
            let text = std::mem::take(out);
            self.push_tok(
                Token::new(TokenKind::InterpStringPart, text.clone(), self.line, self.file.clone())
                    .with_literal(LiteralValue::Str(Rc::from(text.as_str()))),
            );
        }
    }

    /// Scans the body of one `{expr}` or `{expr:fmt}` interpolation hole.
    /// Brace depth and nested-string depth are tracked together: a `:` is
    /// only the start of a format spec when brace depth is exactly 1 (the
    /// outermost level of this hole) and we are not inside a nested
    /// string literal.
    fn scan_interp_expr(&mut self) {
        self.push(TokenKind::InterpExprStart, "");
        let mut depth = 1usize;
        loop {
            match self.peek() {
                None => return self.push_error("unterminated interpolation expression"),
                Some('{') => {
                    depth += 1;
                    self.pos += 1;
                    self.scan_operator_char('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        self.push(TokenKind::InterpExprEnd, "");
                        return;
                    }
                    self.pos += 1;
                    self.scan_operator_char('}');
                }
                Some('"') => self.scan_string(),
                Some('$') if self.peek_at(1) == Some('"') => {
                    self.pos += 1;
                    self.scan_interpolated_string();
                }
                Some(':') if depth == 1 => {
                    self.pos += 1;
                    self.scan_format_spec();
                }
                Some(c) if c.is_whitespace() => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                }
                Some(c) if c.is_alphabetic() || c == '_' => self.scan_identifier(),
                Some(c) if c.is_ascii_digit() => self.scan_number(),
                _ => self.scan_operator(),
            }
        }
    }

    fn scan_operator_char(&mut self, c: char) {
        let kind = if c == '{' {
            TokenKind::LBrace
        } else {
            TokenKind::RBrace
        };
        self.push(kind, "");
    }

    /// Captures format text verbatim until the hole's closing `}` (spec
    /// §4.B: "format text is captured verbatim").
    fn scan_format_spec(&mut self) {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::InterpFormatSpec, &text);
    }

    /// `|` or `$|` pipe-block strings (spec §4.B): every subsequent line
    /// whose indentation exceeds `base_indent` (the `|` token's own
    /// indentation) is content; minimum content indent is stripped and
    /// each line gets `\n`. Lines are kept whole from their first
    /// non-whitespace-consuming character up to the newline, so stripping
    /// only `min_indent` characters off the front re-creates each line's
    /// indentation relative to the shallowest content line.
    fn scan_pipe_block(&mut self, base_indent: usize) {
        // Skip to end of this physical line first (the `|` must be
        // immediately followed by a newline to open a block).
        while matches!(self.peek(), Some(c) if c == ' ' || c == '\t') {
            self.pos += 1;
        }
        match self.peek() {
            Some('\n') | Some('\r') | None => {}
            _ => return self.push_error("pipe-block opener must be followed by a newline"),
        }
        self.consume_newline();

        let mut lines = Vec::new();
        let mut min_indent = usize::MAX;
        loop {
            let line_start = self.pos;
            let mut indent = 0usize;
            while matches!(self.peek(), Some(' ') | Some('\t')) {
                indent += 1;
                self.pos += 1;
            }
            if matches!(self.peek(), Some('\n') | Some('\r')) {
                // Blank line inside the block: keep it, don't count toward
                // min_indent.
                lines.push((indent, String::new(), true));
                self.consume_newline();
                continue;
            }
            if indent <= base_indent || self.peek().is_none() {
                self.pos = line_start;
                break;
            }
            while !matches!(self.peek(), None | Some('\n') | Some('\r')) {
                self.pos += 1;
            }
            let full_line: String = self.chars[line_start..self.pos].iter().collect();
            min_indent = min_indent.min(indent);
            lines.push((indent, full_line, false));
            if self.peek().is_some() {
                self.consume_newline();
            } else {
                break;
            }
        }
        if min_indent == usize::MAX {
            min_indent = 0;
        }
        let mut out = String::new();
        for (_indent, full_line, blank) in lines {
            if blank {
                out.push('\n');
            } else {
                out.push_str(&full_line[min_indent.min(full_line.len())..]);
                out.push('\n');
            }
        }
        self.push_tok(
            Token::new(TokenKind::StringLiteral, out.clone(), self.line, self.file.clone())
                .with_literal(LiteralValue::Str(Rc::from(out.as_str()))),
        );
    }
}

pub fn lex(source: &str, file: PathBuf) -> Vec<Token> {
    Lexer::new(source, file).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, PathBuf::from("t.holt"))
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn hex_bin_oct_prefixes() {
        let toks = lex("0xFF\n0b101\n0o17\n", PathBuf::from("t.holt"));
        let ints: Vec<i64> = toks
            .iter()
            .filter_map(|t| match &t.literal {
                LiteralValue::Int(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(ints, vec![255, 5, 15]);
    }

    #[test]
    fn byte_suffix_range_checked() {
        let toks = lex("300b\n", PathBuf::from("t.holt"));
        assert!(toks.iter().any(|t| t.is_error()));
    }

    #[test]
    fn indent_dedent_discipline() {
        let src = "fn f():\n  var x = 1\n  var y = 2\nreturn\n";
        let ks = kinds(src);
        let indents = ks.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = ks.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn mismatched_dedent_is_an_error() {
        let src = "fn f():\n    var x = 1\n  var y = 2\n";
        assert!(kinds(src).contains(&TokenKind::Error));
    }

    #[test]
    fn simple_interpolation_round_trips() {
        let toks = lex("$\"value = {x}\"\n", PathBuf::from("t.holt"));
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert!(ks.contains(&TokenKind::InterpStringStart));
        assert!(ks.contains(&TokenKind::InterpExprStart));
        assert!(ks.contains(&TokenKind::InterpExprEnd));
        assert!(ks.contains(&TokenKind::InterpStringEnd));
    }

    #[test]
    fn interpolation_format_spec_is_captured() {
        let toks = lex("$\"{x:05d}\"\n", PathBuf::from("t.holt"));
        let spec = toks
            .iter()
            .find(|t| t.kind == TokenKind::InterpFormatSpec)
            .expect("format spec token");
        assert_eq!(spec.text.as_ref(), "05d");
    }

    #[test]
    fn nested_interpolation_tracks_brace_and_string_depth() {
        let toks = lex("$\"a{$\"b{x}c\"}d\"\n", PathBuf::from("t.holt"));
        let starts = toks
            .iter()
            .filter(|t| t.kind == TokenKind::InterpStringStart)
            .count();
        let ends = toks
            .iter()
            .filter(|t| t.kind == TokenKind::InterpStringEnd)
            .count();
        assert_eq!(starts, 2);
        assert_eq!(ends, 2);
    }

    #[test]
    fn pipe_block_strips_minimum_indent() {
        let src = "|\n  line one\n  line two\n";
        let toks = lex(src, PathBuf::from("t.holt"));
        let lit = toks
            .iter()
            .find(|t| t.kind == TokenKind::StringLiteral)
            .unwrap();
        match &lit.literal {
            LiteralValue::Str(s) => assert_eq!(s.as_ref(), "line one\nline two\n"),
            _ => panic!("expected string literal"),
        }
    }

    #[test]
    fn pipe_block_preserves_indentation_past_the_minimum() {
        let src = "|\n  a\n    b\n";
        let toks = lex(src, PathBuf::from("t.holt"));
        let lit = toks
            .iter()
            .find(|t| t.kind == TokenKind::StringLiteral)
            .unwrap();
        match &lit.literal {
            LiteralValue::Str(s) => assert_eq!(s.as_ref(), "a\n  b\n"),
            _ => panic!("expected string literal"),
        }
    }

    #[test]
    fn pipe_block_terminates_at_its_own_indentation_not_column_zero() {
        let src = "fn f(): str:\n  var s: str = |\n    content\n  return s\n";
        let toks = lex(src, PathBuf::from("t.holt"));
        let lit = toks
            .iter()
            .find(|t| t.kind == TokenKind::StringLiteral)
            .unwrap();
        match &lit.literal {
            LiteralValue::Str(s) => assert_eq!(s.as_ref(), "content\n"),
            _ => panic!("expected string literal"),
        }
        // the dedented `return` line is still lexed as a real statement,
        // not swallowed as pipe-block content
        assert!(toks.iter().any(|t| t.kind == TokenKind::Return));
    }

    #[test]
    fn empty_char_literal_is_an_error() {
        assert!(kinds("''\n").contains(&TokenKind::Error));
    }
}
