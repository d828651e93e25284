//! SQL tokenizer.
//!
//! Converts SQL text into a flat ordered sequence of [`Lexeme`]s. Uses
//! memchr for accelerated string scanning. Comments never enter the
//! stream; they attach to the next lexeme, or to the last one at end of
//! input. Multi-word keyword phrases are fused by table-driven lookahead.

use std::sync::atomic::{AtomicU64, Ordering};

use memchr::memchr;
use requel_ast::{Comment, LiteralKind, Span};
use requel_error::TokenizeError;

use crate::token::{Lexeme, LexemeKind, is_keyword, phrases_starting_with, OPERATORS};

// ---------------------------------------------------------------------------
// Tokenize metrics
// ---------------------------------------------------------------------------

/// Monotonic counter of tokenize calls.
static REQUEL_TOKENIZE_CALLS_TOTAL: AtomicU64 = AtomicU64::new(0);
/// Monotonic counter of lexemes produced.
static REQUEL_LEXEMES_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time tokenize metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenizeMetricsSnapshot {
    /// Total tokenize calls.
    pub requel_tokenize_calls_total: u64,
    /// Total lexemes produced across all calls.
    pub requel_lexemes_total: u64,
}

/// Take a point-in-time snapshot of tokenize metrics.
#[must_use]
pub fn tokenize_metrics_snapshot() -> TokenizeMetricsSnapshot {
    TokenizeMetricsSnapshot {
        requel_tokenize_calls_total: REQUEL_TOKENIZE_CALLS_TOTAL.load(Ordering::Relaxed),
        requel_lexemes_total: REQUEL_LEXEMES_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset tokenize metrics (used by tests/diagnostics).
pub fn reset_tokenize_metrics() {
    REQUEL_TOKENIZE_CALLS_TOTAL.store(0, Ordering::Relaxed);
    REQUEL_LEXEMES_TOTAL.store(0, Ordering::Relaxed);
}

/// Tokenize an entire SQL string.
pub fn tokenize(sql: &str) -> Result<Vec<Lexeme>, TokenizeError> {
    REQUEL_TOKENIZE_CALLS_TOTAL.fetch_add(1, Ordering::Relaxed);
    let mut tokenizer = Tokenizer::new(sql);
    let mut lexemes = Vec::new();
    while let Some(lexeme) = tokenizer.next_lexeme()? {
        lexemes.push(lexeme);
    }
    // Trailing comments attach to the last lexeme.
    if !tokenizer.pending.is_empty() {
        if let Some(last) = lexemes.last_mut() {
            last.comments.append(&mut tokenizer.pending);
        }
    }
    REQUEL_LEXEMES_TOTAL.fetch_add(lexemes.len() as u64, Ordering::Relaxed);
    Ok(lexemes)
}

/// Byte-wise SQL tokenizer.
struct Tokenizer<'a> {
    /// The source bytes (UTF-8).
    src: &'a [u8],
    /// Current byte offset into src.
    pos: usize,
    /// Comments collected since the previous lexeme.
    pending: Vec<Comment>,
    /// Value of the previously emitted lexeme when it was a keyword;
    /// drives `[` disambiguation after `array`.
    prev_keyword: Option<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            pending: Vec::new(),
            prev_keyword: None,
        }
    }

    /// Produce the next lexeme, or `None` at end of input.
    fn next_lexeme(&mut self) -> Result<Option<Lexeme>, TokenizeError> {
        self.collect_trivia()?;

        if self.pos >= self.src.len() {
            return Ok(None);
        }

        let start = self.pos;
        let ch = self.src[self.pos];

        let (kind, value) = match ch {
            b'\'' => self.lex_string(start)?,
            b'"' => self.lex_quoted_ident(b'"', start)?,
            b'`' => self.lex_quoted_ident(b'`', start)?,
            b'[' => self.lex_bracket(start)?,
            b']' => {
                self.pos += 1;
                (LexemeKind::CloseBracket, "]".to_owned())
            }
            b'0'..=b'9' => self.lex_number(start)?,
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(start)?,
            b'.' => {
                self.pos += 1;
                (LexemeKind::Dot, ".".to_owned())
            }
            b',' => {
                self.pos += 1;
                (LexemeKind::Comma, ",".to_owned())
            }
            b'(' => {
                self.pos += 1;
                (LexemeKind::OpenParen, "(".to_owned())
            }
            b')' => {
                self.pos += 1;
                (LexemeKind::CloseParen, ")".to_owned())
            }
            b'?' => self.lex_question(),
            b':' => self.lex_colon(start)?,
            b'@' => self.lex_at(start)?,
            b'$' => self.lex_dollar(start)?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.lex_word(start)?,
            _ => self.lex_operator(start)?,
        };

        let span = Span::new(start as u32, self.pos as u32);
        self.prev_keyword = if kind == LexemeKind::Keyword {
            Some(value.clone())
        } else {
            None
        };
        Ok(Some(Lexeme {
            kind,
            value,
            comments: std::mem::take(&mut self.pending),
            span,
        }))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn slice(&self, from: usize) -> &str {
        // The tokenizer only splits at ASCII boundaries, so slices stay
        // valid UTF-8.
        std::str::from_utf8(&self.src[from..self.pos]).unwrap_or_default()
    }

    /// Skip whitespace, collecting comments into `pending`.
    fn collect_trivia(&mut self) -> Result<(), TokenizeError> {
        loop {
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.pos + 1 < self.src.len()
                && self.src[self.pos] == b'-'
                && self.src[self.pos + 1] == b'-'
            {
                self.pos += 2;
                let text_start = self.pos;
                match memchr(b'\n', &self.src[self.pos..]) {
                    Some(offset) => self.pos += offset,
                    None => self.pos = self.src.len(),
                }
                let text = self.slice(text_start).trim().to_owned();
                self.pending.push(Comment::line(text));
                continue;
            }

            if self.pos + 1 < self.src.len()
                && self.src[self.pos] == b'/'
                && self.src[self.pos + 1] == b'*'
            {
                let start = self.pos;
                self.pos += 2;
                let text_start = self.pos;
                let mut depth = 1u32;
                while self.pos < self.src.len() && depth > 0 {
                    if self.src[self.pos] == b'/' && self.peek_at(1) == Some(b'*') {
                        self.pos += 2;
                        depth += 1;
                    } else if self.src[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                        self.pos += 2;
                        depth -= 1;
                    } else {
                        self.pos += 1;
                    }
                }
                if depth > 0 {
                    return Err(TokenizeError::new(start, "unterminated block comment"));
                }
                let text_end = self.pos - 2;
                let text =
                    String::from_utf8_lossy(&self.src[text_start..text_end]).trim().to_owned();
                self.pending.push(Comment::block(text));
                continue;
            }

            return Ok(());
        }
    }

    // -----------------------------------------------------------------------
    // Strings
    // -----------------------------------------------------------------------

    /// Lex a single-quoted string body starting at the opening quote,
    /// honouring the `''` escape. Returns with `pos` past the closing
    /// quote. The raw text (quotes included) is preserved.
    fn lex_string_body(&mut self, start: usize) -> Result<(), TokenizeError> {
        self.pos += 1; // opening quote
        loop {
            let remaining = &self.src[self.pos..];
            match memchr(b'\'', remaining) {
                Some(offset) => {
                    self.pos += offset + 1;
                    if self.peek_at(0) == Some(b'\'') {
                        self.pos += 1; // doubled quote, keep scanning
                    } else {
                        return Ok(());
                    }
                }
                None => {
                    return Err(TokenizeError::new(start, "unterminated string literal"));
                }
            }
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        self.lex_string_body(start)?;
        Ok((
            LexemeKind::Literal(LiteralKind::String),
            self.slice(start).to_owned(),
        ))
    }

    /// Lex a quoted identifier with a doubling escape. Backtick and
    /// double-quote share the logic; the value is the unquoted name with
    /// case retained, bypassing keyword detection.
    fn lex_quoted_ident(
        &mut self,
        quote: u8,
        start: usize,
    ) -> Result<(LexemeKind, String), TokenizeError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let remaining = &self.src[self.pos..];
            match memchr(quote, remaining) {
                Some(offset) => {
                    value.push_str(&String::from_utf8_lossy(
                        &self.src[self.pos..self.pos + offset],
                    ));
                    self.pos += offset + 1;
                    if self.peek_at(0) == Some(quote) {
                        value.push(quote as char);
                        self.pos += 1;
                    } else {
                        return Ok((LexemeKind::Identifier, value));
                    }
                }
                None => {
                    return Err(TokenizeError::new(start, "unterminated quoted identifier"));
                }
            }
        }
    }

    /// `[` is an array-literal opener right after the `array` keyword and a
    /// bracket-quoted identifier everywhere else (the grammar has no other
    /// subscript form).
    fn lex_bracket(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        if self.prev_keyword.as_deref() == Some("array") {
            self.pos += 1;
            return Ok((LexemeKind::OpenBracket, "[".to_owned()));
        }
        self.pos += 1;
        let remaining = &self.src[self.pos..];
        match memchr(b']', remaining) {
            Some(offset) => {
                let value =
                    String::from_utf8_lossy(&self.src[self.pos..self.pos + offset]).into_owned();
                self.pos += offset + 1;
                Ok((LexemeKind::Identifier, value))
            }
            None => Err(TokenizeError::new(start, "unterminated bracket identifier")),
        }
    }

    // -----------------------------------------------------------------------
    // Numbers
    // -----------------------------------------------------------------------

    /// Lex a numeric literal: decimal, scientific, or leading-dot form.
    /// The raw text is preserved.
    fn lex_number(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek_at(0) == Some(b'.')
            && !self.peek_at(1).is_some_and(|c| c == b'.')
        {
            self.pos += 1;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.peek_at(0), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek_at(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let digits_start = self.pos;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            if self.pos == digits_start {
                return Err(TokenizeError::new(mark, "malformed exponent in numeric literal"));
            }
        }
        if self
            .peek_at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            return Err(TokenizeError::new(
                start,
                format!("malformed numeric literal '{}'", self.slice(start)),
            ));
        }
        Ok((
            LexemeKind::Literal(LiteralKind::Numeric),
            self.slice(start).to_owned(),
        ))
    }

    // -----------------------------------------------------------------------
    // Words, keywords, phrase fusion
    // -----------------------------------------------------------------------

    fn scan_word(&mut self) {
        while self.pos < self.src.len() {
            let c = self.src[self.pos];
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn lex_word(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        // String-literal prefixes: E'...', U&'...'.
        let c = self.src[self.pos];
        if matches!(c, b'e' | b'E') && self.peek_at(1) == Some(b'\'') {
            self.pos += 1;
            self.lex_string_body(start)?;
            return Ok((
                LexemeKind::Literal(LiteralKind::String),
                self.slice(start).to_owned(),
            ));
        }
        if matches!(c, b'u' | b'U') && self.peek_at(1) == Some(b'&') && self.peek_at(2) == Some(b'\'')
        {
            self.pos += 2;
            self.lex_string_body(start)?;
            self.fold_uescape(start)?;
            return Ok((
                LexemeKind::Literal(LiteralKind::String),
                self.slice(start).to_owned(),
            ));
        }

        self.scan_word();
        let word = self.slice(start).to_ascii_lowercase();

        if is_keyword(&word) {
            return Ok(match word.as_str() {
                "true" | "false" => (LexemeKind::Literal(LiteralKind::Boolean), word),
                "null" => (LexemeKind::Literal(LiteralKind::Null), word),
                _ => (LexemeKind::Keyword, self.fuse_phrase(word)),
            });
        }

        // Identifier; an immediately following `(` marks a function name.
        let value = self.slice(start).to_owned();
        if self.peek_at(0) == Some(b'(') {
            Ok((LexemeKind::Function, value))
        } else {
            Ok((LexemeKind::Identifier, value))
        }
    }

    /// Fold an optional `UESCAPE '…'` suffix into the current literal.
    fn fold_uescape(&mut self, start: usize) -> Result<(), TokenizeError> {
        let mark = self.pos;
        let mut probe = self.pos;
        while probe < self.src.len() && self.src[probe].is_ascii_whitespace() {
            probe += 1;
        }
        let word_start = probe;
        while probe < self.src.len()
            && (self.src[probe].is_ascii_alphanumeric() || self.src[probe] == b'_')
        {
            probe += 1;
        }
        let word = String::from_utf8_lossy(&self.src[word_start..probe]).to_ascii_lowercase();
        if word != "uescape" {
            self.pos = mark;
            return Ok(());
        }
        self.pos = probe;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.peek_at(0) != Some(b'\'') {
            return Err(TokenizeError::new(
                start,
                "UESCAPE must be followed by a quoted escape character",
            ));
        }
        self.lex_string_body(self.pos)
    }

    /// Attempt multi-word phrase fusion by longest-match lookahead.
    ///
    /// Only plain whitespace may separate the words of a phrase; a comment
    /// between them suppresses fusion so it stays attached where written.
    fn fuse_phrase(&mut self, word: String) -> String {
        for phrase in phrases_starting_with(&word) {
            let mut probe = self.pos;
            let mut matched = true;
            for expected in &phrase[1..] {
                while probe < self.src.len() && self.src[probe].is_ascii_whitespace() {
                    probe += 1;
                }
                let word_start = probe;
                while probe < self.src.len()
                    && (self.src[probe].is_ascii_alphanumeric() || self.src[probe] == b'_')
                {
                    probe += 1;
                }
                let got =
                    String::from_utf8_lossy(&self.src[word_start..probe]).to_ascii_lowercase();
                if got != **expected {
                    matched = false;
                    break;
                }
            }
            if matched {
                self.pos = probe;
                return phrase.join(" ");
            }
        }
        word
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Lex `?` or `?NNN`.
    fn lex_question(&mut self) -> (LexemeKind, String) {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        (LexemeKind::Parameter, self.slice(start).to_owned())
    }

    /// Lex `:name`, or fall back to the `::` operator.
    fn lex_colon(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        if self.peek_at(1) == Some(b':') {
            return self.lex_operator(start);
        }
        self.pos += 1;
        let name_start = self.pos;
        self.scan_word();
        if self.pos == name_start {
            return Err(TokenizeError::new(start, "empty parameter name after ':'"));
        }
        Ok((LexemeKind::Parameter, self.slice(start).to_owned()))
    }

    /// Lex `@name`, or fall back to an operator.
    fn lex_at(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        if self
            .peek_at(1)
            .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
        {
            self.pos += 1;
            self.scan_word();
            return Ok((LexemeKind::Parameter, self.slice(start).to_owned()));
        }
        self.lex_operator(start)
    }

    /// Lex `$1`, `$name`, or a dollar-quoted string `$tag$...$tag$`.
    fn lex_dollar(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        let mut probe = self.pos + 1;
        while probe < self.src.len()
            && (self.src[probe].is_ascii_alphanumeric() || self.src[probe] == b'_')
        {
            probe += 1;
        }
        if self.src.get(probe) == Some(&b'$') {
            // Dollar-quoted string: find the matching closing tag.
            let tag = &self.src[self.pos..=probe];
            let body_start = probe + 1;
            let mut search = body_start;
            while search + tag.len() <= self.src.len() {
                if &self.src[search..search + tag.len()] == tag {
                    self.pos = search + tag.len();
                    return Ok((
                        LexemeKind::Literal(LiteralKind::String),
                        self.slice(start).to_owned(),
                    ));
                }
                search += 1;
            }
            return Err(TokenizeError::new(start, "unterminated dollar-quoted string"));
        }
        if probe == self.pos + 1 {
            return Err(TokenizeError::new(start, "unexpected character '$'"));
        }
        self.pos = probe;
        Ok((LexemeKind::Parameter, self.slice(start).to_owned()))
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    /// Maximal munch over the known operator spellings.
    fn lex_operator(&mut self, start: usize) -> Result<(LexemeKind, String), TokenizeError> {
        let rest = &self.src[self.pos..];
        for op in OPERATORS {
            if rest.starts_with(op.as_bytes()) {
                self.pos += op.len();
                return Ok((LexemeKind::Operator, (*op).to_owned()));
            }
        }
        let ch = self.src[self.pos] as char;
        Err(TokenizeError::new(
            start,
            format!("unexpected character '{ch}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<LexemeKind> {
        tokenize(sql).expect("tokenize").iter().map(|l| l.kind).collect()
    }

    fn values(sql: &str) -> Vec<String> {
        tokenize(sql)
            .expect("tokenize")
            .into_iter()
            .map(|l| l.value)
            .collect()
    }

    #[test]
    fn simple_select() {
        assert_eq!(
            values("SELECT * FROM users"),
            vec!["select", "*", "from", "users"]
        );
        assert_eq!(
            kinds("SELECT * FROM users"),
            vec![
                LexemeKind::Keyword,
                LexemeKind::Operator,
                LexemeKind::Keyword,
                LexemeKind::Identifier,
            ]
        );
    }

    #[test]
    fn keywords_fold_identifiers_keep_case() {
        let lexemes = tokenize("Select UserName FROM Accounts").expect("tokenize");
        assert_eq!(lexemes[0].value, "select");
        assert_eq!(lexemes[1].value, "UserName");
        assert_eq!(lexemes[3].value, "Accounts");
    }

    #[test]
    fn quoted_identifiers_bypass_keyword_detection() {
        let lexemes = tokenize("\"select\" `From` [Group]").expect("tokenize");
        assert_eq!(lexemes[0].kind, LexemeKind::Identifier);
        assert_eq!(lexemes[0].value, "select");
        assert_eq!(lexemes[1].kind, LexemeKind::Identifier);
        assert_eq!(lexemes[1].value, "From");
        assert_eq!(lexemes[2].kind, LexemeKind::Identifier);
        assert_eq!(lexemes[2].value, "Group");
    }

    #[test]
    fn doubled_quote_escape_in_identifier() {
        let lexemes = tokenize("\"a\"\"b\"").expect("tokenize");
        assert_eq!(lexemes[0].value, "a\"b");
    }

    #[test]
    fn phrase_fusion() {
        assert_eq!(
            values("GROUP BY x ORDER BY y"),
            vec!["group by", "x", "order by", "y"]
        );
        assert_eq!(values("a IS NOT DISTINCT FROM b"), vec![
            "a",
            "is not distinct from",
            "b"
        ]);
        assert_eq!(values("UNION ALL"), vec!["union all"]);
        assert_eq!(
            values("CAST(x AS TIMESTAMP WITHOUT TIME ZONE)"),
            vec![
                "cast",
                "(",
                "x",
                "as",
                "timestamp without time zone",
                ")"
            ]
        );
    }

    #[test]
    fn is_not_null_does_not_fuse() {
        assert_eq!(values("x IS NOT NULL"), vec!["x", "is", "not", "null"]);
    }

    #[test]
    fn fusion_spans_arbitrary_whitespace() {
        assert_eq!(values("group\n\t  by x"), vec!["group by", "x"]);
    }

    #[test]
    fn comment_between_phrase_words_suppresses_fusion() {
        let lexemes = tokenize("group /* c */ by x").expect("tokenize");
        assert_eq!(lexemes[0].value, "group");
        assert_eq!(lexemes[1].value, "by");
        assert_eq!(lexemes[1].comments, vec![Comment::block("c")]);
    }

    #[test]
    fn string_literals_keep_raw_text() {
        assert_eq!(values("'it''s'"), vec!["'it''s'"]);
        assert_eq!(values("E'a\\nb'"), vec!["E'a\\nb'"]);
        assert_eq!(values("U&'d\\0061t'"), vec!["U&'d\\0061t'"]);
        assert_eq!(
            values("U&'d!0061t' UESCAPE '!'"),
            vec!["U&'d!0061t' UESCAPE '!'"]
        );
        assert_eq!(values("$tag$not 'quoted'$tag$"), vec!["$tag$not 'quoted'$tag$"]);
        assert_eq!(values("$$x$$"), vec!["$$x$$"]);
    }

    #[test]
    fn numeric_literal_forms() {
        assert_eq!(values("1 2.5 .5 1e10 1.5E-3"), vec![
            "1", "2.5", ".5", "1e10", "1.5E-3"
        ]);
        let lexemes = tokenize(".5").expect("tokenize");
        assert_eq!(lexemes[0].kind, LexemeKind::Literal(LiteralKind::Numeric));
    }

    #[test]
    fn malformed_numeric_rejected() {
        let err = tokenize("1abc").expect_err("should fail");
        assert_eq!(err.offset, 0);
        let err = tokenize("1e").expect_err("should fail");
        assert!(err.message.contains("exponent"));
    }

    #[test]
    fn boolean_and_null_literals() {
        assert_eq!(
            kinds("true FALSE null"),
            vec![
                LexemeKind::Literal(LiteralKind::Boolean),
                LexemeKind::Literal(LiteralKind::Boolean),
                LexemeKind::Literal(LiteralKind::Null),
            ]
        );
        assert_eq!(values("TRUE"), vec!["true"]);
    }

    #[test]
    fn parameters() {
        assert_eq!(values(":userId @name $1 ? ?3 $foo"), vec![
            ":userId", "@name", "$1", "?", "?3", "$foo"
        ]);
        assert!(kinds(":userId @n $1 ? $f")
            .iter()
            .all(|k| *k == LexemeKind::Parameter));
    }

    #[test]
    fn double_colon_is_an_operator_not_a_parameter() {
        assert_eq!(values("x::int"), vec!["x", "::", "int"]);
        let lexemes = tokenize("x::int").expect("tokenize");
        assert_eq!(lexemes[1].kind, LexemeKind::Operator);
    }

    #[test]
    fn operator_maximal_munch() {
        assert_eq!(values("a<>b a!=b a||b a->>b"), vec![
            "a", "<>", "b", "a", "!=", "b", "a", "||", "b", "a", "->>", "b"
        ]);
    }

    #[test]
    fn function_kind_requires_immediate_paren() {
        let lexemes = tokenize("count(x) count (x)").expect("tokenize");
        assert_eq!(lexemes[0].kind, LexemeKind::Function);
        assert_eq!(lexemes[4].kind, LexemeKind::Identifier);
    }

    #[test]
    fn comments_attach_to_next_lexeme() {
        let lexemes = tokenize("-- leading\nSELECT /* mid */ x").expect("tokenize");
        assert_eq!(lexemes[0].comments, vec![Comment::line("leading")]);
        assert_eq!(lexemes[1].comments, vec![Comment::block("mid")]);
    }

    #[test]
    fn trailing_comment_attaches_to_last_lexeme() {
        let lexemes = tokenize("SELECT x -- done").expect("tokenize");
        assert_eq!(lexemes[1].comments, vec![Comment::line("done")]);
    }

    #[test]
    fn nested_block_comments() {
        let lexemes = tokenize("/* a /* b */ c */ x").expect("tokenize");
        assert_eq!(lexemes[0].comments, vec![Comment::block("a /* b */ c")]);
    }

    #[test]
    fn unterminated_inputs_error() {
        assert!(tokenize("'abc").is_err());
        assert!(tokenize("\"abc").is_err());
        assert!(tokenize("/* abc").is_err());
        assert!(tokenize("$tag$abc").is_err());
    }

    #[test]
    fn array_bracket_disambiguation() {
        let lexemes = tokenize("ARRAY[1, 2]").expect("tokenize");
        assert_eq!(lexemes[1].kind, LexemeKind::OpenBracket);
        assert_eq!(lexemes[5].kind, LexemeKind::CloseBracket);
    }

    #[test]
    fn spans_cover_source() {
        let lexemes = tokenize("select x").expect("tokenize");
        assert_eq!(lexemes[0].span, Span::new(0, 6));
        assert_eq!(lexemes[1].span, Span::new(7, 8));
    }
}
