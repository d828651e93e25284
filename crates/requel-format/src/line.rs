//! Stage 2: the line printer.
//!
//! Walks the print-token tree with an explicit work stack (no recursion,
//! so input depth cannot exhaust the native stack) and applies the
//! presentation options: newline string, indentation, keyword case, and
//! the comma/AND break styles.
//!
//! The default newline of `" "` keeps the whole statement on one line;
//! any other newline opts into pretty printing. A container flagged
//! `oneline` is rendered through a nested printer with the newline forced
//! back to `" "`, which is how the CTE one-liner policy is implemented.

use crate::print::{ContainerKind, PrintToken, PrintTokenKind};
use crate::{BreakStyle, KeywordCase, ResolvedOptions};

/// Containers that start on a fresh line in pretty mode.
const fn breaks_before(kind: ContainerKind) -> bool {
    matches!(
        kind,
        ContainerKind::SelectClause
            | ContainerKind::FromClause
            | ContainerKind::JoinClause
            | ContainerKind::WhereClause
            | ContainerKind::GroupByClause
            | ContainerKind::HavingClause
            | ContainerKind::WindowClause
            | ContainerKind::OrderByClause
            | ContainerKind::LimitClause
            | ContainerKind::OffsetClause
            | ContainerKind::ForClause
            | ContainerKind::WithClause
            | ContainerKind::CommonTable
            | ContainerKind::CteImport
            | ContainerKind::Values
            | ContainerKind::SetOperator
            | ContainerKind::CaseBranch
    )
}

/// Indent increment a container applies to its children. Clause
/// containers stay at their caller's level (their continuation breaks
/// indent one deeper at break time); nesting structures indent.
const fn indent_delta(kind: ContainerKind) -> usize {
    match kind {
        ContainerKind::WithClause
        | ContainerKind::SubQuery
        | ContainerKind::CaseExpression => 1,
        ContainerKind::Query
        | ContainerKind::SelectClause
        | ContainerKind::FromClause
        | ContainerKind::JoinClause
        | ContainerKind::WhereClause
        | ContainerKind::GroupByClause
        | ContainerKind::HavingClause
        | ContainerKind::WindowClause
        | ContainerKind::OrderByClause
        | ContainerKind::LimitClause
        | ContainerKind::OffsetClause
        | ContainerKind::ForClause
        | ContainerKind::Values
        | ContainerKind::CommonTable
        | ContainerKind::CteImport
        | ContainerKind::SetOperator
        | ContainerKind::CaseBranch => 0,
    }
}

pub(crate) struct LinePrinter<'a> {
    opts: &'a ResolvedOptions,
    out: String,
    /// Pending line break and its indent level.
    pending_break: Option<usize>,
    /// The previous leaf suppressed the following space.
    prev_glue_right: bool,
    /// The previous leaf was a comment; the next leaf must be spaced.
    prev_was_comment: bool,
}

impl<'a> LinePrinter<'a> {
    pub(crate) fn new(opts: &'a ResolvedOptions) -> Self {
        Self {
            opts,
            out: String::new(),
            pending_break: None,
            prev_glue_right: false,
            prev_was_comment: false,
        }
    }

    fn pretty(&self) -> bool {
        self.opts.newline != " "
    }

    pub(crate) fn render(mut self, root: &PrintToken) -> String {
        let mut stack: Vec<(&PrintToken, usize)> = vec![(root, 0)];
        while let Some((token, level)) = stack.pop() {
            match &token.kind {
                PrintTokenKind::Container { kind, oneline } => {
                    if self.pretty() && breaks_before(*kind) && !self.out.is_empty() {
                        self.pending_break = Some(level);
                    }
                    if *oneline && self.pretty() {
                        let chunk = self.render_oneline(token);
                        self.append_text(&chunk, false, false, false);
                        continue;
                    }
                    let child_level = level + indent_delta(*kind);
                    for child in token.children.iter().rev() {
                        stack.push((child, child_level));
                    }
                }
                PrintTokenKind::Break { back } => {
                    if self.pretty() {
                        self.pending_break = Some(level.saturating_sub(usize::from(*back)));
                    }
                }
                _ => self.append_leaf(token, level),
            }
        }
        self.out
    }

    /// Render a subtree on a single line via a nested printer with the
    /// newline forced to `" "`.
    fn render_oneline(&self, token: &PrintToken) -> String {
        let mut opts = self.opts.clone();
        opts.newline = " ".to_owned();
        LinePrinter::new(&opts).render(token)
    }

    fn append_leaf(&mut self, token: &PrintToken, level: usize) {
        let text = match &token.kind {
            PrintTokenKind::Keyword { .. } => match self.opts.keyword_case {
                KeywordCase::Upper => token.text.to_uppercase(),
                KeywordCase::Lower | KeywordCase::None => token.text.clone(),
            },
            PrintTokenKind::Comment => format!("/* {} */", token.text),
            _ => token.text.clone(),
        };

        // Comma and AND breaks, relative to the token itself.
        let break_before_token = match &token.kind {
            PrintTokenKind::Comma { breakable: true } => {
                self.opts.comma_break == BreakStyle::Before
            }
            PrintTokenKind::Keyword { breakable: true } => {
                self.opts.and_break == BreakStyle::Before
            }
            _ => false,
        };
        let break_after_token = match &token.kind {
            PrintTokenKind::Comma { breakable: true } => {
                self.opts.comma_break == BreakStyle::After
            }
            PrintTokenKind::Keyword { breakable: true } => {
                self.opts.and_break == BreakStyle::After
            }
            _ => false,
        };

        // Comma/AND continuation lines sit one level deeper than the
        // clause line they continue.
        if break_before_token && self.pretty() && !self.out.is_empty() {
            self.pending_break = Some(level + 1);
        }

        let force_space = self.prev_was_comment;
        self.append_text(&text, token.glue_left, token.glue_right, force_space);
        self.prev_was_comment = matches!(token.kind, PrintTokenKind::Comment);

        if break_after_token && self.pretty() {
            self.pending_break = Some(level + 1);
        }
    }

    fn append_text(&mut self, text: &str, glue_left: bool, glue_right: bool, force_space: bool) {
        if text.is_empty() {
            return;
        }
        // pending_break is only ever set in pretty mode.
        if let Some(break_level) = self.pending_break.take() {
            if !self.out.is_empty() {
                self.out.push_str(&self.opts.newline);
                let indent = self
                    .opts
                    .indent_char
                    .to_string()
                    .repeat(self.opts.indent_size * break_level);
                self.out.push_str(&indent);
            }
        } else if !self.out.is_empty() && (force_space || (!self.prev_glue_right && !glue_left)) {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.prev_glue_right = glue_right;
    }
}
