//! The parser (C4): token stream → AST.
//!
//! Grounded on `original_source/MyScript/Parser.hpp`'s recursive-descent
//! structure, reworked around a three-valued [`ParseResult`] instead of the
//! original's mix of null returns and boolean flags — `SPEC_FULL.md` section
//! 9 calls this out explicitly as the discipline worth preserving, not the
//! original's exact return-value shape.

pub mod ast;
pub mod expr;
pub mod stmt;

pub use ast::*;

use mscript_lex::{Lexer, Token, TokenKind};
use mscript_util::{Arena, DiagnosticBuilder, Handler, Interner, Span};

/// The outcome of one parser production, per `SPEC_FULL.md` section 4.2 /
/// section 9 ("Three-valued parse result").
pub enum ParseResult<T> {
    /// AST produced, input advanced past it.
    Success(T),
    /// The first token didn't match this production; input unchanged.
    /// Caller may try an alternative production.
    NotMine,
    /// Committed to this production but the input was invalid; an error has
    /// already been reported. Callers must not retry another production.
    Error,
}

impl<T> ParseResult<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, ParseResult::Error)
    }

    pub fn is_not_mine(&self) -> bool {
        matches!(self, ParseResult::NotMine)
    }
}

/// Saved lexer + lookahead state, for the call-vs-name scanner rewind
/// (`SPEC_FULL.md` 4.2).
struct SavedState<'a> {
    current: Token<'a>,
    position: usize,
    line: u32,
    column: u32,
}

pub struct Parser<'a, 'h, 'i> {
    lexer: Lexer<'a, 'h>,
    current: Token<'a>,
    prev_span: Span,
    arena: &'a Arena,
    interner: &'i mut Interner,
}

impl<'a, 'h, 'i> Parser<'a, 'h, 'i> {
    pub fn new(
        source: &'a str,
        handler: &'h mut Handler,
        arena: &'a Arena,
        interner: &'i mut Interner,
    ) -> Self {
        let mut lexer = Lexer::new(source, handler);
        let current = Self::next_significant(&mut lexer);
        Self {
            lexer,
            current,
            prev_span: Span::DUMMY,
            arena,
            interner,
        }
    }

    /// Parses a whole source file: statements, function definitions, and
    /// imports until end of input (`SPEC_FULL.md` 4.2, "Top level").
    pub fn parse_program(&mut self) -> Option<Program<'a>> {
        let mut items = Vec::new();
        while !self.at_eof() {
            match self.parse_item() {
                ParseResult::Success(item) => items.push(item),
                ParseResult::Error => return None,
                ParseResult::NotMine => {
                    self.error_here("statement expected");
                    return None;
                }
            }
        }
        Some(Program {
            items: self.alloc_slice(items),
        })
    }

    fn parse_item(&mut self) -> ParseResult<Item<'a>> {
        if self.at_keyword("function") {
            return match self.parse_function() {
                ParseResult::Success(f) => ParseResult::Success(Item::Function(f)),
                ParseResult::Error => ParseResult::Error,
                ParseResult::NotMine => ParseResult::NotMine,
            };
        }
        if self.at_keyword("import") {
            return self.parse_import();
        }
        match self.parse_statement() {
            ParseResult::Success(s) => ParseResult::Success(Item::Statement(s)),
            ParseResult::Error => ParseResult::Error,
            ParseResult::NotMine => ParseResult::NotMine,
        }
    }

    fn parse_import(&mut self) -> ParseResult<Item<'a>> {
        let start = self.current.span;
        self.bump(); // 'import'
        if self.current.kind != TokenKind::String {
            self.error_here("string literal expected after 'import'");
            return ParseResult::Error;
        }
        let raw = self.current.text;
        let path: &'a str = self.arena.alloc_str(raw);
        self.bump();
        if !self.eat_punct(";") {
            self.error_here("';' expected");
            return ParseResult::Error;
        }
        ParseResult::Success(Item::Import {
            path,
            span: start.to(self.prev_span),
        })
    }

    // --- token-stream plumbing -------------------------------------------

    fn next_significant(lexer: &mut Lexer<'a, 'h>) -> Token<'a> {
        loop {
            let tok = lexer.next_token();
            if !matches!(tok.kind, TokenKind::Whitespace | TokenKind::Comment) {
                return tok;
            }
        }
    }

    /// Consumes `self.current`, returning it, and loads the next token.
    fn bump(&mut self) -> Token<'a> {
        let prev = self.current;
        self.prev_span = prev.span;
        self.current = Self::next_significant(&mut self.lexer);
        prev
    }

    fn at_eof(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn at_keyword(&self, text: &str) -> bool {
        self.current.kind == TokenKind::Keyword && self.current.text == text
    }

    fn at_punct(&self, text: &str) -> bool {
        self.current.kind == TokenKind::Punctuation && self.current.text == text
    }

    /// True if the current token is an infix operator — either a lexical
    /// `Operator` token, or an `Identifier` token spelling `and`/`or`
    /// (`SPEC_FULL.md` section 6: these two words are reserved syntactically
    /// but are not keywords, so the lexer yields them as plain identifiers;
    /// only the parser knows they double as operators).
    fn current_operator(&self) -> Option<mscript_util::MSOperator> {
        if self.current.kind == TokenKind::Operator {
            return mscript_util::OPERATORS
                .iter()
                .copied()
                .find(|op| op.text() == self.current.text);
        }
        if self.current.kind == TokenKind::Identifier {
            return match self.current.text {
                "and" => Some(mscript_util::MSOperator::And),
                "or" => Some(mscript_util::MSOperator::Or),
                _ => None,
            };
        }
        None
    }

    /// Matches a reserved-but-not-keyword word (`then`, `do`) by text against
    /// an `Identifier`-kind token, since the lexer never classifies these as
    /// `Keyword` (`SPEC_FULL.md` section 6).
    fn at_word(&self, text: &str) -> bool {
        self.current.kind == TokenKind::Identifier && self.current.text == text
    }

    fn expect_word(&mut self, text: &str) -> bool {
        if self.at_word(text) {
            self.bump();
            true
        } else {
            self.error_here(&format!("'{text}' expected"));
            false
        }
    }

    fn expect_keyword(&mut self, text: &str) -> bool {
        if self.eat_keyword(text) {
            true
        } else {
            self.error_here(&format!("'{text}' expected"));
            false
        }
    }

    fn eat_keyword(&mut self, text: &str) -> bool {
        if self.at_keyword(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        if self.at_punct(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, text: &str) -> bool {
        if self.eat_punct(text) {
            true
        } else {
            self.error_here(&format!("'{text}' expected"));
            false
        }
    }

    fn error_here(&mut self, message: &str) {
        DiagnosticBuilder::error(message.to_string())
            .span(self.current.span)
            .emit(self.lexer.handler_mut());
    }

    fn intern(&mut self, text: &str) -> mscript_util::Symbol {
        mscript_util::Symbol::intern(self.interner, text)
    }

    fn alloc_slice<T>(&self, items: Vec<T>) -> &'a [T] {
        mscript_util::arena::alloc_slice(self.arena, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_util::{Interner, MSOperator, MSType};

    fn parse(src: &str) -> (Option<Program<'_>>, bool) {
        // Arena/handler/interner are leaked for the test's duration so the
        // returned `Program<'_>` can still borrow from them; acceptable only
        // in test code, never in library code.
        let arena: &'static Arena = Box::leak(Box::new(Arena::new()));
        let handler: &'static mut Handler = Box::leak(Box::new(Handler::new()));
        let interner: &'static mut Interner = Box::leak(Box::new(Interner::new()));
        let mut parser = Parser::new(src, handler, arena, interner);
        let program = parser.parse_program();
        (program, parser.lexer.handler_mut().has_errors())
    }

    #[test]
    fn hello_string_function_parses() {
        let (program, has_errors) = parse(
            r#"function GetAuthorName() : string
                 return "Alice";
               end"#,
        );
        assert!(!has_errors);
        let items = program.unwrap().items;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Item::Function(Function { return_type: MSType::String, .. })));
    }

    #[test]
    fn precedence_groups_multiply_tighter_than_add() {
        let (program, has_errors) = parse("function f() : int return 1 + 2 * 3; end");
        assert!(!has_errors);
        let items = program.unwrap().items;
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        let Stmt::Return { expr, .. } = &f.body[0] else { panic!("expected return") };
        match expr {
            Expr::BinaryOp(MSOperator::Add, lhs, rhs, _) => {
                assert!(matches!(**lhs, Expr::Integer(1, _)));
                assert!(matches!(**rhs, Expr::BinaryOp(MSOperator::Multiply, _, _, _)));
            }
            _ => panic!("expected top-level Add"),
        }
    }

    #[test]
    fn and_or_identifiers_parse_as_operators() {
        let (program, has_errors) =
            parse("function f() : bool return true and false or true; end");
        assert!(!has_errors);
        let items = program.unwrap().items;
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        let Stmt::Return { expr, .. } = &f.body[0] else { panic!("expected return") };
        assert!(matches!(expr, Expr::BinaryOp(MSOperator::Or, _, _, _)));
    }

    #[test]
    fn while_with_break_parses_full_body() {
        let (program, has_errors) = parse(
            r#"function h() : int
                 int i = 0;
                 while (i < 10) do
                   if (i == 5) then break; end
                   i = i + 1;
                 end
                 return i;
               end"#,
        );
        assert!(!has_errors);
        let items = program.unwrap().items;
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        assert_eq!(f.body.len(), 3);
        assert!(matches!(f.body[1], Stmt::While { .. }));
    }

    #[test]
    fn declaration_without_initializer_is_rejected() {
        let (program, has_errors) = parse("function f() : int int x; return x; end");
        assert!(has_errors);
        assert!(program.is_none());
    }

    #[test]
    fn call_vs_name_disambiguation() {
        let (program, has_errors) = parse("function f() : int return g(1, 2); end");
        assert!(!has_errors);
        let items = program.unwrap().items;
        let Item::Function(f) = &items[0] else { panic!("expected function") };
        let Stmt::Return { expr, .. } = &f.body[0] else { panic!("expected return") };
        match expr {
            Expr::Call(call) => assert_eq!(call.args.len(), 2),
            _ => panic!("expected call expression"),
        }
    }

    #[test]
    fn missing_closing_quote_reports_error_not_panic() {
        let (program, has_errors) = parse(r#"function f() : string return "abc; end"#);
        assert!(has_errors);
        assert!(program.is_none());
    }

    const ALL_OPERATORS: &[MSOperator] = &[
        MSOperator::Add,
        MSOperator::Subtract,
        MSOperator::Multiply,
        MSOperator::Divide,
        MSOperator::Modulo,
        MSOperator::And,
        MSOperator::Or,
        MSOperator::Equality,
        MSOperator::Inequality,
        MSOperator::Greater,
        MSOperator::Lesser,
        MSOperator::GreaterEqual,
        MSOperator::LesserEqual,
    ];

    /// Two arbitrary binary operators, for the precedence-climbing property
    /// below — indices are reduced mod `ALL_OPERATORS.len()` so every
    /// `quickcheck::Gen` output lands on a real operator.
    #[derive(Clone, Debug)]
    struct OperatorPair(MSOperator, MSOperator);

    impl quickcheck::Arbitrary for OperatorPair {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let i = usize::arbitrary(g) % ALL_OPERATORS.len();
            let j = usize::arbitrary(g) % ALL_OPERATORS.len();
            OperatorPair(ALL_OPERATORS[i], ALL_OPERATORS[j])
        }
    }

    /// `a op1 b op2 c` groups as `(a op1 b) op2 c` when
    /// `precedence(op1) >= precedence(op2)`, else as `a op1 (b op2 c)` —
    /// the invariant `parse_expression`'s strict `>` floor check is meant to
    /// guarantee for every operator pair, not just the `+`/`*` case the
    /// unit test above already covers.
    #[quickcheck_macros::quickcheck]
    fn precedence_climbing_groups_by_relative_precedence(pair: OperatorPair) -> bool {
        let OperatorPair(op1, op2) = pair;
        let src = format!(
            "function f() : bool return a {} b {} c; end",
            op1.text(),
            op2.text()
        );
        let (program, has_errors) = parse(&src);
        if has_errors {
            return false;
        }
        let Some(program) = program else { return false };
        let Item::Function(f) = &program.items[0] else { return false };
        let Stmt::Return { expr, .. } = &f.body[0] else { return false };

        match expr {
            Expr::BinaryOp(top_op, lhs, rhs, _) if op1.precedence() >= op2.precedence() => {
                *top_op == op2
                    && matches!(**lhs, Expr::BinaryOp(o, _, _, _) if o == op1)
                    && matches!(**rhs, Expr::Name(_, _))
            }
            Expr::BinaryOp(top_op, lhs, rhs, _) => {
                *top_op == op1
                    && matches!(**lhs, Expr::Name(_, _))
                    && matches!(**rhs, Expr::BinaryOp(o, _, _, _) if o == op2)
            }
            _ => false,
        }
    }
}
