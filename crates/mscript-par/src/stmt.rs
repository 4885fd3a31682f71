//! Statement, function, and parameter-list parsing.
//!
//! Grounded on `SPEC_FULL.md` section 4.2 / the grammar in section 6.
//! Statements are tried in order — call, assignment, if, while, return,
//! break, continue — with each production committing as soon as its leading
//! keyword or distinctive token is seen.

use mscript_lex::TokenKind;
use mscript_util::MSType;

use crate::ast::{Function, Param, Stmt};
use crate::{ParseResult, Parser};

impl<'a, 'h, 'i> Parser<'a, 'h, 'i> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt<'a>> {
        if let Some(ty) = self.peek_type_keyword() {
            return self.parse_declaration(ty);
        }
        if self.at_keyword("if") {
            return self.parse_if();
        }
        if self.at_keyword("while") {
            return self.parse_while();
        }
        if self.at_keyword("return") {
            return self.parse_return();
        }
        if self.at_keyword("break") {
            let span = self.current.span;
            self.bump();
            if !self.expect_punct(";") {
                return ParseResult::Error;
            }
            return ParseResult::Success(Stmt::Break(span));
        }
        if self.at_keyword("continue") {
            let span = self.current.span;
            self.bump();
            if !self.expect_punct(";") {
                return ParseResult::Error;
            }
            return ParseResult::Success(Stmt::Continue(span));
        }
        if self.current.kind == TokenKind::Identifier {
            return self.parse_call_or_reassignment();
        }
        ParseResult::NotMine
    }

    fn peek_type_keyword(&self) -> Option<MSType> {
        if self.current.kind != TokenKind::Keyword {
            return None;
        }
        MSType::from_keyword(self.current.text)
    }

    /// `<type> <name> = <expr>;` — declaration with initializer. A
    /// declaration without one (`<type> <name>;`) is rejected with
    /// "'=' expected", matching `SPEC_FULL.md` 4.2 exactly (not supported).
    fn parse_declaration(&mut self, ty: MSType) -> ParseResult<Stmt<'a>> {
        let span = self.current.span;
        self.bump(); // type keyword

        if self.current.kind != TokenKind::Identifier {
            self.error_here("variable name expected");
            return ParseResult::Error;
        }
        let name = self.intern(self.current.text);
        self.bump();

        if !self.expect_punct("=") {
            return ParseResult::Error;
        }
        let expr = match self.parse_expression(0) {
            ParseResult::Success(e) => e,
            ParseResult::NotMine => {
                self.error_here("expression expected");
                return ParseResult::Error;
            }
            ParseResult::Error => return ParseResult::Error,
        };
        if !self.expect_punct(";") {
            return ParseResult::Error;
        }
        ParseResult::Success(Stmt::Assignment {
            name,
            declared_type: ty,
            expr,
            span,
        })
    }

    /// `call := ident '(' ... ')' ';'` as a statement, or `<name> = <expr>;`
    /// re-assignment (`declared_type` is `Void`, marking "already declared").
    fn parse_call_or_reassignment(&mut self) -> ParseResult<Stmt<'a>> {
        let span = self.current.span;
        let expr = match self.parse_expression(0) {
            ParseResult::Success(e) => e,
            ParseResult::NotMine => return ParseResult::NotMine,
            ParseResult::Error => return ParseResult::Error,
        };

        if self.at_punct("=") {
            let name = match expr {
                crate::ast::Expr::Name(name, _) => name,
                _ => {
                    self.error_here("assignment target must be a name");
                    return ParseResult::Error;
                }
            };
            self.bump(); // '='
            let rhs = match self.parse_expression(0) {
                ParseResult::Success(e) => e,
                ParseResult::NotMine => {
                    self.error_here("expression expected");
                    return ParseResult::Error;
                }
                ParseResult::Error => return ParseResult::Error,
            };
            if !self.expect_punct(";") {
                return ParseResult::Error;
            }
            return ParseResult::Success(Stmt::Assignment {
                name,
                declared_type: MSType::Void,
                expr: rhs,
                span,
            });
        }

        match expr {
            crate::ast::Expr::Call(call) => {
                if !self.expect_punct(";") {
                    return ParseResult::Error;
                }
                ParseResult::Success(Stmt::Call(call))
            }
            _ => {
                self.error_here("';' expected");
                ParseResult::Error
            }
        }
    }

    /// `if := 'if' '(' expr ')' 'then' stmt* ('else' stmt*)? 'end'`.
    fn parse_if(&mut self) -> ParseResult<Stmt<'a>> {
        let span = self.current.span;
        self.bump(); // 'if'
        if !self.expect_punct("(") {
            return ParseResult::Error;
        }
        let cond = match self.parse_expression(0) {
            ParseResult::Success(e) => e,
            ParseResult::NotMine => {
                self.error_here("condition expression expected");
                return ParseResult::Error;
            }
            ParseResult::Error => return ParseResult::Error,
        };
        if !self.expect_punct(")") {
            return ParseResult::Error;
        }
        if !self.expect_word("then") {
            return ParseResult::Error;
        }
        let then_body = match self.parse_block(&["else", "end"]) {
            Some(b) => b,
            None => return ParseResult::Error,
        };
        let else_body = if self.eat_keyword("else") {
            match self.parse_block(&["end"]) {
                Some(b) => b,
                None => return ParseResult::Error,
            }
        } else {
            Vec::new()
        };
        if !self.expect_keyword("end") {
            return ParseResult::Error;
        }
        ParseResult::Success(Stmt::If {
            cond,
            then_body: self.alloc_slice(then_body),
            else_body: self.alloc_slice(else_body),
            span,
        })
    }

    /// `while := 'while' '(' expr ')' 'do' stmt* 'end'`.
    fn parse_while(&mut self) -> ParseResult<Stmt<'a>> {
        let span = self.current.span;
        self.bump(); // 'while'
        if !self.expect_punct("(") {
            return ParseResult::Error;
        }
        let cond = match self.parse_expression(0) {
            ParseResult::Success(e) => e,
            ParseResult::NotMine => {
                self.error_here("condition expression expected");
                return ParseResult::Error;
            }
            ParseResult::Error => return ParseResult::Error,
        };
        if !self.expect_punct(")") {
            return ParseResult::Error;
        }
        if !self.expect_word("do") {
            return ParseResult::Error;
        }
        let body = match self.parse_block(&["end"]) {
            Some(b) => b,
            None => return ParseResult::Error,
        };
        if !self.expect_keyword("end") {
            return ParseResult::Error;
        }
        ParseResult::Success(Stmt::While {
            cond,
            body: self.alloc_slice(body),
            span,
        })
    }

    /// `return := 'return' expr ';'` — the expression is mandatory; there is
    /// no bare `return;` form in this grammar.
    fn parse_return(&mut self) -> ParseResult<Stmt<'a>> {
        let span = self.current.span;
        self.bump(); // 'return'
        let expr = match self.parse_expression(0) {
            ParseResult::Success(e) => e,
            ParseResult::NotMine => {
                self.error_here("expression expected after 'return'");
                return ParseResult::Error;
            }
            ParseResult::Error => return ParseResult::Error,
        };
        if !self.expect_punct(";") {
            return ParseResult::Error;
        }
        ParseResult::Success(Stmt::Return { expr, span })
    }

    /// Parses statements until a keyword in `terminators` is reached (or
    /// end of input, which is always an error here).
    fn parse_block(&mut self, terminators: &[&str]) -> Option<Vec<Stmt<'a>>> {
        let mut body = Vec::new();
        while !terminators.iter().any(|t| self.at_keyword(t)) {
            if self.at_eof() {
                self.error_here("'end' expected");
                return None;
            }
            match self.parse_statement() {
                ParseResult::Success(s) => body.push(s),
                ParseResult::Error => return None,
                ParseResult::NotMine => {
                    self.error_here("statement expected");
                    return None;
                }
            }
        }
        Some(body)
    }

    /// `function := 'function' ident '(' params? ')' (':' type)? stmt* 'end'`.
    /// Omitted return-type annotation defaults to `Void`.
    pub(crate) fn parse_function(&mut self) -> ParseResult<Function<'a>> {
        let span = self.current.span;
        self.bump(); // 'function'

        if self.current.kind != TokenKind::Identifier {
            self.error_here("function name expected");
            return ParseResult::Error;
        }
        let name = self.intern(self.current.text);
        self.bump();

        if !self.expect_punct("(") {
            return ParseResult::Error;
        }
        let params = match self.parse_params() {
            Some(p) => p,
            None => return ParseResult::Error,
        };
        if !self.expect_punct(")") {
            return ParseResult::Error;
        }

        let return_type = if self.eat_punct(":") {
            match self.peek_type_keyword() {
                Some(ty) => {
                    self.bump();
                    ty
                }
                None => {
                    self.error_here("return type expected");
                    return ParseResult::Error;
                }
            }
        } else {
            MSType::Void
        };

        let body = match self.parse_block(&["end"]) {
            Some(b) => b,
            None => return ParseResult::Error,
        };
        if !self.expect_keyword("end") {
            return ParseResult::Error;
        }

        ParseResult::Success(Function {
            name,
            return_type,
            params: self.alloc_slice(params),
            body: self.alloc_slice(body),
            span,
        })
    }

    /// `params := type ident (',' type ident)*`, called with `current`
    /// already positioned just past the opening `(`.
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        if self.at_punct(")") {
            return Some(params);
        }
        loop {
            let ty = match self.peek_type_keyword() {
                Some(ty) => {
                    self.bump();
                    ty
                }
                None => {
                    self.error_here("parameter type expected");
                    return None;
                }
            };
            if self.current.kind != TokenKind::Identifier {
                self.error_here("parameter name expected");
                return None;
            }
            let name = self.intern(self.current.text);
            self.bump();
            params.push(Param { ty, name });
            if !self.eat_punct(",") {
                break;
            }
        }
        Some(params)
    }
}
