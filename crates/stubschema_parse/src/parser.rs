//! Recursive descent parser over the token stream.
//!
//! Function definitions and expression statements are parsed into the
//! syntax tree. Everything else is skipped a logical line (or block) at a
//! time and recorded as [`Statement::Other`].

use crate::ast::{Constant, Expr, FunctionDef, Module, Param, ParamKind, Statement};
use crate::lexer::{tokenize, Number, StrFlavor, Token, TokenKind};
use stubschema_core::{CheckResult, Diagnostic};

/// Reserved words that can never be used as names
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const COMPARISON_OPS: &[&str] = &["==", "!=", "<", ">", "<=", ">="];

/// Parse a whole source file
///
/// # Errors
///
/// Returns a `SyntaxError` diagnostic when the source is malformed or
/// nests deeper than `max_depth`
pub fn parse_module(source: &str, max_depth: usize) -> CheckResult<Module> {
    let tokens = tokenize(source)?;
    Parser::new(tokens, max_depth).module()
}

/// Parse a standalone expression such as a type annotation
///
/// # Errors
///
/// Returns a `SyntaxError` diagnostic unless the whole text is exactly one
/// expression
pub fn parse_expression(text: &str, max_depth: usize) -> CheckResult<Expr> {
    let tokens = tokenize(text.trim())?;
    let mut parser = Parser::new(tokens, max_depth);
    let expr = parser.expression()?;
    parser.eat(&TokenKind::Newline);
    if !parser.at(&TokenKind::EndOfFile) {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

/// Parser state
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a parser over a token stream ending in `EndOfFile`
    #[must_use]
    pub fn new(tokens: Vec<Token>, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn kind(&self) -> &TokenKind {
        self.peek().map_or(&TokenKind::EndOfFile, |t| &t.kind)
    }

    fn kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(&TokenKind::EndOfFile, |t| &t.kind)
    }

    fn line(&self) -> usize {
        self.peek().map_or(0, |t| t.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.kind(), TokenKind::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.kind(), TokenKind::Name(n) if n == word)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> Diagnostic {
        let (line, column) = self.peek().map_or((0, 0), |t| (t.line, t.column));
        Diagnostic::syntax(line, column, message)
    }

    fn unexpected(&self) -> Diagnostic {
        let what = match self.kind() {
            TokenKind::Name(n) => format!("'{}'", n),
            TokenKind::Number(_) => "number".to_string(),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Op(op) => format!("'{}'", op),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::EndOfFile => "end of input".to_string(),
        };
        self.error(format!("invalid syntax, unexpected {}", what))
    }

    fn expect_op(&mut self, op: &str) -> CheckResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", op)))
        }
    }

    fn expect_name(&mut self) -> CheckResult<String> {
        match self.kind() {
            TokenKind::Name(n) if !KEYWORDS.contains(&n.as_str()) => {
                let name = n.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn enter(&mut self) -> CheckResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Charge one link of an operator or trailer chain. Chains build
    /// left-nested trees, so each link counts as a level until `release`.
    fn link(&mut self, links: &mut usize) -> CheckResult<()> {
        self.enter()?;
        *links += 1;
        Ok(())
    }

    fn release(&mut self, links: usize) {
        self.depth = self.depth.saturating_sub(links);
    }

    // ---- statements ----

    /// Parse the module body
    ///
    /// # Errors
    ///
    /// Returns a `SyntaxError` diagnostic on malformed input
    pub fn module(&mut self) -> CheckResult<Module> {
        let mut body = Vec::new();
        while !self.at(&TokenKind::EndOfFile) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            if self.at(&TokenKind::Indent) {
                return Err(self.error("unexpected indent"));
            }
            if self.at(&TokenKind::Dedent) {
                return Err(self.unexpected());
            }
            body.extend(self.statement()?);
        }
        Ok(Module { body })
    }

    fn statement(&mut self) -> CheckResult<Vec<Statement>> {
        if self.at_keyword("def") {
            return Ok(vec![Statement::FunctionDef(self.function_def()?)]);
        }
        self.simple_statements()
    }

    fn function_def(&mut self) -> CheckResult<FunctionDef> {
        let line = self.line();
        self.pos += 1;
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let params = self.parameters()?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect_op(":")?;
        let body = self.suite(line)?;
        Ok(FunctionDef {
            name,
            params,
            returns,
            body,
            line,
        })
    }

    fn suite(&mut self, header_line: usize) -> CheckResult<Vec<Statement>> {
        if !self.eat(&TokenKind::Newline) {
            return self.simple_statements();
        }
        if !self.eat(&TokenKind::Indent) {
            return Err(self.error(format!(
                "expected an indented block after function definition on line {}",
                header_line
            )));
        }
        let mut body = Vec::new();
        while !self.at(&TokenKind::Dedent) && !self.at(&TokenKind::EndOfFile) {
            if self.at(&TokenKind::Indent) {
                return Err(self.error("unexpected indent"));
            }
            body.extend(self.statement()?);
        }
        self.eat(&TokenKind::Dedent);
        Ok(body)
    }

    fn parameters(&mut self) -> CheckResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        let mut seen_slash = false;
        let mut seen_star = false;
        let mut seen_default = false;

        while !self.at_op(")") {
            if self.eat_op("/") {
                if seen_slash || seen_star || params.is_empty() {
                    return Err(self.error("invalid '/' in parameter list"));
                }
                for param in &mut params {
                    param.kind = ParamKind::PositionalOnly;
                }
                seen_slash = true;
            } else if self.eat_op("**") {
                let name = self.expect_name()?;
                let annotation = self.annotation()?;
                params.push(Param {
                    name,
                    kind: ParamKind::VarKeyword,
                    annotation,
                    default: None,
                });
                self.eat_op(",");
                if !self.at_op(")") {
                    return Err(self.error("arguments cannot follow var-keyword argument"));
                }
                break;
            } else if self.eat_op("*") {
                if seen_star {
                    return Err(self.error("* argument may appear only once"));
                }
                seen_star = true;
                if matches!(self.kind(), TokenKind::Name(_)) {
                    let name = self.expect_name()?;
                    let annotation = self.annotation()?;
                    params.push(Param {
                        name,
                        kind: ParamKind::VarPositional,
                        annotation,
                        default: None,
                    });
                } else if self.at_op(")") {
                    return Err(self.error("named arguments must follow bare *"));
                }
            } else {
                let name = self.expect_name()?;
                let annotation = self.annotation()?;
                let default = if self.eat_op("=") {
                    Some(self.expression()?)
                } else {
                    None
                };
                let kind = if seen_star {
                    ParamKind::KeywordOnly
                } else {
                    ParamKind::Positional
                };
                if kind == ParamKind::Positional {
                    if default.is_some() {
                        seen_default = true;
                    } else if seen_default {
                        return Err(self.error("non-default argument follows default argument"));
                    }
                }
                params.push(Param {
                    name,
                    kind,
                    annotation,
                    default,
                });
            }

            if !self.eat_op(",") {
                break;
            }
        }

        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(self.error(format!(
                    "duplicate argument '{}' in function definition",
                    param.name
                )));
            }
        }
        Ok(params)
    }

    fn annotation(&mut self) -> CheckResult<Option<Expr>> {
        if self.eat_op(":") {
            Ok(Some(self.expression()?))
        } else {
            Ok(None)
        }
    }

    /// Parse `;`-separated simple statements up to the end of the line
    fn simple_statements(&mut self) -> CheckResult<Vec<Statement>> {
        let mut out = Vec::new();
        loop {
            let line = self.line();
            let start = self.pos;
            let saved_depth = self.depth;
            let statement = match self.expression_list() {
                Ok(value) if self.at(&TokenKind::Newline) || self.at_op(";") => {
                    Statement::Expr { value, line }
                }
                _ => {
                    self.pos = start;
                    self.depth = saved_depth;
                    self.skip_statement()?;
                    Statement::Other { line }
                }
            };
            out.push(statement);

            if self.eat_op(";") && !self.at(&TokenKind::Newline) {
                continue;
            }
            self.eat(&TokenKind::Newline);
            return Ok(out);
        }
    }

    /// Skip one statement without interpreting it.
    ///
    /// A line ending in `:` introduces a block, which is skipped too.
    fn skip_statement(&mut self) -> CheckResult<()> {
        let mut nesting = 0usize;
        let mut last_was_colon = false;
        loop {
            match self.kind() {
                TokenKind::EndOfFile | TokenKind::Newline => break,
                TokenKind::Op(";") if nesting == 0 => return Ok(()),
                TokenKind::Op("(" | "[" | "{") => nesting += 1,
                TokenKind::Op(")" | "]" | "}") => nesting = nesting.saturating_sub(1),
                _ => {}
            }
            last_was_colon = self.at_op(":");
            self.pos += 1;
        }

        if !last_was_colon || !self.at(&TokenKind::Newline) {
            return Ok(());
        }
        let header_line = self.line();
        self.pos += 1;
        if !self.eat(&TokenKind::Indent) {
            return Err(self.error(format!(
                "expected an indented block after line {}",
                header_line
            )));
        }
        let mut blocks = 1usize;
        while blocks > 0 {
            match self.advance().map(|t| t.kind) {
                Some(TokenKind::Indent) => blocks += 1,
                Some(TokenKind::Dedent) => blocks -= 1,
                Some(TokenKind::EndOfFile) | None => break,
                _ => {}
            }
        }
        Ok(())
    }

    // ---- expressions ----

    /// `expr (',' expr)* [',']`, packed into a tuple when a comma appears
    fn expression_list(&mut self) -> CheckResult<Expr> {
        let first = self.star_expression()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_expression_end() {
                break;
            }
            items.push(self.star_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn at_expression_end(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Newline
                | TokenKind::EndOfFile
                | TokenKind::Op(")" | "]" | "}" | ";" | "=" | ":")
        )
    }

    fn star_expression(&mut self) -> CheckResult<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.bitwise_or()?)));
        }
        self.expression()
    }

    /// Full expression including conditionals and lambdas
    ///
    /// # Errors
    ///
    /// Returns a `SyntaxError` diagnostic on malformed input
    pub fn expression(&mut self) -> CheckResult<Expr> {
        self.enter()?;
        let result = self.expression_inner();
        self.leave();
        result
    }

    fn expression_inner(&mut self) -> CheckResult<Expr> {
        if self.eat_keyword("lambda") {
            let mut nesting = 0usize;
            loop {
                match self.kind() {
                    TokenKind::Op(":") if nesting == 0 => break,
                    TokenKind::Op("(" | "[" | "{") => nesting += 1,
                    TokenKind::Op(")" | "]" | "}") => nesting = nesting.saturating_sub(1),
                    TokenKind::Newline | TokenKind::EndOfFile => return Err(self.unexpected()),
                    _ => {}
                }
                self.pos += 1;
            }
            self.pos += 1;
            let body = self.expression()?;
            return Ok(Expr::Lambda {
                body: Box::new(body),
            });
        }

        let body = self.disjunction()?;
        if self.eat_keyword("if") {
            let test = self.disjunction()?;
            if !self.eat_keyword("else") {
                return Err(self.error("expected 'else' after 'if' expression"));
            }
            let orelse = self.expression()?;
            return Ok(Expr::Conditional {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn disjunction(&mut self) -> CheckResult<Expr> {
        let mut left = self.conjunction()?;
        let mut links = 0;
        while self.eat_keyword("or") {
            self.link(&mut links)?;
            let right = self.conjunction()?;
            left = binop("or", left, right);
        }
        self.release(links);
        Ok(left)
    }

    fn conjunction(&mut self) -> CheckResult<Expr> {
        let mut left = self.inversion()?;
        let mut links = 0;
        while self.eat_keyword("and") {
            self.link(&mut links)?;
            let right = self.inversion()?;
            left = binop("and", left, right);
        }
        self.release(links);
        Ok(left)
    }

    fn inversion(&mut self) -> CheckResult<Expr> {
        if self.eat_keyword("not") {
            self.enter()?;
            let operand = self.inversion();
            self.leave();
            return Ok(Expr::UnaryOp {
                op: "not",
                operand: Box::new(operand?),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> CheckResult<Expr> {
        let mut left = self.bitwise_or()?;
        let mut links = 0;
        loop {
            let op: &'static str = match self.kind() {
                TokenKind::Op(op) if COMPARISON_OPS.contains(op) => *op,
                TokenKind::Name(n) if n == "in" => "in",
                TokenKind::Name(n) if n == "is" => "is",
                TokenKind::Name(n)
                    if n == "not"
                        && matches!(self.kind_at(1), TokenKind::Name(m) if m == "in") =>
                {
                    "not in"
                }
                _ => break,
            };
            self.pos += if op == "not in" { 2 } else { 1 };
            let op = if op == "is" && self.eat_keyword("not") {
                "is not"
            } else {
                op
            };
            self.link(&mut links)?;
            let right = self.bitwise_or()?;
            left = binop(op, left, right);
        }
        self.release(links);
        Ok(left)
    }

    fn binary(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> CheckResult<Expr>,
    ) -> CheckResult<Expr> {
        let mut left = next(self)?;
        let mut links = 0;
        loop {
            let op = match self.kind() {
                TokenKind::Op(op) => ops.iter().copied().find(|o| o == op),
                _ => None,
            };
            let Some(op) = op else { break };
            self.pos += 1;
            self.link(&mut links)?;
            let right = next(self)?;
            left = binop(op, left, right);
        }
        self.release(links);
        Ok(left)
    }

    fn bitwise_or(&mut self) -> CheckResult<Expr> {
        self.binary(&["|"], Self::bitwise_xor)
    }

    fn bitwise_xor(&mut self) -> CheckResult<Expr> {
        self.binary(&["^"], Self::bitwise_and)
    }

    fn bitwise_and(&mut self) -> CheckResult<Expr> {
        self.binary(&["&"], Self::shift)
    }

    fn shift(&mut self) -> CheckResult<Expr> {
        self.binary(&["<<", ">>"], Self::sum)
    }

    fn sum(&mut self) -> CheckResult<Expr> {
        self.binary(&["+", "-"], Self::term)
    }

    fn term(&mut self) -> CheckResult<Expr> {
        self.binary(&["*", "/", "//", "%", "@"], Self::factor)
    }

    fn factor(&mut self) -> CheckResult<Expr> {
        let op = match self.kind() {
            TokenKind::Op("+") => "+",
            TokenKind::Op("-") => "-",
            TokenKind::Op("~") => "~",
            _ => return self.power(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.factor();
        self.leave();
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand?),
        })
    }

    fn power(&mut self) -> CheckResult<Expr> {
        let base = if self.eat_keyword("await") {
            Expr::UnaryOp {
                op: "await",
                operand: Box::new(self.primary()?),
            }
        } else {
            self.primary()?
        };
        if self.eat_op("**") {
            self.enter()?;
            let exponent = self.factor();
            self.leave();
            return Ok(binop("**", base, exponent?));
        }
        Ok(base)
    }

    fn primary(&mut self) -> CheckResult<Expr> {
        let mut expr = self.atom()?;
        let mut links = 0;
        loop {
            if self.at_op(".") || self.at_op("(") || self.at_op("[") {
                self.link(&mut links)?;
            }
            if self.eat_op(".") {
                let attr = self.expect_name()?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                };
            } else if self.eat_op("(") {
                let args = self.call_arguments()?;
                self.expect_op(")")?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.eat_op("[") {
                let index = self.subscript_index()?;
                self.expect_op("]")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                self.release(links);
                return Ok(expr);
            }
        }
    }

    fn call_arguments(&mut self) -> CheckResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            let arg = if self.eat_op("**") {
                Expr::Keyword {
                    name: None,
                    value: Box::new(self.expression()?),
                }
            } else if self.eat_op("*") {
                Expr::Starred(Box::new(self.expression()?))
            } else if matches!(self.kind(), TokenKind::Name(_))
                && matches!(self.kind_at(1), TokenKind::Op("="))
            {
                let name = self.expect_name()?;
                self.pos += 1;
                Expr::Keyword {
                    name: Some(name),
                    value: Box::new(self.expression()?),
                }
            } else {
                let value = self.expression()?;
                if self.at_keyword("for") || self.at_keyword("async") {
                    self.skip_to_closing()?;
                    Expr::Comprehension
                } else {
                    value
                }
            };
            args.push(arg);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn subscript_index(&mut self) -> CheckResult<Expr> {
        let first = self.slice()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.slice()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn slice(&mut self) -> CheckResult<Expr> {
        let lower = if self.at_op(":") {
            None
        } else {
            let expr = self.star_expression()?;
            if !self.at_op(":") {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };
        self.expect_op(":")?;
        let bound = |parser: &mut Self| -> CheckResult<Option<Box<Expr>>> {
            if parser.at_op(":") || parser.at_op(",") || parser.at_op("]") {
                Ok(None)
            } else {
                Ok(Some(Box::new(parser.expression()?)))
            }
        };
        let upper = bound(self)?;
        let step = if self.eat_op(":") { bound(self)? } else { None };
        Ok(Expr::Slice { lower, upper, step })
    }

    /// Consume tokens up to, not including, the bracket closing the
    /// current group
    fn skip_to_closing(&mut self) -> CheckResult<()> {
        let mut nesting = 0usize;
        loop {
            match self.kind() {
                TokenKind::Op(")" | "]" | "}") if nesting == 0 => return Ok(()),
                TokenKind::Op("(" | "[" | "{") => nesting += 1,
                TokenKind::Op(")" | "]" | "}") => nesting -= 1,
                TokenKind::EndOfFile | TokenKind::Newline => return Err(self.unexpected()),
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn atom(&mut self) -> CheckResult<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };
        match token.kind {
            TokenKind::Name(name) => {
                let expr = match name.as_str() {
                    "True" => Expr::Constant(Constant::Bool(true)),
                    "False" => Expr::Constant(Constant::Bool(false)),
                    "None" => Expr::Constant(Constant::None),
                    n if KEYWORDS.contains(&n) => return Err(self.unexpected()),
                    n => Expr::Name(n.to_string()),
                };
                self.pos += 1;
                Ok(expr)
            }
            TokenKind::Number(number) => {
                self.pos += 1;
                Ok(Expr::Constant(match number {
                    Number::Int(i) => Constant::Int(i),
                    Number::BigInt(text) => Constant::BigInt(text),
                    Number::Float(x) => Constant::Float(x),
                    Number::Imaginary(x) => Constant::Imaginary(x),
                }))
            }
            TokenKind::Str(_) => self.strings(),
            TokenKind::Op("...") => {
                self.pos += 1;
                Ok(Expr::Constant(Constant::Ellipsis))
            }
            TokenKind::Op("(") => {
                self.pos += 1;
                self.enter()?;
                let inner = self.parenthesized();
                self.leave();
                let inner = inner?;
                self.expect_op(")")?;
                Ok(inner)
            }
            TokenKind::Op("[") => {
                self.pos += 1;
                self.enter()?;
                let items = self.display_items("]");
                self.leave();
                let items = items?;
                self.expect_op("]")?;
                Ok(items.map_or(Expr::Comprehension, Expr::List))
            }
            TokenKind::Op("{") => {
                self.pos += 1;
                self.enter()?;
                let inner = self.brace_display();
                self.leave();
                let inner = inner?;
                self.expect_op("}")?;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Adjacent string literals concatenate into one constant
    fn strings(&mut self) -> CheckResult<Expr> {
        let mut text = String::new();
        let mut formatted = false;
        let mut bytes: Option<bool> = None;
        while let TokenKind::Str(lit) = self.kind() {
            let is_bytes = lit.flavor == StrFlavor::Bytes;
            if bytes.is_some_and(|b| b != is_bytes) {
                return Err(self.error("cannot mix bytes and nonbytes literals"));
            }
            bytes = Some(is_bytes);
            formatted |= lit.flavor == StrFlavor::Formatted;
            text.push_str(&lit.value);
            self.pos += 1;
        }
        Ok(if formatted {
            Expr::FormattedString(text)
        } else if bytes == Some(true) {
            Expr::Constant(Constant::Bytes(text))
        } else {
            Expr::Constant(Constant::Str(text))
        })
    }

    fn parenthesized(&mut self) -> CheckResult<Expr> {
        if self.at_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }
        if self.at_keyword("yield") {
            self.skip_to_closing()?;
            return Ok(Expr::Comprehension);
        }
        let first = self.star_expression()?;
        if self.at_keyword("for") || self.at_keyword("async") {
            self.skip_to_closing()?;
            return Ok(Expr::Comprehension);
        }
        if self.eat_op(":=") {
            let value = self.expression()?;
            return Ok(binop(":=", first, value));
        }
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            items.push(self.star_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Items of a list or set display; `None` for a comprehension
    fn display_items(&mut self, close: &str) -> CheckResult<Option<Vec<Expr>>> {
        let mut items = Vec::new();
        while !self.at_op(close) {
            items.push(self.star_expression()?);
            if items.len() == 1 && (self.at_keyword("for") || self.at_keyword("async")) {
                self.skip_to_closing()?;
                return Ok(None);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(Some(items))
    }

    fn brace_display(&mut self) -> CheckResult<Expr> {
        if self.at_op("}") {
            return Ok(Expr::Dict(Vec::new()));
        }

        let first_key = if self.eat_op("**") {
            None
        } else {
            let expr = self.star_expression()?;
            if !self.at_op(":") {
                // set display or set comprehension
                if self.at_keyword("for") || self.at_keyword("async") {
                    self.skip_to_closing()?;
                    return Ok(Expr::Comprehension);
                }
                let mut items = vec![expr];
                while self.eat_op(",") {
                    if self.at_op("}") {
                        break;
                    }
                    items.push(self.star_expression()?);
                }
                return Ok(Expr::Set(items));
            }
            Some(expr)
        };

        let mut entries = Vec::new();
        let mut key = first_key;
        loop {
            if key.is_some() {
                self.expect_op(":")?;
            }
            let value = if key.is_some() {
                self.expression()?
            } else {
                self.bitwise_or()?
            };
            if entries.is_empty() && (self.at_keyword("for") || self.at_keyword("async")) {
                self.skip_to_closing()?;
                return Ok(Expr::Comprehension);
            }
            entries.push((key, value));
            if !self.eat_op(",") || self.at_op("}") {
                break;
            }
            key = if self.eat_op("**") {
                None
            } else {
                Some(self.expression()?)
            };
        }
        Ok(Expr::Dict(entries))
    }
}

fn binop(op: &'static str, left: Expr, right: Expr) -> Expr {
    Expr::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
