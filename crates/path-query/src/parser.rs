//! Recursive-descent parser for the supported path-query grammar.

use crate::ast::{Axis, BinaryOp, Expr, Function, LocationPath, NodeTest, Step};
use crate::errors::QueryError;
use crate::lexer::{tokenize, Spanned, Token};

/// Bound on bracket, call and unary-minus nesting.
const MAX_NESTING: usize = 64;
/// Bound on binary and union operators in one expression.
const MAX_OPERATORS: usize = 512;

pub(crate) fn parse(source: &str) -> Result<Expr, QueryError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(QueryError::syntax(source, 0, "empty expression"));
    }
    let mut parser = Parser {
        source,
        tokens,
        position: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(extra) = parser.tokens.get(parser.position) {
        return Err(QueryError::syntax(
            source,
            extra.offset,
            format!("unexpected {} after end of expression", extra.token),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    position: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens
            .get(self.position + ahead)
            .map(|spanned| &spanned.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|spanned| spanned.offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> QueryError {
        QueryError::syntax(self.source, self.offset(), reason)
    }

    fn unexpected(&self, wanted: &str) -> QueryError {
        match self.peek() {
            Some(token) => self.error(format!("expected {wanted}, found {token}")),
            None => self.error(format!("expected {wanted}, found end of expression")),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), QueryError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn count_operator(&mut self) -> Result<(), QueryError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression has too many operators"));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        self.nested(Self::parse_disjunction)
    }

    fn parse_disjunction(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            self.count_operator()?;
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            self.count_operator()?;
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.position += 1;
            self.count_operator()?;
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::LtEq) => BinaryOp::LtEq,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.position += 1;
            self.count_operator()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.position += 1;
            self.count_operator()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.position += 1;
            self.count_operator()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        if self.eat(&Token::Minus) {
            let operand = self.nested(Self::parse_unary)?;
            Ok(Expr::Negate(Box::new(operand)))
        } else {
            self.parse_union()
        }
    }

    fn parse_union(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.parse_path()?;
        while self.eat(&Token::Pipe) {
            self.count_operator()?;
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path(&mut self) -> Result<Expr, QueryError> {
        match self.peek() {
            Some(Token::Slash | Token::DoubleSlash) => self.parse_location_path(),
            Some(Token::LParen | Token::Literal(_) | Token::Number(_)) => self.parse_filter(),
            Some(Token::Name(name)) => {
                let is_call = self.peek_at(1) == Some(&Token::LParen)
                    && !matches!(name.as_str(), "node" | "text");
                if is_call {
                    self.parse_filter()
                } else {
                    self.parse_location_path()
                }
            }
            Some(Token::Dot | Token::DoubleDot | Token::At | Token::Star) => {
                self.parse_location_path()
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_filter(&mut self) -> Result<Expr, QueryError> {
        let base = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        self.parse_relative_tail(&mut steps)?;
        if predicates.is_empty() && steps.is_empty() {
            return Ok(base);
        }
        Ok(Expr::Filter {
            base: Box::new(base),
            predicates,
            steps,
        })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Dot | Token::DoubleDot | Token::At | Token::Star)
        )
    }

    fn parse_location_path(&mut self) -> Result<Expr, QueryError> {
        let mut steps = Vec::new();
        let absolute = if self.eat(&Token::DoubleSlash) {
            steps.push(Step::descendant_or_self());
            steps.push(self.parse_step()?);
            true
        } else if self.eat(&Token::Slash) {
            if self.starts_step() {
                steps.push(self.parse_step()?);
            }
            true
        } else {
            steps.push(self.parse_step()?);
            false
        };
        self.parse_relative_tail(&mut steps)?;
        Ok(Expr::Path(LocationPath { absolute, steps }))
    }

    fn parse_relative_tail(&mut self, steps: &mut Vec<Step>) -> Result<(), QueryError> {
        loop {
            if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else {
                return Ok(());
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, QueryError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if self.peek_at(1) == Some(&Token::ColonColon) {
            let name = match self.peek() {
                Some(Token::Name(name)) => name.clone(),
                _ => return Err(self.unexpected("an axis name")),
            };
            let axis = Axis::from_name(&name)
                .ok_or_else(|| self.error(format!("unknown axis '{name}'")))?;
            self.position += 2;
            axis
        } else {
            Axis::Child
        };

        let test = match self.peek().cloned() {
            Some(Token::Star) => {
                self.position += 1;
                NodeTest::Wildcard
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
                let test = match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    other => return Err(self.error(format!("unsupported node test '{other}()'"))),
                };
                self.position += 1;
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                test
            }
            Some(Token::Name(name)) => {
                self.position += 1;
                NodeTest::Name(name)
            }
            _ => return Err(self.unexpected("a node test")),
        };

        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, QueryError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        let offset = self.offset();
        if !matches!(
            self.peek(),
            Some(Token::LParen | Token::Literal(_) | Token::Number(_) | Token::Name(_))
        ) {
            return Err(self.unexpected("a primary expression"));
        }
        match self.advance().map(|spanned| spanned.token) {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
            Some(Token::Number(number)) => Ok(Expr::Number(number)),
            Some(Token::Name(name)) => {
                let function = Function::from_name(&name).ok_or_else(|| {
                    QueryError::syntax(self.source, offset, format!("unknown function '{name}'"))
                })?;
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    args.push(self.parse_or()?);
                    while self.eat(&Token::Comma) {
                        args.push(self.parse_or()?);
                    }
                    self.expect(&Token::RParen)?;
                }
                let (min, max) = function.arity();
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    return Err(QueryError::syntax(
                        self.source,
                        offset,
                        format!("{name}() does not take {} argument(s)", args.len()),
                    ));
                }
                Ok(Expr::Call(function, args))
            }
            _ => Err(self.error("expected a primary expression")),
        }
    }
}
