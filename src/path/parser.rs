//! Recursive-descent parser: token stream → [`Path`] / [`FilterExpr`] AST.
//!
//! Mirrors the grammar in the specification directly: `OrExpr` over
//! `AndExpr` over `NotExpr` over `Comparison`, with the usual left-to-right
//! associativity for `&&`/`||`.

use crate::error::QueryError;
use crate::path::ast::{CmpOp, FilterExpr, Literal, Operand, Path, Segment, TemporalLiteral, TemporalUnit};
use crate::path::tokenizer::{tokenize, Token};

pub fn parse_path(expr: &str) -> Result<Path, QueryError> {
    let tokens = tokenize(expr)?;
    let mut p = Parser {
        tokens,
        pos: 0,
        expr: expr.to_string(),
    };
    let path = p.parse_path_segments()?;
    if p.pos != p.tokens.len() {
        return Err(QueryError::InvalidPath {
            expression: expr.to_string(),
            reason: "trailing tokens after path expression".to_string(),
        });
    }
    Ok(path)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    expr: String,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<(), QueryError> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected {tok:?}")))
        }
    }

    fn err(&self, reason: String) -> QueryError {
        QueryError::InvalidPath {
            expression: self.expr.clone(),
            reason,
        }
    }

    fn filter_err(&self, reason: String) -> QueryError {
        QueryError::FilterSyntax {
            expression: self.expr.clone(),
            reason,
        }
    }

    fn parse_path_segments(&mut self) -> Result<Path, QueryError> {
        if self.peek() == Some(&Token::Root) {
            self.bump();
        }
        let mut segments = Vec::new();
        while let Some(seg) = self.try_parse_segment()? {
            segments.push(seg);
        }
        Ok(Path { segments })
    }

    fn try_parse_segment(&mut self) -> Result<Option<Segment>, QueryError> {
        match self.peek() {
            Some(Token::Dot) => {
                self.bump();
                let name = self.expect_ident()?;
                Ok(Some(Segment::Field(name)))
            }
            Some(Token::DotDot) => {
                self.bump();
                if self.peek() == Some(&Token::Star) {
                    self.bump();
                    Ok(Some(Segment::Recursive(None)))
                } else {
                    let name = self.expect_ident()?;
                    Ok(Some(Segment::Recursive(Some(name))))
                }
            }
            Some(Token::LBracket) => {
                self.bump();
                let seg = self.parse_bracket_segment()?;
                self.expect(&Token::RBracket)?;
                Ok(Some(seg))
            }
            _ => Ok(None),
        }
    }

    fn expect_ident(&mut self) -> Result<String, QueryError> {
        match self.bump() {
            Some(Token::Ident(s)) => Ok(s),
            other => Err(self.err(format!("expected an identifier, found {other:?}"))),
        }
    }

    fn parse_bracket_segment(&mut self) -> Result<Segment, QueryError> {
        match self.peek() {
            Some(Token::Star) => {
                self.bump();
                Ok(Segment::Wildcard)
            }
            Some(Token::Question) => {
                self.bump();
                self.expect(&Token::LParen)?;
                let expr = self.parse_or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Segment::Filter(expr))
            }
            Some(Token::Integer(_)) | Some(Token::Colon) => self.parse_index_or_slice(),
            other => Err(self.err(format!("unexpected token inside '[...]': {other:?}"))),
        }
    }

    fn parse_index_or_slice(&mut self) -> Result<Segment, QueryError> {
        let start = self.maybe_integer();
        if self.peek() == Some(&Token::Colon) {
            self.bump();
            let end = self.maybe_integer();
            let step = if self.peek() == Some(&Token::Colon) {
                self.bump();
                self.maybe_integer()
            } else {
                None
            };
            return Ok(Segment::Slice { start, end, step });
        }
        match start {
            Some(i) => Ok(Segment::Index(i)),
            None => Err(self.err("expected an index or slice inside '[...]'".to_string())),
        }
    }

    fn maybe_integer(&mut self) -> Option<i64> {
        if let Some(Token::Integer(n)) = self.peek() {
            let n = *n;
            self.bump();
            Some(n)
        } else {
            None
        }
    }

    // --- filter expression grammar ---

    fn parse_or_expr(&mut self) -> Result<FilterExpr, QueryError> {
        let mut left = self.parse_and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.bump();
            let right = self.parse_and_expr()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<FilterExpr, QueryError> {
        let mut left = self.parse_not_expr()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.bump();
            let right = self.parse_not_expr()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<FilterExpr, QueryError> {
        if self.peek() == Some(&Token::Bang) {
            self.bump();
            let inner = self.parse_not_expr()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, QueryError> {
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            let inner = self.parse_or_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }
        let left = self.parse_operand()?;
        if let Some(op) = self.try_parse_cmp_op()? {
            let right = self.parse_operand()?;
            if op == CmpOp::Between {
                if self.peek() == Some(&Token::Comma) {
                    self.bump();
                }
                let right2 = self.parse_operand()?;
                return Ok(FilterExpr::Compare {
                    left,
                    op,
                    right,
                    right2: Some(right2),
                });
            }
            return Ok(FilterExpr::Compare {
                left,
                op,
                right,
                right2: None,
            });
        }
        Ok(FilterExpr::Truthy(left))
    }

    fn try_parse_cmp_op(&mut self) -> Result<Option<CmpOp>, QueryError> {
        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::TildeEq) => Some(CmpOp::FuzzyEq),
            Some(Token::Ident(word)) => word_to_cmp_op(word),
            _ => None,
        };
        if op.is_some() {
            self.bump();
        }
        Ok(op)
    }

    fn parse_operand(&mut self) -> Result<Operand, QueryError> {
        match self.peek().cloned() {
            Some(Token::Current) => {
                self.bump();
                let segs = self.parse_operand_segments()?;
                Ok(Operand::Current(segs))
            }
            Some(Token::Root) => {
                self.bump();
                let segs = self.parse_operand_segments()?;
                Ok(Operand::Root(segs))
            }
            Some(Token::Integer(n)) => {
                self.bump();
                Ok(Operand::Literal(Literal::Number(n as f64)))
            }
            Some(Token::Str(s)) => {
                self.bump();
                Ok(Operand::Literal(Literal::Str(s)))
            }
            Some(Token::Ident(word)) => {
                self.bump();
                Ok(Operand::Literal(parse_ident_literal(&word, self)?))
            }
            other => Err(self.filter_err(format!("expected an operand, found {other:?}"))),
        }
    }

    fn parse_operand_segments(&mut self) -> Result<Vec<Segment>, QueryError> {
        let mut segments = Vec::new();
        while let Some(seg) = self.try_parse_segment()? {
            segments.push(seg);
        }
        Ok(segments)
    }
}

fn parse_ident_literal(word: &str, parser: &Parser) -> Result<Literal, QueryError> {
    match word {
        "true" => Ok(Literal::Bool(true)),
        "false" => Ok(Literal::Bool(false)),
        "null" => Ok(Literal::Null),
        _ if word.starts_with('@') => parse_temporal_literal(word, parser).map(Literal::Temporal),
        other => Ok(Literal::Str(other.to_string())),
    }
}

fn parse_temporal_literal(word: &str, parser: &Parser) -> Result<TemporalLiteral, QueryError> {
    let rest = &word[1..];
    match rest {
        "now" => return Ok(TemporalLiteral::Now),
        "today" => return Ok(TemporalLiteral::Today),
        "yesterday" => return Ok(TemporalLiteral::Yesterday),
        "tomorrow" => return Ok(TemporalLiteral::Tomorrow),
        _ => {}
    }
    if let Some(offset) = rest.strip_prefix("now") {
        let (sign_char, body) = offset.split_at(1);
        let positive = match sign_char {
            "+" => true,
            "-" => false,
            _ => {
                return Err(parser.filter_err(format!("invalid temporal offset '{word}'")));
            }
        };
        let unit_char = body.chars().last().ok_or_else(|| {
            parser.filter_err(format!("invalid temporal offset '{word}'"))
        })?;
        let amount_str = &body[..body.len() - unit_char.len_utf8()];
        let amount: i64 = amount_str
            .parse()
            .map_err(|_| parser.filter_err(format!("invalid temporal offset amount in '{word}'")))?;
        let unit = match unit_char {
            'y' => TemporalUnit::Year,
            'M' => TemporalUnit::Month,
            'w' => TemporalUnit::Week,
            'd' => TemporalUnit::Day,
            'h' => TemporalUnit::Hour,
            'm' => TemporalUnit::Minute,
            's' => TemporalUnit::Second,
            other => {
                return Err(parser.filter_err(format!("unknown temporal unit '{other}' in '{word}'")))
            }
        };
        return Ok(TemporalLiteral::NowOffset { positive, amount, unit });
    }
    Ok(TemporalLiteral::Absolute(rest.to_string()))
}

fn word_to_cmp_op(word: &str) -> Option<CmpOp> {
    match word {
        "contains" => Some(CmpOp::Contains),
        "startsWith" => Some(CmpOp::StartsWith),
        "endsWith" => Some(CmpOp::EndsWith),
        "matches" => Some(CmpOp::Matches),
        "~contains" => Some(CmpOp::FuzzyContains),
        "~startsWith" => Some(CmpOp::FuzzyStartsWith),
        "~endsWith" => Some(CmpOp::FuzzyEndsWith),
        "fuzzyMatch" => Some(CmpOp::FuzzyMatch),
        "soundsLike" => Some(CmpOp::SoundsLike),
        "similar" => Some(CmpOp::Similar),
        "before" => Some(CmpOp::Before),
        "after" => Some(CmpOp::After),
        "between" => Some(CmpOp::Between),
        "daysAgo" => Some(CmpOp::DaysAgo),
        "weeksAgo" => Some(CmpOp::WeeksAgo),
        "monthsAgo" => Some(CmpOp::MonthsAgo),
        "yearsAgo" => Some(CmpOp::YearsAgo),
        "sameDay" => Some(CmpOp::SameDay),
        "sameWeek" => Some(CmpOp::SameWeek),
        "sameMonth" => Some(CmpOp::SameMonth),
        "sameYear" => Some(CmpOp::SameYear),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_field_and_index() {
        let p = parse_path("$.users[0].name").unwrap();
        assert_eq!(
            p.segments,
            vec![
                Segment::Field("users".into()),
                Segment::Index(0),
                Segment::Field("name".into()),
            ]
        );
    }

    #[test]
    fn parses_slice_and_wildcard() {
        let p = parse_path("$.items[1:5:2]").unwrap();
        assert_eq!(
            p.segments,
            vec![
                Segment::Field("items".into()),
                Segment::Slice {
                    start: Some(1),
                    end: Some(5),
                    step: Some(2)
                },
            ]
        );
        let p2 = parse_path("$.items[*]").unwrap();
        assert_eq!(p2.segments[1], Segment::Wildcard);
    }

    #[test]
    fn parses_recursive_descent() {
        let p = parse_path("$..name").unwrap();
        assert_eq!(p.segments, vec![Segment::Recursive(Some("name".into()))]);
    }

    #[test]
    fn parses_filter_with_logical_ops_s3() {
        let p = parse_path("$.users[?(@.age > 25 && @.role == \"admin\")]").unwrap();
        match &p.segments[1] {
            Segment::Filter(FilterExpr::And(left, right)) => {
                assert!(matches!(**left, FilterExpr::Compare { op: CmpOp::Gt, .. }));
                assert!(matches!(**right, FilterExpr::Compare { op: CmpOp::Eq, .. }));
            }
            other => panic!("expected And filter, got {other:?}"),
        }
    }

    #[test]
    fn parses_negative_index() {
        let p = parse_path("$.items[-1]").unwrap();
        assert_eq!(p.segments[1], Segment::Index(-1));
    }

    #[test]
    fn parses_temporal_literal_offset() {
        let p = parse_path("$.events[?(@.createdAt after @now-3d)]").unwrap();
        match &p.segments[1] {
            Segment::Filter(FilterExpr::Compare { op: CmpOp::After, right, .. }) => {
                assert!(matches!(
                    right,
                    Operand::Literal(Literal::Temporal(TemporalLiteral::NowOffset {
                        positive: false,
                        amount: 3,
                        unit: TemporalUnit::Day
                    }))
                ));
            }
            other => panic!("expected After filter, got {other:?}"),
        }
    }
}
