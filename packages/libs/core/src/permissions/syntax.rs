//! predicate 텍스트 문법 파서
//!
//! 정책 정의의 `using` / `with_check` 문자열을 `Expr` 트리로 변환합니다.
//! 파싱은 프로비저닝 시점에만 일어나며, 판정 엔진은 파싱된 정책만 다룹니다.
//!
//! # 문법
//!
//! ```text
//! expr     := or
//! or       := and (("||" | "or") and)*
//! and      := unary (("&&" | "and") unary)*
//! unary    := ("!" | "not") unary | "(" expr ")" | predicate
//! predicate:= "length" "(" operand ")" (cmp INT | "between" INT "and" INT)
//!           | operand [cmp operand | "is" ["not"] "null" | ["not"] "in" "[" literal, ... "]"
//!                      | "matches" STRING]
//! operand  := literal | "actor_id" "(" ")" | "auth" "." "uid" "(" ")"
//!           | ["existing" "." | "proposed" "."] IDENT
//! ```
//!
//! 단독 불리언 필드(`is_pinned`)는 `is_pinned == true`로 해석합니다.
//! `=`는 `==`, `<>`는 `!=`와 같습니다.
//!
//! 문자열은 작은/큰 따옴표 모두 가능하고 JSON 문자열과 같은 이스케이프(`\n`, `\uXXXX` 등)를
//! 받습니다. 숫자는 `-3`, `2.5`, `1e-7` 형태입니다. 따라서 `Expr`의 표시 형식은 다시
//! 파싱하면 같은 트리가 됩니다.

use serde_json::Value;
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::stream::{AsChar, Location};
use winnow::token::{any, one_of, take_while};
use winnow::{LocatingSlice, ModalResult, Parser as _};

use super::expr::{CompareOp, Expr, Operand, Pattern, RowRef};
use crate::error::{Error, Result};

/// predicate 문자열 파싱
pub fn parse_expr(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        Token { kind: TokenKind::Eof, .. } => Ok(expr),
        token => Err(parse_error(token.offset, format!("unexpected {}", token.kind.describe()))),
    }
}

fn parse_error(offset: usize, message: impl Into<String>) -> Error {
    Error::ExprParse {
        offset,
        message: message.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Cmp(CompareOp),
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Int(n) => format!("number {}", n),
            TokenKind::Float(n) => format!("number {}", n),
            TokenKind::Cmp(op) => format!("'{}'", op.as_str()),
            TokenKind::AndAnd => "'&&'".to_string(),
            TokenKind::OrOr => "'||'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

type Input<'a> = LocatingSlice<&'a str>;

/// 입력 전체를 토큰으로 분리 (마지막 토큰은 항상 Eof)
///
/// 첫 번째 잘못된 토큰에서 바로 실패합니다.
fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut input = LocatingSlice::new(source);

    loop {
        let _: ModalResult<&str, ContextError> =
            take_while(0.., char::is_whitespace).parse_next(&mut input);

        let offset = input.current_token_start();
        if input.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                offset,
            });
            return Ok(tokens);
        }

        match next_token(&mut input) {
            Ok(kind) => tokens.push(Token { kind, offset }),
            Err(_) => return Err(lex_error(&source[offset..], offset)),
        }
    }
}

fn lex_error(rest: &str, offset: usize) -> Error {
    let mut chars = rest.chars();
    let message = match (chars.next(), chars.next()) {
        (Some('\'' | '"'), _) => "unterminated string literal or invalid escape".to_string(),
        (Some(c), _) if c.is_ascii_digit() => "invalid number literal".to_string(),
        (Some('-'), Some(c)) if c.is_ascii_digit() => "invalid number literal".to_string(),
        (Some(c), _) => format!("unexpected character '{}'", c),
        (None, _) => "unexpected end of input".to_string(),
    };
    parse_error(offset, message)
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

fn next_token(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        // 두 글자 연산자가 한 글자보다 먼저
        parse_operator,
        parse_string,
        parse_number,
        parse_ident,
        parse_punctuation,
    ))
    .parse_next(input)
}

// =============================================================================
// Operators and Punctuation
// =============================================================================

fn parse_operator(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        "==".value(TokenKind::Cmp(CompareOp::Eq)),
        "!=".value(TokenKind::Cmp(CompareOp::Ne)),
        "<>".value(TokenKind::Cmp(CompareOp::Ne)),
        "<=".value(TokenKind::Cmp(CompareOp::Le)),
        ">=".value(TokenKind::Cmp(CompareOp::Ge)),
        "&&".value(TokenKind::AndAnd),
        "||".value(TokenKind::OrOr),
        '='.value(TokenKind::Cmp(CompareOp::Eq)),
        '<'.value(TokenKind::Cmp(CompareOp::Lt)),
        '>'.value(TokenKind::Cmp(CompareOp::Gt)),
    ))
    .parse_next(input)
}

fn parse_punctuation(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    any.verify_map(|c| match c {
        '!' => Some(TokenKind::Bang),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Dot),
        _ => None,
    })
    .parse_next(input)
}

fn parse_ident(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    (
        take_while(1, |c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .map(|ident: &str| TokenKind::Ident(ident.to_string()))
        .parse_next(input)
}

// =============================================================================
// String Literals
// =============================================================================

// 이스케이프는 JSON 문자열 표기와 같은 집합을 받습니다 (`Expr` 표시 형식과 호환).

fn parse_string(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        delimited('"', string_content_double, '"'),
        delimited('\'', string_content_single, '\''),
    ))
    .map(TokenKind::Str)
    .parse_next(input)
}

fn string_content_double(input: &mut Input<'_>) -> ModalResult<String> {
    string_content(input, '"')
}

fn string_content_single(input: &mut Input<'_>) -> ModalResult<String> {
    string_content(input, '\'')
}

fn string_content(input: &mut Input<'_>, quote: char) -> ModalResult<String> {
    let mut result = String::new();

    loop {
        let chunk: &str = take_while(0.., |c: char| c != quote && c != '\\').parse_next(input)?;
        result.push_str(chunk);

        if !input.starts_with('\\') {
            return Ok(result);
        }
        '\\'.parse_next(input)?;
        result.push(parse_escape_char(input)?);
    }
}

fn parse_escape_char(input: &mut Input<'_>) -> ModalResult<char> {
    let c: char = any.parse_next(input)?;
    match c {
        't' => Ok('\t'),
        'b' => Ok('\x08'),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        'f' => Ok('\x0C'),
        '"' => Ok('"'),
        '\'' => Ok('\''),
        '\\' => Ok('\\'),
        '/' => Ok('/'),
        'u' => {
            let high = parse_hex4(input)?;
            if !(0xD800..0xDC00).contains(&high) {
                return char::from_u32(high).ok_or_else(backtrack);
            }
            // UTF-16 surrogate pair
            "\\u".parse_next(input)?;
            let low = parse_hex4(input)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(backtrack());
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            char::from_u32(code).ok_or_else(backtrack)
        }
        _ => Err(backtrack()),
    }
}

fn parse_hex4(input: &mut Input<'_>) -> ModalResult<u32> {
    let hex: &str = take_while(4..=4, AsChar::is_hex_digit).parse_next(input)?;
    u32::from_str_radix(hex, 16).map_err(|_| backtrack())
}

// =============================================================================
// Numbers
// =============================================================================

fn parse_number(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((parse_float, parse_integer)).parse_next(input)
}

fn parse_integer(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (opt('-'), digit1).take().parse_next(input)?;
    text.parse().map(TokenKind::Int).map_err(|_| backtrack())
}

/// `1.5`, `1.5e-3`, `1e-7` (serde_json이 출력하는 형태 포함)
fn parse_float(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (
        opt('-'),
        alt((
            (digit1, '.', digit1, opt(parse_exponent)).void(),
            (digit1, parse_exponent).void(),
        )),
    )
        .take()
        .parse_next(input)?;
    text.parse().map(TokenKind::Float).map_err(|_| backtrack())
}

fn parse_exponent<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)
        .take()
        .parse_next(input)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // 마지막 토큰은 항상 Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        let token = self.advance();
        if token.kind == kind {
            Ok(())
        } else {
            Err(parse_error(
                token.offset,
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            let token = self.peek();
            Err(parse_error(
                token.offset,
                format!("expected '{}', found {}", keyword, token.kind.describe()),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut items = vec![self.parse_and()?];
        while self.peek().kind == TokenKind::OrOr || self.is_keyword("or") {
            self.advance();
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut items = vec![self.parse_unary()?];
        while self.peek().kind == TokenKind::AndAnd || self.is_keyword("and") {
            self.advance();
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek().kind == TokenKind::Bang || self.is_keyword("not") {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.peek().kind == TokenKind::LParen {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        if self.is_keyword("length") && *self.peek_at(1) == TokenKind::LParen {
            return self.parse_length();
        }

        let start = self.peek().offset;
        let operand = self.parse_operand()?;

        if let TokenKind::Cmp(op) = self.peek().kind {
            self.advance();
            let rhs = self.parse_operand()?;
            return Ok(Expr::Compare {
                op,
                lhs: operand,
                rhs,
                temporal: false,
            });
        }

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull { operand, negated });
        }

        let in_follows =
            matches!(self.peek_at(1), TokenKind::Ident(k) if k.eq_ignore_ascii_case("in"));
        if self.is_keyword("not") && in_follows {
            self.advance();
            self.advance();
            let list = self.parse_list()?;
            return Ok(Expr::Not(Box::new(Expr::In {
                operand,
                list,
                temporal: false,
            })));
        }

        if self.eat_keyword("in") {
            let list = self.parse_list()?;
            return Ok(Expr::In {
                operand,
                list,
                temporal: false,
            });
        }

        if self.eat_keyword("matches") {
            let token = self.advance();
            let TokenKind::Str(source) = token.kind else {
                return Err(parse_error(token.offset, "'matches' requires a string pattern"));
            };
            let pattern = Pattern::new(&source)
                .map_err(|e| parse_error(token.offset, format!("invalid pattern: {}", e)))?;
            return Ok(Expr::Matches { operand, pattern });
        }

        match operand {
            Operand::Literal(Value::Bool(b)) => Ok(Expr::Const(b)),
            Operand::Field { .. } => Ok(Expr::Compare {
                op: CompareOp::Eq,
                lhs: operand,
                rhs: Operand::Literal(Value::Bool(true)),
                temporal: false,
            }),
            _ => Err(parse_error(start, "expected a condition")),
        }
    }

    fn parse_length(&mut self) -> Result<Expr> {
        self.advance();
        self.expect(TokenKind::LParen)?;
        let operand = self.parse_operand()?;
        self.expect(TokenKind::RParen)?;

        if self.eat_keyword("between") {
            let min = self.parse_count()?;
            self.expect_keyword("and")?;
            let max = self.parse_count()?;
            return Ok(Expr::Length {
                operand,
                min: Some(min),
                max: Some(max),
            });
        }

        let token = self.advance();
        let TokenKind::Cmp(op) = token.kind else {
            return Err(parse_error(
                token.offset,
                "expected comparison or 'between' after length(...)",
            ));
        };
        let n = self.parse_count()?;

        let (min, max) = match op {
            CompareOp::Eq => (Some(n), Some(n)),
            CompareOp::Ge => (Some(n), None),
            CompareOp::Gt => (Some(n + 1), None),
            CompareOp::Le => (None, Some(n)),
            CompareOp::Lt if n > 0 => (None, Some(n - 1)),
            _ => {
                return Err(parse_error(
                    token.offset,
                    format!("unsupported length bound '{} {}'", op.as_str(), n),
                ))
            }
        };
        Ok(Expr::Length { operand, min, max })
    }

    fn parse_count(&mut self) -> Result<usize> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(n) if n >= 0 => Ok(n as usize),
            other => Err(parse_error(
                token.offset,
                format!("expected a non-negative integer, found {}", other.describe()),
            )),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Value>> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        if self.peek().kind == TokenKind::RBracket {
            self.advance();
            return Ok(items);
        }
        loop {
            let token = self.peek().clone();
            match self.parse_operand()? {
                Operand::Literal(value) => items.push(value),
                _ => return Err(parse_error(token.offset, "list items must be literals")),
            }
            match self.advance() {
                Token { kind: TokenKind::Comma, .. } => continue,
                Token { kind: TokenKind::RBracket, .. } => return Ok(items),
                token => {
                    return Err(parse_error(
                        token.offset,
                        format!("expected ',' or ']', found {}", token.kind.describe()),
                    ))
                }
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(s) => Ok(Operand::Literal(Value::String(s))),
            TokenKind::Int(n) => Ok(Operand::Literal(Value::from(n))),
            TokenKind::Float(n) => Ok(Operand::Literal(Value::from(n))),
            TokenKind::Ident(name) => self.parse_ident_operand(name, token.offset),
            other => Err(parse_error(
                token.offset,
                format!("expected a value, found {}", other.describe()),
            )),
        }
    }

    fn parse_ident_operand(&mut self, name: String, offset: usize) -> Result<Operand> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "true" => return Ok(Operand::Literal(Value::Bool(true))),
            "false" => return Ok(Operand::Literal(Value::Bool(false))),
            "null" => return Ok(Operand::Literal(Value::Null)),
            "actor_id" if self.peek().kind == TokenKind::LParen => {
                self.advance();
                self.expect(TokenKind::RParen)?;
                return Ok(Operand::ActorId);
            }
            _ => {}
        }

        if self.peek().kind != TokenKind::Dot {
            return Ok(Operand::Field {
                row: RowRef::Current,
                name,
            });
        }

        self.advance();
        let member = match self.advance() {
            Token {
                kind: TokenKind::Ident(member),
                ..
            } => member,
            token => {
                return Err(parse_error(
                    token.offset,
                    format!("expected a field name, found {}", token.kind.describe()),
                ))
            }
        };

        match lower.as_str() {
            "existing" | "old" => Ok(Operand::Field {
                row: RowRef::Existing,
                name: member,
            }),
            "proposed" | "new" => Ok(Operand::Field {
                row: RowRef::Proposed,
                name: member,
            }),
            "auth" if member == "uid" => {
                self.expect(TokenKind::LParen)?;
                self.expect(TokenKind::RParen)?;
                Ok(Operand::ActorId)
            }
            _ => Err(parse_error(offset, format!("unknown qualifier '{}'", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ownership() {
        let expr = parse_expr("owner_id == actor_id()").unwrap();
        assert_eq!(expr, Expr::owner_is_actor());

        // SQL 스타일 표기
        let expr = parse_expr("owner_id = auth.uid()").unwrap();
        assert_eq!(expr, Expr::owner_is_actor());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expr("true").unwrap(), Expr::Const(true));
        assert_eq!(parse_expr("(FALSE)").unwrap(), Expr::Const(false));
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("a == 1 || b == 2 && not c == 3").unwrap();
        match expr {
            Expr::Or(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[1], Expr::And(inner) if matches!(inner[1], Expr::Not(_))));
            }
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_length_forms() {
        let expr = parse_expr("length(title) between 3 and 200").unwrap();
        assert!(matches!(expr, Expr::Length { min: Some(3), max: Some(200), .. }));

        let expr = parse_expr("length(content) < 10001").unwrap();
        assert!(matches!(expr, Expr::Length { min: None, max: Some(10000), .. }));

        let expr = parse_expr("length(content) > 0 and length(content) <= 5").unwrap();
        assert!(matches!(expr, Expr::And(_)));
    }

    #[test]
    fn test_parse_membership_and_nulls() {
        let expr = parse_expr("category not in ['spam', \"ads\"]").unwrap();
        match expr {
            Expr::Not(inner) => match *inner {
                Expr::In { list, .. } => assert_eq!(list, vec![json!("spam"), json!("ads")]),
                other => panic!("expected in, got {:?}", other),
            },
            other => panic!("expected not, got {:?}", other),
        }

        let expr = parse_expr("existing.updated_at is not null").unwrap();
        assert!(matches!(
            expr,
            Expr::IsNull {
                operand: Operand::Field { row: RowRef::Existing, .. },
                negated: true
            }
        ));
    }

    #[test]
    fn test_parse_matches_and_bare_boolean() {
        let expr = parse_expr("username matches '^[a-z0-9_]{3,30}$' && !is_pinned").unwrap();
        let Expr::And(items) = expr else {
            panic!("expected and");
        };
        assert!(matches!(
            &items[0],
            Expr::Matches { pattern, .. } if pattern.as_str() == "^[a-z0-9_]{3,30}$"
        ));
        assert!(matches!(&items[1], Expr::Not(_)));
    }

    #[test]
    fn test_display_round_trip() {
        let source = "proposed.owner_id == existing.owner_id \
                      && (length(title) between 3 and 200 || category in [\"news\", 1])";
        let expr = parse_expr(source).unwrap();
        assert_eq!(parse_expr(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn test_display_round_trip_escapes_and_exponents() {
        let expr = Expr::And(vec![
            Expr::Compare {
                op: CompareOp::Eq,
                lhs: Operand::Field {
                    row: RowRef::Current,
                    name: "title".to_string(),
                },
                rhs: Operand::Literal(json!("a\u{1}b \"q\" \\ /\n\t😀")),
                temporal: false,
            },
            Expr::In {
                operand: Operand::Field {
                    row: RowRef::Current,
                    name: "score".to_string(),
                },
                list: vec![json!(1e-7), json!(-2.5e30), json!(-3)],
                temporal: false,
            },
        ]);

        let printed = expr.to_string();
        assert!(printed.contains("\\u0001"));
        assert_eq!(parse_expr(&printed).unwrap(), expr);
    }

    #[test]
    fn test_lex_string_escapes() {
        let expr = parse_expr(r#"title == 'it\'s \u00e9\ud83d\ude00\/'"#).unwrap();
        let Expr::Compare { rhs, .. } = expr else {
            panic!("expected compare");
        };
        assert_eq!(rhs, Operand::Literal(json!("it's é😀/")));

        // 알 수 없는 이스케이프와 짝 없는 surrogate는 거부
        assert!(parse_expr(r#"title == '\d'"#).is_err());
        assert!(parse_expr(r#"title == '\ud83d'"#).is_err());
        assert!(parse_expr(r#"title == '\u12'"#).is_err());
    }

    #[test]
    fn test_lex_numbers() {
        let literal = |source: &str| match parse_expr(&format!("n == {}", source)).unwrap() {
            Expr::Compare { rhs, .. } => rhs,
            other => panic!("expected compare, got {:?}", other),
        };

        assert_eq!(literal("42"), Operand::Literal(json!(42)));
        assert_eq!(literal("-7"), Operand::Literal(json!(-7)));
        assert_eq!(literal("2.5"), Operand::Literal(json!(2.5)));
        assert_eq!(literal("1e-7"), Operand::Literal(json!(1e-7)));
        assert_eq!(literal("1.5E+3"), Operand::Literal(json!(1500.0)));

        let err = parse_expr("n == 99999999999999999999").unwrap_err();
        assert!(matches!(err, Error::ExprParse { offset: 5, .. }));
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_expr("owner_id == ").unwrap_err();
        assert!(matches!(err, Error::ExprParse { offset: 12, .. }));

        assert!(parse_expr("title matches '('").is_err());
        assert!(parse_expr("'unterminated").is_err());
        assert!(parse_expr("a == 1 b").is_err());
        assert!(parse_expr("session.user == 'x'").is_err());
        assert!(parse_expr("length(title) != 3").is_err());
        let err = parse_expr("a # b").unwrap_err();
        assert!(matches!(err, Error::ExprParse { offset: 2, .. }));

        let err = parse_expr("title == 'open").unwrap_err();
        assert!(matches!(err, Error::ExprParse { offset: 9, .. }));
    }
}
