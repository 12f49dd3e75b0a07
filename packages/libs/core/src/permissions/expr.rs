//! predicate 표현식 트리와 평가기
//!
//! 정책의 `using` / `with_check` 조건은 닫힌 노드 집합(비교, 불리언 결합, 필드 참조,
//! 리터럴, 문자열 형태 검증)으로 표현됩니다. 저장소 엔진 문법에 의존하지 않습니다.
//!
//! # 평가 규칙
//!
//! 내부적으로 3값 논리(true / false / unknown)를 사용합니다. NULL이나 존재하지 않는
//! 값과의 비교는 unknown이고, predicate는 명확히 true일 때만 통과합니다.
//!
//! 문자열은 글자 그대로 비교합니다. 한쪽이 timestamp 필드인 비교만 `bind`가
//! 시각 비교로 표시하며, 이때 오프셋 표기가 달라도 같은 시각이면 같습니다.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::context::RowContext;
use crate::schema::{FieldType, TableSchema};

/// 필드 참조가 가리키는 Row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    /// 평가 단계에 따라 결정 (using → existing, with_check → proposed)
    Current,
    Existing,
    Proposed,
}

/// 비교 피연산자
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Field { row: RowRef, name: String },
    ActorId,
}

/// 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// 컴파일된 정규식 패턴
#[derive(Debug, Clone)]
pub struct Pattern(regex::Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// predicate 표현식
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 리터럴 `true` / `false`
    Const(bool),

    /// `temporal`이면 문자열을 RFC 3339 시각으로 비교 (`bind`가 설정)
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
        temporal: bool,
    },

    IsNull {
        operand: Operand,
        negated: bool,
    },

    /// 리터럴 목록 포함 여부
    In {
        operand: Operand,
        list: Vec<Value>,
        temporal: bool,
    },

    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),

    /// 문자열 길이(문자 수) 범위 검증
    Length {
        operand: Operand,
        min: Option<usize>,
        max: Option<usize>,
    },

    /// 문자열 패턴 검증
    Matches {
        operand: Operand,
        pattern: Pattern,
    },
}

impl Expr {
    /// 소유권 검사 `owner_id == actor_id()`
    pub fn owner_is_actor() -> Self {
        Expr::Compare {
            op: CompareOp::Eq,
            lhs: Operand::Field {
                row: RowRef::Current,
                name: crate::schema::OWNER_ALIAS.to_string(),
            },
            rhs: Operand::ActorId,
            temporal: false,
        }
    }

    /// 시스템 우회 정책의 관례적 형태(`true`)인지
    pub fn is_trivially_true(&self) -> bool {
        matches!(self, Expr::Const(true))
    }

    /// predicate 평가
    ///
    /// 전체 함수이며 부작용이 없습니다. 명확히 true일 때만 `true`를 반환합니다.
    pub fn evaluate(&self, ctx: &RowContext<'_>) -> bool {
        self.truth(ctx) == Some(true)
    }

    /// 3값 논리 평가 (`None` = unknown)
    fn truth(&self, ctx: &RowContext<'_>) -> Option<bool> {
        match self {
            Expr::Const(b) => Some(*b),

            Expr::Compare {
                op,
                lhs,
                rhs,
                temporal,
            } => {
                let l = non_null(ctx.resolve(lhs))?;
                let r = non_null(ctx.resolve(rhs))?;
                compare_values(&l, &r, *temporal).map(|ordering| op.holds(ordering))
            }

            Expr::IsNull { operand, negated } => {
                let is_null = non_null(ctx.resolve(operand)).is_none();
                Some(is_null != *negated)
            }

            Expr::In {
                operand,
                list,
                temporal,
            } => {
                let value = non_null(ctx.resolve(operand))?;
                Some(list.iter().any(|item| {
                    compare_values(&value, item, *temporal) == Some(Ordering::Equal)
                }))
            }

            Expr::And(items) => {
                let mut unknown = false;
                for item in items {
                    match item.truth(ctx) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }

            Expr::Or(items) => {
                let mut unknown = false;
                for item in items {
                    match item.truth(ctx) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }

            Expr::Not(inner) => inner.truth(ctx).map(|b| !b),

            Expr::Length { operand, min, max } => {
                let value = non_null(ctx.resolve(operand))?;
                let len = value.as_str()?.chars().count();
                Some(min.map_or(true, |m| len >= m) && max.map_or(true, |m| len <= m))
            }

            Expr::Matches { operand, pattern } => {
                let value = non_null(ctx.resolve(operand))?;
                Some(pattern.is_match(value.as_str()?))
            }
        }
    }

    /// 테이블 스키마에 대해 predicate를 검증하고 정규화
    ///
    /// 알 수 없는 필드, 타입 불일치, 문자열이 아닌 필드에 대한 문자열 연산 등은
    /// 여기서 거부됩니다. 반환된 표현식의 필드 이름은 실제 필드 이름입니다
    /// (`owner_id` 별칭 해석 포함).
    pub fn bind(&self, table: &TableSchema) -> Result<Expr, String> {
        match self {
            Expr::Const(b) => Ok(Expr::Const(*b)),

            Expr::Compare { op, lhs, rhs, .. } => {
                let (lhs, lt) = bind_operand(lhs, table)?;
                let (rhs, rt) = bind_operand(rhs, table)?;
                let (Some(lt), Some(rt)) = (lt, rt) else {
                    return Err(format!(
                        "comparison '{} {} {}' uses null; use 'is null' instead",
                        lhs,
                        op.as_str(),
                        rhs
                    ));
                };
                if !lt.comparable_with(rt) {
                    return Err(format!(
                        "cannot compare {} with {} in '{} {} {}'",
                        lt,
                        rt,
                        lhs,
                        op.as_str(),
                        rhs
                    ));
                }
                if op.is_ordering() && !(lt.is_orderable() && rt.is_orderable()) {
                    return Err(format!("operator '{}' is not defined for {}", op.as_str(), lt));
                }
                let temporal = lt == FieldType::Timestamp || rt == FieldType::Timestamp;
                if temporal {
                    for operand in [&lhs, &rhs] {
                        if let Operand::Literal(value) = operand {
                            check_instant_literal(value)?;
                        }
                    }
                }
                Ok(Expr::Compare {
                    op: *op,
                    lhs,
                    rhs,
                    temporal,
                })
            }

            Expr::IsNull { operand, negated } => {
                let (operand, _) = bind_operand(operand, table)?;
                Ok(Expr::IsNull {
                    operand,
                    negated: *negated,
                })
            }

            Expr::In { operand, list, .. } => {
                let (operand, ty) = bind_operand(operand, table)?;
                let ty = ty.ok_or_else(|| "'in' requires a non-null operand".to_string())?;
                let temporal = ty == FieldType::Timestamp;
                for item in list {
                    match FieldType::of_literal(item) {
                        Some(item_ty) if ty.comparable_with(item_ty) => {}
                        _ => {
                            return Err(format!("list item {} is not comparable with {}", item, ty))
                        }
                    }
                    if temporal {
                        check_instant_literal(item)?;
                    }
                }
                Ok(Expr::In {
                    operand,
                    list: list.clone(),
                    temporal,
                })
            }

            Expr::And(items) => Ok(Expr::And(
                items.iter().map(|e| e.bind(table)).collect::<Result<_, _>>()?,
            )),
            Expr::Or(items) => Ok(Expr::Or(
                items.iter().map(|e| e.bind(table)).collect::<Result<_, _>>()?,
            )),
            Expr::Not(inner) => Ok(Expr::Not(Box::new(inner.bind(table)?))),

            Expr::Length { operand, min, max } => {
                let operand = bind_string_operand(operand, table, "length")?;
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(format!("length bounds are empty: {} > {}", min, max));
                    }
                }
                Ok(Expr::Length {
                    operand,
                    min: *min,
                    max: *max,
                })
            }

            Expr::Matches { operand, pattern } => Ok(Expr::Matches {
                operand: bind_string_operand(operand, table, "matches")?,
                pattern: pattern.clone(),
            }),
        }
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

/// 두 JSON 값 비교 (비교 불가능하면 None)
///
/// `temporal`이면 문자열 양쪽이 RFC 3339 시각이어야 하며, 아니면 unknown입니다.
fn compare_values(l: &Value, r: &Value, temporal: bool) -> Option<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return Some(a.cmp(&b));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) if temporal => {
            let a = chrono::DateTime::parse_from_rfc3339(a).ok()?;
            let b = chrono::DateTime::parse_from_rfc3339(b).ok()?;
            Some(a.cmp(&b))
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn check_instant_literal(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_err() => {
            Err(format!("'{}' is not an RFC 3339 timestamp", s))
        }
        _ => Ok(()),
    }
}

/// 피연산자 검증 (반환 타입이 None이면 null 리터럴)
fn bind_operand(
    operand: &Operand,
    table: &TableSchema,
) -> Result<(Operand, Option<FieldType>), String> {
    match operand {
        Operand::Literal(Value::Null) => Ok((operand.clone(), None)),
        Operand::Literal(value) => {
            let ty = FieldType::of_literal(value)
                .ok_or_else(|| format!("unsupported literal {}", value))?;
            Ok((operand.clone(), Some(ty)))
        }
        Operand::ActorId => Ok((Operand::ActorId, Some(FieldType::String))),
        Operand::Field { row, name } => {
            let field = table
                .resolve_field(name)
                .ok_or_else(|| format!("unknown field '{}' on table '{}'", name, table.name))?;
            Ok((
                Operand::Field {
                    row: *row,
                    name: field.name.clone(),
                },
                Some(field.field_type),
            ))
        }
    }
}

fn bind_string_operand(
    operand: &Operand,
    table: &TableSchema,
    op: &str,
) -> Result<Operand, String> {
    let (operand, ty) = bind_operand(operand, table)?;
    match ty {
        Some(FieldType::String) => Ok(operand),
        Some(other) => Err(format!("'{}' requires a string operand, got {}", op, other)),
        None => Err(format!("'{}' requires a non-null operand", op)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 표시 (정책 텍스트 문법으로 출력, 파서와 호환)
// ─────────────────────────────────────────────────────────────────────────────

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::ActorId => f.write_str("actor_id()"),
            Operand::Field { row, name } => match row {
                RowRef::Current => f.write_str(name),
                RowRef::Existing => write!(f, "existing.{}", name),
                RowRef::Proposed => write!(f, "proposed.{}", name),
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(b) => write!(f, "{}", b),
            Expr::Compare { op, lhs, rhs, .. } => write!(f, "{} {} {}", lhs, op.as_str(), rhs),
            Expr::IsNull { operand, negated } => {
                if *negated {
                    write!(f, "{} is not null", operand)
                } else {
                    write!(f, "{} is null", operand)
                }
            }
            Expr::In { operand, list, .. } => {
                let items: Vec<String> = list.iter().map(|v| v.to_string()).collect();
                write!(f, "{} in [{}]", operand, items.join(", "))
            }
            Expr::And(items) => write_joined(f, items, " && "),
            Expr::Or(items) => write_joined(f, items, " || "),
            Expr::Not(inner) => write!(f, "!({})", inner),
            Expr::Length { operand, min, max } => match (min, max) {
                (Some(min), Some(max)) => {
                    write!(f, "length({}) between {} and {}", operand, min, max)
                }
                (Some(min), None) => write!(f, "length({}) >= {}", operand, min),
                (None, Some(max)) => write!(f, "length({}) <= {}", operand, max),
                (None, None) => write!(f, "length({}) >= 0", operand),
            },
            Expr::Matches { operand, pattern } => {
                let pattern = Value::String(pattern.as_str().to_string());
                write!(f, "{} matches {}", operand, pattern)
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match item {
            Expr::And(_) | Expr::Or(_) => write!(f, "({})", item)?,
            _ => write!(f, "{}", item)?,
        }
    }
    Ok(())
}

impl Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
