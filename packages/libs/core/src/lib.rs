//! rowgate-core: 행 단위(row-level) 권한 정책 엔진
//!
//! 이 크레이트는 공유 데이터셋(accounts, discussions, replies, likes)에 대한
//! 모든 데이터 접근 시도를 선언형 정책으로 판정합니다.
//!
//! # 모듈 구조
//!
//! - `schema`: 테이블 스키마 카탈로그 (정책 검증 기준)
//! - `permissions`: 표현식 평가, 정책 저장소, 역할 판별, 판정 엔진, 감사 로그
//! - `error`: 공통 에러 타입

pub mod error;
pub mod permissions;
pub mod schema;

pub use error::{Error, Result};
