#![doc = include_str!("../README.md")]
//!
//! # 상태 전이
//!
//! ```text
//! Created  -> (분석 가능 확장자면) 정적 분석 디스패치
//! Modified -> (분석 가능 확장자면) 정적 분석 디스패치
//! Deleted  -> 터미널 — 집계만, 분석 없음
//! ```
//!
//! 이벤트 전달 경로는 절대 분석을 기다리지 않습니다. 분석 작업은
//! 채널로 넘기고 즉시 다음 이벤트를 처리합니다.

pub mod error;
pub mod reactor;
pub mod watcher;

// --- 주요 타입 re-export ---

pub use error::ReactorError;
pub use reactor::{ANALYZABLE_EXTENSIONS, FileReactor, FileReactorBuilder};
pub use watcher::FsWatcher;
