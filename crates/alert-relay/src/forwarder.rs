//! 알림 전달 루프 — 로그를 tail하여 원격 수집기로 전송합니다.
//!
//! [`AlertForwarder`]는 시작 시 로그 파일의 현재 끝으로 커서를 옮기고
//! (이전 실행의 알림은 재전송하지 않음), 이후 고정 주기로 새로 추가된
//! 라인을 폴링합니다. 각 라인은 알림 문서로 파싱되어 수집기에 POST됩니다.
//!
//! # 전달 의미론
//! 성공(2xx)이든 실패든 커서는 전진합니다. 실패한 전달은 재시도하지
//! 않으며 tail 루프를 멈추지 않습니다 — 실패 시 at-most-once,
//! best-effort입니다. 불완전한(개행 없는) 마지막 라인은 다음 폴링까지
//! 남겨둡니다. 파일이 줄어들면(로테이션/truncation) 커서를 새 끝으로
//! 재설정합니다.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use hostwatch_core::types::Alert;

use crate::error::RelayError;

/// 수집기 요청 제한시간
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// 전달 루프 누적 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    /// 성공적으로 전달된 알림 수
    pub forwarded: u64,
    /// 전달에 실패한 알림 수 (커서는 전진함)
    pub failed: u64,
}

/// 알림 전달 루프 (tailer)
pub struct AlertForwarder {
    log_path: PathBuf,
    collector_url: String,
    poll_interval: Duration,
    client: reqwest::Client,
    stats: ForwarderStats,
}

impl AlertForwarder {
    /// 새 전달 루프를 생성합니다.
    pub fn new(
        log_path: impl Into<PathBuf>,
        collector_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;

        Ok(Self {
            log_path: log_path.into(),
            collector_url: collector_url.into(),
            poll_interval,
            client,
            stats: ForwarderStats::default(),
        })
    }

    /// 전달 루프를 실행합니다. 취소 토큰이 신호될 때까지 폴링하며,
    /// 종료 시 누적 통계를 반환합니다.
    pub async fn run(mut self, cancel: CancellationToken) -> ForwarderStats {
        // 시작 시점의 파일 끝으로 이동 — 이전 알림은 재생하지 않음
        let mut cursor = tokio::fs::metadata(&self.log_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        tracing::info!(
            path = %self.log_path.display(),
            collector = %self.collector_url,
            cursor,
            "alert forwarder started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("alert forwarder cancelled");
                    break;
                }
                _ = interval.tick() => {
                    cursor = self.poll_once(cursor).await;
                }
            }
        }

        tracing::info!(
            forwarded = self.stats.forwarded,
            failed = self.stats.failed,
            "alert forwarder stopped"
        );
        self.stats
    }

    /// 커서 이후의 완전한 라인을 읽어 전달하고, 새 커서를 반환합니다.
    async fn poll_once(&mut self, cursor: u64) -> u64 {
        let len = match tokio::fs::metadata(&self.log_path).await {
            Ok(meta) => meta.len(),
            // 로그 파일이 아직 없으면 다음 폴링에서 다시 확인
            Err(_) => return cursor,
        };

        if len < cursor {
            tracing::warn!(
                path = %self.log_path.display(),
                old_cursor = cursor,
                new_len = len,
                "alert log shrank (rotated or truncated), resetting cursor"
            );
            return len;
        }
        if len == cursor {
            return cursor;
        }

        let mut file = match tokio::fs::File::open(&self.log_path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open alert log for tailing");
                return cursor;
            }
        };
        if let Err(e) = file.seek(SeekFrom::Start(cursor)).await {
            tracing::warn!(error = %e, "failed to seek alert log");
            return cursor;
        }

        let mut buf = Vec::with_capacity((len - cursor) as usize);
        let mut region = file.take(len - cursor);
        if let Err(e) = region.read_to_end(&mut buf).await {
            tracing::warn!(error = %e, "failed to read alert log");
            return cursor;
        }

        let mut consumed = 0usize;
        while let Some(newline) = buf[consumed..].iter().position(|b| *b == b'\n') {
            let line = &buf[consumed..consumed + newline];
            consumed += newline + 1;

            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Alert>(line) {
                Ok(alert) => self.forward(&alert).await,
                Err(e) => {
                    // 파싱 불가 라인도 커서는 전진 — tail 루프를 멈추지 않음
                    tracing::warn!(error = %e, "skipping unparseable alert log line");
                }
            }
        }

        cursor + consumed as u64
    }

    /// 알림 한 건을 수집기로 전송합니다. 실패는 기록만 하고 재시도하지
    /// 않습니다.
    async fn forward(&mut self, alert: &Alert) {
        match self
            .client
            .post(&self.collector_url)
            .json(alert)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                self.stats.forwarded += 1;
                tracing::info!(
                    technique_id = %alert.technique_id,
                    description = %alert.description,
                    "alert forwarded"
                );
            }
            Ok(response) => {
                self.stats.failed += 1;
                tracing::error!(
                    technique_id = %alert.technique_id,
                    status = %response.status(),
                    "failed to forward alert"
                );
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::error!(
                    technique_id = %alert.technique_id,
                    error = %e,
                    "network error forwarding alert"
                );
            }
        }
    }

    /// 누적 통계를 반환합니다.
    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }
}
