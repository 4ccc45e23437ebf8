//! 오탐 게이트 — 후보 알림을 커밋 전에 거릅니다.
//!
//! 게이트는 교체 가능한 정책입니다
//! ([`FalsePositiveGate`](hostwatch_core::pipeline::FalsePositiveGate)).
//! 기본 구현 [`AllowListGate`]는 양성 도메인/호스트 허용 목록으로
//! 동작합니다. 게이트 내부 오류 처리는 호출자(네트워크 모니터)가
//! `fail_open` 설정으로 결정합니다 — 게이트는 에러만 보고합니다.

use hostwatch_core::error::GateError;
use hostwatch_core::pipeline::FalsePositiveGate;
use hostwatch_core::types::Alert;

/// 허용 목록 기반 오탐 게이트
///
/// 알림의 도메인성 추가 필드(`query`, `host`, `sni`)가 양성 도메인
/// 접미사와 일치하거나 양성 호스트와 정확히 일치하면 억제합니다.
/// 목록 비교 외의 상태가 없으므로 결정적이고 부수 효과가 없습니다.
pub struct AllowListGate {
    benign_domains: Vec<String>,
    benign_hosts: Vec<String>,
}

impl AllowListGate {
    /// 설정에서 받은 허용 목록으로 게이트를 생성합니다.
    pub fn new(benign_domains: Vec<String>, benign_hosts: Vec<String>) -> Self {
        Self {
            benign_domains: benign_domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            benign_hosts: benign_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    /// 알림에서 도메인성 필드를 추출합니다.
    fn domain_fields<'a>(alert: &'a Alert) -> impl Iterator<Item = &'a str> {
        ["query", "host", "sni"]
            .into_iter()
            .filter_map(|key| alert.extra.get(key).map(String::as_str))
            .filter(|value| *value != "absent")
    }
}

impl FalsePositiveGate for AllowListGate {
    fn name(&self) -> &str {
        "allow-list"
    }

    fn suppress(&self, candidate: &Alert) -> Result<bool, GateError> {
        for value in Self::domain_fields(candidate) {
            let value_lower = value.to_ascii_lowercase();

            if self.benign_hosts.iter().any(|host| *host == value_lower) {
                tracing::debug!(
                    technique_id = %candidate.technique_id,
                    value = %value,
                    "candidate suppressed by benign host list"
                );
                return Ok(true);
            }

            let is_benign_domain = self.benign_domains.iter().any(|domain| {
                value_lower == *domain || value_lower.ends_with(&format!(".{domain}"))
            });
            if is_benign_domain {
                tracing::debug!(
                    technique_id = %candidate.technique_id,
                    value = %value,
                    "candidate suppressed by benign domain list"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}
