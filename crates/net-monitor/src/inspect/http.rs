//! HTTP 검사기 — 의심 호스트 토큰 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1071.001";
const TECHNIQUE: &str = "Application Layer Protocol: Web Protocols";

/// 호스트명에 포함되면 의심으로 보는 토큰
const SUSPICIOUS_HOST_TOKENS: [&str; 3] = ["suspicious", "malware", "phish"];

/// HTTP 요청 검사기
pub struct HttpInspector;

impl ProtocolInspector for HttpInspector {
    fn name(&self) -> &str {
        "http"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("http") {
            return Ok(None);
        }

        let host = packet
            .field("http", "host")
            .ok_or_else(|| InspectError::MissingField {
                layer: "http".to_owned(),
                field: "host".to_owned(),
            })?;

        let host_lower = host.to_ascii_lowercase();
        let Some(token) = SUSPICIOUS_HOST_TOKENS
            .iter()
            .find(|token| host_lower.contains(*token))
        else {
            return Ok(None);
        };

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!("HTTP request to suspicious host: {host}"),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("host", host)
        .with_extra("matched_token", *token);

        if let Some(uri) = packet.field("http", "request_uri") {
            alert = alert.with_extra("request_uri", uri);
        }

        Ok(Some(alert))
    }
}
