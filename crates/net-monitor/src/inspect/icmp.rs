//! ICMP 검사기 — 터널링/디스커버리 의심 트래픽
//!
//! ICMP는 데이터 은닉 채널(터널링)과 호스트 탐색에 흔히 쓰이므로
//! 모든 ICMP 패킷을 후보 알림으로 올립니다. 유형/코드/크기를
//! 추가 필드로 남겨 게이트와 분석가가 판단할 수 있게 합니다.

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1040";
const TECHNIQUE: &str = "ICMP Tunneling or Discovery";

/// ICMP 트래픽 검사기
pub struct IcmpInspector;

impl ProtocolInspector for IcmpInspector {
    fn name(&self) -> &str {
        "icmp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("icmp") {
            return Ok(None);
        }

        let icmp_type = packet.field("icmp", "type").unwrap_or("unknown");
        let icmp_code = packet.field("icmp", "code").unwrap_or("unknown");
        let size = packet.size;

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "ICMP packet detected - Type: {icmp_type}, Code: {icmp_code}, Size: {size} bytes"
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("icmp_type", icmp_type)
        .with_extra("icmp_code", icmp_code)
        .with_extra("packet_size", size.to_string());

        Ok(Some(alert))
    }
}
