//! Telnet 검사기

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1021";
const TECHNIQUE: &str = "Remote Services: Telnet";

const TELNET_PORT: u16 = 23;

/// Telnet 세션 검사기
///
/// Telnet은 자격증명과 세션 전체가 평문이므로 관측 즉시 후보를 올립니다.
pub struct TelnetInspector;

impl ProtocolInspector for TelnetInspector {
    fn name(&self) -> &str {
        "telnet"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("telnet") && packet.dst_port != TELNET_PORT {
            return Ok(None);
        }

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "Telnet session traffic from {} to {}:{} - cleartext remote administration",
                packet.src_ip, packet.dst_ip, packet.dst_port
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("dst_port", packet.dst_port.to_string());

        Ok(Some(alert))
    }
}
