//! DHCP 검사기 — 비인가 서버 활동 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1557";
const TECHNIQUE: &str = "Adversary-in-the-Middle";

/// DHCP 서버 측 메시지 검사기
///
/// OFFER/ACK는 서버만 보내는 메시지이므로, 어떤 주소가 서버로
/// 행동하는지 알림으로 남깁니다. 비인가(rogue) DHCP 서버 판별은
/// 게이트/분석가의 몫입니다.
pub struct DhcpInspector;

impl ProtocolInspector for DhcpInspector {
    fn name(&self) -> &str {
        "dhcp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("dhcp") {
            return Ok(None);
        }

        let message_type =
            packet
                .field("dhcp", "message_type")
                .ok_or_else(|| InspectError::MissingField {
                    layer: "dhcp".to_owned(),
                    field: "message_type".to_owned(),
                })?;

        let message_lower = message_type.to_ascii_lowercase();
        if message_lower != "offer" && message_lower != "ack" {
            return Ok(None);
        }

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "DHCP {message_lower} from {} - verify this is an authorized DHCP server",
                packet.src_ip
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("message_type", message_lower)
        .with_extra("server_ip", packet.src_ip.to_string());

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhcp_packet(message_type: &str) -> DecodedPacket {
        DecodedPacket::new("192.168.0.1".parse().unwrap(), "192.168.0.77".parse().unwrap())
            .with_ports(67, 68)
            .with_protocol(17)
            .with_field("dhcp", "message_type", message_type)
    }

    #[test]
    fn flags_offer_and_ack() {
        for message in ["offer", "ACK"] {
            let alert = DhcpInspector
                .inspect(&dhcp_packet(message))
                .unwrap()
                .unwrap();
            assert_eq!(alert.technique_id, "T1557");
            assert_eq!(
                alert.extra.get("server_ip").map(String::as_str),
                Some("192.168.0.1")
            );
        }
    }

    #[test]
    fn ignores_client_messages() {
        assert!(
            DhcpInspector
                .inspect(&dhcp_packet("discover"))
                .unwrap()
                .is_none()
        );
        assert!(
            DhcpInspector
                .inspect(&dhcp_packet("request"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_message_type_is_an_error() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_layer("dhcp");
        assert!(DhcpInspector.inspect(&packet).is_err());
    }
}
