//! RDP 검사기

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1021.001";
const TECHNIQUE: &str = "Remote Services: Remote Desktop Protocol";

const RDP_PORT: u16 = 3389;

/// RDP 연결 시도 검사기
pub struct RdpInspector;

impl ProtocolInspector for RdpInspector {
    fn name(&self) -> &str {
        "rdp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("rdp") && packet.dst_port != RDP_PORT {
            return Ok(None);
        }

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "RDP connection attempt from {} to {}:{}",
                packet.src_ip, packet.dst_ip, packet.dst_port
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("dst_port", packet.dst_port.to_string());

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_traffic_to_rdp_port() {
        let packet = DecodedPacket::new("10.0.0.9".parse().unwrap(), "10.0.0.20".parse().unwrap())
            .with_ports(51234, 3389)
            .with_protocol(6)
            .with_layer("tcp");
        let alert = RdpInspector.inspect(&packet).unwrap().unwrap();
        assert_eq!(alert.technique_id, "T1021.001");
        assert_eq!(alert.extra.get("dst_port").map(String::as_str), Some("3389"));
    }

    #[test]
    fn flags_rdp_layer_on_nonstandard_port() {
        let packet = DecodedPacket::new("10.0.0.9".parse().unwrap(), "10.0.0.20".parse().unwrap())
            .with_ports(51234, 13389)
            .with_layer("rdp");
        assert!(RdpInspector.inspect(&packet).unwrap().is_some());
    }

    #[test]
    fn ignores_other_traffic() {
        let packet = DecodedPacket::new("10.0.0.9".parse().unwrap(), "10.0.0.20".parse().unwrap())
            .with_ports(51234, 443)
            .with_layer("tcp");
        assert!(RdpInspector.inspect(&packet).unwrap().is_none());
    }
}
