//! Tor 검사기 — 알려진 Tor 포트로의 접속 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1090.003";
const TECHNIQUE: &str = "Proxy: Multi-hop Proxy";

/// Tor 릴레이/디렉토리/SOCKS 기본 포트
const TOR_PORTS: [u16; 5] = [9001, 9030, 9050, 9051, 9150];

/// Tor 지표 검사기
pub struct TorInspector;

impl ProtocolInspector for TorInspector {
    fn name(&self) -> &str {
        "tor"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !TOR_PORTS.contains(&packet.dst_port) {
            return Ok(None);
        }

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "Connection to well-known Tor port {} ({} -> {})",
                packet.dst_port, packet.src_ip, packet.dst_ip
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

    fn packet_to_port(dst_port: u16) -> DecodedPacket {
        DecodedPacket::new("192.168.0.33".parse().unwrap(), "198.51.100.77".parse().unwrap())
            .with_ports(50333, dst_port)
            .with_protocol(6)
            .with_layer("tcp")
    }

    #[test]
    fn flags_known_tor_ports() {
        for port in TOR_PORTS {
            let alert = TorInspector
                .inspect(&packet_to_port(port))
                .unwrap()
                .unwrap();
            assert_eq!(alert.technique_id, "T1090.003");
            assert_eq!(
                alert.extra.get("dst_port").map(String::as_str),
                Some(port.to_string().as_str())
            );
        }
    }

    #[test]
    fn ignores_other_ports() {
        assert!(TorInspector.inspect(&packet_to_port(443)).unwrap().is_none());
        assert!(TorInspector.inspect(&packet_to_port(9000)).unwrap().is_none());
    }
}
