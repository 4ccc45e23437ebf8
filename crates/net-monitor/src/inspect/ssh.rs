//! SSH 검사기 — 비표준 포트의 SSH 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1021.004";
const TECHNIQUE: &str = "Remote Services: SSH";

const SSH_PORT: u16 = 22;

/// SSH 트래픽 검사기
///
/// 표준 포트(22)의 SSH는 정상 운영 트래픽으로 보고, 다른 포트에서
/// SSH 배너가 관측되면 터널링/우회 의심으로 후보를 올립니다.
pub struct SshInspector;

impl ProtocolInspector for SshInspector {
    fn name(&self) -> &str {
        "ssh"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("ssh") {
            return Ok(None);
        }

        if packet.dst_port == SSH_PORT {
            return Ok(None);
        }

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "SSH traffic on non-standard port {} ({} -> {})",
                packet.dst_port, packet.src_ip, packet.dst_ip
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("dst_port", packet.dst_port.to_string());

        if let Some(banner) = packet.field("ssh", "protocol") {
            alert = alert.with_extra("banner", banner);
        }

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_packet(dst_port: u16) -> DecodedPacket {
        DecodedPacket::new("10.0.0.8".parse().unwrap(), "203.0.113.40".parse().unwrap())
            .with_ports(51999, dst_port)
            .with_protocol(6)
            .with_field("ssh", "protocol", "SSH-2.0-OpenSSH_9.6")
    }

    #[test]
    fn flags_ssh_on_nonstandard_port() {
        let alert = SshInspector.inspect(&ssh_packet(2222)).unwrap().unwrap();
        assert_eq!(alert.technique_id, "T1021.004");
        assert_eq!(alert.extra.get("dst_port").map(String::as_str), Some("2222"));
        assert!(alert.extra.get("banner").unwrap().contains("OpenSSH"));
    }

    #[test]
    fn ignores_ssh_on_standard_port() {
        assert!(SshInspector.inspect(&ssh_packet(22)).unwrap().is_none());
    }

    #[test]
    fn ignores_non_ssh_packets() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_ports(50000, 2222)
            .with_layer("tcp");
        assert!(SshInspector.inspect(&packet).unwrap().is_none());
    }
}
