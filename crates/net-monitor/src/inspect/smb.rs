//! SMB 검사기

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1021.002";
const TECHNIQUE: &str = "Remote Services: SMB/Windows Admin Shares";

const SMB_PORT: u16 = 445;

/// SMB 세션 검사기
pub struct SmbInspector;

impl ProtocolInspector for SmbInspector {
    fn name(&self) -> &str {
        "smb"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        let has_smb_layer = packet.has_layer("smb") || packet.has_layer("smb2");
        if !has_smb_layer && packet.dst_port != SMB_PORT {
            return Ok(None);
        }

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!(
                "SMB session traffic from {} to {}:{}",
                packet.src_ip, packet.dst_ip, packet.dst_port
            ),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("dst_port", packet.dst_port.to_string());

        // 관리 공유 접근은 별도 필드로 남김
        if let Some(share) = packet
            .field("smb2", "share")
            .or_else(|| packet.field("smb", "share"))
        {
            alert = alert.with_extra("share", share);
        }

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_traffic_to_smb_port() {
        let packet = DecodedPacket::new("10.0.0.3".parse().unwrap(), "10.0.0.50".parse().unwrap())
            .with_ports(49800, 445)
            .with_layer("tcp");
        let alert = SmbInspector.inspect(&packet).unwrap().unwrap();
        assert_eq!(alert.technique_id, "T1021.002");
    }

    #[test]
    fn records_admin_share_when_present() {
        let packet = DecodedPacket::new("10.0.0.3".parse().unwrap(), "10.0.0.50".parse().unwrap())
            .with_ports(49800, 445)
            .with_field("smb2", "share", r"\\10.0.0.50\ADMIN$");
        let alert = SmbInspector.inspect(&packet).unwrap().unwrap();
        assert!(alert.extra.get("share").unwrap().contains("ADMIN$"));
    }

    #[test]
    fn ignores_other_traffic() {
        let packet = DecodedPacket::new("10.0.0.3".parse().unwrap(), "10.0.0.50".parse().unwrap())
            .with_ports(49800, 80)
            .with_layer("http");
        // http 검사 대상일 뿐 smb 후보는 아님
        assert!(SmbInspector.inspect(&packet).unwrap().is_none());
    }
}
