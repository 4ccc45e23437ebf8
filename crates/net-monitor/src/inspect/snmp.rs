//! SNMP 검사기 — 기본 커뮤니티 문자열 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1602";
const TECHNIQUE: &str = "Data from Configuration Repository";

/// 공장 출하 기본 커뮤니티 문자열
const DEFAULT_COMMUNITIES: [&str; 2] = ["public", "private"];

/// SNMP 요청 검사기
pub struct SnmpInspector;

impl ProtocolInspector for SnmpInspector {
    fn name(&self) -> &str {
        "snmp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("snmp") {
            return Ok(None);
        }

        let community =
            packet
                .field("snmp", "community")
                .ok_or_else(|| InspectError::MissingField {
                    layer: "snmp".to_owned(),
                    field: "community".to_owned(),
                })?;

        if !DEFAULT_COMMUNITIES.contains(&community.to_ascii_lowercase().as_str()) {
            return Ok(None);
        }

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!("SNMP request with default community string '{community}'"),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("community", community);

        if let Some(version) = packet.field("snmp", "version") {
            alert = alert.with_extra("version", version);
        }

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snmp_packet(community: &str) -> DecodedPacket {
        DecodedPacket::new("10.0.0.30".parse().unwrap(), "10.0.0.1".parse().unwrap())
            .with_ports(50111, 161)
            .with_protocol(17)
            .with_field("snmp", "community", community)
    }

    #[test]
    fn flags_default_community_strings() {
        for community in ["public", "Private"] {
            let alert = SnmpInspector
                .inspect(&snmp_packet(community))
                .unwrap()
                .unwrap();
            assert_eq!(alert.technique_id, "T1602");
        }
    }

    #[test]
    fn ignores_custom_community() {
        assert!(
            SnmpInspector
                .inspect(&snmp_packet("s3cret-community"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_community_is_an_error() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_layer("snmp");
        assert!(SnmpInspector.inspect(&packet).is_err());
    }
}
