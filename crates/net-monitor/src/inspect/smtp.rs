//! SMTP 검사기 — 실행 파일 첨부 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1071.003";
const TECHNIQUE: &str = "Application Layer Protocol: Mail Protocols";

/// 메일 첨부로 위험한 확장자
const RISKY_ATTACHMENT_EXTENSIONS: [&str; 4] = [".exe", ".js", ".vbs", ".scr"];

/// SMTP 트래픽 검사기
pub struct SmtpInspector;

impl ProtocolInspector for SmtpInspector {
    fn name(&self) -> &str {
        "smtp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("smtp") {
            return Ok(None);
        }

        let Some(attachment) = packet.field("smtp", "attachment") else {
            return Ok(None);
        };

        let attachment_lower = attachment.to_ascii_lowercase();
        if !RISKY_ATTACHMENT_EXTENSIONS
            .iter()
            .any(|ext| attachment_lower.ends_with(ext))
        {
            return Ok(None);
        }

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!("SMTP message carries executable attachment: {attachment}"),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("attachment", attachment);

        if let Some(mail_from) = packet.field("smtp", "mail_from") {
            alert = alert.with_extra("mail_from", mail_from);
        }

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_packet(attachment: Option<&str>) -> DecodedPacket {
        let mut packet =
            DecodedPacket::new("192.168.0.15".parse().unwrap(), "203.0.113.25".parse().unwrap())
                .with_ports(47211, 25)
                .with_layer("smtp");
        if let Some(name) = attachment {
            packet = packet.with_field("smtp", "attachment", name);
        }
        packet
    }

    #[test]
    fn flags_executable_attachment() {
        let packet = smtp_packet(Some("invoice.EXE")).with_field(
            "smtp",
            "mail_from",
            "billing@example.com",
        );
        let alert = SmtpInspector.inspect(&packet).unwrap().unwrap();
        assert_eq!(alert.technique_id, "T1071.003");
        assert_eq!(
            alert.extra.get("mail_from").map(String::as_str),
            Some("billing@example.com")
        );
    }

    #[test]
    fn ignores_document_attachments() {
        assert!(
            SmtpInspector
                .inspect(&smtp_packet(Some("report.pdf")))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn ignores_mail_without_attachment() {
        assert!(SmtpInspector.inspect(&smtp_packet(None)).unwrap().is_none());
    }

    #[test]
    fn ignores_non_smtp_packets() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_layer("http");
        assert!(SmtpInspector.inspect(&packet).unwrap().is_none());
    }
}
