//! FTP 검사기 — 평문 자격증명 전송 탐지

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1048.003";
const TECHNIQUE: &str = "Exfiltration Over Unencrypted Protocol";

/// FTP 명령 검사기
///
/// USER/PASS 명령은 자격증명이 평문으로 흐른다는 뜻이므로 후보 알림을
/// 올립니다. PASS 인자는 기록하지 않습니다.
pub struct FtpInspector;

impl ProtocolInspector for FtpInspector {
    fn name(&self) -> &str {
        "ftp"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("ftp") {
            return Ok(None);
        }

        let Some(command) = packet.field("ftp", "request_command") else {
            // 응답 전용 세그먼트는 검사 대상이 아님
            return Ok(None);
        };

        let command_upper = command.to_ascii_uppercase();
        if command_upper != "USER" && command_upper != "PASS" {
            return Ok(None);
        }

        let mut alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!("FTP {command_upper} command observed - credentials sent in cleartext"),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("command", command_upper.clone());

        // 사용자명은 남기되 비밀번호는 가림
        if command_upper == "USER" {
            if let Some(arg) = packet.field("ftp", "request_arg") {
                alert = alert.with_extra("argument", arg);
            }
        } else {
            alert = alert.with_extra("argument", "<redacted>");
        }

        Ok(Some(alert))
    }
}
