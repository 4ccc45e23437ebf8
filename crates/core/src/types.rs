//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! [`Alert`]는 탐지 파이프라인의 최종 산출물이며, 수집기 문서 형식과
//! 필드 단위로 일치하도록 직렬화됩니다.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 보안 알림
///
/// 관측된 행위가 알려진 공격 기법과 일치함을 주장하는 불변 레코드입니다.
/// 검사기가 생성한 뒤에는 절대 수정되지 않으며, 오탐 게이트를 통과하면
/// 내구 로그에 기록되고 원격 수집기로 전달됩니다.
///
/// 직렬화 형식은 수집기 계약과 동일합니다:
/// `timestamp`, `technique_id`, `technique`, `description`, `source_ip`,
/// `destination_ip`에 프로토콜별 추가 필드가 최상위에 평탄화됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 생성 시각 (UTC, RFC 3339 문자열로 직렬화)
    pub timestamp: DateTime<Utc>,
    /// 기법 식별자 (예: "T1040")
    pub technique_id: String,
    /// 기법 이름
    pub technique: String,
    /// 사람이 읽는 설명
    pub description: String,
    /// 출발지 주소
    pub source_ip: IpAddr,
    /// 목적지 주소
    pub destination_ip: IpAddr,
    /// 프로토콜별 추가 필드 (최상위에 평탄화)
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Alert {
    /// 새 알림을 생성합니다. 추가 필드는 [`with_extra`](Self::with_extra)로 붙입니다.
    pub fn new(
        technique_id: impl Into<String>,
        technique: impl Into<String>,
        description: impl Into<String>,
        source_ip: IpAddr,
        destination_ip: IpAddr,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            technique_id: technique_id.into(),
            technique: technique.into(),
            description: description.into(),
            source_ip,
            destination_ip,
            extra: BTreeMap::new(),
        }
    }

    /// 프로토콜별 추가 필드를 붙입니다.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} - {} ({} -> {})",
            self.technique_id, self.technique, self.description, self.source_ip, self.destination_ip,
        )
    }
}

/// 디코딩된 패킷
///
/// 캡처/디코드 협력자가 공급하는 입력 단위입니다. 프로토콜 계층은
/// 이름으로 접근하며([`has_layer`](Self::has_layer),
/// [`field`](Self::field)), 검사기는 이 구조체를 읽기 전용으로 공유합니다.
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    /// 출발지 IP
    pub src_ip: IpAddr,
    /// 목적지 IP
    pub dst_ip: IpAddr,
    /// 출발지 포트 (해당 없으면 0)
    pub src_port: u16,
    /// 목적지 포트 (해당 없으면 0)
    pub dst_port: u16,
    /// 전송 프로토콜 번호 (TCP=6, UDP=17, ICMP=1 등)
    pub protocol: u8,
    /// 패킷 크기 (바이트)
    pub size: usize,
    /// 최상위 프로토콜 계층명 (프로토콜 분포 집계에 사용)
    pub highest_layer: String,
    /// 계층별 디코딩된 필드 (계층명 -> 필드명 -> 값)
    pub layers: HashMap<String, HashMap<String, String>>,
    /// 캡처 시각
    pub captured_at: SystemTime,
}

impl DecodedPacket {
    /// 주소만 채운 패킷을 생성합니다. 나머지 필드는 `with_*`로 채웁니다.
    pub fn new(src_ip: IpAddr, dst_ip: IpAddr) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port: 0,
            dst_port: 0,
            protocol: 0,
            size: 0,
            highest_layer: String::new(),
            layers: HashMap::new(),
            captured_at: SystemTime::now(),
        }
    }

    /// 출발지/목적지 포트를 설정합니다.
    pub fn with_ports(mut self, src_port: u16, dst_port: u16) -> Self {
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    /// 전송 프로토콜 번호를 설정합니다.
    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    /// 패킷 크기를 설정합니다.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// 계층을 추가하고 최상위 계층명을 갱신합니다.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        let layer = layer.into();
        self.layers.entry(layer.clone()).or_default();
        self.highest_layer = layer;
        self
    }

    /// 계층 필드를 추가합니다. 계층이 없으면 함께 생성합니다.
    pub fn with_field(
        mut self,
        layer: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let layer = layer.into();
        if self.highest_layer.is_empty() {
            self.highest_layer = layer.clone();
        }
        self.layers
            .entry(layer)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// 해당 계층이 존재하는지 확인합니다.
    pub fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    /// 계층 필드 값을 조회합니다.
    pub fn field(&self, layer: &str, key: &str) -> Option<&str> {
        self.layers
            .get(layer)
            .and_then(|fields| fields.get(key))
            .map(String::as_str)
    }
}

impl fmt::Display for DecodedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} proto={} layer={} size={}",
            self.src_ip,
            self.src_port,
            self.dst_ip,
            self.dst_port,
            self.protocol,
            self.highest_layer,
            self.size,
        )
    }
}

/// 정적 분석 판정 등급
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// 이상 없음
    #[default]
    Clean,
    /// 의심스러움 — 추가 확인 필요
    Suspicious,
    /// 악성
    Malicious,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Suspicious => write!(f, "suspicious"),
            Self::Malicious => write!(f, "malicious"),
        }
    }
}

/// 정적 분석 결과
///
/// 외부 정적 분석 협력자가 반환하는 사전 채점된 판정입니다.
/// 채점 내부는 이 크레이트의 범위 밖이며, 판정만 집계에 반영됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVerdict {
    /// 분석한 파일 경로
    pub path: PathBuf,
    /// 파일 유형 라벨 (예: "executable", "script")
    pub file_type: String,
    /// 판정 등급
    pub disposition: Disposition,
}

impl fmt::Display for FileVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.path.display(),
            self.file_type,
            self.disposition,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_alert() -> Alert {
        Alert::new(
            "T1040",
            "ICMP Tunneling or Discovery",
            "ICMP packet detected",
            "10.0.0.5".parse().unwrap(),
            "8.8.8.8".parse().unwrap(),
        )
        .with_extra("icmp_type", "8")
        .with_extra("icmp_code", "0")
    }

    #[test]
    fn alert_serializes_with_flattened_extras() {
        let alert = sample_alert();
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["technique_id"], "T1040");
        assert_eq!(json["source_ip"], "10.0.0.5");
        assert_eq!(json["destination_ip"], "8.8.8.8");
        // 추가 필드는 최상위에 평탄화됨
        assert_eq!(json["icmp_type"], "8");
        assert_eq!(json["icmp_code"], "0");
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn alert_timestamp_is_utc_string() {
        let alert = sample_alert();
        let json = serde_json::to_value(&alert).unwrap();
        let ts = json["timestamp"].as_str().expect("timestamp is a string");
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z') || ts.contains('+'));
    }

    #[test]
    fn alert_roundtrip_preserves_extras() {
        let alert = sample_alert();
        let json = serde_json::to_string(&alert).unwrap();
        let parsed: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.technique_id, alert.technique_id);
        assert_eq!(parsed.extra.get("icmp_type").map(String::as_str), Some("8"));
    }

    #[test]
    fn alert_display() {
        let alert = sample_alert();
        let display = alert.to_string();
        assert!(display.contains("T1040"));
        assert!(display.contains("10.0.0.5"));
        assert!(display.contains("8.8.8.8"));
    }

    #[test]
    fn packet_layer_accessors() {
        let packet = DecodedPacket::new("192.168.0.2".parse().unwrap(), "1.1.1.1".parse().unwrap())
            .with_field("dns", "qry_name", "example.xyz");
        assert!(packet.has_layer("dns"));
        assert!(!packet.has_layer("http"));
        assert_eq!(packet.field("dns", "qry_name"), Some("example.xyz"));
        assert_eq!(packet.field("dns", "resp_name"), None);
        assert_eq!(packet.field("http", "host"), None);
    }

    #[test]
    fn packet_highest_layer_follows_last_layer() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_layer("ip")
            .with_layer("tcp")
            .with_layer("http");
        assert_eq!(packet.highest_layer, "http");
    }

    #[test]
    fn packet_display() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap())
            .with_ports(44123, 80)
            .with_protocol(6)
            .with_size(512)
            .with_layer("http");
        let display = packet.to_string();
        assert!(display.contains("10.0.0.1:44123"));
        assert!(display.contains("10.0.0.2:80"));
        assert!(display.contains("http"));
    }

    #[test]
    fn disposition_default_is_clean() {
        assert_eq!(Disposition::default(), Disposition::Clean);
    }

    #[test]
    fn file_verdict_display() {
        let verdict = FileVerdict {
            path: PathBuf::from("/tmp/malware.exe"),
            file_type: "executable".to_owned(),
            disposition: Disposition::Malicious,
        };
        let display = verdict.to_string();
        assert!(display.contains("malware.exe"));
        assert!(display.contains("malicious"));
    }
}
