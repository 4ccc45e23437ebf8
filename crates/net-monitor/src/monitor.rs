//! 네트워크 모니터 워커 — 패킷 채널 소비와 알림 커밋 경로
//!
//! [`NetworkMonitor`]는 캡처/디코드 협력자가 공급하는 패킷 채널을
//! 소비하며, 패킷마다 검사기 레지스트리를 실행하고 후보 알림을
//! 게이트에 통과시킨 뒤 커밋합니다.
//!
//! # 커밋 경로
//! 1. 게이트 통과 (억제되면 여기서 끝)
//! 2. [`AlertSink`]로 내구 기록 — 성공해야 "전송됨"
//! 3. 알림 큐로 전달 (알림 처리 루프가 집계 저장소에 기록)
//! 4. 의심 연결 카운터/차단 주소 갱신
//!
//! 통계는 패킷 `flush_every_packets`개마다 집계 저장소로 플러시되고,
//! 종료 시 한 번 더 플러시됩니다.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hostwatch_core::config::{AlertConfig, NetworkConfig};
use hostwatch_core::error::{ConfigError, HostwatchError};
use hostwatch_core::event::SharedReceiver;
use hostwatch_core::pipeline::{AlertSink, FalsePositiveGate};
use hostwatch_core::store::{AggregationStore, HistorySample, NetworkStats};
use hostwatch_core::types::{Alert, DecodedPacket};

use crate::inspect::InspectorRegistry;

/// 프로토콜 분포 집계에서 개별 카테고리로 취급하는 계층
const TRACKED_PROTOCOLS: [&str; 5] = ["HTTP", "DNS", "FTP", "SSH", "SMTP"];

/// 네트워크 모니터 워커
pub struct NetworkMonitor {
    registry: InspectorRegistry,
    gate: Arc<dyn FalsePositiveGate>,
    sink: Arc<dyn AlertSink>,
    store: Arc<AggregationStore>,
    alert_tx: mpsc::Sender<Alert>,
    packet_rx: SharedReceiver<DecodedPacket>,
    flush_every_packets: u64,
    fail_open: bool,

    // 실행 중 누적 통계 (플러시 시 저장소로 전달)
    packets_analyzed: u64,
    suspicious_connections: u64,
    blocked_ips: HashSet<IpAddr>,
    protocol_stats: HashMap<String, u64>,
    suppressed: u64,
    bytes_window: u64,
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("inspectors", &self.registry.count())
            .field("flush_every_packets", &self.flush_every_packets)
            .field("fail_open", &self.fail_open)
            .field("packets_analyzed", &self.packets_analyzed)
            .field("suspicious_connections", &self.suspicious_connections)
            .field("blocked_ips", &self.blocked_ips)
            .field("protocol_stats", &self.protocol_stats)
            .field("suppressed", &self.suppressed)
            .field("bytes_window", &self.bytes_window)
            .finish()
    }
}

impl NetworkMonitor {
    /// 워커 루프를 실행합니다. 취소 토큰이 신호될 때까지 패킷을
    /// 처리하며, 종료 전에 통계를 한 번 더 플러시합니다.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            inspectors = self.registry.count(),
            gate = self.gate.name(),
            "network monitor started"
        );

        let packet_rx = Arc::clone(&self.packet_rx);
        let mut packet_rx = packet_rx.lock().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("network monitor cancelled");
                    break;
                }
                maybe_packet = packet_rx.recv() => {
                    match maybe_packet {
                        Some(packet) => self.handle_packet(&packet),
                        None => {
                            tracing::warn!("packet source closed, stopping network monitor");
                            break;
                        }
                    }
                }
            }
        }

        self.flush_stats();
        tracing::info!(
            packets = self.packets_analyzed,
            suspicious = self.suspicious_connections,
            suppressed = self.suppressed,
            "network monitor stopped"
        );
    }

    /// 단일 패킷을 처리합니다. 패킷 하나의 오류가 이후 패킷 처리를
    /// 중단시키지 않습니다.
    fn handle_packet(&mut self, packet: &DecodedPacket) {
        self.packets_analyzed += 1;
        self.bytes_window += packet.size as u64;

        let category = classify_protocol(&packet.highest_layer);
        *self.protocol_stats.entry(category).or_insert(0) += 1;

        for candidate in self.registry.inspect_all(packet) {
            self.process_candidate(candidate, packet);
        }

        if self.packets_analyzed % self.flush_every_packets == 0 {
            self.flush_stats();
        }
    }

    /// 후보 알림을 게이트에 통과시키고, 허용되면 커밋합니다.
    fn process_candidate(&mut self, candidate: Alert, packet: &DecodedPacket) {
        let suppressed = match self.gate.suppress(&candidate) {
            Ok(suppressed) => suppressed,
            Err(e) => {
                tracing::warn!(
                    gate = self.gate.name(),
                    technique_id = %candidate.technique_id,
                    error = %e,
                    fail_open = self.fail_open,
                    "gate evaluation failed, applying configured policy"
                );
                !self.fail_open
            }
        };

        if suppressed {
            self.suppressed += 1;
            tracing::debug!(
                technique_id = %candidate.technique_id,
                "candidate alert suppressed by gate"
            );
            return;
        }

        // 내구 기록이 성공해야 알림을 커밋된 것으로 간주함
        if let Err(e) = self.sink.submit(&candidate) {
            tracing::error!(
                technique_id = %candidate.technique_id,
                error = %e,
                "failed to persist alert, dropping"
            );
            return;
        }

        self.suspicious_connections += 1;
        self.blocked_ips.insert(packet.src_ip);
        tracing::info!(
            technique_id = %candidate.technique_id,
            source_ip = %candidate.source_ip,
            destination_ip = %candidate.destination_ip,
            "alert committed"
        );

        // 큐가 가득 차도 패킷 경로를 막지 않음. 알림은 이미 내구 로그에 있음.
        if let Err(e) = self.alert_tx.try_send(candidate) {
            tracing::warn!(error = %e, "alert queue full, queue entry dropped");
        }
    }

    /// 누적 통계를 집계 저장소로 플러시합니다.
    fn flush_stats(&mut self) {
        let stats = NetworkStats {
            packets_analyzed: self.packets_analyzed,
            suspicious_connections: self.suspicious_connections,
            blocked_ips: self.blocked_ips.clone(),
            protocol_stats: self.protocol_stats.clone(),
            traffic_sample: Some(HistorySample::now(self.bytes_window, None)),
        };
        self.store.update_network(stats);
        self.bytes_window = 0;
    }
}

/// 최상위 계층명을 프로토콜 분포 카테고리로 변환합니다.
fn classify_protocol(highest_layer: &str) -> String {
    let upper = highest_layer.to_ascii_uppercase();
    if TRACKED_PROTOCOLS.contains(&upper.as_str()) {
        upper
    } else {
        "Other".to_owned()
    }
}

/// 네트워크 모니터 빌더
///
/// 게이트, 알림 싱크, 집계 저장소, 채널을 조립합니다.
pub struct NetworkMonitorBuilder {
    network_config: NetworkConfig,
    alert_config: AlertConfig,
    registry: Option<InspectorRegistry>,
    gate: Option<Arc<dyn FalsePositiveGate>>,
    sink: Option<Arc<dyn AlertSink>>,
    store: Option<Arc<AggregationStore>>,
    alert_tx: Option<mpsc::Sender<Alert>>,
    packet_rx: Option<SharedReceiver<DecodedPacket>>,
}

impl NetworkMonitorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            network_config: NetworkConfig::default(),
            alert_config: AlertConfig::default(),
            registry: None,
            gate: None,
            sink: None,
            store: None,
            alert_tx: None,
            packet_rx: None,
        }
    }

    /// 네트워크 설정을 지정합니다.
    pub fn network_config(mut self, config: NetworkConfig) -> Self {
        self.network_config = config;
        self
    }

    /// 알림 설정을 지정합니다 (`fail_open` 정책에 사용).
    pub fn alert_config(mut self, config: AlertConfig) -> Self {
        self.alert_config = config;
        self
    }

    /// 검사기 레지스트리를 지정합니다. 생략하면 기본 13종을 사용합니다.
    pub fn registry(mut self, registry: InspectorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 오탐 게이트를 지정합니다 (필수).
    pub fn gate(mut self, gate: Arc<dyn FalsePositiveGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// 알림 싱크를 지정합니다 (필수).
    pub fn sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 집계 저장소를 지정합니다 (필수).
    pub fn store(mut self, store: Arc<AggregationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 알림 큐 송신측을 지정합니다 (필수).
    pub fn alert_sender(mut self, tx: mpsc::Sender<Alert>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    /// 패킷 수신 채널을 지정합니다 (필수).
    pub fn packet_receiver(mut self, rx: SharedReceiver<DecodedPacket>) -> Self {
        self.packet_rx = Some(rx);
        self
    }

    /// 모니터를 빌드합니다.
    pub fn build(self) -> Result<NetworkMonitor, HostwatchError> {
        if self.network_config.flush_every_packets == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.flush_every_packets".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        Ok(NetworkMonitor {
            registry: self.registry.unwrap_or_default(),
            gate: self.gate.ok_or_else(|| missing("gate"))?,
            sink: self.sink.ok_or_else(|| missing("sink"))?,
            store: self.store.ok_or_else(|| missing("store"))?,
            alert_tx: self.alert_tx.ok_or_else(|| missing("alert_sender"))?,
            packet_rx: self.packet_rx.ok_or_else(|| missing("packet_receiver"))?,
            flush_every_packets: self.network_config.flush_every_packets,
            fail_open: self.alert_config.fail_open,
            packets_analyzed: 0,
            suspicious_connections: 0,
            blocked_ips: HashSet::new(),
            protocol_stats: HashMap::new(),
            suppressed: 0,
            bytes_window: 0,
        })
    }
}

impl Default for NetworkMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(field: &str) -> HostwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: "required component not provided".to_owned(),
    }
    .into()
}
