//! 집계 저장소 — 모든 워커가 공유하는 스레드 안전 통계
//!
//! [`AggregationStore`]는 세 서브시스템(네트워크, 정적 분석, 파일 모니터)의
//! 스냅샷과 알림 이력을 단일 lock 아래에서 관리합니다. 쓰기는 각 모듈
//! 워커가, 읽기는 콘솔 협력자가 수행합니다.
//!
//! # 일관성 규칙
//! - 헤드라인 카운터는 덮어쓰고(set), 카테고리 맵은 키 단위로 병합하며,
//!   차단 주소 집합은 합집합합니다. 같은 통계로 두 번 갱신해도 결과
//!   카운터는 동일합니다.
//! - 이력은 append-only이며 길이가 [`HISTORY_CAPACITY`]를 넘으면 가장
//!   오래된 샘플부터 제거됩니다 (삽입 순서 = 시간 순서).
//! - getter는 항상 독립 복사본을 반환합니다. 반환값을 수정해도 내부
//!   상태에 영향이 없습니다.
//!
//! 단일 coarse lock은 서브시스템 간 일관된 시점 읽기를 보장합니다.
//! 스냅샷이 작고 쓰기가 배치(네트워크는 패킷 10개마다 플러시)라서
//! 경합 비용은 수용 가능한 수준입니다.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde::Serialize;

/// 이력 버퍼 최대 길이
pub const HISTORY_CAPACITY: usize = 100;

/// 기본 프로토콜 분포 카테고리
const PROTOCOL_CATEGORIES: [&str; 6] = ["HTTP", "DNS", "FTP", "SSH", "SMTP", "Other"];

/// 기본 변경 종류 카테고리
const CHANGE_CATEGORIES: [&str; 4] = ["created", "modified", "deleted", "accessed"];

/// 시간 순서 이력 샘플
#[derive(Debug, Clone, Serialize)]
pub struct HistorySample {
    /// 샘플 시각
    pub timestamp: SystemTime,
    /// 샘플 값 (트래픽 바이트, 변경 건수 등)
    pub value: u64,
    /// 부가 설명 (탐지 내용, 변경 경로 등)
    pub detail: Option<String>,
}

impl HistorySample {
    /// 현재 시각의 샘플을 생성합니다.
    pub fn now(value: u64, detail: Option<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            value,
            detail,
        }
    }
}

/// 네트워크 서브시스템 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    /// 분석한 패킷 수
    pub packets_analyzed: u64,
    /// 의심 연결 수
    pub suspicious_connections: u64,
    /// 차단 대상으로 기록된 주소 집합
    pub blocked_ips: HashSet<IpAddr>,
    /// 프로토콜 분포
    pub protocol_stats: HashMap<String, u64>,
    /// 트래픽 이력 (최근 100개)
    pub traffic_history: VecDeque<HistorySample>,
}

impl Default for NetworkSnapshot {
    fn default() -> Self {
        Self {
            packets_analyzed: 0,
            suspicious_connections: 0,
            blocked_ips: HashSet::new(),
            protocol_stats: PROTOCOL_CATEGORIES
                .iter()
                .map(|c| ((*c).to_owned(), 0))
                .collect(),
            traffic_history: VecDeque::new(),
        }
    }
}

/// 네트워크 통계 갱신 입력
///
/// 생산자(네트워크 모니터 워커)가 자신의 누적 통계를 그대로 전달합니다.
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_analyzed: u64,
    pub suspicious_connections: u64,
    pub blocked_ips: HashSet<IpAddr>,
    pub protocol_stats: HashMap<String, u64>,
    /// 이번 구간의 트래픽 샘플 (있으면 이력에 추가)
    pub traffic_sample: Option<HistorySample>,
}

/// 정적 분석 서브시스템 스냅샷
#[derive(Debug, Clone, Default, Serialize)]
pub struct StaticAnalysisSnapshot {
    /// 분석한 파일 수
    pub files_analyzed: u64,
    /// 악성 판정 수
    pub malicious_files: u64,
    /// 의심 판정 수
    pub suspicious_files: u64,
    /// 파일 유형 분포
    pub file_types: HashMap<String, u64>,
    /// 탐지 이력 (최근 100개)
    pub detection_history: VecDeque<HistorySample>,
}

/// 정적 분석 통계 갱신 입력
#[derive(Debug, Clone, Default)]
pub struct StaticAnalysisStats {
    pub files_analyzed: u64,
    pub malicious_files: u64,
    pub suspicious_files: u64,
    pub file_types: HashMap<String, u64>,
    /// 이번 판정의 탐지 샘플 (있으면 이력에 추가)
    pub detection_sample: Option<HistorySample>,
}

/// 파일 모니터 서브시스템 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct FileMonitorSnapshot {
    /// 감시 중인 디렉토리 수
    pub monitored_dirs: u64,
    /// 감시 경로 아래 전체 파일 수
    pub total_files: u64,
    /// 의심 변경 수
    pub suspicious_changes: u64,
    /// 변경 종류 분포
    pub change_types: HashMap<String, u64>,
    /// 변경 이력 (최근 100개)
    pub change_history: VecDeque<HistorySample>,
}

impl Default for FileMonitorSnapshot {
    fn default() -> Self {
        Self {
            monitored_dirs: 0,
            total_files: 0,
            suspicious_changes: 0,
            change_types: CHANGE_CATEGORIES
                .iter()
                .map(|c| ((*c).to_owned(), 0))
                .collect(),
            change_history: VecDeque::new(),
        }
    }
}

/// 파일 모니터 통계 갱신 입력
#[derive(Debug, Clone, Default)]
pub struct FileMonitorStats {
    pub monitored_dirs: u64,
    pub total_files: u64,
    pub suspicious_changes: u64,
    pub change_types: HashMap<String, u64>,
    /// 이번 변경의 이력 샘플 (있으면 이력에 추가)
    pub change_sample: Option<HistorySample>,
}

/// 알림 이력 레코드
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    /// 기록 시각
    pub timestamp: SystemTime,
    /// 알림 메시지
    pub message: String,
}

/// lock 내부 상태
#[derive(Debug, Default)]
struct Inner {
    network: NetworkSnapshot,
    static_analysis: StaticAnalysisSnapshot,
    file_monitor: FileMonitorSnapshot,
    alert_history: VecDeque<AlertRecord>,
}

/// 스레드 안전 집계 저장소
///
/// 단일 mutex가 세 스냅샷과 알림 이력 전체를 보호합니다.
#[derive(Debug, Default)]
pub struct AggregationStore {
    inner: Mutex<Inner>,
}

impl AggregationStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 네트워크 통계를 갱신합니다.
    pub fn update_network(&self, stats: NetworkStats) {
        let mut inner = self.lock();
        tracing::debug!(
            packets = stats.packets_analyzed,
            suspicious = stats.suspicious_connections,
            "updating network stats"
        );
        inner.network.packets_analyzed = stats.packets_analyzed;
        inner.network.suspicious_connections = stats.suspicious_connections;
        inner.network.blocked_ips.extend(stats.blocked_ips);
        for (protocol, count) in stats.protocol_stats {
            inner.network.protocol_stats.insert(protocol, count);
        }
        if let Some(sample) = stats.traffic_sample {
            push_bounded(&mut inner.network.traffic_history, sample);
        }
    }

    /// 정적 분석 통계를 갱신합니다.
    pub fn update_static(&self, stats: StaticAnalysisStats) {
        let mut inner = self.lock();
        tracing::debug!(
            files = stats.files_analyzed,
            malicious = stats.malicious_files,
            "updating static analysis stats"
        );
        inner.static_analysis.files_analyzed = stats.files_analyzed;
        inner.static_analysis.malicious_files = stats.malicious_files;
        inner.static_analysis.suspicious_files = stats.suspicious_files;
        for (file_type, count) in stats.file_types {
            inner.static_analysis.file_types.insert(file_type, count);
        }
        if let Some(sample) = stats.detection_sample {
            push_bounded(&mut inner.static_analysis.detection_history, sample);
        }
    }

    /// 파일 모니터 통계를 갱신합니다.
    pub fn update_file(&self, stats: FileMonitorStats) {
        let mut inner = self.lock();
        tracing::debug!(
            total_files = stats.total_files,
            "updating file monitor stats"
        );
        inner.file_monitor.monitored_dirs = stats.monitored_dirs;
        inner.file_monitor.total_files = stats.total_files;
        inner.file_monitor.suspicious_changes = stats.suspicious_changes;
        for (change_type, count) in stats.change_types {
            inner.file_monitor.change_types.insert(change_type, count);
        }
        if let Some(sample) = stats.change_sample {
            push_bounded(&mut inner.file_monitor.change_history, sample);
        }
    }

    /// 알림 이력에 메시지를 추가합니다.
    pub fn add_alert(&self, message: impl Into<String>) {
        let record = AlertRecord {
            timestamp: SystemTime::now(),
            message: message.into(),
        };
        let mut inner = self.lock();
        if inner.alert_history.len() >= HISTORY_CAPACITY {
            inner.alert_history.pop_front();
        }
        inner.alert_history.push_back(record);
    }

    /// 네트워크 스냅샷 복사본을 반환합니다.
    pub fn network(&self) -> NetworkSnapshot {
        self.lock().network.clone()
    }

    /// 정적 분석 스냅샷 복사본을 반환합니다.
    pub fn static_analysis(&self) -> StaticAnalysisSnapshot {
        self.lock().static_analysis.clone()
    }

    /// 파일 모니터 스냅샷 복사본을 반환합니다.
    pub fn file_monitor(&self) -> FileMonitorSnapshot {
        self.lock().file_monitor.clone()
    }

    /// 알림 이력 복사본을 반환합니다.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.lock().alert_history.iter().cloned().collect()
    }

    /// 내부 lock을 획득합니다. poison 상태는 복구하여 계속 사용합니다.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 이력 버퍼에 샘플을 추가하고, 용량을 넘으면 가장 오래된 샘플을 제거합니다.
fn push_bounded(history: &mut VecDeque<HistorySample>, sample: HistorySample) {
    if history.len() >= HISTORY_CAPACITY {
        history.pop_front();
    }
    history.push_back(sample);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn network_stats_with_sample(value: u64) -> NetworkStats {
        NetworkStats {
            packets_analyzed: value,
            traffic_sample: Some(HistorySample::now(value, None)),
            ..NetworkStats::default()
        }
    }

    #[test]
    fn new_store_has_default_categories() {
        let store = AggregationStore::new();
        let network = store.network();
        assert_eq!(network.packets_analyzed, 0);
        assert_eq!(network.protocol_stats.get("HTTP"), Some(&0));
        assert_eq!(network.protocol_stats.get("Other"), Some(&0));

        let file = store.file_monitor();
        assert_eq!(file.change_types.get("created"), Some(&0));
        assert_eq!(file.change_types.get("accessed"), Some(&0));
    }

    #[test]
    fn headline_counters_are_set_not_incremented() {
        let store = AggregationStore::new();
        let stats = NetworkStats {
            packets_analyzed: 50,
            suspicious_connections: 3,
            ..NetworkStats::default()
        };
        store.update_network(stats.clone());
        store.update_network(stats);
        let snapshot = store.network();
        assert_eq!(snapshot.packets_analyzed, 50);
        assert_eq!(snapshot.suspicious_connections, 3);
    }

    #[test]
    fn protocol_stats_merge_per_key() {
        let store = AggregationStore::new();
        store.update_network(NetworkStats {
            protocol_stats: HashMap::from([("DNS".to_owned(), 7)]),
            ..NetworkStats::default()
        });
        store.update_network(NetworkStats {
            protocol_stats: HashMap::from([("HTTP".to_owned(), 2)]),
            ..NetworkStats::default()
        });
        let snapshot = store.network();
        // 이전 갱신의 키는 유지되고 새 키만 덮어씀
        assert_eq!(snapshot.protocol_stats.get("DNS"), Some(&7));
        assert_eq!(snapshot.protocol_stats.get("HTTP"), Some(&2));
        assert_eq!(snapshot.protocol_stats.get("FTP"), Some(&0));
    }

    #[test]
    fn blocked_ips_accumulate_as_union() {
        let store = AggregationStore::new();
        store.update_network(NetworkStats {
            blocked_ips: HashSet::from(["10.0.0.1".parse().unwrap()]),
            ..NetworkStats::default()
        });
        store.update_network(NetworkStats {
            blocked_ips: HashSet::from([
                "10.0.0.1".parse().unwrap(),
                "10.0.0.2".parse().unwrap(),
            ]),
            ..NetworkStats::default()
        });
        assert_eq!(store.network().blocked_ips.len(), 2);
    }

    #[test]
    fn history_never_exceeds_capacity() {
        let store = AggregationStore::new();
        for i in 0..250 {
            store.update_network(network_stats_with_sample(i));
        }
        let history = store.network().traffic_history;
        assert_eq!(history.len(), HISTORY_CAPACITY);
    }

    #[test]
    fn history_retains_most_recent_in_arrival_order() {
        let store = AggregationStore::new();
        for i in 0..150u64 {
            store.update_network(network_stats_with_sample(i));
        }
        let history = store.network().traffic_history;
        let values: Vec<u64> = history.iter().map(|s| s.value).collect();
        let expected: Vec<u64> = (50..150).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn snapshot_is_structurally_independent() {
        let store = AggregationStore::new();
        store.update_network(NetworkStats {
            packets_analyzed: 10,
            ..NetworkStats::default()
        });

        let mut snapshot = store.network();
        snapshot.packets_analyzed = 9999;
        snapshot.protocol_stats.insert("HTTP".to_owned(), 9999);
        snapshot
            .blocked_ips
            .insert("192.168.1.1".parse().unwrap());

        let fresh = store.network();
        assert_eq!(fresh.packets_analyzed, 10);
        assert_eq!(fresh.protocol_stats.get("HTTP"), Some(&0));
        assert!(fresh.blocked_ips.is_empty());
    }

    #[test]
    fn static_analysis_update_and_detection_history() {
        let store = AggregationStore::new();
        store.update_static(StaticAnalysisStats {
            files_analyzed: 4,
            malicious_files: 1,
            suspicious_files: 2,
            file_types: HashMap::from([("executable".to_owned(), 3)]),
            detection_sample: Some(HistorySample::now(
                1,
                Some("/tmp/malware.exe [executable] malicious".to_owned()),
            )),
        });
        let snapshot = store.static_analysis();
        assert_eq!(snapshot.files_analyzed, 4);
        assert_eq!(snapshot.malicious_files, 1);
        assert_eq!(snapshot.file_types.get("executable"), Some(&3));
        assert_eq!(snapshot.detection_history.len(), 1);
        assert!(
            snapshot.detection_history[0]
                .detail
                .as_deref()
                .unwrap()
                .contains("malware.exe")
        );
    }

    #[test]
    fn file_monitor_update_and_change_history() {
        let store = AggregationStore::new();
        store.update_file(FileMonitorStats {
            monitored_dirs: 2,
            total_files: 120,
            suspicious_changes: 1,
            change_types: HashMap::from([("created".to_owned(), 5)]),
            change_sample: Some(HistorySample::now(1, Some("created /tmp/a.exe".to_owned()))),
        });
        let snapshot = store.file_monitor();
        assert_eq!(snapshot.monitored_dirs, 2);
        assert_eq!(snapshot.total_files, 120);
        assert_eq!(snapshot.change_types.get("created"), Some(&5));
        assert_eq!(snapshot.change_types.get("deleted"), Some(&0));
        assert_eq!(snapshot.change_history.len(), 1);
    }

    #[test]
    fn alert_history_bounded_at_capacity() {
        let store = AggregationStore::new();
        for i in 0..130 {
            store.add_alert(format!("alert {i}"));
        }
        let alerts = store.alerts();
        assert_eq!(alerts.len(), HISTORY_CAPACITY);
        assert_eq!(alerts[0].message, "alert 30");
        assert_eq!(alerts[99].message, "alert 129");
    }

    #[test]
    fn alerts_returns_copy() {
        let store = AggregationStore::new();
        store.add_alert("original");
        let mut alerts = store.alerts();
        alerts.push(AlertRecord {
            timestamp: SystemTime::now(),
            message: "injected".to_owned(),
        });
        assert_eq!(store.alerts().len(), 1);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let store = Arc::new(AggregationStore::new());
        let mut handles = Vec::new();

        for t in 0..4u64 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    store.update_network(network_stats_with_sample(t * 100 + i));
                    store.add_alert(format!("t{t} alert {i}"));
                    let _ = store.network();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("writer thread panicked");
        }

        let network = store.network();
        assert_eq!(network.traffic_history.len(), HISTORY_CAPACITY);
        assert_eq!(store.alerts().len(), HISTORY_CAPACITY);
    }
}
