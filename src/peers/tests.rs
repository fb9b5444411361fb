use super::stats::PeerStatTable;

const PEER_1: &str = "http://cache-server-1:9527";
const PEER_2: &str = "http://cache-server-2:9528";
const PEER_3: &str = "http://cache-server-3:9529";

fn table() -> PeerStatTable {
    PeerStatTable::new(&[
        PEER_1.to_string(),
        PEER_2.to_string(),
        PEER_3.to_string(),
    ])
}

#[test]
fn test_counters_stay_consistent() {
    let stats = table();

    stats.record(PEER_1, 10, true);
    stats.record(PEER_1, 20, false);
    stats.record(PEER_1, 30, true);

    let snapshot = stats.snapshot();
    let record = snapshot.iter().find(|p| p.addr == PEER_1).unwrap();

    // Successes and errors always sum to the request count.
    assert_eq!(record.requests, 3);
    assert_eq!(record.successes + record.errors, record.requests);
    assert_eq!(record.successes, 2);
    assert_eq!(record.errors, 1);
    assert_eq!(record.avg_latency_ms, 20.0);
}

#[test]
fn test_peers_start_healthy() {
    let stats = table();
    assert!(stats.is_healthy(PEER_1));
    assert!(stats.is_healthy(PEER_2));
    assert!(stats.is_healthy(PEER_3));
}

#[test]
fn test_mark_unhealthy_wins_over_good_numbers() {
    let stats = table();
    stats.record(PEER_2, 5, true);

    stats.mark_healthy(PEER_2, false);
    assert!(!stats.is_healthy(PEER_2));

    stats.mark_healthy(PEER_2, true);
    assert!(stats.is_healthy(PEER_2));
}

#[test]
fn test_high_error_rate_is_unhealthy() {
    let stats = table();

    // 2 errors out of 5 observations: 40% error rate.
    for _ in 0..3 {
        stats.record(PEER_3, 10, true);
    }
    for _ in 0..2 {
        stats.record(PEER_3, 10, false);
    }

    assert!(!stats.is_healthy(PEER_3));
}

#[test]
fn test_slow_peer_is_unhealthy() {
    let stats = table();

    stats.record(PEER_2, 1500, true);
    stats.record(PEER_2, 1200, true);

    assert!(!stats.is_healthy(PEER_2));
}

#[test]
fn test_unknown_peer_is_unhealthy() {
    let stats = table();
    assert!(!stats.is_healthy("http://nowhere:1"));

    // Observations for unknown peers are dropped, not created.
    stats.record("http://nowhere:1", 10, true);
    assert_eq!(stats.snapshot().len(), 3);
}

#[test]
fn test_pick_least_loaded_prefers_idle_peer() {
    let stats = table();

    stats.record(PEER_1, 100, true);
    stats.record(PEER_2, 5, true);
    // PEER_3 has no observations at all: score 0.

    assert_eq!(stats.pick_least_loaded(), Some(PEER_3.to_string()));
}

#[test]
fn test_pick_least_loaded_skips_unhealthy() {
    let stats = table();

    stats.mark_healthy(PEER_3, false);
    stats.record(PEER_1, 100, true);
    stats.record(PEER_2, 5, true);

    assert_eq!(stats.pick_least_loaded(), Some(PEER_2.to_string()));
}

#[test]
fn test_pick_least_loaded_none_when_all_down() {
    let stats = table();

    stats.mark_healthy(PEER_1, false);
    stats.mark_healthy(PEER_2, false);
    stats.mark_healthy(PEER_3, false);

    assert_eq!(stats.pick_least_loaded(), None);
}

#[test]
fn test_error_weight_dominates_score() {
    let stats = table();

    // PEER_1: fast but failing half the time... which already trips the
    // health gate, so load it just below the error threshold instead.
    stats.record(PEER_1, 1, true);
    stats.record(PEER_1, 1, true);
    stats.record(PEER_1, 1, true);
    stats.record(PEER_1, 1, false);
    // score(PEER_1) ~ 1 + 1000 * 0.25 + 0.4 = 251.4

    stats.record(PEER_2, 200, true);
    // score(PEER_2) ~ 200 + 0 + 0.1 = 200.1

    stats.mark_healthy(PEER_3, false);

    assert_eq!(stats.pick_least_loaded(), Some(PEER_2.to_string()));
}

#[test]
fn test_snapshot_is_sorted_and_complete() {
    let stats = table();
    stats.record(PEER_2, 7, true);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].addr, PEER_1);
    assert_eq!(snapshot[1].addr, PEER_2);
    assert_eq!(snapshot[2].addr, PEER_3);
    assert!(snapshot[1].last_seen_ms > 0);
}
