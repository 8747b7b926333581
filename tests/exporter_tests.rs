//! End-to-end tests for the export loop.
//!
//! Run with: cargo test --test exporter_tests

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};

use common::{ClosedTransport, MemoryTransport};
use metrics_udpjson::export::record::{Distribution, Rates};
use metrics_udpjson::metrics::QUANTILES;
use metrics_udpjson::{
    Connection, Counter, Exporter, ExporterConfig, Gauge, GaugeFloat, Healthcheck, Histogram,
    Meter, Payload, Protocol, Record, Registry, Timer, TypeTag,
};

fn registry() -> Arc<Registry> {
    Arc::new(Registry::new())
}

fn config() -> ExporterConfig {
    ExporterConfig::new(Duration::from_secs(10))
}

// =============================================================================
// Wire format
// =============================================================================

/// One counter, emitter id 7: exactly one object with the documented layout.
#[tokio::test]
async fn counter_record_layout() {
    let r = registry();
    let requests = Arc::new(Counter::new());
    requests.inc(42);
    r.register("requests", Arc::clone(&requests)).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config().with_server_id(7));
    exporter.tick().await;

    let frames = transport.frames();
    assert_eq!(frames.len(), 1);

    let text = String::from_utf8(frames[0].clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let time = value["time"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(time).is_ok(), "bad time {time}");
    assert!(time.ends_with('Z'));

    assert_eq!(
        text,
        format!(
            r#"{{"time":"{time}","server_id":7,"type":"counter","metric":"requests","value":42}}"#
        )
    );
}

#[tokio::test]
async fn type_tags_follow_metric_kind_not_name() {
    let r = registry();
    r.register("histogram", Counter::new()).unwrap();
    r.register("counter", Gauge::new()).unwrap();
    r.register("float", GaugeFloat::new()).unwrap();
    r.register("check", Healthcheck::new(|| -> Result<(), String> { Ok(()) }))
        .unwrap();
    r.register("dist", Histogram::new()).unwrap();
    r.register("rate", Meter::new()).unwrap();
    r.register("timing", Timer::new()).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;

    let mut tags: Vec<(String, TypeTag)> = transport
        .records()
        .into_iter()
        .map(|rec| (rec.metric, rec.kind))
        .collect();
    tags.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        tags,
        vec![
            ("check".to_string(), TypeTag::Gauge),
            ("counter".to_string(), TypeTag::Gauge),
            ("dist".to_string(), TypeTag::Histogram),
            ("float".to_string(), TypeTag::Gauge),
            ("histogram".to_string(), TypeTag::Counter),
            ("rate".to_string(), TypeTag::Meter),
            ("timing".to_string(), TypeTag::Histogram),
        ]
    );
}

#[tokio::test]
async fn no_server_id_key_without_emitter_id() {
    let r = registry();
    r.register("requests", Counter::new()).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;

    let v = &transport.values()[0];
    assert!(v.get("server_id").is_none());
}

// =============================================================================
// Tick semantics
// =============================================================================

#[tokio::test]
async fn one_record_per_metric_sharing_one_timestamp() {
    let r = registry();
    for i in 0..50 {
        r.register(format!("counter.{i}"), Counter::new()).unwrap();
    }
    r.register("timer", Timer::new()).unwrap();
    r.register("meter", Meter::new()).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    let summary = exporter.tick().await;
    assert_eq!(summary.records, 52);
    assert_eq!(summary.written, 52);

    let records = transport.records();
    assert_eq!(records.len(), 52);

    let names: HashSet<_> = records.iter().map(|r| r.metric.clone()).collect();
    assert_eq!(names.len(), 52);

    let times: HashSet<_> = records.iter().map(|r| r.time).collect();
    assert_eq!(times.len(), 1);
}

#[tokio::test]
async fn histogram_percentiles_match_snapshot() {
    let r = registry();
    let h = Arc::new(Histogram::new());
    for v in 1..=5_000 {
        h.update(v * 3);
    }
    r.register("latency", Arc::clone(&h)).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;

    let snap = h.snapshot();
    let ps = snap.percentiles(&QUANTILES);
    let expected = Distribution {
        count: snap.count(),
        min: snap.min(),
        max: snap.max(),
        mean: snap.mean(),
        stddev: snap.std_dev(),
        pct50: ps[0],
        pct75: ps[1],
        pct95: ps[2],
        pct99: ps[3],
        pct9999: ps[4],
    };

    let record = &transport.records()[0];
    assert_eq!(record.kind, TypeTag::Histogram);
    assert_eq!(record.payload, Payload::Histogram(expected));
}

#[tokio::test]
async fn timer_carries_distribution_and_rates() {
    let r = registry();
    let t = Arc::new(Timer::new());
    for ms in [1, 2, 3, 4] {
        t.update(Duration::from_millis(ms));
    }
    r.register("handler", Arc::clone(&t)).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;

    let record = &transport.records()[0];
    assert_eq!(record.kind, TypeTag::Histogram);
    match &record.payload {
        Payload::Timer {
            distribution,
            rates,
        } => {
            assert_eq!(distribution.count, 4);
            assert_eq!(distribution.min, 1_000_000);
            assert_eq!(distribution.max, 4_000_000);
            assert_eq!(distribution.mean, 2_500_000.0);
            assert!(rates.ratemean > 0.0);
            assert!(rates.rate1m >= 0.0);
        }
        other => panic!("expected timer payload, got {other:?}"),
    }
}

#[tokio::test]
async fn meter_reports_count_and_rates() {
    let r = registry();
    let m = Arc::new(Meter::new());
    m.mark(12);
    r.register("events", Arc::clone(&m)).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;

    match &transport.records()[0].payload {
        Payload::Meter {
            count,
            rates: Rates { ratemean, .. },
        } => {
            assert_eq!(*count, 12);
            assert!(*ratemean > 0.0);
        }
        other => panic!("expected meter payload, got {other:?}"),
    }
}

#[tokio::test]
async fn healthcheck_invoked_once_per_tick_and_reported() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let r = registry();
    r.register(
        "db",
        Healthcheck::new(move || {
            // healthy on odd calls, failing on even ones
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            if n % 2 == 0 {
                Err(format!("probe {n} failed"))
            } else {
                Ok(())
            }
        }),
    )
    .unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    exporter.tick().await;
    exporter.tick().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let values = transport.values();
    assert_eq!(values[0]["type"], "gauge");
    assert_eq!(values[0]["string"], "<nil>");
    assert_eq!(values[1]["string"], "probe 2 failed");
    assert!(values[1].get("error").is_none());
}

#[tokio::test]
async fn records_decode_to_source_values() {
    let r = registry();
    let c = Arc::new(Counter::new());
    c.inc(-17);
    let g = Arc::new(Gauge::new());
    g.update(i64::MAX);
    let f = Arc::new(GaugeFloat::new());
    f.update(std::f64::consts::PI);
    r.register("c", Arc::clone(&c)).unwrap();
    r.register("g", Arc::clone(&g)).unwrap();
    r.register("f", Arc::clone(&f)).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config().with_server_id(-1));
    exporter.tick().await;

    let mut records = transport.records();
    records.sort_by(|a, b| a.metric.cmp(&b.metric));
    let payloads: Vec<_> = records.iter().map(|r| r.payload.clone()).collect();
    assert_eq!(
        payloads,
        vec![
            Payload::Int { value: -17 },
            Payload::Float {
                value: std::f64::consts::PI
            },
            Payload::Int { value: i64::MAX },
        ]
    );
    assert!(records.iter().all(|r| r.server_id == Some(-1)));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn closed_transport_does_not_halt_ticks() {
    let r = registry();
    r.register("a", Counter::new()).unwrap();
    r.register("b", Counter::new()).unwrap();

    let mut exporter = Exporter::new(r, ClosedTransport, config());
    for _ in 0..3 {
        let summary = exporter.tick().await;
        assert_eq!(summary.failed, 2);
    }

    let stats = exporter.stats().snapshot();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.write_failures, 6);
    assert_eq!(stats.records_written, 0);
}

/// A NaN float gauge cannot be written as JSON: its record is dropped and
/// counted, the rest of the tick still goes out.
#[tokio::test]
async fn non_finite_gauge_is_counted_as_serialize_failure() {
    let r = registry();
    let load = Arc::new(GaugeFloat::new());
    load.update(f64::NAN);
    r.register("load", Arc::clone(&load)).unwrap();
    r.register("requests", Counter::new()).unwrap();

    let transport = MemoryTransport::new();
    let mut exporter = Exporter::new(r, transport.clone(), config());
    let summary = exporter.tick().await;
    assert_eq!(summary.records, 2);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed, 1);

    let values = transport.values();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["metric"], "requests");

    let stats = exporter.stats().snapshot();
    assert_eq!(stats.serialize_failures, 1);
    assert_eq!(stats.write_failures, 0);

    load.update(f64::INFINITY);
    exporter.tick().await;
    assert_eq!(exporter.stats().serialize_failures(), 2);
    assert!(transport.values().iter().all(|v| v["metric"] != "load"));
}

#[tokio::test]
async fn peer_hangup_on_tcp_is_survived() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let conn = Connection::connect(Protocol::Tcp, &addr).await.unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    drop(peer);
    drop(listener);

    let r = registry();
    r.register("a", Counter::new()).unwrap();
    let mut exporter = Exporter::new(r, conn, config());

    for _ in 0..5 {
        exporter.tick().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let stats = exporter.stats().snapshot();
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.records_written + stats.write_failures, 5);
}

// =============================================================================
// Real sockets
// =============================================================================

#[tokio::test]
async fn udp_datagram_per_record() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap().to_string();
    let conn = Connection::connect(Protocol::Udp, &addr).await.unwrap();

    let r = registry();
    let c = Arc::new(Counter::new());
    c.inc(5);
    r.register("hits", Arc::clone(&c)).unwrap();
    r.register("up", Healthcheck::new(|| -> Result<(), String> { Ok(()) }))
        .unwrap();

    let mut exporter = Exporter::new(r, conn, config().with_server_id(3));
    exporter.tick().await;

    let mut buf = vec![0u8; 65_536];
    let mut got = Vec::new();
    for _ in 0..2 {
        let n = receiver.recv(&mut buf).await.unwrap();
        let rec: Record = serde_json::from_slice(&buf[..n]).unwrap();
        got.push(rec);
    }
    got.sort_by(|a, b| a.metric.cmp(&b.metric));

    assert_eq!(got[0].metric, "hits");
    assert_eq!(got[0].payload, Payload::Int { value: 5 });
    assert_eq!(got[1].metric, "up");
    assert_eq!(
        got[1].payload,
        Payload::Healthcheck {
            error: "<nil>".into()
        }
    );
    assert!(got.iter().all(|r| r.server_id == Some(3)));
}

/// TCP carries records back-to-back; the reader splits on object boundaries.
#[tokio::test]
async fn tcp_stream_is_unframed_json() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let conn = Connection::connect(Protocol::Tcp, &addr).await.unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();

    let r = registry();
    for i in 0..3 {
        r.register(format!("c{i}"), Counter::new()).unwrap();
    }
    let mut exporter = Exporter::new(r, conn, config());
    exporter.tick().await;
    exporter.tick().await;
    drop(exporter);

    let mut bytes = Vec::new();
    peer.read_to_end(&mut bytes).await.unwrap();
    assert!(!bytes.contains(&b'\n'));

    let records: Vec<Record> = serde_json::Deserializer::from_slice(&bytes)
        .into_iter::<Record>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 6);
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn run_until_ticks_once_per_interval() {
    let r = registry();
    r.register("a", Counter::new()).unwrap();

    let transport = MemoryTransport::new();
    let exporter = Exporter::new(r, transport.clone(), config());
    let stats = exporter.stats();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = exporter.spawn(async {
        let _ = rx.await;
    });

    tokio::time::sleep(Duration::from_secs(35)).await;
    tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(stats.ticks(), 3);
    assert_eq!(transport.frames().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_first_interval_exports_nothing() {
    let r = registry();
    r.register("a", Counter::new()).unwrap();

    let transport = MemoryTransport::new();
    let exporter = Exporter::new(r, transport.clone(), config());
    let stats = exporter.stats();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = exporter.spawn(async {
        let _ = rx.await;
    });

    tokio::time::sleep(Duration::from_secs(9)).await;
    tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(stats.ticks(), 0);
    assert!(transport.frames().is_empty());
}
