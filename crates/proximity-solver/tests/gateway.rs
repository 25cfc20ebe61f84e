//! Runs a full solver against a loopback world model speaking the
//! line-delimited JSON gateway protocol.

use std::time::Duration;

use proximity_core::payload;
use proximity_solver::{AggregatorConfig, Error, ProximitySolver, Shutdown, SolverConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

async fn write_line(stream: &mut tokio::net::tcp::OwnedWriteHalf, value: &Value) {
    let line = value.to_string() + "\n";
    stream.write_all(line.as_bytes()).await.unwrap();
}

/// Serve the client port: answer the sensor query once, then keep feeding
/// link medians that alternate between two receivers with rising strength
/// so every round is a new decision.
async fn serve_client_port(stream: TcpStream) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut link_ticket = None;

    for _ in 0..2 {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(request["type"], "stream_request");
        assert_eq!(request["uri"], ".*");
        let ticket = request["ticket"].as_u64().unwrap();

        match request["attributes"][0].as_str().unwrap() {
            "sensor.*" => {
                assert_eq!(request["interval_ms"], 10_000);
                let sensor = hex::encode(payload::encode_id(1, 5));
                let response = json!({
                    "type": "data",
                    "ticket": ticket,
                    "results": {"lab.mug": [{"name": "sensor.pipsqueak", "data": sensor}]},
                });
                write_line(&mut writer, &response).await;
            }
            "link median" => {
                assert_eq!(request["interval_ms"], 1_000);
                link_ticket = Some(ticket);
            }
            other => panic!("unexpected attribute pattern {}", other),
        }
    }

    let ticket = link_ticket.expect("link median query");
    for round in 0..250u32 {
        let receiver = 2 + (round % 2);
        let rss = -60.0 + f64::from(round) * 0.1;
        let response = json!({
            "type": "data",
            "ticket": ticket,
            "results": {
                format!("link.5.{}", receiver): [{
                    "name": "link median",
                    "data": hex::encode(payload::encode_rss(rss)),
                }]
            },
        });
        if writer.write_all((response.to_string() + "\n").as_bytes()).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Serve the solver port: forward the handshake and every push.
async fn serve_solver_port(stream: TcpStream, messages: mpsc::Sender<Value>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {
                let msg: Value = serde_json::from_str(&line).unwrap();
                if messages.send(msg).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Accept the solver connection on a fresh port and forward its messages.
async fn spawn_solver_port() -> (u16, mpsc::Receiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (msg_tx, msg_rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve_solver_port(stream, msg_tx).await;
    });
    (port, msg_rx)
}

async fn next_message(messages: &mut mpsc::Receiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), messages.recv())
        .await
        .expect("no message in time")
        .expect("solver port closed")
}

#[tokio::test]
async fn solver_publishes_proximity_over_tcp() {
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client_port = client_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = client_listener.accept().await.unwrap();
        serve_client_port(stream).await;
    });

    let (solver_port, mut messages) = spawn_solver_port().await;

    let mut config = SolverConfig::new("127.0.0.1", client_port, solver_port, -70.0);
    config.idle_wait = Duration::from_millis(5);
    let shutdown = Shutdown::new();
    let solver = tokio::spawn(ProximitySolver::new(config).run(shutdown.clone()));

    let handshake = next_message(&mut messages).await;
    assert_eq!(handshake["type"], "handshake");
    assert_eq!(handshake["origin"], "proximity solver");
    assert_eq!(handshake["solution_types"][0], "proximity");

    let push = next_message(&mut messages).await;
    assert_eq!(push["type"], "push");
    assert_eq!(push["create_uris"], false);

    let solution = &push["data"][0];
    assert_eq!(solution["uri"], "lab.mug");
    let attribute = &solution["attributes"][0];
    assert_eq!(attribute["name"], "proximity");
    assert_eq!(attribute["origin"], "proximity solver");
    assert!(attribute["creation"].as_u64().unwrap() > 0);

    let data = hex::decode(attribute["data"].as_str().unwrap()).unwrap();
    let closest = payload::decode_proximity(&data).unwrap().expect("in proximity");
    assert!(closest.get() == 2 || closest.get() == 3);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), solver)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

/// Transmitter id wider than 64 bits, as the aggregator reports them.
const WIDE_TXID: u128 = (1 << 100) + 5;

#[tokio::test]
async fn aggregator_samples_drive_pushes() {
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client_port = client_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = client_listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(request["attributes"][0], "sensor.*");

        let sensor = hex::encode(payload::encode_id(1, WIDE_TXID));
        let response = json!({
            "type": "data",
            "ticket": request["ticket"],
            "results": {"lab.mug": [{"name": "sensor.pipsqueak", "data": sensor}]},
        });
        write_line(&mut writer, &response).await;

        // Hold the connection until the solver goes away.
        line.clear();
        let _ = reader.read_line(&mut line).await;
    });

    let aggregator_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let aggregator_port = aggregator_listener.local_addr().unwrap().port();
    let (rule_tx, mut rule_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let (stream, _) = aggregator_listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let rule: Value = serde_json::from_str(&line).unwrap();
        rule_tx.send(rule).await.unwrap();

        // serde_json values cannot hold ids past u64, so lines are written by hand.
        for round in 0..250u32 {
            let receiver = 2 + (round % 2);
            let rssi = -60.0 + f64::from(round) * 0.1;
            let sample = format!(
                "{{\"device_id\":{},\"receiver_id\":{},\"phy\":1,\"rssi\":{:.1}}}\n",
                WIDE_TXID, receiver, rssi
            );
            if writer.write_all(sample.as_bytes()).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let (solver_port, mut messages) = spawn_solver_port().await;

    let mut config = SolverConfig::new("127.0.0.1", client_port, solver_port, -70.0);
    config.aggregator = Some(AggregatorConfig {
        host: "127.0.0.1".into(),
        port: aggregator_port,
    });
    config.idle_wait = Duration::from_millis(5);
    let shutdown = Shutdown::new();
    let solver = tokio::spawn(ProximitySolver::new(config).run(shutdown.clone()));

    let rule = tokio::time::timeout(Duration::from_secs(5), rule_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rule, json!({"phy": 0, "txers": [], "update_interval_ms": 1_000}));

    assert_eq!(next_message(&mut messages).await["type"], "handshake");
    let push = next_message(&mut messages).await;
    assert_eq!(push["type"], "push");
    let solution = &push["data"][0];
    assert_eq!(solution["uri"], "lab.mug");

    let data = hex::decode(solution["attributes"][0]["data"].as_str().unwrap()).unwrap();
    let closest = payload::decode_proximity(&data).unwrap().expect("in proximity");
    assert!(closest.get() == 2 || closest.get() == 3);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), solver)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn world_model_disconnect_stops_the_solver() {
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client_port = client_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = client_listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        // Take both query requests, then hang up.
        for _ in 0..2 {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
        }
    });

    let (solver_port, mut messages) = spawn_solver_port().await;

    let mut config = SolverConfig::new("127.0.0.1", client_port, solver_port, -70.0);
    config.idle_wait = Duration::from_millis(5);
    let shutdown = Shutdown::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ProximitySolver::new(config).run(shutdown.clone()),
    )
    .await
    .expect("solver should stop on disconnect");

    assert!(matches!(
        result,
        Err(Error::World(proximity_world::Error::Disconnected(_)))
    ));
    assert!(shutdown.is_triggered());

    // Only the handshake went out.
    assert_eq!(next_message(&mut messages).await["type"], "handshake");
    assert!(messages.try_recv().is_err());
}
