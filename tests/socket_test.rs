use beacon_agent::dispatch::Dispatcher;
use beacon_agent::ingest::SocketIngestor;
use beacon_agent::transport::MemoryTransport;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Fixture {
    dispatcher: Arc<Dispatcher>,
    transport: MemoryTransport,
    cancel: CancellationToken,
    server: JoinHandle<()>,
}

fn start(socket: &Path) -> Fixture {
    let transport = MemoryTransport::new();
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(transport.clone()),
        Duration::from_secs(60),
    ));
    let ingestor = SocketIngestor::bind(socket.to_str().unwrap(), dispatcher.clone()).unwrap();

    let cancel = CancellationToken::new();
    let server = tokio::spawn(ingestor.run(cancel.clone()));

    Fixture {
        dispatcher,
        transport,
        cancel,
        server,
    }
}

impl Fixture {
    async fn stop(self) {
        self.cancel.cancel();
        self.server.await.unwrap();
    }
}

/// One connection, one message. Reading to EOF afterwards waits until the
/// server has processed the payload and dropped the connection.
async fn send_payload(socket: &Path, payload: &[u8]) {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buf = [0u8; 1];
    let _ = stream.read(&mut buf).await;
}

#[tokio::test]
async fn mixed_array_enqueues_only_valid_elements_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    let fixture = start(&socket);

    send_payload(
        &socket,
        br#"[{"collector":"a"},{"bad":1},{"collector":"b"}]"#,
    )
    .await;
    fixture.dispatcher.flush().await;

    let sent = fixture.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 2);
    assert_eq!(sent[0][0]["collector"], "a");
    assert_eq!(sent[0][1]["collector"], "b");

    fixture.stop().await;
}

#[tokio::test]
async fn object_without_collector_enqueues_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    let fixture = start(&socket);

    send_payload(&socket, br#"{"site":"x"}"#).await;
    fixture.dispatcher.flush().await;

    assert!(fixture.transport.sent().is_empty());
    assert_eq!(fixture.dispatcher.pending(), 0);

    fixture.stop().await;
}

#[tokio::test]
async fn malformed_json_enqueues_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    let fixture = start(&socket);

    send_payload(&socket, b"{truncated").await;
    fixture.dispatcher.flush().await;

    assert!(fixture.transport.sent().is_empty());

    fixture.stop().await;
}

#[tokio::test]
async fn bare_object_is_accepted_as_one_event() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    let fixture = start(&socket);

    send_payload(&socket, br#"{"collector":"ext","value":7}"#).await;
    fixture.dispatcher.flush().await;

    let sent = fixture.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0]["collector"], "ext");
    assert_eq!(sent[0][0]["value"], 7);

    fixture.stop().await;
}

#[tokio::test]
async fn sequential_connections_accumulate_into_one_flush() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    let fixture = start(&socket);

    send_payload(&socket, br#"{"collector":"one"}"#).await;
    send_payload(&socket, br#"{"collector":"two"}"#).await;
    fixture.dispatcher.flush().await;

    let sent = fixture.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0]["collector"], "one");
    assert_eq!(sent[0][1]["collector"], "two");

    fixture.stop().await;
}

#[tokio::test]
async fn stale_socket_node_is_replaced_on_bind() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("ingest.sock");
    std::fs::write(&socket, b"stale").unwrap();

    let fixture = start(&socket);

    send_payload(&socket, br#"{"collector":"fresh"}"#).await;
    fixture.dispatcher.flush().await;

    assert_eq!(fixture.transport.sent().len(), 1);

    fixture.stop().await;
}
