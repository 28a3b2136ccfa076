use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use cairn_client::gateway::gateway_url;
use cairn_client::{ChatSession, EventStream, HttpGateway, MessageGateway, ScrollAction};
use cairn_db::Database;
use cairn_gateway::EventBus;
use cairn_types::models::{Message, Outcome};

struct TestServer {
    base_url: String,
    shutdown: CancellationToken,
    bus: EventBus,
}

async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let bus = EventBus::new();
    let shutdown = CancellationToken::new();
    let state = cairn_server::app_state(
        Database::open_in_memory().unwrap(),
        "e2e-secret".into(),
        bus.clone(),
    );
    let app = cairn_server::router(state, shutdown.clone());

    let stop = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        shutdown,
        bus,
    }
}

async fn next(stream: &mut EventStream) -> Message {
    tokio::time::timeout(Duration::from_secs(5), stream.next_message())
        .await
        .expect("no delivery within 5s")
        .expect("stream ended")
        .expect("stream error")
}

#[tokio::test]
async fn message_fans_out_to_every_connected_client() {
    let server = spawn_server().await;

    let mut ada_http = HttpGateway::new(&server.base_url);
    let ada = ada_http.register("ada", "correct horse").await.unwrap();
    let mut grace_http = HttpGateway::new(&server.base_url);
    let grace = grace_http.register("grace", "battery staple").await.unwrap();

    let ws_url = gateway_url(&server.base_url);
    let mut ada_stream = EventStream::connect(&ws_url, ada_http.token().unwrap()).await.unwrap();
    let mut grace_stream = EventStream::connect(&ws_url, grace_http.token().unwrap()).await.unwrap();
    assert_eq!(ada_stream.identity(), &ada);
    assert_eq!(grace_stream.identity(), &grace);
    assert_eq!(server.bus.subscriber_count(), 2);

    let mut ada_session = ChatSession::new(ada_http.clone(), ada.clone());
    let mut grace_session = ChatSession::new(grace_http.clone(), grace.clone());
    ada_session.load().await.unwrap();
    grace_session.load().await.unwrap();

    let created = ada_session.send("!r 4d6d1+2").await.unwrap();
    assert_eq!(created.author_id, ada.user_id);
    assert_eq!(created.author_name, "ada");
    let Some(Outcome::Roll(roll)) = &created.outcome else {
        panic!("expected a roll outcome");
    };
    assert_eq!(roll.rolls.len(), 4);
    assert_eq!(roll.drop, Some(1));

    // Both clients see the stored record exactly as created.
    assert_eq!(next(&mut grace_stream).await, created);
    assert_eq!(next(&mut ada_stream).await, created);

    assert_eq!(grace_session.receive(created.clone()), ScrollAction::ScrollToBottom);
    assert_eq!(grace_session.timeline().len(), 1);

    // The echo of our own send was already merged from the create response.
    assert_eq!(ada_session.receive(created.clone()), ScrollAction::Stay);
    assert_eq!(ada_session.timeline().len(), 1);

    // Drive the reply in two steps so the tentative entry is visible while
    // the create call is out.
    let pending = grace_session.begin_send("nice roll").unwrap();
    assert!(grace_session.timeline().entries()[1].tentative);
    let result = grace_http.create_message(pending.content()).await;
    let reply = grace_session.finish_send(pending, result).unwrap();
    assert_eq!(grace_session.timeline().len(), 2);
    assert_eq!(next(&mut ada_stream).await, reply);
    assert_eq!(ada_session.receive(reply.clone()), ScrollAction::ScrollToBottom);

    assert_eq!(grace_http.list_messages().await.unwrap(), vec![created, reply]);

    server.shutdown.cancel();
    server.bus.shutdown();
    let ended = tokio::time::timeout(Duration::from_secs(5), ada_stream.next_message())
        .await
        .expect("stream did not end on shutdown");
    assert!(!matches!(ended, Some(Ok(_))));
}

#[tokio::test]
async fn late_subscriber_only_sees_later_messages() {
    let server = spawn_server().await;

    let mut ada_http = HttpGateway::new(&server.base_url);
    ada_http.register("ada", "correct horse").await.unwrap();
    let before = ada_http.create_message("before").await.unwrap();

    let ws_url = gateway_url(&server.base_url);
    let mut stream = EventStream::connect(&ws_url, ada_http.token().unwrap()).await.unwrap();
    let after = ada_http.create_message("after").await.unwrap();

    assert_eq!(next(&mut stream).await, after);
    assert_eq!(ada_http.list_messages().await.unwrap(), vec![before, after]);

    server.shutdown.cancel();
}

#[tokio::test]
async fn bad_token_never_gets_ready() {
    let server = spawn_server().await;

    let result = EventStream::connect(&gateway_url(&server.base_url), "not-a-token").await;
    assert!(result.is_err());
    assert_eq!(server.bus.subscriber_count(), 0);

    server.shutdown.cancel();
}
