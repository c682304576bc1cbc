//! End-to-end test against a local `tokio-tungstenite` server.

use futures::{SinkExt, StreamExt};
use mempoolfeed_ws::{ClientConfig, ConnectionState, InboundEvent, MempoolClient};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn wire_roundtrip_with_local_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let mut received = Vec::new();
        while received.len() < 2 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => received.push(text),
                Some(Ok(_)) => {}
                other => panic!("unexpected server read: {other:?}"),
            }
        }

        ws.send(Message::Ping(vec![1, 2, 3])).await.unwrap();
        ws.send(Message::Text(
            r#"{"address-transactions":[{"txid":"aaa111","fee":1000,"weight":400}],"mempoolInfo":{}}"#
                .into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"block":{"id":"00000000abc","height":850000,"extras":{"feeRange":[1,2.5]}}}"#.into(),
        ))
        .await
        .unwrap();

        // Expect the pong, then wait for the client to close.
        let mut got_pong = false;
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Pong(data) => {
                    assert_eq!(data, vec![1, 2, 3]);
                    got_pong = true;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        (received, got_pong)
    });

    let client = MempoolClient::new(format!("ws://{addr}"), ClientConfig::default());
    client.track_address("bc1qtracked").unwrap();
    let mut status = client.subscribe_status();
    let mut events = client.connect().await.unwrap();

    match events.recv().await {
        Some(InboundEvent::NewTx(tx)) => {
            assert_eq!(tx.txid, "aaa111");
            assert_eq!(tx.fee_rate(), 10.0);
        }
        other => panic!("expected NewTx, got {other:?}"),
    }
    match events.recv().await {
        Some(InboundEvent::Block(block)) => {
            assert_eq!(block.height, 850000);
            assert_eq!(block.fee_range, vec![1.0, 2.5]);
        }
        other => panic!("expected Block, got {other:?}"),
    }

    client.disconnect().await.unwrap();
    assert_eq!(events.recv().await, None);

    let (received, got_pong) = server.await.unwrap();
    assert_eq!(
        received,
        vec![
            r#"{"action":"want","data":["stats","blocks"]}"#.to_string(),
            r#"{"track-address":"bc1qtracked"}"#.to_string(),
        ]
    );
    assert!(got_pong);
    assert_eq!(
        status.drain(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ]
    );
}
