//! End-to-end store flows against in-process server doubles.
//!
//! Each test stands up an axum router playing the SlotSwapper server, wires
//! a [`SlotSwap`] handle at it, and drives one reconciliation flow: the
//! optimistic schedule edit, the non-optimistic marketplace proposal, the
//! refetch-always swap response, and the push channel feeding the badge.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Path;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, sleep, timeout};

use slotswap_client::{
    ChannelState, ClientConfig, CredentialStore, Event, EventStatus, MemoryCredentialStore,
    NewEvent, Notification, ProposeError, SlotSwap, StatusChangeError, SwapRequestView, SwapStatus,
};

async fn serve(app: Router) -> SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> SlotSwap {
    SlotSwap::new(
        ClientConfig::new(&format!("http://{}", addr)).unwrap(),
        Arc::new(MemoryCredentialStore::new()),
    )
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn event(id: i64, title: &str, day: u32, status: EventStatus) -> Event {
    Event {
        id,
        title: title.to_string(),
        start_time: at(day, 9),
        end_time: at(day, 10),
        status,
        user_id: 1,
    }
}

fn view(id: i64, status: SwapStatus) -> SwapRequestView {
    SwapRequestView {
        id,
        status,
        requester_id: 3,
        requester_name: "dana".to_string(),
        desired_slot_title: "Tuesday clinic".to_string(),
        offered_slot_title: "Friday clinic".to_string(),
        offered_slot_start_time: at(6, 13),
    }
}

async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn status_edit_is_visible_before_the_server_confirms() {
    let release = Arc::new(Notify::new());
    let gate = release.clone();
    let app = Router::new()
        .route(
            "/api/events",
            get(|| async { Json(vec![event(1, "Morning shift", 2, EventStatus::Busy)]) }),
        )
        .route(
            "/api/events/{id}/status",
            put(move |Path(id): Path<i64>| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Json(event(id, "Morning shift", 2, EventStatus::Swappable))
                }
            }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.schedule.refresh().await.unwrap();

    let schedule = app.schedule.clone();
    let edit = tokio::spawn(async move { schedule.set_status(1, EventStatus::Swappable).await });

    // The server has not answered yet, but the local slot already moved.
    wait_until("the optimistic edit", || {
        app.schedule.events()[0].status == EventStatus::Swappable
    })
    .await;

    release.notify_one();
    edit.await.unwrap().unwrap();
    assert_eq!(app.schedule.events()[0].status, EventStatus::Swappable);
}

#[tokio::test]
async fn rejected_status_edit_rolls_back_to_the_server_state() {
    let gets = Arc::new(AtomicUsize::new(0));
    let gets_handler = gets.clone();
    let app = Router::new()
        .route(
            "/api/events",
            get(move || {
                let gets = gets_handler.clone();
                async move {
                    gets.fetch_add(1, Ordering::SeqCst);
                    Json(vec![event(1, "Morning shift", 2, EventStatus::Busy)])
                }
            }),
        )
        .route(
            "/api/events/{id}/status",
            put(|| async { (StatusCode::CONFLICT, "slot is locked by a pending swap") }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.schedule.refresh().await.unwrap();

    let result = app.schedule.set_status(1, EventStatus::Swappable).await;
    assert!(matches!(result, Err(StatusChangeError::Locked)));
    assert_eq!(app.schedule.events()[0].status, EventStatus::Busy);
    // Initial load plus the refetch after the rollback.
    assert_eq!(gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn locked_slots_refuse_edits_without_a_request() {
    let puts = Arc::new(AtomicUsize::new(0));
    let puts_handler = puts.clone();
    let app = Router::new()
        .route(
            "/api/events",
            get(|| async { Json(vec![event(1, "Morning shift", 2, EventStatus::SwapPending)]) }),
        )
        .route(
            "/api/events/{id}/status",
            put(move || {
                let puts = puts_handler.clone();
                async move {
                    puts.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.schedule.refresh().await.unwrap();

    let result = app.schedule.set_status(1, EventStatus::Busy).await;
    assert!(matches!(result, Err(StatusChangeError::Locked)));
    assert_eq!(app.schedule.events()[0].status, EventStatus::SwapPending);
    assert_eq!(puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn creating_an_event_refetches_the_schedule_in_order() {
    let posted = Arc::new(Mutex::new(None::<serde_json::Value>));
    let posted_handler = posted.clone();
    let app = Router::new().route(
        "/api/events",
        get(|| async {
            Json(vec![
                event(1, "Morning shift", 2, EventStatus::Busy),
                event(2, "Board review", 9, EventStatus::Busy),
            ])
        })
        .post(move |Json(body): Json<serde_json::Value>| {
            let posted = posted_handler.clone();
            async move {
                *posted.lock().unwrap() = Some(body);
                Json(event(2, "Board review", 9, EventStatus::Busy))
            }
        }),
    );
    let addr = serve(app).await;

    let app = client_for(addr);
    let created = app
        .schedule
        .create_event(NewEvent {
            title: "  Board review  ".to_string(),
            start_time: at(9, 9),
            end_time: at(9, 10),
        })
        .await
        .unwrap();
    assert_eq!(created.id, 2);

    let body = posted.lock().unwrap().take().unwrap();
    assert_eq!(body["title"], json!("Board review"));
    assert!(body.get("startTime").is_some());
    assert!(body.get("endTime").is_some());

    // Refetched and sorted newest first.
    let events = app.schedule.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, 2);
    assert_eq!(events[1].id, 1);
}

#[tokio::test]
async fn successful_proposal_removes_the_listing_without_a_refetch() {
    let gets = Arc::new(AtomicUsize::new(0));
    let gets_handler = gets.clone();
    let app = Router::new()
        .route(
            "/api/swappable-slots",
            get(move || {
                let gets = gets_handler.clone();
                async move {
                    gets.fetch_add(1, Ordering::SeqCst);
                    Json(vec![
                        event(10, "Tuesday clinic", 3, EventStatus::Swappable),
                        event(11, "Thursday clinic", 5, EventStatus::Swappable),
                    ])
                }
            }),
        )
        .route(
            "/api/swap-request",
            post(|| async { Json(view(5, SwapStatus::Pending)) }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.marketplace.refresh().await.unwrap();

    let proposal = app.marketplace.propose_swap(1, 10).await.unwrap();
    assert_eq!(proposal.id, 5);

    let slots = app.marketplace.slots();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, 11);
    assert_eq!(gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_proposal_reports_taken_and_refetches() {
    let gets = Arc::new(AtomicUsize::new(0));
    let gets_handler = gets.clone();
    let app = Router::new()
        .route(
            "/api/swappable-slots",
            get(move || {
                let gets = gets_handler.clone();
                async move {
                    gets.fetch_add(1, Ordering::SeqCst);
                    Json(vec![
                        event(10, "Tuesday clinic", 3, EventStatus::Swappable),
                        event(11, "Thursday clinic", 5, EventStatus::Swappable),
                    ])
                }
            }),
        )
        .route(
            "/api/swap-request",
            post(|| async { (StatusCode::CONFLICT, "slot is not available") }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.marketplace.refresh().await.unwrap();

    let result = app.marketplace.propose_swap(1, 10).await;
    assert!(matches!(result, Err(ProposeError::Taken)));
    // The refetch keeps whatever the server still lists.
    assert_eq!(gets.load(Ordering::SeqCst), 2);
    assert!(app.marketplace.slots().iter().any(|slot| slot.id == 10));
}

#[tokio::test]
async fn responding_refetches_both_request_lists_regardless_of_outcome() {
    let incoming_gets = Arc::new(AtomicUsize::new(0));
    let outgoing_gets = Arc::new(AtomicUsize::new(0));
    let incoming_handler = incoming_gets.clone();
    let outgoing_handler = outgoing_gets.clone();
    let app = Router::new()
        .route(
            "/api/swap-requests/incoming",
            get(move || {
                let gets = incoming_handler.clone();
                async move {
                    gets.fetch_add(1, Ordering::SeqCst);
                    Json(vec![view(9, SwapStatus::Pending)])
                }
            }),
        )
        .route(
            "/api/swap-requests/outgoing",
            get(move || {
                let gets = outgoing_handler.clone();
                async move {
                    gets.fetch_add(1, Ordering::SeqCst);
                    Json(Vec::<SwapRequestView>::new())
                }
            }),
        )
        .route(
            "/api/swap-response/{id}",
            post(|Path(id): Path<i64>| async move {
                if id == 9 {
                    Json(view(9, SwapStatus::Accepted)).into_response()
                } else {
                    (StatusCode::GONE, "request already answered").into_response()
                }
            }),
        );
    let addr = serve(app).await;

    let app = client_for(addr);
    app.requests.refresh().await.unwrap();
    assert_eq!(incoming_gets.load(Ordering::SeqCst), 1);
    assert_eq!(outgoing_gets.load(Ordering::SeqCst), 1);

    let answered = app.requests.respond(9, true).await.unwrap();
    assert_eq!(answered.status, SwapStatus::Accepted);
    assert_eq!(incoming_gets.load(Ordering::SeqCst), 2);
    assert_eq!(outgoing_gets.load(Ordering::SeqCst), 2);

    let error = app.requests.respond(10, false).await.unwrap_err();
    assert_eq!(error.status().map(|status| status.as_u16()), Some(410));
    assert_eq!(incoming_gets.load(Ordering::SeqCst), 3);
    assert_eq!(outgoing_gets.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn credential_changes_apply_to_the_next_request() {
    let app = Router::new().route(
        "/api/events",
        get(|headers: HeaderMap| async move {
            match headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
            {
                Some("Bearer fresh-token") => {
                    Json(vec![event(1, "Morning shift", 2, EventStatus::Busy)]).into_response()
                }
                _ => (StatusCode::UNAUTHORIZED, "credentials expired").into_response(),
            }
        }),
    );
    let addr = serve(app).await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.store_credential("stale-token");
    let app = SlotSwap::new(
        ClientConfig::new(&format!("http://{}", addr)).unwrap(),
        store.clone(),
    );

    let error = app.schedule.refresh().await.unwrap_err();
    assert!(error.is_session_invalid());

    store.store_credential("fresh-token");
    app.schedule.refresh().await.unwrap();
    assert_eq!(app.schedule.events().len(), 1);
}

// -- Push wiring --

fn bearer_token(subject: &str) -> String {
    let claims = json!({ "sub": subject }).to_string();
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(claims);
    format!("header.{}.signature", payload)
}

async fn recv_frame(socket: &mut WebSocket) -> String {
    loop {
        let message = socket
            .recv()
            .await
            .expect("socket closed before a frame arrived")
            .expect("socket failed");
        if let Message::Text(text) = message {
            return text.to_string();
        }
    }
}

async fn send_raw(socket: &mut WebSocket, frame: &str) {
    socket.send(Message::Text(frame.into())).await.unwrap();
}

async fn push_notification(socket: &mut WebSocket, id: u32, body: &str) {
    let frame = format!(
        "MESSAGE\ndestination:/user/queue/notifications\nmessage-id:m-{}\nsubscription:sub-0\ncontent-length:{}\n\n{}\u{0}",
        id,
        body.len(),
        body
    );
    send_raw(socket, &frame).await;
}

async fn stomp_session(mut socket: WebSocket) {
    let connect = recv_frame(&mut socket).await;
    assert!(connect.starts_with("CONNECT\n"), "expected CONNECT, got {}", connect);
    send_raw(&mut socket, "CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\u{0}").await;

    let subscribe = recv_frame(&mut socket).await;
    assert!(subscribe.starts_with("SUBSCRIBE\n"), "expected SUBSCRIBE, got {}", subscribe);
    assert!(subscribe.contains("destination:/user/queue/notifications\n"));

    push_notification(&mut socket, 1, "NEW_REQUEST").await;
    push_notification(&mut socket, 2, "SWAP_ACCEPTED").await;

    // Hold the session open until the client says goodbye.
    while socket.recv().await.is_some_and(|message| message.is_ok()) {}
}

#[tokio::test]
async fn push_notifications_feed_the_unread_badge() {
    let router = Router::new().route(
        "/ws",
        get(|upgrade: WebSocketUpgrade| async move { upgrade.on_upgrade(stomp_session) }),
    );
    let addr = serve(router).await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.store_credential(&bearer_token("dana"));
    let app = SlotSwap::new(
        ClientConfig::new(&format!("http://{}", addr)).unwrap(),
        store,
    );

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let channel = app
        .connect_push_with(move |notification| {
            let _ = seen_tx.send(notification);
        })
        .unwrap();

    let mut watcher = app.notifications.watch();
    let badge = *timeout(
        Duration::from_secs(5),
        watcher.wait_for(|state| state.unread == 2),
    )
    .await
    .expect("timed out waiting for notifications")
    .unwrap();
    assert_eq!(badge.generation, 2);
    assert_eq!(channel.state(), ChannelState::Connected);

    assert_eq!(seen_rx.recv().await, Some(Notification::NewRequest));
    assert_eq!(seen_rx.recv().await, Some(Notification::SwapAccepted));

    app.notifications.acknowledge_all();
    let badge = app.notifications.current();
    assert_eq!(badge.unread, 0);
    assert_eq!(badge.generation, 2);

    channel.shutdown().await;
}
