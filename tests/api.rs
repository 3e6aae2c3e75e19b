mod common;

use std::collections::HashSet;

use dancewithme::{config::UnknownEventMessages, StoreOptions};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use common::{count, spawn, TestServer};

async fn post(client: &Client, url: String, body: Value) -> (StatusCode, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn get(client: &Client, url: String) -> (StatusCode, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

fn messages_of(server: &TestServer, event: &Value) -> String {
    server.url(&format!("/messages/{}", event["id"].as_str().unwrap()))
}

#[tokio::test]
async fn salsa_night_scenario() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    let (status, event) =
        post(&client, server.url("/events"), json!({ "name": "Salsa Night" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["name"], "Salsa Night");

    let (status, user) = post(&client, server.url("/users"), json!({ "name": "Anon 42" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, posted) = post(&client, server.url("/messages"), json!({
        "eventId": event["id"],
        "userId": user["id"],
        "text": "hi",
    })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted["sender"]["name"], "Anon 42");

    let (status, listed) = get(&client, messages_of(&server, &event)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["text"], "hi");
    assert_eq!(listed[0]["sender"]["name"], "Anon 42");

    // what came back from the post is what the list shows
    assert_eq!(listed[0]["id"], posted["id"]);
    assert_eq!(listed[0]["sender"]["id"], user["id"]);
    assert_eq!(listed[0]["event"], event["id"]);
    assert_eq!(listed[0]["createdAt"], posted["createdAt"]);
}

#[tokio::test]
async fn created_events_get_unique_ids() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    let mut ids = HashSet::new();
    for i in 0..10 {
        let name = format!("Social #{i}");
        let (status, event) =
            post(&client, server.url("/events"), json!({ "name": name })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(event["name"], name.as_str());
        assert!(ids.insert(event["id"].as_str().unwrap().to_owned()));
    }

    let (_, events) = get(&client, server.url("/events")).await;
    assert_eq!(events.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn blank_names_are_rejected_without_writes() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    for path in ["/events", "/users"] {
        for body in [json!({ "name": "" }), json!({ "name": "   " }), json!({})] {
            let (status, error) = post(&client, server.url(path), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(error["error"].is_string());
        }
    }

    assert_eq!(count(server.db_pool(), "events").await, 0);
    assert_eq!(count(server.db_pool(), "users").await, 0);
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    let response = client
        .post(server.url("/events"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json!({ "name": "x", "date": "tomorrow" });
    let (status, _) = post(&client, server.url("/events"), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count(server.db_pool(), "events").await, 0);
}

#[tokio::test]
async fn event_dates_are_read_in_every_common_form() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    let forms = [
        (json!("2024-06-01T22:00:00+02:00"), "2024-06-01T20:00:00Z"),
        (json!("2024-06-01T20:00:00Z"), "2024-06-01T20:00:00Z"),
        (json!("2024-06-01"), "2024-06-01T00:00:00Z"),
        (json!("2024-06-01T20:00:00"), "2024-06-01T20:00:00Z"),
        (json!(1717272000000_i64), "2024-06-01T20:00:00Z"),
    ];
    for (date, expected) in forms {
        let body = json!({ "name": "Salsa Night", "date": date });
        let (status, event) = post(&client, server.url("/events"), body).await;
        assert_eq!(status, StatusCode::OK, "{event}");
        assert_eq!(event["date"], expected);
    }

    let (_, events) = get(&client, server.url("/events")).await;
    assert_eq!(events.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn incomplete_messages_are_rejected_without_writes() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();
    let (_, event) = post(&client, server.url("/events"), json!({ "name": "Salsa Night" })).await;
    let (_, user) = post(&client, server.url("/users"), json!({ "name": "Anon 1" })).await;

    let bodies = [
        json!({ "userId": user["id"], "text": "hi" }),
        json!({ "eventId": event["id"], "text": "hi" }),
        json!({ "eventId": event["id"], "userId": user["id"] }),
        json!({ "eventId": "", "userId": user["id"], "text": "hi" }),
        json!({ "eventId": event["id"], "userId": user["id"], "text": "" }),
    ];
    for body in bodies {
        let (status, error) = post(&client, server.url("/messages"), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "Missing eventId, userId or text");
    }

    assert_eq!(count(server.db_pool(), "messages").await, 0);
}

#[tokio::test]
async fn messages_come_back_in_post_order() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();
    let (_, event) = post(&client, server.url("/events"), json!({ "name": "Kizomba" })).await;
    let (_, user) = post(&client, server.url("/users"), json!({ "name": "Anon 9" })).await;

    let texts: Vec<String> = (0..12).map(|i| format!("line {i}")).collect();
    for text in &texts {
        let (status, _) = post(&client, server.url("/messages"), json!({
            "eventId": event["id"],
            "userId": user["id"],
            "text": text,
        })).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, listed) = get(&client, messages_of(&server, &event)).await;
    let listed_texts: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap())
        .collect();
    assert_eq!(listed_texts, texts);
}

#[tokio::test]
async fn unknown_event_is_empty_by_default() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();

    let (status, listed) = get(&client, server.url("/messages/not-an-event")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn unknown_event_can_be_not_found() {
    let server = spawn(StoreOptions {
        unknown_event_messages: UnknownEventMessages::NotFound,
        ..Default::default()
    }).await;
    let client = Client::new();

    let (status, error) = get(&client, server.url("/messages/not-an-event")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn empty_user_list() {
    let server = spawn(StoreOptions::default()).await;
    let (status, users) = get(&Client::new(), server.url("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn posted_messages_reach_the_hub() {
    let server = spawn(StoreOptions::default()).await;
    let client = Client::new();
    let mut rx = server.state.hub.subscribe();

    let (_, event) = post(&client, server.url("/events"), json!({ "name": "Salsa Night" })).await;
    let (_, user) = post(&client, server.url("/users"), json!({ "name": "Anon 5" })).await;
    let (_, posted) = post(&client, server.url("/messages"), json!({
        "eventId": event["id"],
        "userId": user["id"],
        "text": "hola",
    })).await;

    let published = rx.recv().await.unwrap();
    assert_eq!(published.id.to_string(), posted["id"].as_str().unwrap());
    assert!(rx.try_recv().is_err());
    assert_eq!(count(server.db_pool(), "messages").await, 1);
}
