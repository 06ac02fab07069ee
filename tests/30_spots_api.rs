mod common;

use anyhow::Result;
use reqwest::{
    header::{COOKIE, ETAG, IF_NONE_MATCH},
    StatusCode,
};
use serde_json::{json, Value};

struct Session {
    client: reqwest::Client,
    base: String,
    cookie: String,
}

impl Session {
    fn new(server: &common::TestServer, sub: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{}/api", server.base_url),
            cookie: common::session_cookie(sub),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let res = self
            .client
            .get(format!("{}{}", self.base, path))
            .header(COOKIE, &self.cookie)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
        Ok(res.json::<Value>().await?["data"].clone())
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base, path))
            .header(COOKIE, &self.cookie);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        Ok((status, res.json::<Value>().await?))
    }

    async fn put_spots(&self, spots: Value) -> Result<(StatusCode, Value)> {
        self.send(reqwest::Method::PUT, "/spots", Some(json!({ "spots": spots }))).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let (status, body) = self.send(reqwest::Method::POST, path, Some(body)).await?;
        assert_eq!(status, StatusCode::OK, "POST {path}: {body}");
        Ok(body["data"].clone())
    }
}

fn abcd() -> Value {
    json!([
        { "name": "A", "isSelected": true, "index": 0 },
        { "name": "B", "isSelected": true, "index": 1 },
        { "name": "C", "isSelected": true, "index": 2, "area": "Gion" },
        { "name": "D", "isSelected": false, "index": null }
    ])
}

fn selected_names(view: &Value) -> Vec<String> {
    view["selected"]
        .as_array()
        .map(|spots| {
            spots
                .iter()
                .filter_map(|spot| spot["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn index_of(view: &Value, name: &str) -> Value {
    view["spots"]
        .as_array()
        .and_then(|spots| spots.iter().find(|spot| spot["name"] == name))
        .map(|spot| spot["index"].clone())
        .unwrap_or(Value::Null)
}

#[tokio::test]
async fn new_user_has_empty_collection() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "fresh");

    let view = session.get("/spots").await?;
    assert_eq!(view, json!({ "spots": [], "selected": [] }));
    Ok(())
}

#[tokio::test]
async fn reorder_moves_spot_and_renumbers() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "alice");

    let (status, _) = session.put_spots(abcd()).await?;
    assert_eq!(status, StatusCode::OK);

    let view = session.post("/spots/reorder", json!({ "moved": "A", "target": "C" })).await?;
    assert_eq!(selected_names(&view), ["B", "C", "A"]);
    assert_eq!(index_of(&view, "A"), json!(2));
    assert_eq!(index_of(&view, "B"), json!(0));
    assert_eq!(index_of(&view, "C"), json!(1));
    assert_eq!(view["spots"][3], json!({ "name": "D", "isSelected": false, "index": null }));
    // extra client fields survive
    assert_eq!(view["spots"][2]["area"], "Gion");

    // the store reflects the move on the next read
    let selected = session.get("/spots/selected").await?;
    let names: Vec<_> = selected.as_array().unwrap().iter().map(|s| s["name"].clone()).collect();
    assert_eq!(names, [json!("B"), json!("C"), json!("A")]);
    Ok(())
}

#[tokio::test]
async fn reorder_without_valid_target_changes_nothing() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "bob");
    session.put_spots(abcd()).await?;
    let before = session.get("/spots").await?;

    let dropped_outside = session.post("/spots/reorder", json!({ "moved": "A", "target": null })).await?;
    assert_eq!(dropped_outside, before);

    let onto_unselected = session.post("/spots/reorder", json!({ "moved": "A", "target": "D" })).await?;
    assert_eq!(onto_unselected, before);

    let onto_itself = session.post("/spots/reorder", json!({ "moved": "B", "target": "B" })).await?;
    assert_eq!(onto_itself, before);
    Ok(())
}

#[tokio::test]
async fn toggle_appends_and_closes_gaps() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "carol");
    session.put_spots(abcd()).await?;

    let view = session.post("/spots/D/toggle", json!({})).await?;
    assert_eq!(selected_names(&view), ["A", "B", "C", "D"]);

    let view = session.post("/spots/A/toggle", json!({})).await?;
    assert_eq!(selected_names(&view), ["B", "C", "D"]);
    assert_eq!(index_of(&view, "A"), Value::Null);
    assert_eq!(index_of(&view, "B"), json!(0));
    Ok(())
}

#[tokio::test]
async fn reset_deselects_everything() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "dave");
    session.put_spots(abcd()).await?;

    let view = session.post("/spots/reset", json!({})).await?;
    assert_eq!(view["selected"], json!([]));
    for spot in view["spots"].as_array().unwrap() {
        assert_eq!(spot["isSelected"], false);
        assert_eq!(spot["index"], Value::Null);
    }

    let again = session.post("/spots/reset", json!({})).await?;
    assert_eq!(again, view);
    Ok(())
}

#[tokio::test]
async fn invalid_collection_is_rejected() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "erin");

    let (status, body) = session
        .put_spots(json!([
            { "name": "A", "isSelected": true, "index": 0 },
            { "name": "A", "isSelected": false, "index": null }
        ]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["A"].is_string());

    let (status, _) = session
        .put_spots(json!([{ "name": "A", "isSelected": true, "index": 3 }]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(session.get("/spots").await?["spots"], json!([]));
    Ok(())
}

#[tokio::test]
async fn users_do_not_share_collections() -> Result<()> {
    let server = common::spawn_dev().await?;
    let alice = Session::new(&server, "alice");
    let bob = Session::new(&server, "bob");

    alice.put_spots(abcd()).await?;
    assert_eq!(bob.get("/spots").await?["spots"], json!([]));
    Ok(())
}

#[tokio::test]
async fn unchanged_collection_revalidates_with_304() -> Result<()> {
    let server = common::spawn_dev().await?;
    let session = Session::new(&server, "frank");
    session.put_spots(abcd()).await?;

    let url = format!("{}/spots", session.base);
    let first = session.client.get(&url).header(COOKIE, &session.cookie).send().await?;
    let etag = first.headers()[ETAG].clone();
    assert!(etag.to_str()?.starts_with("W/"));

    let second = session
        .client
        .get(&url)
        .header(COOKIE, &session.cookie)
        .header(IF_NONE_MATCH, etag.clone())
        .send()
        .await?;
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);

    session.post("/spots/reorder", json!({ "moved": "C", "target": "A" })).await?;
    let third = session
        .client
        .get(&url)
        .header(COOKIE, &session.cookie)
        .header(IF_NONE_MATCH, etag)
        .send()
        .await?;
    assert_eq!(third.status(), StatusCode::OK);
    Ok(())
}
