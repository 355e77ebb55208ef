//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use rockt_core::{
  car::NewCar,
  location::Location,
  rules::StandardRules,
  stop::Stop,
  store::GameStore,
  user::UserId,
};
use rockt_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, USER_HEADER, api_router};

struct Fixture {
  state: ApiState<SqliteStore>,
  joe:   UserId,
  heidi: UserId,
}

async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let joe = store.add_user("joe".into(), 1000).await.unwrap().user_id;
  let heidi = store.add_user("heidi".into(), 100).await.unwrap().user_id;

  for (number, longitude, latitude) in [
    (4001, -79.4110, 43.66449),
    (4002, -79.4065, 43.66449),
    (4003, -79.39951, 43.63651),
  ] {
    store
      .add_car(NewCar {
        number,
        route: Some(511),
        active: true,
        location: Location::new(longitude, latitude),
      })
      .await
      .unwrap();
  }
  for (number, longitude, latitude) in [
    ("00258", -79.411286, 43.666532),
    ("04412", -79.402858, 43.644075),
  ] {
    store
      .add_stop(Stop {
        number:   number.into(),
        route:    Some(511),
        location: Location::new(longitude, latitude),
      })
      .await
      .unwrap();
  }

  Fixture {
    state: ApiState {
      store:         Arc::new(store),
      rules:         Arc::new(StandardRules::default()),
      base_path:     "/api".into(),
      nearby_max_km: 5.0,
    },
    joe,
    heidi,
  }
}

async fn call(
  state:  &ApiState<SqliteStore>,
  method: &str,
  uri:    &str,
  user:   Option<UserId>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(USER_HEADER, user.to_string());
  }
  let req = match body {
    Some(json) => builder
      .header("content-type", "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    // Extractor rejections are plain text.
    serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value)
}

// ── Auth ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_endpoints_require_a_user() {
  let f = fixture().await;
  for uri in ["/user", "/user/cars", "/user/cars/4001"] {
    let (status, _) = call(&f.state, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
  }
  let (status, _) = call(&f.state, "GET", "/user", Some(UserId(999)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── /user ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_data_accurate() {
  let f = fixture().await;
  let (status, body) = call(&f.state, "GET", "/user", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["username"], "joe");
  assert_eq!(body["balance"], 1000);
  assert!(body["check_out_url"].is_null());
}

#[tokio::test]
async fn checked_in_user_gets_check_out_url() {
  let f = fixture().await;
  let (status, body) = call(
    &f.state,
    "POST",
    "/cars/4001/check_in",
    Some(f.joe),
    Some(json!({ "stop": "00258" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["check_out_url"], "/api/user/check_out");

  let (_, body) = call(&f.state, "GET", "/user", Some(f.joe), None).await;
  assert_eq!(body["check_out_url"], "/api/user/check_out");

  let (status, body) = call(
    &f.state,
    "POST",
    "/user/check_out",
    Some(f.joe),
    Some(json!({ "stop": "04412" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["fare"], 5);
  assert_eq!(body["event"]["event"], "car_ride");

  let (_, body) = call(&f.state, "GET", "/user", Some(f.joe), None).await;
  assert!(body["check_out_url"].is_null());
  assert_eq!(body["balance"], 995);
}

#[tokio::test]
async fn check_out_without_check_in_is_409() {
  let f = fixture().await;
  let (status, _) = call(
    &f.state,
    "POST",
    "/user/check_out",
    Some(f.joe),
    Some(json!({ "stop": "04412" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn user_car_list() {
  let f = fixture().await;
  for number in [4001, 4003] {
    let (status, _) =
      call(&f.state, "POST", &format!("/cars/{number}/buy"), Some(f.joe), None).await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (status, body) = call(&f.state, "GET", "/user/cars", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::OK);
  let cars = body.as_array().unwrap();
  assert_eq!(cars.len(), 2);
  assert_eq!(cars[0]["number"], 4001);
  assert_eq!(cars[0]["location"], json!([-79.4110, 43.66449]));
  assert_eq!(cars[0]["timeline_url"], "/api/cars/4001/timeline");
  assert_eq!(cars[1]["stats_url"], "/api/user/cars/4003");
}

#[tokio::test]
async fn car_stats_owner_only() {
  let f = fixture().await;
  let (status, _) = call(&f.state, "GET", "/user/cars/4001", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  call(&f.state, "POST", "/cars/4001/buy", Some(f.joe), None).await;
  call(
    &f.state,
    "POST",
    "/cars/4001/ride",
    Some(f.heidi),
    Some(json!({ "on": "00258", "off": "04412" })),
  )
  .await;

  let (status, body) = call(&f.state, "GET", "/user/cars/4001", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["number"], 4001);
  assert_eq!(body["route"], 511);
  assert_eq!(body["active"], true);
  assert_eq!(body["owner_fares"], json!({ "riders": 1, "revenue": 5 }));
  assert_eq!(body["total_fares"], json!({ "riders": 1, "revenue": 5 }));
  assert_eq!(body["sell_car_url"], "/api/cars/4001/sell");

  let (status, _) = call(&f.state, "GET", "/user/cars/4001", Some(f.heidi), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&f.state, "GET", "/user/cars/9999", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── /cars ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn buy_maps_domain_errors() {
  let f = fixture().await;
  // heidi has 100, the car costs 400.
  let (status, body) = call(&f.state, "POST", "/cars/4002/buy", Some(f.heidi), None).await;
  assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
  assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

  let (status, body) = call(&f.state, "POST", "/cars/4002/buy", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["event"], "car_bought");
  assert_eq!(body["data"]["price"], 400);
  assert_eq!(body["data"]["user"], f.joe.0);

  let (status, _) = call(&f.state, "POST", "/cars/4002/buy", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&f.state, "POST", "/cars/9999/buy", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sell_requires_ownership() {
  let f = fixture().await;
  call(&f.state, "POST", "/cars/4002/buy", Some(f.joe), None).await;

  let (status, _) = call(&f.state, "POST", "/cars/4002/sell", Some(f.heidi), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call(&f.state, "POST", "/cars/4002/sell", Some(f.joe), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["event"], "car_sold");

  let (_, body) = call(&f.state, "GET", "/user", Some(f.joe), None).await;
  assert_eq!(body["balance"], 1000);
}

#[tokio::test]
async fn ride_returns_fare() {
  let f = fixture().await;
  let (status, body) = call(
    &f.state,
    "POST",
    "/cars/4003/ride",
    Some(f.heidi),
    Some(json!({ "on": "00258", "off": "04412" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["fare"], 5);
  assert_eq!(body["event"]["data"]["on"]["number"], "00258");
  assert!(body["event"]["data"].get("owner").is_none());

  let (status, _) = call(
    &f.state,
    "POST",
    "/cars/4003/ride",
    Some(f.heidi),
    Some(json!({ "on": "00258", "off": "nowhere" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn car_map_lists_active_cars() {
  let f = fixture().await;
  call(&f.state, "POST", "/cars/4002/buy", Some(f.joe), None).await;

  let (status, body) = call(&f.state, "GET", "/cars", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let cars = body.as_array().unwrap();
  let numbers: Vec<_> = cars.iter().map(|c| c["number"].as_u64().unwrap()).collect();
  assert_eq!(numbers, vec![4001, 4002, 4003]);
  assert_eq!(cars[1]["owned"], true);
  assert_eq!(cars[1]["location"], json!([-79.4065, 43.66449]));
  assert_eq!(cars[1]["url"], "/api/cars/4002");

  let (_, body) = call(&f.state, "GET", "/cars?route=511", None, None).await;
  assert_eq!(body.as_array().unwrap().len(), 3);
  let (_, body) = call(&f.state, "GET", "/cars?route=510", None, None).await;
  assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_car_is_public() {
  let f = fixture().await;
  let (status, body) = call(&f.state, "GET", "/cars/4003", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["owned"], false);
  assert_eq!(body["timeline_url"], "/api/cars/4003/timeline");
}

#[tokio::test]
async fn timeline_shows_usernames() {
  let f = fixture().await;
  call(&f.state, "POST", "/cars/4001/buy", Some(f.joe), None).await;
  call(
    &f.state,
    "POST",
    "/cars/4001/ride",
    Some(f.heidi),
    Some(json!({ "on": "00258", "off": "04412" })),
  )
  .await;
  f.state.store.delete_user(f.heidi).await.unwrap();

  let (status, body) = call(&f.state, "GET", "/cars/4001/timeline", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let events = body.as_array().unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[0]["event"], "car_bought");
  assert_eq!(events[0]["data"]["user"], "joe");
  assert_eq!(events[1]["event"], "car_ride");
  assert!(events[1]["data"]["rider"].is_null());
  assert_eq!(events[1]["data"]["owner"], "joe");

  let (status, _) = call(&f.state, "GET", "/cars/9999/timeline", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── /stops ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn nearby_cars_nearest_first() {
  let f = fixture().await;
  let (status, body) = call(&f.state, "GET", "/stops/00258/nearby", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let numbers: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["number"].as_u64().unwrap())
    .collect();
  assert_eq!(numbers, vec![4001, 4002, 4003]);

  let (_, body) = call(&f.state, "GET", "/stops/00258/nearby?max_km=1", None, None).await;
  assert_eq!(body.as_array().unwrap().len(), 2);

  let (status, _) = call(&f.state, "GET", "/stops/nope/nearby", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stops_near_a_position() {
  let f = fixture().await;
  let (status, body) =
    call(&f.state, "GET", "/stops/nearby?lat=43.66449&lon=-79.4110", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let stops = body.as_array().unwrap();
  let numbers: Vec<_> = stops.iter().map(|s| s["number"].as_str().unwrap()).collect();
  assert_eq!(numbers, vec!["00258", "04412"]);
  assert_eq!(stops[0]["cars_url"], "/api/stops/00258/nearby");
  assert!(stops[0]["distance_km"].as_f64().unwrap() < stops[1]["distance_km"].as_f64().unwrap());

  let (_, body) = call(
    &f.state,
    "GET",
    "/stops/nearby?lat=43.66449&lon=-79.4110&max_km=1",
    None,
    None,
  )
  .await;
  assert_eq!(body.as_array().unwrap().len(), 1);

  for uri in [
    "/stops/nearby?lon=-79.4110",
    "/stops/nearby?lat=100&lon=-79.4110",
    "/stops/nearby?lat=43.66449&lon=-79.4110&max_km=-1",
  ] {
    let (status, _) = call(&f.state, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
  }
}
