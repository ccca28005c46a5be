use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use foodgram::{
    api::create_app,
    app_state::AppState,
    config::Config,
    models::{NewIngredient, NewTag, NewUser},
};

struct TestApp {
    router: Router,
    state: AppState,
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

impl TestApp {
    async fn new() -> Self {
        let state = AppState::new(Config::for_testing()).await.unwrap();
        Self {
            router: create_app(state.clone()),
            state,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "testserver");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        TestResponse { status, headers, body }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Register through the API and log in, returning `(user id, token)`.
    async fn signup(&self, username: &str) -> (i64, String) {
        let res = self
            .post(
                "/api/users/",
                None,
                json!({
                    "email": format!("{}@example.com", username),
                    "username": username,
                    "first_name": "First",
                    "last_name": "Last",
                    "password": "s3cret-pass"
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
        let id = res.json()["id"].as_i64().unwrap();

        let res = self
            .post(
                "/api/auth/token/login/",
                None,
                json!({ "email": format!("{}@example.com", username), "password": "s3cret-pass" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        (id, res.json()["auth_token"].as_str().unwrap().to_string())
    }

    async fn staff_token(&self) -> String {
        let admin = self
            .state
            .users
            .create_user(
                NewUser {
                    email: "admin@example.com".to_string(),
                    username: "admin".to_string(),
                    first_name: "Ad".to_string(),
                    last_name: "Min".to_string(),
                    password: "admin-pass".to_string(),
                },
                true,
            )
            .await
            .unwrap();
        self.state.users.issue_token(admin.id).await.unwrap()
    }

    /// Catalog with two ingredients and two tags: returns `(egg, flour, breakfast, dinner)` ids.
    async fn seed_catalog(&self) -> (i64, i64, i64, i64) {
        let catalog = &self.state.catalog;
        let egg = catalog
            .create_ingredient(NewIngredient { name: "egg".into(), measurement_unit: "pcs".into() })
            .await
            .unwrap();
        let flour = catalog
            .create_ingredient(NewIngredient { name: "flour".into(), measurement_unit: "g".into() })
            .await
            .unwrap();
        let breakfast = catalog
            .create_tag(NewTag { name: "Breakfast".into(), slug: "breakfast".into(), color: None })
            .await
            .unwrap();
        let dinner = catalog
            .create_tag(NewTag { name: "Dinner".into(), slug: "dinner".into(), color: None })
            .await
            .unwrap();
        (egg.id.value(), flour.id.value(), breakfast.id.value(), dinner.id.value())
    }
}

fn recipe_body(name: &str, ingredients: &[(i64, i64)], tags: &[i64]) -> Value {
    json!({
        "name": name,
        "text": "Mix everything",
        "image": "data:image/png;base64,iVBORw0KGgo=",
        "cooking_time": 15,
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let res = app.get("/api/health/", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_registration_and_tokens() {
    let app = TestApp::new().await;
    let (id, token) = app.signup("alice").await;

    let me = app.get("/api/users/me/", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["id"], json!(id));
    assert_eq!(me.json()["is_subscribed"], json!(false));
    assert!(me.json().get("password").is_none());

    assert_eq!(app.get("/api/users/me/", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/users/me/", Some("bogus")).await.status, StatusCode::UNAUTHORIZED);

    let duplicate = app
        .post(
            "/api/users/",
            None,
            json!({ "email": "alice@example.com", "username": "alice2", "first_name": "A",
                    "last_name": "B", "password": "x" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let reserved = app
        .post(
            "/api/users/",
            None,
            json!({ "email": "me@example.com", "username": "me", "first_name": "A",
                    "last_name": "B", "password": "x" }),
        )
        .await;
    assert_eq!(reserved.status, StatusCode::BAD_REQUEST);

    let bad_login = app
        .post("/api/auth/token/login/", None, json!({ "email": "alice@example.com", "password": "nope" }))
        .await;
    assert_eq!(bad_login.status, StatusCode::BAD_REQUEST);

    let changed = app
        .post(
            "/api/users/set_password/",
            Some(&token),
            json!({ "current_password": "s3cret-pass", "new_password": "n3w-pass" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let logout = app.post("/api/auth/token/logout/", Some(&token), json!({})).await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/api/users/me/", Some(&token)).await.status, StatusCode::UNAUTHORIZED);

    let relogin = app
        .post("/api/auth/token/login/", None, json!({ "email": "alice@example.com", "password": "n3w-pass" }))
        .await;
    assert_eq!(relogin.status, StatusCode::OK);

    let users = app.get("/api/users/?limit=1", None).await;
    assert_eq!(users.json()["count"], json!(1));
    assert_eq!(users.json()["next"], Value::Null);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let app = TestApp::new().await;
    let staff = app.staff_token().await;
    let (_, user) = app.signup("bob").await;

    let tag = json!({ "name": "Lunch", "slug": "lunch", "color": "#ff0000" });
    assert_eq!(app.post("/api/tags/", Some(&user), tag.clone()).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.post("/api/tags/", None, tag.clone()).await.status, StatusCode::UNAUTHORIZED);
    let created = app.post("/api/tags/", Some(&staff), tag.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["color"], json!("#FF0000"));
    assert_eq!(app.post("/api/tags/", Some(&staff), tag).await.status, StatusCode::CONFLICT);

    for name in ["Sugar", "salt", "Sage"] {
        let res = app
            .post("/api/ingredients/", Some(&staff), json!({ "name": name, "measurement_unit": "g" }))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    let found = app.get("/api/ingredients/?name=sa", None).await.json();
    let names: Vec<&str> = found.as_array().unwrap().iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Sage", "salt"]);

    let tags = app.get("/api/tags/", None).await.json();
    let id = tags[0]["id"].as_i64().unwrap();
    assert_eq!(app.get(&format!("/api/tags/{}/", id), None).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/tags/999/", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/ingredients/999/", None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recipe_lifecycle() {
    let app = TestApp::new().await;
    let (egg, flour, breakfast, dinner) = app.seed_catalog().await;
    let (alice_id, alice) = app.signup("alice").await;
    let (_, bob) = app.signup("bob").await;

    let anonymous = app.post("/api/recipes/", None, recipe_body("Omelette", &[(egg, 3)], &[breakfast])).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let invalid = app.post("/api/recipes/", Some(&alice), recipe_body("Omelette", &[], &[breakfast])).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    let malformed = app.post("/api/recipes/", Some(&alice), json!({ "name": "No body" })).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let created = app
        .post("/api/recipes/", Some(&alice), recipe_body("Omelette", &[(egg, 3), (flour, 20)], &[breakfast]))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
    let recipe = created.json();
    let id = recipe["id"].as_i64().unwrap();
    assert_eq!(recipe["author"]["id"], json!(alice_id));
    assert_eq!(recipe["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(recipe["is_favorited"], json!(false));

    let patch = json!({ "name": "Fluffy omelette", "tags": [dinner] });
    let forbidden = app.send(Method::PATCH, &format!("/api/recipes/{}/", id), Some(&bob), Some(patch.clone())).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    let patched = app.send(Method::PATCH, &format!("/api/recipes/{}/", id), Some(&alice), Some(patch)).await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.json()["name"], json!("Fluffy omelette"));
    assert_eq!(patched.json()["tags"][0]["slug"], json!("dinner"));
    assert_eq!(patched.json()["ingredients"].as_array().unwrap().len(), 2);

    let link = app.get(&format!("/api/recipes/{}/get-link/", id), None).await.json();
    let short = link["short-link"].as_str().unwrap().to_string();
    assert!(short.starts_with("http://testserver/r/"));
    let path = short.trim_start_matches("http://testserver");
    let redirect = app.get(path, None).await;
    assert_eq!(redirect.status, StatusCode::FOUND);
    assert_eq!(redirect.headers[header::LOCATION], format!("/recipes/{}/", id).as_str());
    assert_eq!(app.get("/r/zzzzzz/", None).await.status, StatusCode::NOT_FOUND);

    let favorite = app.post(&format!("/api/recipes/{}/favorite/", id), Some(&bob), json!({})).await;
    assert_eq!(favorite.status, StatusCode::CREATED);
    assert_eq!(favorite.json()["name"], json!("Fluffy omelette"));
    let again = app.post(&format!("/api/recipes/{}/favorite/", id), Some(&bob), json!({})).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let favorites = app.get("/api/recipes/?is_favorited=1", Some(&bob)).await.json();
    assert_eq!(favorites["count"], json!(1));
    assert_eq!(favorites["results"][0]["is_favorited"], json!(true));
    assert_eq!(app.get("/api/recipes/?is_favorited=1", Some(&alice)).await.json()["count"], json!(0));

    let denied = app.delete(&format!("/api/recipes/{}/", id), Some(&bob)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    let deleted = app.delete(&format!("/api/recipes/{}/", id), Some(&alice)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&format!("/api/recipes/{}/", id), None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/recipes/?is_favorited=1", Some(&bob)).await.json()["count"], json!(0));
    let unfavorite = app.delete(&format!("/api/recipes/{}/favorite/", id), Some(&bob)).await;
    assert_eq!(unfavorite.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recipe_list_filters_and_pagination() {
    let app = TestApp::new().await;
    let (egg, _, breakfast, dinner) = app.seed_catalog().await;
    let (alice_id, alice) = app.signup("alice").await;
    let (_, bob) = app.signup("bob").await;

    for (token, name, tag) in [
        (&alice, "Alpha", breakfast),
        (&alice, "Bravo", dinner),
        (&bob, "Charlie", breakfast),
    ] {
        let res = app.post("/api/recipes/", Some(token), recipe_body(name, &[(egg, 1)], &[tag])).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let page = app.get("/api/recipes/?limit=2", None).await.json();
    assert_eq!(page["count"], json!(3));
    assert_eq!(page["next"], json!(2));
    assert_eq!(page["previous"], Value::Null);
    assert_eq!(page["results"][0]["name"], json!("Alpha"));

    let page2 = app.get("/api/recipes/?limit=2&page=2", None).await.json();
    assert_eq!(page2["results"].as_array().unwrap().len(), 1);
    assert_eq!(page2["previous"], json!(1));

    let by_author = app.get(&format!("/api/recipes/?author={}", alice_id), None).await.json();
    assert_eq!(by_author["count"], json!(2));

    let tagged = app.get("/api/recipes/?tags=breakfast", None).await.json();
    assert_eq!(tagged["count"], json!(2));
    let either = app.get("/api/recipes/?tags=breakfast&tags=dinner", None).await.json();
    assert_eq!(either["count"], json!(3));

    assert_eq!(app.get("/api/recipes/?author=abc", None).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_number_at_upper_bound() {
    let app = TestApp::new().await;
    let (egg, _, breakfast, _) = app.seed_catalog().await;
    let (_, alice) = app.signup("alice").await;
    let (bob_id, _) = app.signup("bob").await;
    let res = app.post("/api/recipes/", Some(&alice), recipe_body("Alpha", &[(egg, 1)], &[breakfast])).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let res = app.post(&format!("/api/users/{}/subscribe/", bob_id), Some(&alice), json!({})).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());

    for uri in [
        "/api/recipes/?page=9223372036854775807",
        "/api/users/?page=9223372036854775807",
        "/api/users/subscriptions/?page=9223372036854775807",
    ] {
        let res = app.get(uri, Some(&alice)).await;
        assert_eq!(res.status, StatusCode::OK, "{}: {}", uri, res.text());
        let page = res.json();
        assert!(page["results"].as_array().unwrap().is_empty(), "{}", uri);
        assert_eq!(page["next"], Value::Null, "{}", uri);
        assert_eq!(page["previous"], json!(i64::MAX - 1), "{}", uri);
    }

    let res = app.get("/api/recipes/?page=9223372036854775808", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_path_ids_are_bad_requests() {
    let app = TestApp::new().await;
    let (_, alice) = app.signup("alice").await;

    for (method, uri) in [
        (Method::GET, "/api/recipes/abc/"),
        (Method::GET, "/api/users/abc/"),
        (Method::GET, "/api/tags/1.5/"),
        (Method::GET, "/api/ingredients/99999999999999999999/"),
        (Method::POST, "/api/recipes/abc/favorite/"),
        (Method::DELETE, "/api/users/abc/subscribe/"),
    ] {
        let res = app.send(method.clone(), uri, Some(&alice), None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        let body = res.json();
        assert_eq!(body["status"], json!(400), "{} {}", method, uri);
        assert!(body["error"].is_string(), "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_shopping_cart_download() {
    let app = TestApp::new().await;
    let (egg, flour, breakfast, _) = app.seed_catalog().await;
    let (_, alice) = app.signup("alice").await;

    let x = app
        .post("/api/recipes/", Some(&alice), recipe_body("X", &[(egg, 2), (flour, 100)], &[breakfast]))
        .await
        .json()["id"]
        .as_i64()
        .unwrap();
    let y = app
        .post("/api/recipes/", Some(&alice), recipe_body("Y", &[(egg, 1), (flour, 50)], &[breakfast]))
        .await
        .json()["id"]
        .as_i64()
        .unwrap();

    let empty = app.get("/api/recipes/download_shopping_cart/", Some(&alice)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.text(), "");
    assert_eq!(
        app.get("/api/recipes/download_shopping_cart/", None).await.status,
        StatusCode::UNAUTHORIZED
    );

    for id in [x, y] {
        let res = app.post(&format!("/api/recipes/{}/shopping_cart/", id), Some(&alice), json!({})).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let list = app.get("/api/recipes/download_shopping_cart/", Some(&alice)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert!(list.headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert!(list.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("shopping_list.txt"));
    assert_eq!(list.text(), "egg (pcs) — 3\nflour (g) — 150");

    let in_cart = app.get("/api/recipes/?is_in_shopping_cart=true", Some(&alice)).await.json();
    assert_eq!(in_cart["count"], json!(2));

    let removed = app.delete(&format!("/api/recipes/{}/shopping_cart/", x), Some(&alice)).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let list = app.get("/api/recipes/download_shopping_cart/", Some(&alice)).await;
    assert_eq!(list.text(), "egg (pcs) — 1\nflour (g) — 50");
}

#[tokio::test]
async fn test_subscriptions() {
    let app = TestApp::new().await;
    let (egg, _, breakfast, _) = app.seed_catalog().await;
    let (alice_id, alice) = app.signup("alice").await;
    let (bob_id, bob) = app.signup("bob").await;

    for name in ["One", "Two", "Three"] {
        app.post("/api/recipes/", Some(&bob), recipe_body(name, &[(egg, 1)], &[breakfast])).await;
    }

    let own = app.post(&format!("/api/users/{}/subscribe/", alice_id), Some(&alice), json!({})).await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    let missing = app.post("/api/users/999/subscribe/", Some(&alice), json!({})).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let sub = app
        .post(&format!("/api/users/{}/subscribe/?recipes_limit=2", bob_id), Some(&alice), json!({}))
        .await;
    assert_eq!(sub.status, StatusCode::CREATED);
    let body = sub.json();
    assert_eq!(body["id"], json!(bob_id));
    assert_eq!(body["is_subscribed"], json!(true));
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);
    assert_eq!(body["recipes_count"], json!(3));

    let dup = app.post(&format!("/api/users/{}/subscribe/", bob_id), Some(&alice), json!({})).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let profile = app.get(&format!("/api/users/{}/", bob_id), Some(&alice)).await.json();
    assert_eq!(profile["is_subscribed"], json!(true));
    let anonymous = app.get(&format!("/api/users/{}/", bob_id), None).await.json();
    assert_eq!(anonymous["is_subscribed"], json!(false));

    let list = app.get("/api/users/subscriptions/?recipes_limit=1", Some(&alice)).await.json();
    assert_eq!(list["count"], json!(1));
    assert_eq!(list["results"][0]["username"], json!("bob"));
    assert_eq!(list["results"][0]["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(app.get("/api/users/subscriptions/", Some(&bob)).await.json()["count"], json!(0));

    let gone = app.delete(&format!("/api/users/{}/subscribe/", bob_id), Some(&alice)).await;
    assert_eq!(gone.status, StatusCode::NO_CONTENT);
    let again = app.delete(&format!("/api/users/{}/subscribe/", bob_id), Some(&alice)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}
