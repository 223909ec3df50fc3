use std::path::Path;

use actix_files::NamedFile;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;

use crate::error::RelayError;
use crate::model::prompt;
use crate::web::models::{ChatReply, ChatRequest, ConfigPayload};
use crate::AppState;

// Liveness endpoint
pub async fn status() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ready" }))
}

/// Serves `favicon.ico` from the public directory, or an empty 204 so
/// browsers stop asking.
pub async fn favicon(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let icon = Path::new(&data.config.public_dir).join("favicon.ico");
    match NamedFile::open_async(&icon).await {
        Ok(file) => file.into_response(&req),
        Err(_) => HttpResponse::NoContent().finish(),
    }
}

/// Hands the front-end what it needs to talk to the data store directly.
pub async fn config(data: web::Data<AppState>) -> impl Responder {
    let store = data.store.config();
    HttpResponse::Ok().json(ConfigPayload {
        supabase_url: store.map(|s| s.url.clone()),
        supabase_key: store.map(|s| s.public_key().to_string()),
    })
}

// Data store smoke test
pub async fn test_store(data: web::Data<AppState>) -> Result<HttpResponse, RelayError> {
    match data.store.count_rows().await {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({
            "status": "success",
            "data": rows,
        }))),
        Err(e) => {
            error!("Data store connection error: {}", e);
            Err(e.into())
        }
    }
}

// Chat relay endpoint
pub async fn chat(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, RelayError> {
    let chat = req.into_inner().validate(data.config.require_personality)?;

    info!(
        "Chat request from {} ({} history entries, custom persona: {})",
        chat.user_name,
        chat.history.len(),
        chat.personality.is_some()
    );

    let messages = prompt::build_messages(
        &chat,
        &data.config.default_persona,
        data.config.history_window,
    );
    let max_tokens = data.completions.max_tokens_for(chat.personality.is_some());

    match data.completions.complete(&messages, max_tokens).await {
        Ok(reply) => Ok(HttpResponse::Ok().json(ChatReply { reply })),
        Err(e) => {
            error!("Completion error: {}", e);
            Err(e.into())
        }
    }
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, RelayError> {
    Err(RelayError::NotFound(req.path().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::{MISSING_PARAMETERS, REPLY_FAILED};
    use crate::web::routes;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(openai_url: &str, extra: &[(&str, &str)]) -> AppConfig {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("OPENAI_API_KEY".into(), "sk-test".into());
        vars.insert("OPENAI_BASE_URL".into(), openai_url.into());
        vars.insert("PUBLIC_DIR".into(), "no-such-public-dir".into());
        vars.insert("UPSTREAM_TIMEOUT_SECS".into(), "5".into());
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    macro_rules! relay_app {
        ($config:expr) => {{
            let state = web::Data::new(AppState::new($config).unwrap());
            let public_dir = state.config.public_dir.clone();
            test::init_service(
                App::new()
                    .app_data(state)
                    .configure(routes::configure)
                    .configure(|cfg| routes::static_files(cfg, &public_dir))
                    .default_service(web::to(not_found)),
            )
            .await
        }};
    }

    fn chat_body(personality: Option<&str>) -> Value {
        let mut body = json!({
            "message": "Hello",
            "userName": "Alice",
            "chatHistory": [],
        });
        if let Some(p) = personality {
            body["personality"] = json!(p);
        }
        body
    }

    #[actix_web::test]
    async fn status_is_always_ready() {
        let app = relay_app!(test_config("http://127.0.0.1:9", &[]));

        let req = test::TestRequest::get().uri("/status").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"status": "ready"}));
    }

    #[actix_web::test]
    async fn favicon_is_no_content() {
        let app = relay_app!(test_config("http://127.0.0.1:9", &[]));

        let req = test::TestRequest::get().uri("/favicon.ico").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 204);
        assert!(test::read_body(resp).await.is_empty());
    }

    #[actix_web::test]
    async fn config_is_stable_and_prefers_anon_key() {
        let app = relay_app!(test_config(
            "http://127.0.0.1:9",
            &[
                ("SUPABASE_URL", "https://proj.supabase.co"),
                ("SUPABASE_KEY", "service-secret"),
                ("SUPABASE_ANON_KEY", "anon-public"),
            ]
        ));

        let first: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/config").to_request(),
        )
        .await;
        let second: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/config").to_request(),
        )
        .await;

        assert_eq!(first, second);
        assert_eq!(
            first,
            json!({"supabaseUrl": "https://proj.supabase.co", "supabaseKey": "anon-public"})
        );
    }

    #[actix_web::test]
    async fn chat_relays_reply_with_personality_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "max_tokens": 800,
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "User Alice said: Hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello Alice, how can I help?"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = relay_app!(test_config(&server.uri(), &[]));
        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(chat_body(Some("You are a helpful assistant.")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"reply": "Hello Alice, how can I help?"}));
    }

    #[actix_web::test]
    async fn chat_upstream_failure_is_500_with_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let app = relay_app!(test_config(&server.uri(), &[]));
        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(chat_body(None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 500);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], REPLY_FAILED);
        assert!(body["details"]
            .as_str()
            .unwrap()
            .contains("Incorrect API key provided"));
    }

    #[actix_web::test]
    async fn chat_without_required_personality_never_reaches_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = relay_app!(test_config(
            &server.uri(),
            &[("REQUIRE_PERSONALITY", "true")]
        ));
        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(chat_body(None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], MISSING_PARAMETERS);
        assert_eq!(body["details"], "personality");
    }

    #[actix_web::test]
    async fn chat_rejects_malformed_json() {
        let app = relay_app!(test_config("http://127.0.0.1:9", &[]));
        let req = test::TestRequest::post()
            .uri("/chat")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"message\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid JSON payload");
    }

    #[actix_web::test]
    async fn store_check_reports_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/chat_messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
            .mount(&server)
            .await;

        let store_url = server.uri();
        let app = relay_app!(test_config(
            "http://127.0.0.1:9",
            &[("SUPABASE_URL", store_url.as_str()), ("SUPABASE_KEY", "service-secret")]
        ));
        let req = test::TestRequest::get().uri("/test-supabase").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "success", "data": {"count": 3}}));
    }

    #[actix_web::test]
    async fn store_check_without_store_is_500() {
        let app = relay_app!(test_config("http://127.0.0.1:9", &[]));

        let req = test::TestRequest::get().uri("/test-supabase").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 500);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"status": "error", "error": "Data store is not configured"})
        );
    }

    #[actix_web::test]
    async fn unmatched_route_is_json_404() {
        let app = relay_app!(test_config("http://127.0.0.1:9", &[]));

        let req = test::TestRequest::get().uri("/missing/page").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["details"], "/missing/page");
    }

    fn public_dir_with(files: &[(&str, &[u8])]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    #[actix_web::test]
    async fn public_dir_serves_front_end_behind_api_routes() {
        let dir = public_dir_with(&[("index.html", &b"<h1>hi</h1>"[..])]);
        let public_dir = dir.path().to_str().unwrap().to_string();
        let app = relay_app!(test_config(
            "http://127.0.0.1:9",
            &[("PUBLIC_DIR", public_dir.as_str())]
        ));

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(test::read_body(resp).await, "<h1>hi</h1>");

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "ready"}));

        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
    }

    #[actix_web::test]
    async fn favicon_from_public_dir_wins_over_no_content() {
        let icon: &[u8] = &[0, 0, 1, 0, 1, 0];
        let dir = public_dir_with(&[("favicon.ico", icon)]);
        let public_dir = dir.path().to_str().unwrap().to_string();
        let app = relay_app!(test_config(
            "http://127.0.0.1:9",
            &[("PUBLIC_DIR", public_dir.as_str())]
        ));

        let req = test::TestRequest::get().uri("/favicon.ico").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(test::read_body(resp).await, icon);
    }
}
