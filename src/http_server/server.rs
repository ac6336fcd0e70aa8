//! http serving 层
//! 只输出注册表快照、能力自描述并受理指令下发；页面渲染不在网关
//! 职责内，由上层站点消费这些 json 接口

use std::sync::Arc;

use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::error::ServerErrorCode;
use crate::common::setting::Settings;
use crate::device_controller::command_dispatcher::CommandDispatcher;
use crate::device_controller::device_registry::DeviceRegistry;
use crate::driver::registry as driver_registry;
use crate::driver::schema;
use crate::info;

const LOG_TAG: &str = "http_server";

pub struct AppState {
    pub device_registry: Arc<DeviceRegistry>,
    pub dispatcher: Arc<CommandDispatcher>,
}

#[get("/api/devices")]
async fn list_devices(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.device_registry.list())
}

#[get("/api/device/{serial}")]
async fn get_device(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.device_registry.get(path.as_str()) {
        Ok(device) => HttpResponse::Ok().json(device),
        Err(e) => HttpResponse::NotFound().json(json!({ "error": e.msg })),
    }
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    kind: String,
    #[serde(default)]
    params: Value,
}

#[post("/api/device/{serial}/command")]
async fn post_command(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommandRequest>,
) -> impl Responder {
    let serial = path.into_inner();
    let dispatcher = state.dispatcher.clone();
    let kind = body.kind.clone();
    let params = body.params.clone();

    // dispatch 会等待 broker 确认（最长 send timeout），放到阻塞线程池
    let dispatched = web::block({
        let serial = serial.clone();
        move || dispatcher.dispatch(serial.as_str(), kind.as_str(), params)
    })
    .await;

    match dispatched {
        Ok(Ok(correlation_id)) => HttpResponse::Accepted().json(json!({
            "serial": serial,
            "correlation_id": correlation_id,
        })),
        Ok(Err(e)) => {
            let mut response = match e.code {
                ServerErrorCode::UnknownDevice => HttpResponse::NotFound(),
                ServerErrorCode::UnsupportedCommand => HttpResponse::BadRequest(),
                ServerErrorCode::PublishFailure => HttpResponse::BadGateway(),
                _ => HttpResponse::InternalServerError(),
            };
            response.json(json!({ "error": e.msg }))
        }
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

/// 能力自描述：新增设备族只需注册驱动和 schema，这里无需改动
#[get("/api/families")]
async fn list_families() -> impl Responder {
    let families: Vec<Value> = driver_registry::known_families()
        .iter()
        .map(|family| {
            let driver = driver_registry::resolve(family);
            json!({
                "family": family,
                "message_types": driver.get_message_types(),
                "command_kinds": driver.get_command_kinds(),
                "schemas": schema::describe_family(family),
            })
        })
        .collect();
    HttpResponse::Ok().json(families)
}

#[get("/api/commands/pending")]
async fn list_pending_commands(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.dispatcher.pending_snapshot())
}

// run server as a submodule
pub async fn run(
    device_registry: Arc<DeviceRegistry>,
    dispatcher: Arc<CommandDispatcher>,
) -> std::io::Result<()> {
    let setting = Settings::get();
    let state = web::Data::new(AppState {
        device_registry,
        dispatcher,
    });

    info!(
        LOG_TAG,
        "http server listening on {}:{}", setting.web.web_host, setting.web.web_port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(list_devices)
            .service(get_device)
            .service(post_command)
            .service(list_families)
            .service(list_pending_commands)
    })
    .bind((setting.web.web_host.as_str(), setting.web.web_port))?
    .run()
    .await
}

// 单元测试部分
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::DeviceServerError;
    use crate::common::mqtt::MessagePublisher;
    use crate::entity::dto::decoded_dto::DecodedMessageDto;
    use crate::entity::dto::device_dto::DeviceDto;
    use crate::entity::dto::topic_dto::MessageClassEnum;
    use actix_web::test;
    use std::sync::Mutex;

    struct DummyPublisher {
        published: Mutex<Vec<String>>,
    }

    impl MessagePublisher for DummyPublisher {
        fn publish(&self, topic: &str, _payload: &[u8]) -> Result<(), DeviceServerError> {
            self.published.lock().unwrap().push(topic.to_string());
            Ok(())
        }
    }

    fn make_state() -> web::Data<AppState> {
        let device_registry = Arc::new(DeviceRegistry::new(60_000));
        device_registry.upsert(
            "ABC123",
            "sanitizerGen2",
            &DecodedMessageDto {
                class: MessageClassEnum::Announce,
                schema_name: "SanitizerAnnounce".to_string(),
                fields: json!({"product_name": "AquaRite 940"}),
                correlation_id: None,
            },
            1000,
        );
        let dispatcher = Arc::new(CommandDispatcher::new(
            device_registry.clone(),
            Arc::new(DummyPublisher {
                published: Mutex::new(Vec::new()),
            }),
            30_000,
        ));
        web::Data::new(AppState {
            device_registry,
            dispatcher,
        })
    }

    #[actix_web::test]
    async fn test_list_devices() {
        let app = test::init_service(
            App::new().app_data(make_state()).service(list_devices),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/devices").to_request();
        let devices: Vec<DeviceDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "ABC123");
    }

    #[actix_web::test]
    async fn test_get_unknown_device_is_404() {
        let app = test::init_service(
            App::new().app_data(make_state()).service(get_device),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/device/GHOST")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_post_command_accepted() {
        let app = test::init_service(
            App::new().app_data(make_state()).service(post_command),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/device/ABC123/command")
            .set_json(json!({"kind": "get_status"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::ACCEPTED);
    }

    #[actix_web::test]
    async fn test_post_unsupported_command_is_400() {
        let app = test::init_service(
            App::new().app_data(make_state()).service(post_command),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/device/ABC123/command")
            .set_json(json!({"kind": "open_pod_bay_doors"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_families_self_describe() {
        let app = test::init_service(App::new().service(list_families)).await;

        let req = test::TestRequest::get().uri("/api/families").to_request();
        let families: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(families
            .iter()
            .any(|f| f["family"] == "sanitizerGen2"
                && f["command_kinds"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .any(|k| k == "set_output_percentage")));
    }
}
