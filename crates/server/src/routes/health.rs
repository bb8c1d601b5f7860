use axum::response::Json as ResponseJson;
use utils::response::Ack;

pub async fn health_check() -> ResponseJson<Ack> {
    ResponseJson(Ack::ok())
}
