//! OAuth state 签发与校验
//!
//! 供外部登录流程调用：跳转前签发 state，回调时校验并消费。

use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};

use crate::services::{AppServices, StateCheck};

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_response, success_response};
use super::types::{IssueStateRequest, IssueStateResponse, VerifyStateRequest, VerifyStateResponse};

pub async fn issue_state(
    body: web::Json<IssueStateRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "session_id cannot be empty",
        ));
    }
    let state = services.oauth.issue(session_id).await;
    Ok(success_response(IssueStateResponse { state }))
}

pub async fn verify_state(
    body: web::Json<VerifyStateRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .oauth
        .verify(body.session_id.trim(), body.state.as_deref())
        .await
        .map(|check| VerifyStateResponse {
            verified: true,
            provider_state_missing: check == StateCheck::MissingFromProvider,
        });
    Ok(api_result(result))
}
