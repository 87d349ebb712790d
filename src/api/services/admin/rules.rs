//! Admin API 替换规则管理

use actix_web::{Responder, Result as ActixResult, web};

use crate::services::{AppServices, CreateRuleRequest, UpdateRuleRequest};

use super::helpers::{api_result, created_response, error_from_domain, success_response};
use super::types::RuleResponse;

/// 全部规则（按 id，即应用顺序）
pub async fn list_rules(services: web::Data<AppServices>) -> ActixResult<impl Responder> {
    let rules: Vec<RuleResponse> = services
        .endpoints
        .list_rules()
        .into_iter()
        .map(RuleResponse::from)
        .collect();
    Ok(success_response(rules))
}

pub async fn get_rule(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .get_rule(path.into_inner())
        .map(RuleResponse::from);
    Ok(api_result(result))
}

pub async fn create_rule(
    body: web::Json<CreateRuleRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    match services.endpoints.create_rule(body.into_inner()).await {
        Ok(rule) => Ok(created_response(RuleResponse::from(rule))),
        Err(e) => Ok(error_from_domain(&e)),
    }
}

pub async fn update_rule(
    path: web::Path<i32>,
    body: web::Json<UpdateRuleRequest>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let result = services
        .endpoints
        .update_rule(path.into_inner(), body.into_inner())
        .await
        .map(RuleResponse::from);
    Ok(api_result(result))
}

pub async fn delete_rule(
    path: web::Path<i32>,
    services: web::Data<AppServices>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let result = services
        .endpoints
        .delete_rule(id)
        .await
        .map(|_| serde_json::json!({ "deleted": id }));
    Ok(api_result(result))
}
