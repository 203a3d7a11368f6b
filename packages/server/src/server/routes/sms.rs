use axum::extract::{Form, OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::AppError;
use crate::domains::company::models::Company;
use crate::server::app::AppState;

/// Inbound SMS webhook.
///
/// The request is authenticated by its `X-Twilio-Signature` header, computed
/// over the full URL and the form parameters. Messages are logged against
/// the company owning the destination number; transport-level replies are
/// the SMS collaborator's concern, so the handler answers 204.
pub async fn inbound_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Form(params): Form<Vec<(String, String)>>,
) -> Result<StatusCode, AppError> {
    let Some(twilio) = &state.twilio else {
        warn!("inbound SMS received but Twilio credentials are not configured");
        return Err(AppError::Auth);
    };

    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Auth)?;

    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Auth)?;
    let url = format!("https://{}{}", host, uri.path());

    if !twilio.validate_webhook_signature(&url, &params, signature) {
        warn!("inbound SMS failed signature validation");
        return Err(AppError::Auth);
    }

    let field = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    let from = field("From").unwrap_or_default().to_string();
    let to = field("To").unwrap_or_default().to_string();
    let body = field("Body").unwrap_or_default().to_string();
    let message_sid = field("MessageSid").map(str::to_string);

    let company = Company::find_by_sms_number(&to, &state.deps.db_pool).await?;

    sqlx::query(
        "INSERT INTO sms_messages (id, company_id, from_number, to_number, body, message_sid)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::now_v7())
    .bind(company.as_ref().map(|c| c.id))
    .bind(&from)
    .bind(&to)
    .bind(&body)
    .bind(&message_sid)
    .execute(&state.deps.db_pool)
    .await
    .map_err(AppError::Database)?;

    info!(
        from = %from,
        company = ?company.as_ref().map(|c| c.id),
        "inbound SMS recorded"
    );
    Ok(StatusCode::NO_CONTENT)
}
