//! External integration routes: AI chat, medication registry, payments
//!
//! The payment webhook is the only route here that always answers HTTP 200;
//! the gateway treats any other status as a delivery failure and retries.

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    jwt::Claims,
    middleware::{ai_rate_limit, auth_middleware, require_admin},
    models::{
        Category, CreateTransactionRequest, NewOrder, NewOrderItem, NewProduct, Order,
        OrderStatus, PaymentNotification, Product, TransactionData,
    },
    services::{
        ai,
        payment::{CustomerDetails, generate_order_id, map_notification_status},
    },
    state::AppState,
};

/// Question/message length cap shared by both AI routes
const MAX_QUESTION_CHARS: usize = 500;

/// Registry page size pulled during a sync run
const SYNC_FETCH_LIMIT: u32 = 50;

pub fn router(state: &AppState) -> Router<AppState> {
    let ai_routes = Router::new()
        .route("/ai/ask", post(ask_ai))
        .route("/ai/chat", post(chat_ai))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ai_rate_limit,
        ));

    let registry_routes = Router::new()
        .route("/kemenkes/medications", get(get_medications))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let registry_admin_routes = Router::new()
        .route("/kemenkes/sync", post(sync_medications))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let payment_routes = Router::new()
        .route("/payment/create", post(create_payment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(ai_routes)
        .merge(registry_routes)
        .merge(registry_admin_routes)
        .merge(payment_routes)
        .route("/payment/webhook", post(payment_webhook))
}

// Request types

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct MedicationQuery {
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// One-shot AI question with product recommendations
pub async fn ask_ai(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Result<Response, ApiError> {
    let question = validate_prompt(payload.question.as_deref(), "Question")?;

    let answer = match state.ai_client.ask(&question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("AI request failed: {}", e);
            return Ok(adapter_failure("Failed to process AI request"));
        }
    };

    let recommended = recommend_products(&state, &question).await?;

    Ok(Json(json!({
        "success": true,
        "answer": answer,
        "recommendedProducts": recommended,
    }))
    .into_response())
}

/// Chat-style AI route; degrades to an apology instead of a bare error
pub async fn chat_ai(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let message = validate_prompt(payload.message.as_deref(), "Message")?;

    if let Some(ref context) = payload.context {
        debug!("Chat context provided: {}", context);
    }

    match state.ai_client.ask(&message).await {
        Ok(answer) => {
            let recommended = recommend_products(&state, &message).await?;
            Ok(Json(json!({
                "success": true,
                "answer": answer,
                "recommendedProducts": recommended,
            }))
            .into_response())
        }
        Err(e) => {
            error!("AI chat failed: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "answer": "Sorry, I am having technical difficulties. Please try again.",
                    "recommendedProducts": [],
                })),
            )
                .into_response())
        }
    }
}

/// Proxy a medication search against the registry
pub async fn get_medications(
    State(state): State<AppState>,
    Query(query): Query<MedicationQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(10).min(100).max(1);

    match state
        .registry_client
        .get_medications(query.search.as_deref(), limit)
        .await
    {
        Ok(data) => Ok(Json(json!({
            "success": true,
            "count": data.len(),
            "data": data,
        }))
        .into_response()),
        Err(e) => {
            error!("Medication registry request failed: {}", e);
            Ok(adapter_failure("Failed to fetch medication data"))
        }
    }
}

/// Seed catalog entries from the registry (admin)
///
/// New products land inactive with zero price and stock so they stay
/// hidden until an admin prices them.
pub async fn sync_medications(State(state): State<AppState>) -> Result<Response, ApiError> {
    let medications = match state
        .registry_client
        .get_medications(None, SYNC_FETCH_LIMIT)
        .await
    {
        Ok(medications) => medications,
        Err(e) => {
            error!("Medication registry request failed: {}", e);
            return Ok(adapter_failure("Failed to fetch medication data"));
        }
    };

    let mut new_products = 0;
    for medication in &medications {
        if medication.name.trim().is_empty() {
            continue;
        }
        if state
            .product_repository
            .exists_by_name(&medication.name)
            .await?
        {
            continue;
        }

        let new_product = NewProduct {
            name: medication.name.clone(),
            description: medication.description.clone(),
            category: Category::Medicine,
            price: 0,
            stock: 0,
            manufacturer: medication.manufacturer.clone(),
            image_url: None,
            is_active: false,
        };
        state.product_repository.create(&new_product).await?;
        new_products += 1;
    }

    info!(
        "Registry sync added {} products from {} medications",
        new_products,
        medications.len()
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Synced {} new medications from Kemenkes", new_products),
        "newProducts": new_products,
    }))
    .into_response())
}

/// Create a pending order and open a gateway transaction for it
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<Response, ApiError> {
    if payload.items.is_empty() {
        return Err(ApiError::BadRequest("Order items are required".to_string()));
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let ids: Vec<Uuid> = payload.items.iter().map(|item| item.product_id).collect();
    let products = state.product_repository.find_by_ids(&ids).await?;
    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut order_items = Vec::with_capacity(payload.items.len());
    let mut total_amount: i64 = 0;
    for item in &payload.items {
        let product = by_id
            .get(&item.product_id)
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

        if !product.is_active {
            return Err(ApiError::BadRequest("Product is not active".to_string()));
        }
        if item.quantity > product.stock {
            return Err(ApiError::BadRequest("Insufficient stock".to_string()));
        }

        total_amount += product.price * i64::from(item.quantity);
        order_items.push(NewOrderItem {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: item.quantity,
        });
    }

    let order_id = payload
        .order_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_order_id);

    let new_order = NewOrder {
        order_id,
        user_id: claims.sub,
        total_amount,
        customer_name: payload.customer_name.clone(),
        customer_email: payload.customer_email.clone(),
        customer_phone: payload.customer_phone.clone(),
        customer_address: payload.customer_address.clone(),
        notes: payload.notes.clone(),
    };
    let order = state
        .order_repository
        .create_with_items(&new_order, &order_items)
        .await?;

    let customer = CustomerDetails {
        name: order.customer_name.clone(),
        email: order.customer_email.clone(),
        phone: order.customer_phone.clone(),
        address: order.customer_address.clone(),
    };

    let snap = match state
        .payment_client
        .create_transaction(&order.order_id, order.total_amount, &customer, &order_items)
        .await
    {
        Ok(snap) => snap,
        Err(e) => {
            // The order stays pending; the client can retry payment later
            error!(
                "Payment gateway transaction failed for {}: {}",
                order.order_id, e
            );
            return Ok(adapter_failure("Failed to create payment transaction"));
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": "Payment transaction created",
        "data": TransactionData {
            order_id: order.order_id,
            token: snap.token,
            redirect_url: snap.redirect_url,
            total_amount: order.total_amount,
        },
    }))
    .into_response())
}

/// Gateway notification callback
///
/// Always answers HTTP 200 so the gateway does not re-deliver; failures
/// are encoded in the envelope body.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(notification): Json<PaymentNotification>,
) -> Response {
    match process_notification(&state, &notification).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("Webhook processing failed: {}", e);
            Json(json!({
                "success": false,
                "message": "Failed to process notification",
            }))
            .into_response()
        }
    }
}

async fn process_notification(
    state: &AppState,
    notification: &PaymentNotification,
) -> Result<serde_json::Value, ApiError> {
    let Some(order_id) = notification.order_id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok(json!({"success": false, "message": "Missing order_id"}));
    };

    let Some(previous) = state.order_repository.find_by_reference(order_id).await? else {
        warn!("Webhook for unknown order {}", order_id);
        return Ok(json!({"success": false, "message": "Order not found"}));
    };

    let new_status = notification
        .transaction_status
        .as_deref()
        .and_then(|status| map_notification_status(status, notification.fraud_status.as_deref()));

    let Some(order) = state
        .order_repository
        .apply_notification(order_id, new_status, notification)
        .await?
    else {
        return Ok(json!({"success": false, "message": "Order not found"}));
    };

    info!(
        "Webhook for {}: {} -> {}",
        order.order_id,
        previous.status.as_str(),
        order.status.as_str()
    );

    if order.status == OrderStatus::Paid && previous.status != OrderStatus::Paid {
        send_confirmation(state, &order).await;
    }

    Ok(json!({"success": true, "message": "Notification processed"}))
}

/// Best-effort confirmation email; failures never affect the webhook
async fn send_confirmation(state: &AppState, order: &Order) {
    let items = match state.order_repository.items_for(order.id).await {
        Ok(items) => items,
        Err(e) => {
            warn!(
                "Could not load items for confirmation email on {}: {}",
                order.order_id, e
            );
            return;
        }
    };

    if let Err(e) = state.email.send_payment_confirmation(order, &items).await {
        warn!(
            "Payment confirmation email failed for {}: {}",
            order.order_id, e
        );
    }
}

fn validate_prompt(raw: Option<&str>, field: &str) -> Result<String, ApiError> {
    let value = raw.map(str::trim).unwrap_or_default();

    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "{} too long (max {} characters)",
            field, MAX_QUESTION_CHARS
        )));
    }

    Ok(value.to_string())
}

async fn recommend_products(state: &AppState, question: &str) -> Result<Vec<Product>, ApiError> {
    let keywords = ai::extract_keywords(question);
    if keywords.is_empty() {
        return Ok(Vec::new());
    }

    Ok(state.product_repository.search_keywords(&keywords, 3).await?)
}

fn adapter_failure(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}
