//! Training actions, including QR-gated check-in.

use chrono::Utc;
use serde_json::json;

use cs_gateway::{ActionContext, HandlerFailure, HandlerResult};

use crate::enrollment::handlers::EnrollErrors;
use crate::shared::qr::QrTokenSigner;
use crate::shared::store::SportStore;
use crate::training::entity::CheckIn;

/// `GET /training/{id}`
pub async fn retrieve(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let training_id = ctx.path_int("id")?;
    let training = store
        .training(training_id)
        .ok_or_else(|| HandlerFailure::not_found("Training", training_id))?;
    let group = store
        .group(training.group_id)
        .ok_or_else(|| HandlerFailure::internal("training without group"))?;

    let checked_in = ctx
        .caller
        .user_id
        .map(|user_id| store.checkin(user_id, training.id).is_some())
        .unwrap_or(false);

    Ok(json!({
        "id": training.id,
        "group_id": group.id,
        "group_name": group.name,
        "custom_name": training.custom_name,
        "start": training.start,
        "end": training.end,
        "training_class": training.training_class,
        "accredited": group.accredited,
        "require_qr": group.require_qr,
        "checked_in_count": store.checkin_count(training.id),
        "checked_in": checked_in,
        "can_check_in": Utc::now() < training.end,
    }))
}

/// `POST /training/{id}/check-in`
///
/// Requires enrollment into the training's group. Groups with a QR
/// requirement additionally demand a valid signed `qr_token`.
pub async fn check_in(
    store: &SportStore,
    signer: &QrTokenSigner,
    ctx: &ActionContext,
) -> HandlerResult {
    let training_id = ctx.path_int("id")?;
    let user_id = ctx.user_id()?;

    let training = store
        .training(training_id)
        .ok_or_else(|| HandlerFailure::not_found("Training", training_id))?;
    let group = store
        .group(training.group_id)
        .ok_or_else(|| HandlerFailure::internal("training without group"))?;

    if store.enrollment(user_id, group.id).is_none() {
        let (code, detail) = EnrollErrors::NOT_ENROLLED;
        return Err(HandlerFailure::rule(code, detail));
    }
    if Utc::now() >= training.end {
        return Err(HandlerFailure::unprocessable("Training is already over"));
    }
    if store.checkin(user_id, training.id).is_some() {
        return Err(HandlerFailure::conflict(
            "You are already checked in to this training",
        ));
    }
    if store.checkin_count(training.id) >= group.capacity as usize {
        let (code, detail) = EnrollErrors::GROUP_IS_FULL;
        return Err(HandlerFailure::rule(code, detail));
    }

    if group.require_qr {
        let valid = ctx
            .str_field("qr_token")
            .map(|token| signer.verify(token, user_id, training.id))
            .unwrap_or(false);
        if !valid {
            let (code, detail) = EnrollErrors::QR_ERROR;
            return Err(HandlerFailure::rule(code, detail));
        }
    }

    let id = store.next_id();
    store.checkins.insert(id, CheckIn::new(id, user_id, training.id));
    Ok(json!({}))
}

/// `POST /training/{id}/cancel-check-in`
pub async fn cancel_check_in(store: &SportStore, ctx: &ActionContext) -> HandlerResult {
    let training_id = ctx.path_int("id")?;
    let user_id = ctx.user_id()?;

    if store.training(training_id).is_none() {
        return Err(HandlerFailure::not_found("Training", training_id));
    }
    let checkin = store
        .checkin(user_id, training_id)
        .ok_or_else(|| HandlerFailure::unprocessable("You are not checked in to this training"))?;

    store.checkins.remove(&checkin.id);
    Ok(json!({}))
}
