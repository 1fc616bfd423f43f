//! Public widget settings for front-end integration.

use axum::{Json, extract::State};
use serde::Serialize;

use formgate_common::constants::RECAPTCHA_BRANDING;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WidgetResponse {
    site_key: String,
    hide_badge: bool,
    /// Branding text to render under protected forms
    #[serde(skip_serializing_if = "Option::is_none")]
    branding: Option<&'static str>,
}

/// Site key and badge settings; never includes the secret
pub async fn widget_settings(State(state): State<AppState>) -> Json<WidgetResponse> {
    let recaptcha = &state.config.recaptcha;

    // A hidden badge is only allowed with visible branding
    let show_branding = recaptcha.hide_badge || recaptcha.add_text;

    Json(WidgetResponse {
        site_key: recaptcha.site_key.clone(),
        hide_badge: recaptcha.hide_badge,
        branding: show_branding.then_some(RECAPTCHA_BRANDING),
    })
}
