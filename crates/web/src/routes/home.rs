//! Home page and contact route handlers.
//!
//! The home page shows the logged-in user's contact table, a map of the
//! geocoded contacts and an optional poem about the most recently added
//! contact, plus the form to add a new one.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use mycontacts_core::ContactRecord;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::contacts::{ContactError, ContactFields, ValidationError};
use crate::state::AppState;

// =============================================================================
// Form and Query Types
// =============================================================================

/// New contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

/// Query parameters for error/warning/success display.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub error: Option<String>,
    pub warning: Option<String>,
    pub success: Option<String>,
}

/// One marker on the contact map.
#[derive(Debug, Serialize)]
struct MapPoint<'a> {
    name: &'a str,
    lat: f64,
    lon: f64,
}

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub display_name: String,
    pub contacts: Vec<ContactRecord>,
    /// JSON array of map markers, embedded into the page script.
    pub map_points: String,
    pub poem: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the home page with the user's contact table.
pub async fn home(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<HomeQuery>,
) -> Result<Response> {
    let table = state.contacts_for(user.username.clone()).table().await?;

    let points: Vec<MapPoint<'_>> = table
        .records()
        .iter()
        .filter_map(|record| {
            record.coordinates.map(|c| MapPoint {
                name: &record.name,
                lat: c.lat,
                lon: c.lon,
            })
        })
        .collect();
    let map_points = map_points_json(&points);

    // Best effort; the page renders fine without a poem.
    let mut poem = None;
    if let (Some(client), Some(last)) = (state.poems(), table.last()) {
        match client.generate(&last.name).await {
            Ok(text) => poem = Some(text),
            Err(e) => tracing::warn!("Poem generation failed: {}", e),
        }
    }

    Ok(HomeTemplate {
        display_name: user.display_name,
        contacts: table.records().to_vec(),
        map_points,
        poem,
        error: query.error,
        warning: query.warning,
        success: query.success,
    }
    .into_response())
}

/// Handle new contact form submission.
pub async fn add_contact(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ContactForm>,
) -> Response {
    let fields = ContactFields {
        name: form.name.trim().to_string(),
        street: form.street.trim().to_string(),
        postal_code: form.postal_code.trim().to_string(),
        city: form.city.trim().to_string(),
    };

    match state.contacts_for(user.username).add_contact(fields).await {
        Ok(outcome) => match outcome.geocode_warning {
            Some(warning) => {
                let url = format!("/?warning={}", urlencoding::encode(&warning));
                Redirect::to(&url).into_response()
            }
            None => Redirect::to("/?success=added").into_response(),
        },
        Err(ContactError::Validation(ValidationError::EmptyField(field))) => {
            let url = format!("/?error=empty_{field}");
            Redirect::to(&url).into_response()
        }
        Err(e) => {
            tracing::error!("Saving contact failed: {}", e);
            Redirect::to("/?error=save_failed").into_response()
        }
    }
}

/// Serialize map markers for embedding in a `<script>` block.
///
/// `<` is escaped as `\u003c` so a contact name can never close the
/// script element.
fn map_points_json(points: &[MapPoint<'_>]) -> String {
    serde_json::to_string(points)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('<', "\\u003c")
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_points_json_escapes_script_closers() {
        let points = vec![MapPoint {
            name: "Eve </script><script>alert(1)</script>",
            lat: 47.37,
            lon: 8.54,
        }];

        let json = map_points_json(&points);
        assert!(!json.contains('<'));
        assert!(json.contains("\\u003c/script>"));
    }

    #[test]
    fn test_map_points_json_plain_names_unchanged() {
        let points = vec![MapPoint {
            name: "Alice",
            lat: 47.37,
            lon: 8.54,
        }];

        assert_eq!(
            map_points_json(&points),
            r#"[{"name":"Alice","lat":47.37,"lon":8.54}]"#
        );
    }
}
