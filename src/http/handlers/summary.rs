use crate::domain::summary::TimeRange;
use crate::service::summary_service::INTERNAL_FLAG;
use crate::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Set by peers; any non-empty value suppresses federation.
    pub internal: Option<String>,
}

impl SummaryQuery {
    /// Builds the query from decoded pairs. A repeated key keeps its first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "from" => &mut query.from,
                "to" => &mut query.to,
                INTERNAL_FLAG => &mut query.internal,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    pub fn federate(&self) -> bool {
        self.internal.as_deref().map_or(true, str::is_empty)
    }
}

pub async fn get_summary(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> impl IntoResponse {
    let query = match pairs {
        Ok(Query(pairs)) => SummaryQuery::from_pairs(pairs),
        Err(e) => {
            tracing::debug!(error = %e, "rejecting summary request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let range = match TimeRange::parse(query.from.as_deref(), query.to.as_deref()) {
        Ok(range) => range,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting summary request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match state.summary_service.get_summary(&range, query.federate()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}
