use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Layout};
use crate::error::ServiceError;
use crate::ingest;
use crate::models::*;
use crate::parser;
use crate::report;
use crate::store::{self, RollupStore};
use crate::table::TableView;

struct AppState {
    layout: Layout,
    escaping: Escaping,
    profile_url: String,
}

pub fn create_router(config: &Config) -> Router {
    let layout = config.layout();
    let public = ServeDir::new(&layout.public_dir);
    let assets = ServeDir::new(&layout.assets_dir);
    let uploads = ServeDir::new(&layout.uploads_dir);

    let state = Arc::new(AppState {
        layout,
        escaping: config.escaping,
        profile_url: config.profile_url.clone(),
    });

    Router::new()
        .route("/", get(index))
        .route("/processRollup", post(process_rollup))
        .route("/rollup-files", get(rollup_files))
        .route("/api/standings", get(standings))
        .route("/api/standings/view", post(standings_view))
        .route("/api/players/{name}/report", get(player_report))
        .nest_service("/public", public)
        .nest_service("/assets", assets)
        .nest_service("/uploads", uploads)
        .fallback(get(spa_fallback))
        .with_state(state)
}

/// Run file work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Log the real failure, hand the caller only a generic message
fn internal_error(message: &'static str) -> impl FnOnce(ServiceError) -> (StatusCode, String) {
    move |err| {
        error!(error = %err, "{}", message);
        (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }
}

async fn process_rollup(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, String)> {
    let layout = state.layout.clone();
    let outcome = blocking(move || ingest::ingest(&layout))
        .await
        .map_err(internal_error("Error processing rollup file."))?;

    if let IngestOutcome::Ingested {
        archived_as,
        created_log,
    } = &outcome
    {
        info!(archived_as = %archived_as.display(), created_log, "rollup processed");
    }
    Ok("Rollup file processed and combined successfully.")
}

async fn rollup_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let store = RollupStore::new(&state.layout);
    blocking(move || store.list_all())
        .await
        .map(Json)
        .map_err(internal_error("Error reading rollup files."))
}

/// Standings rows worth displaying. A missing export is an empty table.
fn load_standings(layout: &Layout) -> Result<Vec<StandingsRow>, ServiceError> {
    if !layout.standings_file.exists() {
        warn!(path = %layout.standings_file.display(), "standings file not found");
        return Ok(Vec::new());
    }
    let html = store::read_text(&layout.standings_file)?;
    Ok(parser::standings_for_display(parser::extract_standings(&html)))
}

async fn standings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StandingsRow>>, (StatusCode, String)> {
    let layout = state.layout.clone();
    blocking(move || load_standings(&layout))
        .await
        .map(Json)
        .map_err(internal_error("Error loading standings."))
}

async fn standings_view(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<ViewResponse>, (StatusCode, String)> {
    let layout = state.layout.clone();
    let rows = blocking(move || load_standings(&layout))
        .await
        .map_err(internal_error("Error loading standings."))?;

    let mut view = TableView::new(rows, request.state);
    if let Some(query) = &request.search {
        view.search(query);
    }
    if let Some(column) = request.sort {
        let direction = view.sort(column);
        debug!(column, ?direction, order = ?view.state().order, "sorted standings");
    }
    let tbody = view.render_body(&state.profile_url, state.escaping);
    Ok(Json(ViewResponse {
        state: view.into_state(),
        tbody,
    }))
}

async fn player_report(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Html<String>, (StatusCode, String)> {
    let store = RollupStore::new(&state.layout);
    let escaping = state.escaping;
    let page = blocking(move || {
        let Some(log) = store.combined_contents()? else {
            return Ok(None);
        };
        let entries = parser::extract_log_entries(&log);
        let matched = report::filter_by_player(&entries, &name);
        info!(player = %name, matched = matched.len(), "rendering player report");
        Ok(Some(report::render_player_report(&name, &matched, escaping)))
    })
    .await
    .map_err(internal_error("Error loading player records."))?;

    page.map(Html)
        .ok_or((StatusCode::NOT_FOUND, "No combined rollup log yet.".to_string()))
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    serve_index(&state).await
}

/// SPA fallback: any path that doesn't look like a file gets index.html
async fn spa_fallback(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let last_segment = uri.path().rsplit('/').next().unwrap_or("");
    if std::path::Path::new(last_segment).extension().is_some() {
        return not_found();
    }
    serve_index(&state).await
}

async fn serve_index(state: &AppState) -> Response {
    let path = state.layout.index_file();
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "index.html unavailable");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not Found",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempRoot;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const INDEX: &str = "<!DOCTYPE html><title>DKP</title>";

    fn config(root: &TempRoot) -> Config {
        Config {
            root: root.path().to_path_buf(),
            port: 0,
            open_browser: false,
            escaping: Escaping::Raw,
            profile_url: DEFAULT_PROFILE_URL.to_string(),
        }
    }

    fn prepared(name: &str) -> TempRoot {
        let root = TempRoot::new(name);
        root.write("public/index.html", INDEX);
        RollupStore::new(&root.layout()).ensure_dir().unwrap();
        root
    }

    async fn send(root: &TempRoot, request: Request<Body>) -> (StatusCode, String) {
        let response = create_router(&config(root)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn process_rollup_succeeds_without_source() {
        let root = prepared("api_no_source");
        let (status, body) = send(&root, post_req("/processRollup", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("successfully"));
    }

    #[tokio::test]
    async fn process_rollup_merges_and_lists() {
        let root = prepared("api_ingest");
        root.write("source/rollup.html", "X");
        let (status, _) = send(&root, post_req("/processRollup", "")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&root, get_req("/rollup-files")).await;
        assert_eq!(status, StatusCode::OK);
        let files: Vec<String> = serde_json::from_str(&body).unwrap();
        // combined log plus the archived original
        assert_eq!(files, vec!["X".to_string(), "X".to_string()]);
    }

    #[tokio::test]
    async fn process_rollup_failure_is_a_server_error() {
        let root = TempRoot::new("api_ingest_failure");
        root.write("source/rollup.html", "X");
        let (status, body) = send(&root, post_req("/processRollup", "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error processing rollup file.");
    }

    #[tokio::test]
    async fn rollup_listing_without_directory_is_a_server_error() {
        let root = TempRoot::new("api_list_failure");
        let (status, _) = send(&root, get_req("/rollup-files")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn standings_skip_rows_without_points() {
        let root = prepared("api_standings");
        root.write(
            "uploads/QDKP.html",
            "<table><tr><th>Name</th></tr>\
             <tr><td>PlayerA (MainA)</td><td>x</td><td>y</td><td>10</td><td>20</td><td>5</td></tr>\
             <tr><td>Idle</td><td></td><td></td><td>0</td><td>0</td><td>0</td></tr></table>",
        );
        let (status, body) = send(&root, get_req("/api/standings")).await;
        assert_eq!(status, StatusCode::OK);
        let rows: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["name"], "PlayerA (MainA)");
        assert_eq!(rows[0]["total_points"], "20");
    }

    #[tokio::test]
    async fn view_sorts_and_returns_state() {
        let root = prepared("api_view");
        root.write(
            "uploads/QDKP.html",
            "<table>\
             <tr><td>B</td><td></td><td></td><td>2</td><td>9</td><td>1</td></tr>\
             <tr><td>A</td><td></td><td></td><td>1</td><td>9</td><td>1</td></tr></table>",
        );
        let (status, body) =
            send(&root, post_req("/api/standings/view", r#"{"sort": 1}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let response: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["state"]["order"], serde_json::json!([1, 0]));
        assert_eq!(response["state"]["directions"]["1"], "asc");

        let again = format!(r#"{{"state": {}, "sort": 1}}"#, response["state"]);
        let (_, body) = send(&root, post_req("/api/standings/view", &again)).await;
        let response: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["state"]["order"], serde_json::json!([0, 1]));
        assert_eq!(response["state"]["directions"]["1"], "desc");
    }

    #[tokio::test]
    async fn view_search_hides_non_matching_rows() {
        let root = prepared("api_view_search");
        root.write(
            "uploads/QDKP.html",
            "<table>\
             <tr><td>Anna</td><td></td><td></td><td>1</td><td>9</td><td>1</td></tr>\
             <tr><td>Bob</td><td></td><td></td><td>1</td><td>9</td><td>1</td></tr></table>",
        );
        let (_, body) = send(&root, post_req("/api/standings/view", r#"{"search": "ANN"}"#)).await;
        let response: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(response["state"]["search"], "ann");
        let tbody = response["tbody"].as_str().unwrap();
        assert!(tbody.contains("<tr data-index=\"0\">"));
        assert!(tbody.contains("<tr data-index=\"1\" style=\"display: none\">"));
    }

    #[tokio::test]
    async fn player_report_filters_on_main_name() {
        let root = prepared("api_report");
        root.write(
            "uploads/rollups/combined_rollup.html",
            "<table><tr><td>t1</td><td>-10</td><td>Main won <i>Helm</i></td></tr>\
             <tr><td>t2</td><td>-20</td><td>Other won Boots</td></tr></table>",
        );
        let (status, body) = send(&root, get_req("/api/players/Alt%20(Main)/report")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>DKP Log - Main</h1>"));
        assert!(body.contains("<td>Main won <i>Helm</i></td>"));
        assert!(!body.contains("Boots"));
    }

    #[tokio::test]
    async fn player_report_without_log_is_not_found() {
        let root = prepared("api_report_missing");
        let (status, _) = send(&root, get_req("/api/players/Solo/report")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn static_mounts_serve_uploads() {
        let root = prepared("api_static");
        root.write("uploads/QDKP.html", "<table></table>");
        let (status, body) = send(&root, get_req("/uploads/QDKP.html")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn spa_fallback_serves_index_for_routes_only() {
        let root = prepared("api_fallback");
        let (status, body) = send(&root, get_req("/")).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, INDEX));

        let (status, body) = send(&root, get_req("/players/standings")).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, INDEX));

        let (status, body) = send(&root, get_req("/missing/bundle.js")).await;
        assert_eq!((status, body.as_str()), (StatusCode::NOT_FOUND, "Not Found"));
    }
}
