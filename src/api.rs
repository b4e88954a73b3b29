//! REST API for the packing service.
//!
//! Exposes the packing engine over HTTP and derives the per-request summary
//! (globally unpacked items) from the per-bin results.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PackerConfig};
use crate::model::{Bin, Item, ValidationError};
use crate::packer::{PackOptions, Packer};
use crate::types::RotationType;

#[derive(Clone)]
struct ApiState {
    packer_config: PackerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>binpack3d API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis],
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// A bin as submitted by the client.
#[derive(Deserialize, Clone, ToSchema)]
pub struct BinRequest {
    pub name: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([10.0, 10.0, 10.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl BinRequest {
    fn into_bin(self, index: usize) -> Result<Bin, ValidationError> {
        let name = self.name.unwrap_or_else(|| format!("Bin {}", index + 1));
        Bin::new(name, self.dims.0, self.dims.1, self.dims.2, self.max_weight)
    }
}

/// An item as submitted by the client.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ItemRequest {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([5.0, 5.0, 5.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
}

impl ItemRequest {
    fn into_item(self) -> Result<Item, ValidationError> {
        Item::new(self.name, self.dims.0, self.dims.1, self.dims.2, self.weight)
    }
}

/// Request structure for the packing endpoints.
///
/// Omitted options fall back to the server's configured defaults.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "bins": [
            { "name": "Crate", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0 }
        ],
        "items": [
            { "name": "Cube", "dims": [5.0, 5.0, 5.0], "weight": 10.0 }
        ],
        "bigger_first": false,
        "distribute_items": false,
        "precision": 3
    })
)]
pub struct PackRequest {
    pub bins: Vec<BinRequest>,
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub bigger_first: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub distribute_items: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub precision: Option<u32>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    bins: Vec<Bin>,
    items: Vec<Item>,
    options: PackOptions,
}

impl ValidatedPackRequest {
    fn into_packer(self) -> (Packer, PackOptions) {
        let mut packer = Packer::new();
        for bin in self.bins {
            packer.add_bin(bin);
        }
        for item in self.items {
            packer.add_item(item);
        }
        (packer, self.options)
    }
}

#[derive(Debug)]
enum PackRequestValidationError {
    MissingBins,
    InvalidBin(ValidationError),
    InvalidItem(ValidationError),
    InvalidOptions(ValidationError),
}

impl PackRequest {
    fn into_validated(
        self,
        defaults: PackOptions,
    ) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        if self.bins.is_empty() {
            return Err(PackRequestValidationError::MissingBins);
        }

        let bins = self
            .bins
            .into_iter()
            .enumerate()
            .map(|(idx, request)| request.into_bin(idx))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidBin)?;

        let items = self
            .items
            .into_iter()
            .map(ItemRequest::into_item)
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidItem)?;

        let options = PackOptions::builder()
            .bigger_first(self.bigger_first.unwrap_or(defaults.bigger_first))
            .distribute_items(self.distribute_items.unwrap_or(defaults.distribute_items))
            .precision(self.precision.unwrap_or(defaults.precision))
            .build();
        options
            .validate()
            .map_err(PackRequestValidationError::InvalidOptions)?;

        Ok(ValidatedPackRequest {
            bins,
            items,
            options,
        })
    }
}

/// Response structure with every bin and the items no bin could take.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub bins: Vec<PackedBin>,
    pub unpacked: Vec<UnpackedItem>,
    pub is_complete: bool,
}

/// One bin with its placed and unfitted items.
#[derive(Serialize, ToSchema)]
pub struct PackedBin {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([10.0, 10.0, 10.0]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
    pub volume: f64,
    pub total_weight: f64,
    pub items: Vec<PackedItem>,
    pub unfitted_items: Vec<UnpackedItem>,
}

/// A placed item in the response.
///
/// # Fields
/// * `dims` - Dimensions as laid out in the bin (after rotation)
/// * `position` - Minimum corner inside the bin
/// * `corners` - The eight corners of the item's box, for rendering
#[derive(Serialize, ToSchema)]
pub struct PackedItem {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([5.0, 5.0, 5.0]))]
    pub dims: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([2.5, 2.5, 2.5]))]
    pub center: (f64, f64, f64),
    #[schema(value_type = Vec<[f64; 3]>)]
    pub corners: Vec<(f64, f64, f64)>,
    pub rotation: RotationType,
    pub rotation_code: u8,
    pub weight: f64,
}

impl From<&Item> for PackedItem {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            dims: item.effective_dimensions().as_tuple(),
            position: item.position.as_tuple(),
            center: item.center().as_tuple(),
            corners: item
                .bounding_box_corners()
                .iter()
                .map(|c| c.as_tuple())
                .collect(),
            rotation: item.rotation,
            rotation_code: item.rotation.code(),
            weight: item.weight,
        }
    }
}

/// An item that was not placed (in one bin, or in any bin).
#[derive(Serialize, ToSchema)]
pub struct UnpackedItem {
    pub name: String,
    #[schema(value_type = [f64; 3], example = json!([20.0, 5.0, 5.0]))]
    pub dims: (f64, f64, f64),
    pub weight: f64,
    pub volume: f64,
}

impl From<&Item> for UnpackedItem {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            dims: (item.width, item.height, item.depth),
            weight: item.weight,
            volume: item.volume(),
        }
    }
}

fn same_item(a: &Item, b: &Item) -> bool {
    a.name == b.name
        && a.width == b.width
        && a.height == b.height
        && a.depth == b.depth
        && a.weight == b.weight
}

/// Items that ended up in no bin at all.
///
/// In distribute mode this is exactly the packer's remaining pool. Otherwise
/// every bin saw every item, so an item is unpacked when every bin lists it as
/// unfitted; identical items are counted, not merged.
pub fn unpacked_items(bins: &[Bin], pending: &[Item], distributed: bool) -> Vec<Item> {
    if distributed {
        return pending.to_vec();
    }

    pending
        .iter()
        .enumerate()
        .filter(|(idx, item)| {
            let earlier_twins = pending[..*idx].iter().filter(|o| same_item(o, item)).count();
            let unfitted_everywhere = bins
                .iter()
                .map(|b| {
                    b.unfitted_items
                        .iter()
                        .filter(|u| same_item(u, item))
                        .count()
                })
                .min()
                .unwrap_or(usize::MAX);
            earlier_twins < unfitted_everywhere
        })
        .map(|(_, item)| item.clone())
        .collect()
}

impl PackResponse {
    /// Creates a PackResponse from a packer that has completed its run.
    pub fn from_packer(packer: &Packer, distributed: bool) -> Self {
        let unpacked: Vec<UnpackedItem> =
            unpacked_items(packer.bins(), packer.items(), distributed)
                .iter()
                .map(UnpackedItem::from)
                .collect();

        Self {
            bins: packer
                .bins()
                .iter()
                .map(|bin| PackedBin {
                    name: bin.name.clone(),
                    dims: (bin.width, bin.height, bin.depth),
                    max_weight: bin.max_weight,
                    volume: bin.volume(),
                    total_weight: bin.total_weight(),
                    items: bin.items.iter().map(PackedItem::from).collect(),
                    unfitted_items: bin.unfitted_items.iter().map(UnpackedItem::from).collect(),
                })
                .collect(),
            is_complete: unpacked.is_empty(),
            unpacked,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        details: details.into(),
    };
    (status, Json(body)).into_response()
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    defaults: PackOptions,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => {
            return Err(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid JSON data",
                err.to_string(),
            ));
        }
    };

    match payload.into_validated(defaults) {
        Ok(validated) => Ok(validated),
        Err(PackRequestValidationError::MissingBins) => {
            Err(validation_error("At least one bin must be specified"))
        }
        Err(PackRequestValidationError::InvalidBin(err)) => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid bin configuration",
            err.to_string(),
        )),
        Err(PackRequestValidationError::InvalidItem(err))
        | Err(PackRequestValidationError::InvalidOptions(err)) => {
            Err(validation_error(err.to_string()))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            BinRequest,
            ItemRequest,
            PackResponse,
            PackedBin,
            PackedItem,
            UnpackedItem,
            RotationType,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for 3D bin packing"))
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(
    config: ApiConfig,
    packer_config: PackerConfig,
) -> std::io::Result<()> {
    let app = router(ApiState { packer_config });

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /pack, POST /pack_stream");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /pack endpoint.
///
/// Packs the submitted items into the submitted bins and returns every bin's
/// contents plus the items no bin could take.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Packing finished", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, bin or item",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, state.packer_config.pack_options()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (mut packer, options) = request.into_packer();
    info!(
        "📥 New pack request: {} items, {} bins",
        packer.total_items(),
        packer.bins().len()
    );

    if let Err(err) = packer.pack(options) {
        return validation_error(err.to_string());
    }

    let response = PackResponse::from_packer(&packer, options.distribute_items);
    info!(
        "📦 Result: {} bins, {} items unpacked",
        response.bins.len(),
        response.unpacked.len()
    );
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, bin or item",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, state.packer_config.pack_options()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (mut packer, options) = request.into_packer();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let outcome = packer.pack_with_progress(options, |evt| match serde_json::to_string(evt) {
            // A closed receiver means the client left; remaining events are dropped.
            Ok(json) => {
                let _ = tx.blocking_send(json);
            }
            Err(err) => error!("❌ Could not serialize pack event: {err}"),
        });
        if let Err(err) = outcome {
            warn!("⚠️ Streamed pack run rejected: {err}");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PackRequest {
        serde_json::from_str(json).expect("Should parse valid JSON")
    }

    fn run(json: &str) -> PackResponse {
        let validated = parse(json)
            .into_validated(PackOptions::default())
            .expect("Should validate successfully");
        let (mut packer, options) = validated.into_packer();
        packer.pack(options).expect("Options were validated");
        PackResponse::from_packer(&packer, options.distribute_items)
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/pack"));
        assert!(paths.contains_key("/pack_stream"));
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["PackRequest", "PackResponse", "PackedItem", "ErrorResponse"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn request_options_default_to_config_when_absent() {
        let request = parse(
            r#"{
                "bins": [{"dims": [10.0, 10.0, 10.0], "max_weight": 100.0}],
                "items": [{"name": "a", "dims": [5.0, 5.0, 5.0], "weight": 10.0}]
            }"#,
        );
        assert_eq!(request.bigger_first, None);
        assert_eq!(request.precision, None);

        let defaults = PackOptions::builder()
            .bigger_first(true)
            .precision(2)
            .build();
        let validated = request.into_validated(defaults).unwrap();
        assert_eq!(validated.options, defaults);
        assert_eq!(validated.bins[0].name, "Bin 1");
    }

    #[test]
    fn request_options_override_config() {
        let request = parse(
            r#"{
                "bins": [{"name": "crate", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0}],
                "items": [],
                "bigger_first": true,
                "distribute_items": true,
                "precision": 1
            }"#,
        );
        let validated = request.into_validated(PackOptions::default()).unwrap();
        assert!(validated.options.bigger_first);
        assert!(validated.options.distribute_items);
        assert_eq!(validated.options.precision, 1);
        assert_eq!(validated.bins[0].name, "crate");
    }

    #[test]
    fn request_validation_failures() {
        let missing = parse(r#"{"bins": [], "items": []}"#);
        assert!(matches!(
            missing.into_validated(PackOptions::default()),
            Err(PackRequestValidationError::MissingBins)
        ));

        let bad_bin = parse(r#"{"bins": [{"dims": [0.0, 1.0, 1.0], "max_weight": 1.0}], "items": []}"#);
        assert!(matches!(
            bad_bin.into_validated(PackOptions::default()),
            Err(PackRequestValidationError::InvalidBin(_))
        ));

        let bad_item = parse(
            r#"{
                "bins": [{"dims": [1.0, 1.0, 1.0], "max_weight": 1.0}],
                "items": [{"name": "a", "dims": [1.0, 1.0, 1.0], "weight": -1.0}]
            }"#,
        );
        assert!(matches!(
            bad_item.into_validated(PackOptions::default()),
            Err(PackRequestValidationError::InvalidItem(_))
        ));

        let bad_precision = parse(
            r#"{"bins": [{"dims": [1.0, 1.0, 1.0], "max_weight": 1.0}], "items": [], "precision": 99}"#,
        );
        assert!(matches!(
            bad_precision.into_validated(PackOptions::default()),
            Err(PackRequestValidationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn negative_precision_is_rejected_by_deserialization() {
        let result = serde_json::from_str::<PackRequest>(
            r#"{"bins": [], "items": [], "precision": -1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn response_reports_placements_and_unpacked_items() {
        let response = run(
            r#"{
                "bins": [{"name": "crate", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0}],
                "items": [
                    {"name": "cube", "dims": [5.0, 5.0, 5.0], "weight": 10.0},
                    {"name": "beam", "dims": [20.0, 5.0, 5.0], "weight": 1.0}
                ]
            }"#,
        );
        assert!(!response.is_complete);
        assert_eq!(response.unpacked.len(), 1);
        assert_eq!(response.unpacked[0].name, "beam");

        let bin = &response.bins[0];
        assert_eq!(bin.total_weight, 10.0);
        assert_eq!(bin.volume, 1000.0);
        assert_eq!(bin.items[0].name, "cube");
        assert_eq!(bin.items[0].rotation_code, 0);
        assert_eq!(bin.items[0].center, (2.5, 2.5, 2.5));
        assert_eq!(bin.items[0].corners.len(), 8);
        assert_eq!(bin.unfitted_items[0].name, "beam");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["bins"][0]["items"][0]["rotation"], "WHD");
    }

    #[test]
    fn item_placed_in_any_bin_is_not_unpacked() {
        let response = run(
            r#"{
                "bins": [
                    {"name": "small", "dims": [2.0, 2.0, 2.0], "max_weight": 100.0},
                    {"name": "large", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0}
                ],
                "items": [
                    {"name": "big", "dims": [6.0, 6.0, 6.0], "weight": 1.0},
                    {"name": "huge", "dims": [11.0, 1.0, 1.0], "weight": 1.0}
                ]
            }"#,
        );
        let unpacked: Vec<_> = response.unpacked.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(unpacked, ["huge"]);
    }

    #[test]
    fn identical_items_are_counted_separately() {
        let mut small = Bin::new("small", 5.0, 5.0, 5.0, 100.0).unwrap();
        let twin = Item::new("twin", 5.0, 5.0, 5.0, 1.0).unwrap();
        assert!(small.put(&twin, crate::types::Vec3::zero()));
        small.unfitted_items.push(twin.clone());

        let pending = vec![twin.clone(), twin];
        let unpacked = unpacked_items(std::slice::from_ref(&small), &pending, false);
        assert_eq!(unpacked.len(), 1);
    }

    #[test]
    fn distributed_runs_report_the_remaining_pool() {
        let response = run(
            r#"{
                "bins": [
                    {"name": "a", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0},
                    {"name": "b", "dims": [10.0, 10.0, 10.0], "max_weight": 100.0}
                ],
                "items": [
                    {"name": "one", "dims": [10.0, 10.0, 10.0], "weight": 1.0},
                    {"name": "two", "dims": [10.0, 10.0, 10.0], "weight": 1.0},
                    {"name": "three", "dims": [10.0, 10.0, 10.0], "weight": 1.0}
                ],
                "distribute_items": true
            }"#,
        );
        assert_eq!(response.bins[0].items[0].name, "one");
        assert_eq!(response.bins[1].items[0].name, "two");
        let unpacked: Vec<_> = response.unpacked.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(unpacked, ["three"]);
    }
}
