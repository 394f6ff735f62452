//! JSON API for the monthly budget board and the annual review.
//!
//! Endpoints (all under `/api/v1`):
//! - `GET    /categories`              list categories
//! - `POST   /categories`              create a category
//! - `PUT    /categories/{id}`         update name/color
//! - `DELETE /categories/{id}`         delete an unreferenced category
//! - `GET    /budget-lines?month_id=`  one month's ledger with categories and actuals
//! - `POST   /budget-lines`            add a budget line to an open month
//! - `PUT    /budget-lines/{id}`       relabel or reprice a line
//! - `DELETE /budget-lines/{id}`       remove a line and its actual
//! - `PUT    /actual-lines/{id}`       record an actual ({id} is the budget line id)
//! - `GET    /board-data/{month_id}`   board view for one month
//! - `PUT    /months/{id}/finalize`    close the month and open its successor
//! - `GET    /dashboard?month_id=`     live expected-vs-actual rollup
//! - `GET    /reports/annual?year=`    snapshot metadata for one year
//! - `GET    /reports/snapshots/{id}`  frozen dashboard payload, verbatim

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use monthbook_core::{
    build_dashboard, ActualLine, BudgetLine, Category, DashboardPayload, LedgerRow,
};
use monthbook_db::{
    CategoryStore, DbPool, LedgerStore, MonthStore, SnapshotStore, SnapshotSummary, StoreError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiState {
    db_pool: DbPool,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBudgetLineRequest {
    pub month_id: i64,
    pub category_id: i64,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBudgetLineRequest {
    pub label: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub expected: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SetActualRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub actual: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub month_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AnnualQuery {
    pub year: i32,
}

/// One row of the board view: the ledger row flattened with its category and
/// the zero-defaulted actual.
#[derive(Debug, Serialize)]
pub struct BoardRow {
    pub id: i64,
    pub month_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_color: String,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BoardData {
    pub month_id: i64,
    pub year: i32,
    pub month_name: String,
    pub is_finalized: bool,
    pub budget_lines: Vec<BoardRow>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub message: String,
    pub new_month_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(db_pool: DbPool) -> Router {
    let api = Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .route("/budget-lines", get(list_budget_lines).post(create_budget_line))
        .route("/budget-lines/{id}", put(update_budget_line).delete(delete_budget_line))
        .route("/actual-lines/{id}", put(set_actual))
        .route("/board-data/{month_id}", get(board_data))
        .route("/months/{id}/finalize", put(finalize_month))
        .route("/dashboard", get(dashboard))
        .route("/reports/annual", get(annual_snapshots))
        .route("/reports/snapshots/{id}", get(snapshot_detail));

    Router::new().nest("/api/v1", api).with_state(ApiState { db_pool })
}

// ---------------------------------------------------------------------------
// Category handlers
// ---------------------------------------------------------------------------

async fn list_categories(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Category>>, (StatusCode, Json<ErrorBody>)> {
    let categories =
        CategoryStore::new(state.db_pool.clone()).list().await.map_err(store_error_response)?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<ApiState>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, Json<ErrorBody>)> {
    let category = CategoryStore::new(state.db_pool.clone())
        .create(&body.name, &body.color)
        .await
        .map_err(store_error_response)?;

    info!(category_id = category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    Json(body): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, (StatusCode, Json<ErrorBody>)> {
    let category = CategoryStore::new(state.db_pool.clone())
        .update(id, body.name.as_deref(), body.color.as_deref())
        .await
        .map_err(store_error_response)?;
    Ok(Json(category))
}

async fn delete_category(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    CategoryStore::new(state.db_pool.clone()).delete(id).await.map_err(store_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Ledger handlers
// ---------------------------------------------------------------------------

async fn list_budget_lines(
    Query(query): Query<LedgerQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<LedgerRow>>, (StatusCode, Json<ErrorBody>)> {
    let rows = LedgerStore::new(state.db_pool.clone())
        .list_for_month(query.month_id)
        .await
        .map_err(store_error_response)?;
    Ok(Json(rows))
}

async fn create_budget_line(
    State(state): State<ApiState>,
    Json(body): Json<CreateBudgetLineRequest>,
) -> Result<(StatusCode, Json<BudgetLine>), (StatusCode, Json<ErrorBody>)> {
    let line = LedgerStore::new(state.db_pool.clone())
        .create_line(body.month_id, body.category_id, &body.label, body.expected)
        .await
        .map_err(store_error_response)?;

    info!(budget_line_id = line.id, month_id = line.month_id, "budget line created");
    Ok((StatusCode::CREATED, Json(line)))
}

async fn update_budget_line(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
    Json(body): Json<UpdateBudgetLineRequest>,
) -> Result<Json<BudgetLine>, (StatusCode, Json<ErrorBody>)> {
    let line = LedgerStore::new(state.db_pool.clone())
        .update_line(id, body.label.as_deref(), body.expected)
        .await
        .map_err(store_error_response)?;
    Ok(Json(line))
}

async fn delete_budget_line(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    LedgerStore::new(state.db_pool.clone()).delete_line(id).await.map_err(store_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_actual(
    Path(budget_line_id): Path<i64>,
    State(state): State<ApiState>,
    Json(body): Json<SetActualRequest>,
) -> Result<Json<ActualLine>, (StatusCode, Json<ErrorBody>)> {
    let actual = LedgerStore::new(state.db_pool.clone())
        .set_actual(budget_line_id, body.actual)
        .await
        .map_err(store_error_response)?;
    Ok(Json(actual))
}

// ---------------------------------------------------------------------------
// Board, dashboard and finalize handlers
// ---------------------------------------------------------------------------

async fn board_data(
    Path(month_id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<BoardData>, (StatusCode, Json<ErrorBody>)> {
    let month =
        MonthStore::new(state.db_pool.clone()).get(month_id).await.map_err(store_error_response)?;
    let rows = LedgerStore::new(state.db_pool.clone())
        .list_for_month(month_id)
        .await
        .map_err(store_error_response)?;

    Ok(Json(BoardData {
        month_id: month.id,
        year: month.year,
        month_name: month.name().to_string(),
        is_finalized: month.is_finalized(),
        budget_lines: rows.into_iter().map(board_row).collect(),
    }))
}

async fn dashboard(
    Query(query): Query<LedgerQuery>,
    State(state): State<ApiState>,
) -> Result<Json<DashboardPayload>, (StatusCode, Json<ErrorBody>)> {
    let month = MonthStore::new(state.db_pool.clone())
        .get(query.month_id)
        .await
        .map_err(store_error_response)?;
    let rows = LedgerStore::new(state.db_pool.clone())
        .list_for_month(query.month_id)
        .await
        .map_err(store_error_response)?;

    Ok(Json(build_dashboard(&month, &rows)))
}

async fn finalize_month(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<FinalizeResponse>, (StatusCode, Json<ErrorBody>)> {
    let outcome =
        MonthStore::new(state.db_pool.clone()).finalize(id).await.map_err(store_error_response)?;

    info!(
        month_id = outcome.month_id,
        new_month_id = outcome.new_month_id,
        snapshot_id = outcome.snapshot_id,
        carried_lines = outcome.carried_lines,
        "month finalized"
    );

    Ok(Json(FinalizeResponse {
        message: "Month finalized successfully".to_string(),
        new_month_id: outcome.new_month_id,
    }))
}

// ---------------------------------------------------------------------------
// Annual report handlers
// ---------------------------------------------------------------------------

async fn annual_snapshots(
    Query(query): Query<AnnualQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<SnapshotSummary>>, (StatusCode, Json<ErrorBody>)> {
    let snapshots = SnapshotStore::new(state.db_pool.clone())
        .list_by_year(query.year)
        .await
        .map_err(store_error_response)?;
    Ok(Json(snapshots))
}

/// Returns the stored payload as raw JSON so frozen history ships byte for
/// byte, never re-serialized through live types.
async fn snapshot_detail(
    Path(id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<Box<RawValue>>, (StatusCode, Json<ErrorBody>)> {
    let detail = SnapshotStore::new(state.db_pool.clone())
        .get_detail(id)
        .await
        .map_err(store_error_response)?;

    let raw = RawValue::from_string(detail).map_err(|err| {
        error!(snapshot_id = id, error = %err, "stored snapshot payload is not valid JSON");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: "an internal error occurred".to_string() }),
        )
    })?;
    Ok(Json(raw))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn board_row(row: LedgerRow) -> BoardRow {
    BoardRow {
        id: row.id,
        month_id: row.month_id,
        category_id: row.category_id,
        category_name: row.category_name,
        category_color: row.category_color,
        label: row.label,
        expected_amount: row.expected,
        actual_amount: row.actual_amount,
    }
}

fn store_error_response(error: StoreError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        StoreError::Domain(_) | StoreError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::MonthFinalized { .. }
        | StoreError::AlreadyFinalized { .. }
        | StoreError::CategoryInUse { .. } => StatusCode::CONFLICT,
        StoreError::Database(_) | StoreError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %error, "api storage failure");
        return (status, Json(ErrorBody { error: "an internal error occurred".to_string() }));
    }

    (status, Json(ErrorBody { error: error.to_string() }))
}
