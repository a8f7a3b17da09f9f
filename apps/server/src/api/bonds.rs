use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use bondboard_core::bonds::{Bond, BondStore, Transaction, TransactionStore};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_bonds(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Bond>>> {
    let bonds = state.bonds.list()?;
    Ok(Json(bonds))
}

pub async fn get_bond(
    State(state): State<Arc<AppState>>,
    Path(isin): Path<String>,
) -> ApiResult<Json<Bond>> {
    let bond = state
        .bonds
        .find_by_isin(&isin)?
        .ok_or_else(|| ApiError::not_found("Bond not found"))?;
    Ok(Json(bond))
}

pub async fn bond_transactions(
    State(state): State<Arc<AppState>>,
    Path(isin): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let bond = state
        .bonds
        .find_by_isin(&isin)?
        .ok_or_else(|| ApiError::not_found("Bond not found"))?;
    let transactions = state.bonds.transactions_for_bond(&bond.id)?;
    Ok(Json(transactions))
}
