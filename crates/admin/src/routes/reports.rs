//! Sales reports and dashboard figures.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::SalesRepository;
use quillhouse_commerce::db::sales::DashboardStats;
use quillhouse_core::sales::SalesReport;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
}

impl ReportQuery {
    fn year(&self) -> Result<Option<i32>> {
        match self.year {
            Some(year) if !(2000..=9999).contains(&year) => {
                Err(AppError::BadRequest(format!("Invalid year: {year}")))
            }
            year => Ok(year),
        }
    }
}

/// Store-wide sales, optionally for one calendar year.
#[instrument(skip(_admin, state))]
pub async fn sales(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<SalesReport>> {
    let year = query.year()?;
    let lines = SalesRepository::new(state.pool()).all_lines().await?;
    Ok(Json(SalesReport::build(&lines, year)))
}

#[instrument(skip(_admin, state))]
pub async fn dashboard(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    Ok(Json(SalesRepository::new(state.pool()).dashboard().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        assert_eq!(ReportQuery { year: None }.year().unwrap(), None);
        assert_eq!(ReportQuery { year: Some(2025) }.year().unwrap(), Some(2025));
        assert!(ReportQuery { year: Some(25) }.year().is_err());
    }
}
