use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};

use crate::db::{CategoryInput, CategoryRepository, CategoryWithCount};
use crate::error::AppResult;
use crate::i18n;
use crate::routes::auth::AdminUser;
use crate::routes::page::{self, Flash};
use crate::services::catalog::CatalogService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(show).post(act))
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub action: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesPage {
    pub categories: Vec<CategoryWithCount>,
}

async fn render(
    state: &Arc<AppState>,
    status: StatusCode,
    flash: Option<Flash>,
) -> AppResult<Response> {
    let categories = CategoryRepository::list_with_counts(&state.db).await?;
    Ok(page::render(status, flash, CategoriesPage { categories }))
}

async fn show(State(state): State<Arc<AppState>>, _admin: AdminUser) -> AppResult<Response> {
    render(&state, StatusCode::OK, None).await
}

async fn act(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let result = run_action(&state, &form).await;
    let (status, flash) = page::action_flash(&form.action, result);
    render(&state, status, Some(flash)).await
}

fn input(form: &CategoryForm) -> CategoryInput {
    CategoryInput {
        name: form.name.clone().unwrap_or_default(),
        description: form.description.clone(),
    }
}

async fn run_action(state: &Arc<AppState>, form: &CategoryForm) -> AppResult<String> {
    match form.action.as_str() {
        "add_category" => {
            let category = CatalogService::add_category(state, input(form)).await?;
            Ok(i18n::t_with("category.added", &[("name", category.name.as_str())]))
        }
        "update_category" => {
            let id = page::required(&form.id, "Category")?;
            let category = CatalogService::update_category(state, id, input(form)).await?;
            Ok(i18n::t_with("category.updated", &[("name", category.name.as_str())]))
        }
        "delete_category" => {
            let id = page::required(&form.id, "Category")?;
            CatalogService::delete_category(state, id).await?;
            Ok(i18n::t("category.deleted"))
        }
        other => Err(page::unknown_action(other)),
    }
}
