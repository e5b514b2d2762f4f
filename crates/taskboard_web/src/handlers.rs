//! Route handlers: translate forms into store operations, then render or redirect.

use crate::error::WebError;
use crate::render::{list_path, render_list, ListView};
use crate::state::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::Form;
use chrono::Local;
use serde::Deserialize;
use taskboard_core::{Category, TaskId, TaskValidationError};

/// Body of `POST /check`.
#[derive(Debug, Deserialize)]
pub struct CheckForm {
    pub id: String,
    #[serde(rename = "taskType")]
    pub task_type: String,
    /// The state the page showed; anything but `"true"` means not done.
    #[serde(rename = "isDone", default)]
    pub is_done: String,
}

/// Body of `POST /submit`.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "taskType")]
    pub task_type: String,
}

/// Body of `POST /delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "taskType")]
    pub task_type: String,
}

pub async fn list_today(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    list(state, Category::Today).await
}

pub async fn list_work(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    list(state, Category::Work).await
}

pub async fn check(
    State(state): State<AppState>,
    form: Result<Form<CheckForm>, FormRejection>,
) -> Result<Redirect, WebError> {
    let form = form_body(form)?;
    let target = redirect_for(&form.task_type)?;
    let id = parse_task_id(&form.id)?;
    let hint = form.is_done == "true";

    state
        .call(move |store, ctx| store.toggle_done(ctx, id, hint))
        .await?;
    Ok(target)
}

pub async fn submit(
    State(state): State<AppState>,
    form: Result<Form<SubmitForm>, FormRejection>,
) -> Result<Redirect, WebError> {
    let form = form_body(form)?;
    let category = parse_category(&form.task_type)?;
    let name = form.name;

    state
        .call(move |store, ctx| store.create(ctx, &name, category))
        .await?;
    Ok(Redirect::to(list_path(category)))
}

pub async fn delete(
    State(state): State<AppState>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Redirect, WebError> {
    let form = form_body(form)?;
    // An unrecognised category has nothing completed to purge.
    let Ok(category) = parse_category(&form.task_type) else {
        return Ok(Redirect::to(list_path(Category::Today)));
    };

    state
        .call(move |store, ctx| store.delete_completed(ctx, category))
        .await?;
    Ok(Redirect::to(list_path(category)))
}

async fn list(state: AppState, category: Category) -> Result<Html<String>, WebError> {
    let tasks = state
        .call(move |store, ctx| store.list_by_category(ctx, category))
        .await?;
    let today = Local::now().format("%d %b %Y").to_string();
    Ok(Html(render_list(ListView::new(category, tasks, &today))))
}

/// Missing fields and undecodable bodies are plain bad requests.
fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, WebError> {
    form.map(|Form(body)| body)
        .map_err(|rejection| WebError::BadRequest(rejection.body_text()))
}

fn parse_category(task_type: &str) -> Result<Category, WebError> {
    task_type
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Category::from_code)
        .ok_or_else(|| {
            WebError::Store(TaskValidationError::UnknownCategory(task_type.to_string()).into())
        })
}

/// Malformed `taskType` on a toggle is rejected before touching the store.
fn redirect_for(task_type: &str) -> Result<Redirect, WebError> {
    match task_type.trim().parse::<i64>() {
        Ok(code) => Ok(Redirect::to(
            Category::from_code(code).map_or("/", list_path),
        )),
        Err(_) => Err(WebError::BadRequest(format!(
            "taskType must be a number, got `{task_type}`"
        ))),
    }
}

fn parse_task_id(value: &str) -> Result<TaskId, WebError> {
    TaskId::parse_str(value.trim())
        .map_err(|_| WebError::BadRequest(format!("malformed task id `{value}`")))
}
