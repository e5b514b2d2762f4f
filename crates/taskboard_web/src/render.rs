//! Server-rendered HTML for the list pages.
//!
//! Pages are leptos components rendered to strings; text and attribute
//! values are escaped by the renderer.

use axum::http::StatusCode;
use leptos::*;
use taskboard_core::{Category, Task};

/// View model for one category page.
#[derive(Debug, Clone)]
pub struct ListView {
    pub doc_title: String,
    pub list_title: String,
    pub category: Category,
    pub tasks: Vec<Task>,
}

impl ListView {
    /// Builds the page model; `today` is the already formatted date heading.
    pub fn new(category: Category, tasks: Vec<Task>, today: &str) -> Self {
        let (doc_title, list_title) = match category {
            Category::Today => ("Today Task".to_string(), today.to_string()),
            Category::Work => ("Work Task".to_string(), "Work Task".to_string()),
        };
        Self {
            doc_title,
            list_title,
            category,
            tasks,
        }
    }
}

/// Path of the list page for a category.
pub fn list_path(category: Category) -> &'static str {
    match category {
        Category::Today => "/",
        Category::Work => "/work",
    }
}

pub fn render_list(view: ListView) -> String {
    render_page(move || {
        let ListView {
            doc_title,
            list_title,
            category,
            tasks,
        } = view;
        view! {
            <Page title=doc_title>
                <ListPage list_title=list_title category=category tasks=tasks/>
            </Page>
        }
    })
}

pub fn render_error(status: StatusCode, message: &str) -> String {
    let heading = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let message = message.to_string();
    render_page(move || {
        view! {
            <Page title={"Error".to_string()}>
                <h1>{heading}</h1>
                <p>{message}</p>
                <p><a href="/">"Back to tasks"</a></p>
            </Page>
        }
    })
}

fn render_page<F, N>(page: F) -> String
where
    F: FnOnce() -> N + 'static,
    N: IntoView,
{
    format!("<!DOCTYPE html>{}", leptos::ssr::render_to_string(page))
}

#[component]
fn Page(title: String, children: Children) -> impl IntoView {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{title}</title>
                <link rel="stylesheet" href="/static/styles.css"/>
            </head>
            <body>{children()}</body>
        </html>
    }
}

#[component]
fn ListPage(list_title: String, category: Category, tasks: Vec<Task>) -> impl IntoView {
    let code = category.code().to_string();
    view! {
        <nav class="switcher">
            <SwitcherLink target=Category::Today active=category label="Today"/>
            <SwitcherLink target=Category::Work active=category label="Work"/>
        </nav>
        <h1>{list_title}</h1>
        <ul class="task-list">
            {tasks.into_iter().map(|task| view! { <TaskRow task=task/> }).collect_view()}
        </ul>
        <form action="/submit" method="post">
            <input type="hidden" name="taskType" value={code.clone()}/>
            <input type="text" name="name" placeholder="New task" autocomplete="off" required=true/>
            <button class="btn-dark" type="submit">"Add"</button>
        </form>
        <form action="/delete" method="post">
            <input type="hidden" name="taskType" value={code}/>
            <button class="btn-outline-dark" type="submit">"Delete completed"</button>
        </form>
    }
}

#[component]
fn SwitcherLink(target: Category, active: Category, label: &'static str) -> impl IntoView {
    let class = if target == active {
        "btn-dark"
    } else {
        "btn-outline-dark"
    };
    view! { <a class=class href={list_path(target)}>{label}</a> }
}

#[component]
fn TaskRow(task: Task) -> impl IntoView {
    let Task {
        id,
        name,
        category,
        done,
    } = task;
    let state = if done { "done" } else { "open" };
    view! {
        <li>
            <form action="/check" method="post">
                <input type="hidden" name="id" value={id.to_string()}/>
                <input type="hidden" name="taskType" value={category.code().to_string()}/>
                <input type="hidden" name="isDone" value={done.to_string()}/>
                <input type="checkbox" onchange="this.form.submit()" checked=done/>
            </form>
            <span class=state>{name}</span>
        </li>
    }
}
