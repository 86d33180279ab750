//! The lab pages, compiled into the binary.

use axum::response::Html;

pub const HOME: &str = include_str!("../static/home.html");
pub const COMPUTATIONAL_LAB: &str = include_str!("../static/computational_lab.html");
pub const TEMPERATURE_LAB: &str = include_str!("../static/temperature_lab.html");

pub async fn home() -> Html<&'static str> {
    Html(HOME)
}

pub async fn computational_lab() -> Html<&'static str> {
    Html(COMPUTATIONAL_LAB)
}

pub async fn temperature_lab() -> Html<&'static str> {
    Html(TEMPERATURE_LAB)
}
