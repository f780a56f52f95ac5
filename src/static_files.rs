use tide::http::mime;
use tide::{Request, Response, StatusCode};

// This will bundle the necessary files in the final binary so we don't have to worry about
// portability.
const STYLE_CSS: &str = include_str!("../static/style.css");
const APP_JS: &str = include_str!("../static/app.js");

/// The stylesheet shared by every page.
pub async fn style<State>(_req: Request<State>) -> tide::Result {
    Ok(Response::builder(StatusCode::Ok)
        .body(STYLE_CSS)
        .content_type(mime::CSS)
        .build())
}

/// The browser side of the converter form and the admin copy buttons.
pub async fn script<State>(_req: Request<State>) -> tide::Result {
    Ok(Response::builder(StatusCode::Ok)
        .body(APP_JS)
        .content_type(mime::JAVASCRIPT)
        .build())
}
