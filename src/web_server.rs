use std::sync::Arc;

use log::{error, warn};
use serde_json::json;
use tide::http::mime;
use tide::{Body, Request, Response, Server, StatusCode};

use crate::auth::{is_authorized, Authenticator};
use crate::conversion::{run_conversion, ConvertError, ConvertRequest};
use crate::pages::{admin_html, base_html, index_html};
use crate::record::TimestampSource;
use crate::static_files;
use crate::store::{Listing, RecordStore};

const INVALID_BODY: &str = "Invalid request body";
const SERVER_ERROR: &str = "Error processing request";
const REALM: &str = "Basic realm=\"md2txt admin\"";

/// The state necessary to process requests.
///
/// It needs somewhere to keep the history of conversions, something to check
/// operator credentials against and a source of unique timestamps for the
/// records.
pub struct State<S, A> {
    store: Arc<S>,
    auth: Arc<A>,
    clock: Arc<TimestampSource>,
}

impl<S, A> State<S, A>
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, auth: A) -> State<S, A> {
        State::with_clock(store, auth, TimestampSource::new())
    }

    /// Like [`State::new`], with the timestamps coming from `clock`.
    pub fn with_clock(store: Arc<S>, auth: A, clock: TimestampSource) -> State<S, A> {
        State {
            store,
            auth: Arc::new(auth),
            clock: Arc::new(clock),
        }
    }
}

impl<S, A> Clone for State<S, A> {
    fn clone(&self) -> Self {
        State {
            store: self.store.clone(),
            auth: self.auth.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// A JSON response with the given status.
fn json_response(status: StatusCode, payload: &serde_json::Value) -> tide::Result {
    Ok(Response::builder(status)
        .body(Body::from_json(payload)?)
        .build())
}

fn error_json(status: StatusCode, message: &str) -> tide::Result {
    json_response(status, &json!({ "error": message }))
}

fn plain_response(status: StatusCode, body: &str) -> Response {
    Response::builder(status)
        .body(body)
        .content_type(mime::PLAIN)
        .build()
}

fn html_response(title: &str, content: &str) -> Response {
    Response::builder(StatusCode::Ok)
        .body(base_html(title, content))
        .content_type(mime::HTML)
        .build()
}

/// The answer to any admin request without valid credentials. Says nothing about the records.
fn unauthorized() -> Response {
    Response::builder(StatusCode::Unauthorized)
        .body("Unauthorized")
        .content_type(mime::PLAIN)
        .header("WWW-Authenticate", REALM)
        .build()
}

/// Renders the converter form.
async fn render_index<S, A>(_req: Request<State<S, A>>) -> tide::Result {
    Ok(html_response("Markdown to plain text", &index_html()))
}

/// Converts the posted markdown, records the conversion and returns the text.
///
/// Every failure is answered here: a missing or unreadable body is the client's
/// fault, anything else is logged and reported without details.
async fn convert_markdown<S, A>(mut req: Request<State<S, A>>) -> tide::Result
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    let request: ConvertRequest = match req.body_json().await {
        Ok(request) => request,
        Err(err) => {
            warn!("Unreadable conversion request: {}", err);
            return error_json(StatusCode::BadRequest, INVALID_BODY);
        }
    };

    let state = req.state();
    match run_conversion(state.store.as_ref(), &state.clock, &request).await {
        Ok(text) => json_response(StatusCode::Ok, &json!({ "text": text })),
        Err(err @ ConvertError::MissingMarkdown) => {
            error_json(StatusCode::BadRequest, &err.to_string())
        }
        Err(err) => {
            error!("Conversion failed:\n{}", err);
            error_json(StatusCode::InternalServerError, SERVER_ERROR)
        }
    }
}

/// Loads the sorted history, or the response to send instead.
async fn load_listing<S, A>(state: &State<S, A>, authorized: bool) -> Result<Listing, Response>
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    if !authorized {
        return Err(unauthorized());
    }

    Listing::load(state.store.as_ref()).await.map_err(|err| {
        error!("Could not list conversions:\n{}", err);
        plain_response(StatusCode::InternalServerError, SERVER_ERROR)
    })
}

/// Renders every recorded conversion, most recent first.
async fn render_admin<S, A>(req: Request<State<S, A>>) -> tide::Result
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    let authorized = is_authorized(req.state().auth.as_ref(), &req);
    match load_listing(req.state(), authorized).await {
        Ok(listing) => Ok(html_response("Conversion history", &admin_html(&listing))),
        Err(resp) => Ok(resp),
    }
}

/// The same listing as [`render_admin`], as `{records, total}` JSON.
async fn list_records<S, A>(req: Request<State<S, A>>) -> tide::Result
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    let authorized = is_authorized(req.state().auth.as_ref(), &req);
    match load_listing(req.state(), authorized).await {
        Ok(listing) => Ok(Response::builder(StatusCode::Ok)
            .body(Body::from_json(&listing)?)
            .build()),
        Err(resp) => Ok(resp),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "lowercase")]
enum DownloadContent {
    Converted,
    Original,
}

#[derive(Deserialize, Debug)]
struct DownloadQuery {
    timestamp: String,
    content: DownloadContent,
}

/// Only keeps characters that are safe inside a quoted header parameter.
fn attachment_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sends back the converted or original text of one record as a file.
async fn download_record<S, A>(req: Request<State<S, A>>) -> tide::Result
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    let state = req.state();
    if !is_authorized(state.auth.as_ref(), &req) {
        return Ok(unauthorized());
    }

    let query: DownloadQuery = match req.query() {
        Ok(query) => query,
        Err(err) => {
            warn!("Bad download request: {}", err);
            return Ok(plain_response(
                StatusCode::BadRequest,
                "Invalid download request",
            ));
        }
    };

    let record = match state.store.find(&query.timestamp).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Ok(plain_response(
                StatusCode::NotFound,
                &format!("Could not find a conversion at {}", query.timestamp),
            ))
        }
        Err(err) => {
            error!("Could not load conversion {}:\n{}", query.timestamp, err);
            return Ok(plain_response(StatusCode::InternalServerError, SERVER_ERROR));
        }
    };

    let (name, text) = match query.content {
        DownloadContent::Converted => (record.converted_download_name(), record.full_text),
        DownloadContent::Original => (record.original_download_name(), record.original_markdown),
    };

    Ok(Response::builder(StatusCode::Ok)
        .body(text)
        .content_type(mime::PLAIN)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", attachment_name(&name)),
        )
        .build())
}

/// Builds a `tide::Server` with the appropriate endpoint mappings.
pub fn build_app<S, A>(state: State<S, A>) -> Server<State<S, A>>
where
    S: RecordStore + Send + Sync + 'static,
    A: Authenticator + Send + Sync + 'static,
{
    let mut app = Server::with_state(state);
    app.with(tide::log::LogMiddleware::new());
    app.at("/").get(render_index::<S, A>);
    app.at("/api/convert").post(convert_markdown::<S, A>);
    app.at("/admin").get(render_admin::<S, A>);
    app.at("/admin/records").get(list_records::<S, A>);
    app.at("/admin/download").get(download_record::<S, A>);
    app.at("/static/style.css").get(static_files::style::<State<S, A>>);
    app.at("/static/app.js").get(static_files::script::<State<S, A>>);

    app
}
