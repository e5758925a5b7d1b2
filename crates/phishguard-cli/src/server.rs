//! HTTP front end: the single-page detection form plus a JSON API.
//!
//! Both routes read the raw body so that bytes which are not UTF-8 reach
//! [`EmailText::from_bytes`] instead of being replaced or rejected by an
//! extractor.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use percent_encoding::percent_decode;
use phishguard_ai::Pipeline;
use phishguard_core::{ClassProbability, EmailText, PipelineError, Prediction, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::display::{REVIEW_NOTE, format_percent};

/// Shared, read-only state behind every handler.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub phishing_label: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/api/v1/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, classes = ?state.pipeline.classes(), "phishguard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ── Form page ──

async fn index() -> Html<String> {
    Html(
        Page {
            email: "",
            section: None,
        }
        .to_string(),
    )
}

async fn submit(State(state): State<Arc<AppState>>, body: Bytes) -> Html<String> {
    let raw = form_field(&body, "email").unwrap_or_default();
    let echo = String::from_utf8_lossy(&raw).into_owned();

    let outcome = EmailText::from_bytes(raw).and_then(|email| state.pipeline.predict(&email));
    let section = match &outcome {
        Ok(prediction) => Section::Result {
            prediction,
            phishing_label: &state.phishing_label,
        },
        Err(e) => {
            log_failure(e);
            Section::Notice {
                level: if *e == PipelineError::EmptyInput {
                    "warning"
                } else {
                    "error"
                },
                message: e.user_message(),
            }
        }
    };

    Html(
        Page {
            email: &echo,
            section: Some(section),
        }
        .to_string(),
    )
}

/// First value of `name` in an `application/x-www-form-urlencoded` body,
/// percent-decoded to raw bytes.
fn form_field(body: &[u8], name: &str) -> Option<Vec<u8>> {
    body.split(|&b| b == b'&').find_map(|pair| {
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &pair[pair.len()..]),
        };
        (form_decode(key) == name.as_bytes()).then(|| form_decode(value))
    })
}

fn form_decode(component: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = component
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

// ── JSON API ──

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: String,
    pub verdict: Verdict,
    pub distribution: Vec<ClassProbability>,
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let request: PredictRequest = serde_json::from_slice(&body)
        .map_err(|e| PipelineError::InvalidInput(format!("request body: {e}")))?;
    let email = EmailText::parse(request.text)?;
    let prediction = state.pipeline.predict(&email)?;
    Ok(Json(PredictResponse {
        verdict: prediction.verdict(&state.phishing_label),
        label: prediction.label,
        distribution: prediction.distribution,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "classes": state.pipeline.classes(),
    }))
}

/// A pipeline failure rendered as a JSON error body.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        log_failure(&err);
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PipelineError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::FeatureMismatch { .. } | PipelineError::Model(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "error": {
                "message": self.0.user_message(),
                "type": self.0.kind(),
            }
        });
        (status, Json(body)).into_response()
    }
}

fn log_failure(err: &PipelineError) {
    if err.is_operator_fault() {
        error!(kind = err.kind(), error = %err, "prediction failed");
    } else {
        warn!(kind = err.kind(), error = %err, "rejected submission");
    }
}

// ── HTML ──

const TITLE: &str = "Phishing Email Detection System";
const SUBTITLE: &str = "An Intelligent, Ensemble-Based Email Classifier";
const ABOUT: &str = "Paste any email content and click \"Detect\" to see a detailed result, \
including confidence scores. The system combines Random Forest, XGBoost, and Logistic \
Regression stacked on word and character TF-IDF features.";

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:48em}\
textarea{width:100%}\
.result.phishing .headline,.class.phishing span{color:#e74c3c}\
.result.safe .headline,.class.safe span{color:#27ae60}\
.notice.warning{color:#b7791f}.notice.error{color:#e74c3c}\
progress{display:block;width:100%}";

struct Page<'a> {
    email: &'a str,
    section: Option<Section<'a>>,
}

enum Section<'a> {
    Result {
        prediction: &'a Prediction,
        phishing_label: &'a str,
    },
    Notice {
        level: &'static str,
        message: &'a str,
    },
}

impl fmt::Display for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<!doctype html>")?;
        writeln!(f, "<html lang=\"en\">")?;
        writeln!(f, "<head>")?;
        writeln!(f, "<meta charset=\"utf-8\">")?;
        writeln!(f, "<title>{TITLE}</title>")?;
        writeln!(f, "<style>{STYLE}</style>")?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, "<main>")?;
        writeln!(
            f,
            "<header><h1>{TITLE}</h1><p class=\"subtitle\">{SUBTITLE}</p></header>"
        )?;
        writeln!(f, "<aside><h2>About This App</h2><p>{}</p></aside>", Escaped(ABOUT))?;
        writeln!(f, "<form method=\"post\" action=\"/\">")?;
        writeln!(f, "<h3>Paste Email Content</h3>")?;
        writeln!(
            f,
            "<textarea name=\"email\" rows=\"10\" \
             placeholder=\"Paste the body of the email you want to check here...\">{}</textarea>",
            Escaped(self.email)
        )?;
        writeln!(f, "<button type=\"submit\">Detect</button>")?;
        writeln!(f, "</form>")?;
        if let Some(section) = &self.section {
            write!(f, "{section}")?;
        }
        writeln!(f, "</main>")?;
        writeln!(f, "</body>")?;
        writeln!(f, "</html>")
    }
}

impl fmt::Display for Section<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Notice { level, message } => {
                writeln!(f, "<p class=\"notice {level}\">{}</p>", Escaped(message))
            }
            Section::Result {
                prediction,
                phishing_label,
            } => {
                let verdict = prediction.verdict(phishing_label);
                writeln!(f, "<section class=\"result {}\">", verdict.as_str())?;
                writeln!(f, "<h4>Detection Result</h4>")?;
                writeln!(
                    f,
                    "<p class=\"headline\"><strong>{}</strong></p>",
                    verdict.headline()
                )?;
                writeln!(f, "<p class=\"advice\">{}</p>", Escaped(verdict.advice()))?;
                writeln!(f, "<h5>Confidence</h5>")?;
                for class in &prediction.distribution {
                    let colour = if class.class == *phishing_label {
                        "phishing"
                    } else {
                        "safe"
                    };
                    let percent = format_percent(class.probability);
                    writeln!(
                        f,
                        "<div class=\"class {colour}\"><strong>{}:</strong> <span>{percent}</span>\
                         <progress max=\"1\" value=\"{}\">{percent}</progress></div>",
                        Escaped(&class.class),
                        class.probability,
                    )?;
                }
                writeln!(f, "<p class=\"note\">{}</p>", Escaped(REVIEW_NOTE))?;
                writeln!(f, "</section>")
            }
        }
    }
}

/// Text with HTML markup characters escaped.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                _ => fmt::Write::write_char(f, c)?,
            }
        }
        Ok(())
    }
}
