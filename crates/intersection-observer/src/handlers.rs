//! REST API endpoint handlers for the Observer server.
//!
//! Every handler derives what it returns from the shared clock at request
//! time, so responses are as fresh as the last tick.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/intersection` | Current snapshot |
//! | `GET` | `/api/signals/{id}` | Current state of one signal |
//! | `GET` | `/api/plan` | Static timing plan |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use intersection_types::{LightState, SignalId};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the active phase and every signal.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.current();
    let phase = escape_html(&snapshot.current_phase);
    let remaining = snapshot.phase_seconds_remaining;
    let total = snapshot.total_phase_duration;
    let cycle = snapshot.cycle_position_seconds;

    let mut rows = String::new();
    for signal in &snapshot.signals {
        let class = match signal.light_state {
            LightState::Red => "red",
            LightState::Yellow => "yellow",
            LightState::Green => "green",
        };
        let detail = if signal.is_active() {
            format!("{}s left", signal.phase_seconds_remaining)
        } else {
            format!("wait {}s", signal.waiting_time_seconds)
        };
        let _ = write!(
            rows,
            r#"
        <tr>
            <td>{id}</td>
            <td>{lane}</td>
            <td>{position}</td>
            <td class="{class}">{light}{pre}</td>
            <td>{detail}</td>
        </tr>"#,
            id = escape_html(signal.id.as_str()),
            lane = escape_html(&signal.lane_name),
            position = signal.position,
            light = signal.light_state,
            pre = if signal.is_pre_green { " (pre-green)" } else { "" },
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Intersection Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        table {{ border-collapse: collapse; width: 100%; }}
        td, th {{ border-bottom: 1px solid #30363d; padding: 0.4rem; text-align: left; }}
        .red {{ color: #f85149; font-weight: bold; }}
        .yellow {{ color: #d29922; font-weight: bold; }}
        .green {{ color: #3fb950; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
    </style>
</head>
<body>
    <h1>Intersection Observer</h1>

    <div>
        <div class="metric">
            <div class="label">Phase</div>
            <div class="value">{phase}</div>
        </div>
        <div class="metric">
            <div class="label">Remaining</div>
            <div class="value">{remaining}s / {total}s</div>
        </div>
        <div class="metric">
            <div class="label">Cycle</div>
            <div class="value">{cycle}s</div>
        </div>
    </div>

    <table>
        <tr><th>Signal</th><th>Lane</th><th>Position</th><th>Light</th><th></th></tr>{rows}
    </table>

    <h2>API</h2>
    <ul>
        <li><a href="/api/intersection">/api/intersection</a></li>
        <li><a href="/api/plan">/api/plan</a></li>
        <li><code>ws://host:port/ws/intersection</code></li>
    </ul>
</body>
</html>"#
    ))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// GET /api/intersection -- current snapshot
// ---------------------------------------------------------------------------

/// Return the current snapshot of the whole intersection.
pub async fn get_intersection(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(serde_json::to_value(state.current())?))
}

// ---------------------------------------------------------------------------
// GET /api/signals/{id} -- one signal
// ---------------------------------------------------------------------------

/// Return the current state of one signal.
pub async fn get_signal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = SignalId::new(id);
    let snapshot = state.current();
    let signal = snapshot
        .signal(&id)
        .ok_or_else(|| ObserverError::NotFound(format!("signal {id}")))?;
    Ok(Json(serde_json::to_value(signal)?))
}

// ---------------------------------------------------------------------------
// GET /api/plan -- static timing plan
// ---------------------------------------------------------------------------

/// Return the timing plan: phases, signal bindings, window policy, and
/// the cycle length.
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let plan = state.clock.plan();
    Ok(Json(serde_json::json!({
        "phases": plan.phases(),
        "signals": plan.signals(),
        "policy": plan.policy(),
        "cycleDurationSeconds": plan.cycle_duration(),
    })))
}
