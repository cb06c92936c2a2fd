//! Results explorer - score-range filtering, summary, histogram and export
//! for every result variant of an experiment.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use minijinja::HtmlEscape;
use serde::{Deserialize, Serialize};

use agandock_common::{AgandockError, ApiError};
use agandock_pipeline::PlipTable;
use agandock_results::export::{export_csv, export_file_name};
use agandock_results::{ResultVariant, ScoreRange, SortKey, SortOrder, VariantView, ViewSnapshot};

use crate::handlers::dashboard::NAV_HTML;
use crate::handlers::optional_number;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    #[serde(default, deserialize_with = "optional_number")]
    pub lower: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub upper: Option<f64>,
    /// PLIP table name, for the `interactions` variant
    pub table: Option<String>,
    /// Column to order rows by; the docking score when absent
    pub sort: Option<String>,
    /// `asc` (default) or `desc`
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewResponse {
    Ready(ViewSnapshot),
    NotAvailable { variant: ResultVariant, label: String },
}

/// The variant's table as a fresh unfiltered view; `None` until the stage
/// producing it has run.
async fn load_view(
    state: &SharedState,
    experiment: &str,
    variant: &ResultVariant,
) -> Result<Option<VariantView>, ApiError> {
    let table = state.cache.load(&state.source, experiment, variant).await?;
    Ok(table.map(|table| VariantView::new(variant.clone(), table, &state.aggregator)))
}

/// Commit `lower`/`upper` if either was given; a missing side falls back to
/// the variant's bounds.
fn apply_range(view: &mut VariantView, params: &ViewParams) -> Result<(), ApiError> {
    if params.lower.is_none() && params.upper.is_none() {
        return Ok(());
    }
    let bounds = view.bounds();
    let range = ScoreRange::new(
        params.lower.unwrap_or(bounds.lower()),
        params.upper.unwrap_or(bounds.upper()),
    )?;
    view.commit(range);
    Ok(())
}

/// Order rows by `sort`/`order`; either one alone applies to the score column
/// or ascending order respectively.
fn apply_sort(view: &mut VariantView, params: &ViewParams, state: &SharedState) -> Result<(), ApiError> {
    let column = params.sort.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let order = params.order.as_deref().map(str::trim).filter(|o| !o.is_empty());
    if column.is_none() && order.is_none() {
        return Ok(());
    }
    let order: SortOrder = order.map(str::parse::<SortOrder>).transpose()?.unwrap_or_default();
    let column = column.unwrap_or(state.aggregator.score_column());
    view.sort_by(SortKey::new(column, order), &state.aggregator)?;
    Ok(())
}

/// Range and sort from the query, in that order.
fn apply_params(view: &mut VariantView, params: &ViewParams, state: &SharedState) -> Result<(), ApiError> {
    apply_range(view, params)?;
    apply_sort(view, params, state)
}

fn not_available(variant: ResultVariant) -> ViewResponse {
    ViewResponse::NotAvailable {
        label: variant.label(),
        variant,
    }
}

/// GET /api/results/{name}/{variant}?lower&upper[&table][&sort&order]
pub async fn api_results(
    State(state): State<SharedState>,
    Path((name, kind)): Path<(String, String)>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, ApiError> {
    let variant = ResultVariant::from_selector(&kind, params.table.as_deref())?;
    let Some(mut view) = load_view(&state, &name, &variant).await? else {
        return Ok(Json(not_available(variant)));
    };
    apply_params(&mut view, &params, &state)?;
    Ok(Json(ViewResponse::Ready(view.snapshot(&state.aggregator))))
}

/// POST /api/results/{name}/{variant}/reset - unfiltered view with bounds
/// recomputed from this variant's table.
pub async fn api_reset(
    State(state): State<SharedState>,
    Path((name, kind)): Path<(String, String)>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, ApiError> {
    let variant = ResultVariant::from_selector(&kind, params.table.as_deref())?;
    let Some(mut view) = load_view(&state, &name, &variant).await? else {
        return Ok(Json(not_available(variant)));
    };
    view.reset(&state.aggregator);
    apply_sort(&mut view, &params, &state)?;
    Ok(Json(ViewResponse::Ready(view.snapshot(&state.aggregator))))
}

/// GET /api/results/{name}/{variant}/export?lower&upper[&sort&order] - the
/// displayed rows as CSV, in display order.
pub async fn api_export(
    State(state): State<SharedState>,
    Path((name, kind)): Path<(String, String)>,
    Query(params): Query<ViewParams>,
) -> Result<impl IntoResponse, ApiError> {
    let variant = ResultVariant::from_selector(&kind, params.table.as_deref())?;
    let mut view = load_view(&state, &name, &variant)
        .await?
        .ok_or_else(|| AgandockError::NotAvailable(format!("{} for '{}'", variant.label(), name)))?;
    apply_params(&mut view, &params, &state)?;

    let csv = export_csv(&view.displayed(&state.aggregator))?;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(&name, &variant));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

// ── Page ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub experiment: Option<String>,
    pub variant: Option<String>,
    pub table: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    pub lower: Option<f64>,
    #[serde(default, deserialize_with = "optional_number")]
    pub upper: Option<f64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

pub async fn results_page(
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Html<String> {
    let Some(experiment) = params.experiment.clone().filter(|e| !e.is_empty()) else {
        let experiments = state.pipeline.workspace().list_experiments().await.unwrap_or_default();
        return Html(render_page("Results", &render_picker(&experiments)));
    };

    let body = match render_experiment(&state, &experiment, &params).await {
        Ok(body) => body,
        Err(ApiError(e)) => format!(
            r#"<div class="alert alert-danger">{}</div>"#,
            HtmlEscape(&e.to_string())
        ),
    };
    Html(render_page(&format!("{experiment} - Results"), &body))
}

async fn render_experiment(
    state: &SharedState,
    experiment: &str,
    params: &PageParams,
) -> Result<String, ApiError> {
    let variant = ResultVariant::from_selector(
        params.variant.as_deref().unwrap_or("raw"),
        params.table.as_deref(),
    )?;
    let plip_tables = state
        .pipeline
        .workspace()
        .plip_tables(experiment)
        .await
        .unwrap_or_default();

    let tabs = render_tabs(experiment, &variant, &plip_tables);
    let content = match load_view(state, experiment, &variant).await? {
        None => format!(
            r#"<div class="card"><p class="text-muted">{} not yet available. Run the pipeline stage that produces it.</p></div>"#,
            HtmlEscape(&variant.label())
        ),
        Some(mut view) => {
            apply_params(
                &mut view,
                &ViewParams {
                    lower: params.lower,
                    upper: params.upper,
                    table: params.table.clone(),
                    sort: params.sort.clone(),
                    order: params.order.clone(),
                },
                state,
            )?;
            render_view(experiment, &view.snapshot(&state.aggregator))
        }
    };

    Ok(format!(
        r#"<h2 class="experiment-name">{}</h2>
{}
{}
{}"#,
        HtmlEscape(experiment),
        tabs,
        content,
        render_actions(experiment)
    ))
}

fn variant_query(experiment: &str, variant: &ResultVariant) -> String {
    let mut query = format!("experiment={}&variant={}", urlencoding::encode(experiment), variant.selector());
    if let Some(table) = variant.table_name() {
        query.push_str("&table=");
        query.push_str(&urlencoding::encode(table));
    }
    query
}

fn render_tabs(
    experiment: &str,
    current: &ResultVariant,
    plip_tables: &[PlipTable],
) -> String {
    let mut variants = vec![
        ResultVariant::Raw,
        ResultVariant::ValidityPassed,
        ResultVariant::ValidityFailed,
    ];
    variants.extend(
        plip_tables
            .iter()
            .filter_map(|t| ResultVariant::interaction_table(&t.name).ok()),
    );

    let tabs: String = variants
        .iter()
        .map(|variant| {
            let active = if variant == current { " active" } else { "" };
            format!(
                r#"<a class="tab{}" href="/results?{}">{}</a>"#,
                active,
                variant_query(experiment, variant),
                HtmlEscape(&variant.label())
            )
        })
        .collect();
    format!(r#"<div class="tabs mb-4">{}</div>"#, tabs)
}

fn render_view(experiment: &str, view: &ViewSnapshot) -> String {
    let base = variant_query(experiment, &view.variant);
    let range_query = match view.state {
        "range_filtered" => format!("&lower={}&upper={}", view.range.lower(), view.range.upper()),
        _ => String::new(),
    };
    let sort_query = format!(
        "&sort={}&order={}",
        urlencoding::encode(&view.sort.column),
        view.sort.order.as_str()
    );
    let export_query = format!(
        "?{}{}{}",
        view.variant
            .table_name()
            .map(|t| format!("table={}", urlencoding::encode(t)))
            .unwrap_or_default(),
        range_query,
        sort_query
    )
    .replacen("?&", "?", 1);

    let range_form = format!(
        r#"<form class="d-flex gap-3 mb-4 align-center" method="GET" action="/results">
        <input type="hidden" name="experiment" value="{exp}">
        <input type="hidden" name="variant" value="{sel}">
        {table_input}
        <input type="hidden" name="sort" value="{sort_col}">
        <input type="hidden" name="order" value="{sort_order}">
        <label>Lower <input type="number" step="0.1" name="lower" class="form-control" min="{bmin}" max="{bmax}" value="{lo}"></label>
        <label>Upper <input type="number" step="0.1" name="upper" class="form-control" min="{bmin}" max="{bmax}" value="{hi}"></label>
        <button type="submit" class="btn btn-primary">Apply Filter</button>
        <a class="btn btn-outline" href="/results?{base}">Reset</a>
        <a class="btn btn-outline" href="/api/results/{exp_q}/{sel}/export{export_query}">Export CSV</a>
    </form>"#,
        exp = HtmlEscape(experiment),
        exp_q = urlencoding::encode(experiment),
        sel = view.variant.selector(),
        table_input = view
            .variant
            .table_name()
            .map(|t| format!(r#"<input type="hidden" name="table" value="{}">"#, HtmlEscape(t)))
            .unwrap_or_default(),
        sort_col = HtmlEscape(&view.sort.column),
        sort_order = view.sort.order.as_str(),
        bmin = view.bounds.lower(),
        bmax = view.bounds.upper(),
        lo = view.range.lower(),
        hi = view.range.upper(),
        base = base,
        export_query = HtmlEscape(&export_query),
    );

    let stats = format!(
        r#"<div class="grid-3 mb-4">
        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">Ligands</div></div>
        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">Best score (kcal/mol)</div></div>
        <div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">Mean score (kcal/mol)</div></div>
    </div>"#,
        view.summary.rows,
        view.summary.min_label(),
        view.summary.mean_label()
    );

    let histogram = if view.show_histogram {
        let peak = view.histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        let bars: String = view
            .histogram
            .iter()
            .map(|bin| {
                let pct = bin.count * 100 / peak;
                format!(
                    r#"<div class="histogram-bar" title="{label}: {count}">
                <div class="progress-track"><div class="progress-bar" style="width:{pct}%"></div></div>
                <span class="histogram-label">{label}</span><span class="histogram-count">{count}</span>
            </div>"#,
                    label = HtmlEscape(&bin.range_label),
                    count = bin.count,
                    pct = pct
                )
            })
            .collect();
        format!(
            r#"<div class="card mb-4"><div class="card-header"><div>Score distribution</div></div>{}</div>"#,
            bars
        )
    } else {
        String::new()
    };

    // Clicking a header sorts by it; clicking the sorted one flips direction.
    let head: String = view
        .columns
        .iter()
        .map(|c| {
            let (order, marker) = if *c == view.sort.column {
                let marker = match view.sort.order {
                    SortOrder::Asc => " &#9650;",
                    SortOrder::Desc => " &#9660;",
                };
                (view.sort.order.reversed(), marker)
            } else {
                (SortOrder::Asc, "")
            };
            let href = format!(
                "/results?{}{}&sort={}&order={}",
                base,
                range_query,
                urlencoding::encode(c),
                order.as_str()
            );
            format!(
                r#"<th><a class="sort-link" href="{}">{}</a>{}</th>"#,
                HtmlEscape(&href),
                HtmlEscape(c),
                marker
            )
        })
        .collect();
    let body: String = if view.rows.is_empty() {
        format!(
            r#"<tr><td colspan="{}" class="text-center text-muted">No ligands in this range.</td></tr>"#,
            view.columns.len().max(1)
        )
    } else {
        view.rows
            .iter()
            .map(|row| {
                let cells: String = view
                    .columns
                    .iter()
                    .map(|c| format!("<td>{}</td>", HtmlEscape(row.get(c))))
                    .collect();
                format!("<tr>{}</tr>", cells)
            })
            .collect()
    };

    format!(
        r#"{}
{}
{}
<div class="card">
    <div class="card-header"><div>{}</div></div>
    <div class="table-container">
        <table class="table">
            <thead><tr>{}</tr></thead>
            <tbody>{}</tbody>
        </table>
    </div>
</div>"#,
        range_form,
        stats,
        histogram,
        HtmlEscape(&view.label),
        head,
        body
    )
}

fn render_actions(experiment: &str) -> String {
    format!(
        r#"<div class="card mt-4">
    <div class="card-header"><div>Pipeline</div></div>
    <div class="d-flex gap-3 align-center">
        <button class="btn btn-primary" data-stage="filter">Run PoseBusters</button>
        <label><input type="checkbox" id="use-pb"> Only PoseBusters-passed ligands</label>
        <button class="btn btn-primary" data-stage="plip">Run PLIP</button>
    </div>
    <pre id="stage-output" class="command-output"></pre>
</div>
<script>
(function () {{
    var experiment = {exp_json};
    var out = document.getElementById('stage-output');
    function range() {{
        var lo = document.querySelector('input[name=lower]');
        var hi = document.querySelector('input[name=upper]');
        return lo && hi ? [parseFloat(lo.value), parseFloat(hi.value)] : [null, null];
    }}
    document.querySelectorAll('button[data-stage]').forEach(function (button) {{
        button.addEventListener('click', async function () {{
            var r = range();
            var payload = {{ folder_name: experiment, lower_range: r[0], higher_range: r[1] }};
            if (button.dataset.stage === 'plip') {{
                payload.use_pb_filtered_ligands = document.getElementById('use-pb').checked;
            }}
            out.textContent = 'Running ' + button.textContent + '...';
            var resp = await fetch('/api/' + button.dataset.stage, {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify(payload)
            }});
            var body = await resp.json();
            out.textContent = resp.ok ? body.command : body.error;
            if (resp.ok) {{ window.location.reload(); }}
        }});
    }});
}})();
</script>"#,
        exp_json = serde_json::Value::String(experiment.to_string())
    )
}

fn render_picker(experiments: &[String]) -> String {
    if experiments.is_empty() {
        return r#"<p class="text-muted">No experiments yet. Start a docking run from the <a href="/">dashboard</a>.</p>"#.to_string();
    }
    let items: String = experiments
        .iter()
        .map(|name| {
            format!(
                r#"<li><a href="/results?experiment={}">{}</a></li>"#,
                urlencoding::encode(name),
                HtmlEscape(name)
            )
        })
        .collect();
    format!(r#"<ul class="experiment-list">{}</ul>"#, items)
}

fn render_page(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{} - AGanDock</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<div class="app-container">
{}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">Docking Results</h1>
            <p class="text-muted">Filter ligands by docking score, inspect the distribution and export subsets</p>
        </div>
    </div>
{}
</main>
</div>
</body>
</html>"#,
        HtmlEscape(title),
        NAV_HTML,
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agandock_results::{ResultTable, ScoreAggregator};
    use std::sync::Arc;

    fn view() -> VariantView {
        let table = ResultTable::parse(
            "Name,SMILES,Docking score (kcal/mol),Ligand efficiency\nA,CCO,-9.5,0.3\nB,<b>,-3.0,0.1\n",
        );
        VariantView::new(ResultVariant::Raw, Arc::new(table), &ScoreAggregator::default())
    }

    #[test]
    fn test_apply_range_fills_missing_side_from_bounds() {
        let mut v = view();
        apply_range(&mut v, &ViewParams { lower: Some(-5.0), ..Default::default() }).unwrap();
        assert_eq!(v.active_range(), ScoreRange::new(-5.0, 0.0).unwrap());
    }

    #[test]
    fn test_apply_range_rejects_inverted() {
        let mut v = view();
        let err = apply_range(&mut v, &ViewParams { lower: Some(-1.0), upper: Some(-8.0), ..Default::default() });
        assert!(err.is_err());
    }

    #[test]
    fn test_render_view_escapes_cells() {
        let v = view();
        let html = render_view("egfr", &v.snapshot(&ScoreAggregator::default()));
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("-10 to -8"));
        assert!(html.contains("/api/results/egfr/raw/export"));
        assert!(html.contains("sort=Docking%20score%20%28kcal%2Fmol%29&amp;order=asc"));
    }

    #[test]
    fn test_render_view_marks_sorted_column() {
        let mut v = view();
        let agg = ScoreAggregator::default();
        v.sort_by(SortKey::new("Name", SortOrder::Desc), &agg).unwrap();
        let html = render_view("egfr", &v.snapshot(&agg));
        // The sorted header links to the opposite direction.
        assert!(html.contains("sort=Name&amp;order=asc\">Name</a> &#9660;"));
        let a = html.find("<td>A</td>").unwrap();
        let b = html.find("<td>B</td>").unwrap();
        assert!(b < a);
    }
}
