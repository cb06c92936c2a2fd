//! Dashboard handler - experiment overview and docking submission form.

use axum::{extract::State, response::Html};
use minijinja::HtmlEscape;
use tracing::warn;

use crate::state::SharedState;

/// Navigation HTML template shared across all pages
pub const NAV_HTML: &str = include_str!("../../templates/nav.html");

pub async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    let workspace = state.pipeline.workspace();
    let experiments = workspace.list_experiments().await.unwrap_or_else(|e| {
        warn!("Failed to list experiments: {}", e);
        Vec::new()
    });

    let mut rows = Vec::with_capacity(experiments.len());
    for name in &experiments {
        let validated = workspace.has_validity_results(name).await.unwrap_or(false);
        rows.push((name.clone(), validated));
    }

    Html(render_dashboard(&rows))
}

fn render_dashboard(experiments: &[(String, bool)]) -> String {
    let experiment_rows: String = if experiments.is_empty() {
        r#"<tr><td colspan="3" class="text-center text-muted">No experiments yet. Submit a docking run below.</td></tr>"#.to_string()
    } else {
        experiments.iter().map(|(name, validated)| {
            let badge = if *validated {
                r#"<span class="badge badge-success">PoseBusters done</span>"#
            } else {
                r#"<span class="badge badge-outline">Docked</span>"#
            };
            format!(r#"
            <tr>
                <td style="font-weight: 700;">{}</td>
                <td>{}</td>
                <td><a href="/results?experiment={}" class="btn btn-outline btn-sm">Results</a></td>
            </tr>"#, HtmlEscape(name), badge, urlencoding::encode(name))
        }).collect()
    };

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Experiments - AGanDock</title>
    <link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<div class="app-container">
{}
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">Molecular Docking</h1>
            <p class="text-muted">Dock ligands, validate poses with PoseBusters and profile interactions with PLIP</p>
        </div>
    </div>

    <div class="card mb-4">
        <div class="card-header"><div>Experiments</div></div>
        <div class="table-container">
            <table class="table">
                <thead><tr><th>Folder</th><th>Status</th><th></th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>
    </div>

    <div class="card">
        <div class="card-header"><div>New Docking Run</div></div>
        <form id="docking-form" class="form-grid" method="POST" action="/api/docking" enctype="multipart/form-data">
            <label>Folder name <input type="text" name="folderName" class="form-control" pattern="[A-Za-z0-9_-]+" required></label>
            <label>Receptor PDB <input type="file" name="pdbFile" accept=".pdb" required></label>
            <label>Receptor PDBQT <input type="file" name="pdbqtFile" accept=".pdbqt" required></label>
            <label>Vina config <input type="file" name="configFile" accept=".txt" required></label>
            <label>Input type
                <select name="inputType" class="form-control">
                    <option value="smiles">Single SMILES</option>
                    <option value="csv">Multiple SMILES (CSV)</option>
                </select>
            </label>
            <label>SMILES <input type="text" name="inputSmiles" class="form-control"></label>
            <label>Ligand CSV <input type="file" name="inputCsv" accept=".csv"></label>
            <button type="submit" class="btn btn-primary">Run Docking</button>
        </form>
        <pre id="docking-output" class="command-output"></pre>
    </div>
</main>
<script>
document.getElementById('docking-form').addEventListener('submit', async function (e) {{
    e.preventDefault();
    var out = document.getElementById('docking-output');
    out.textContent = 'Running docking...';
    var resp = await fetch('/api/docking', {{ method: 'POST', body: new FormData(e.target) }});
    var body = await resp.json();
    out.textContent = resp.ok ? body.command + '\n\n' + body.stdout : body.error;
    if (resp.ok) {{ window.location.href = '/results?experiment=' + encodeURIComponent(body.experiment); }}
}});
</script>
</div>
</body>
</html>"#, NAV_HTML, experiment_rows)
}
