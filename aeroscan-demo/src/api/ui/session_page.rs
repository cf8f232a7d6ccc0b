//! Session page - the three workflow steps rendered as HTML

use std::fmt::Write;

use axum::{
    extract::{Path, State},
    response::Html,
};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    services::surface::HeightField,
    view::{
        render, PhaseState, ProcessingView, ResultsView, StepBadge, UploadView, View, ViewBody,
    },
    AppState,
};

/// Every other grid sample is drawn in the surface preview
const SURFACE_STRIDE: usize = 2;
const SURFACE_CELL_PX: f64 = 8.0;

/// GET /session/:id
pub async fn session_page(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Html<String>> {
    let snapshot = state.sessions.get(session_id).await?;
    Ok(Html(render_page(&render(&snapshot))))
}

/// Full HTML document for a view
pub fn render_page(view: &View) -> String {
    let body = match &view.body {
        ViewBody::Upload(upload) => upload_section(upload),
        ViewBody::Processing(processing) => processing_section(processing),
        ViewBody::Results(results) => results_section(results),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AeroScan - Road Inspection</title>
    <link rel="stylesheet" href="/static/aeroscan.css">
</head>
<body data-session-id="{session_id}" data-step="{step}">
    <header>
        <div>
            <h1>AeroScan <span id="connection-status" class="connection-status status-connecting">Connecting...</span></h1>
            <div class="subtitle">Drone road-surface inspection</div>
        </div>
        <div class="steps">{badges}</div>
    </header>
    <div class="content">
        {body}
        <div id="message"></div>
    </div>
    <script src="/static/aeroscan.js"></script>
</body>
</html>"#,
        session_id = view.session_id,
        step = view.step.number(),
        badges = step_badges(&view.steps),
        body = body,
    )
}

fn step_badges(steps: &[StepBadge]) -> String {
    let mut out = String::new();
    for badge in steps {
        let mut class = String::from("step-badge");
        if badge.reached {
            class.push_str(" reached");
        }
        if badge.current {
            class.push_str(" current");
        }
        let _ = write!(
            out,
            r#"<span class="{}">{}. {}</span>"#,
            class, badge.number, badge.label
        );
    }
    out
}

fn upload_section(view: &UploadView) -> String {
    let accept: Vec<String> = view
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect();
    let pavement_options: String = view
        .pavement_types
        .iter()
        .map(|p| {
            let selected = if *p == view.metadata.pavement_type {
                " selected"
            } else {
                ""
            };
            format!(r#"<option value="{:?}"{}>{}</option>"#, p, selected, p.label())
        })
        .collect();
    let capabilities: String = view
        .capabilities
        .iter()
        .map(|c| format!("<li>{}</li>", c))
        .collect();
    let upload_message = view
        .upload_message
        .as_deref()
        .map(|m| format!(r#"<div class="message">{}</div>"#, m))
        .unwrap_or_default();

    format!(
        r#"<h2>1. Upload drone data</h2>
<div class="card">
    <label for="files">Images and point clouds ({extensions})</label>
    <input id="files" type="file" multiple accept="{accept}" data-action="upload">
    {upload_message}
</div>
<div class="card">
    <label for="project-name">Project name</label>
    <input id="project-name" type="text" value="{name}">
    <label for="survey-date">Survey date</label>
    <input id="survey-date" type="date" value="{date}">
    <label for="road-length">Road length (km)</label>
    <input id="road-length" type="number" min="0.1" max="50" step="0.1" value="{length}">
    <label for="pavement-type">Pavement</label>
    <select id="pavement-type">{pavement_options}</select>
</div>
<button class="button" data-action="start">Start processing</button>
<button class="button secondary" data-action="sample">Use sample data</button>
<div class="card"><h2>Capabilities</h2><ul>{capabilities}</ul></div>"#,
        extensions = view.allowed_extensions.join(", "),
        accept = accept.join(","),
        upload_message = upload_message,
        name = escape_html(&view.metadata.project_name),
        date = view.metadata.survey_date.format("%Y-%m-%d"),
        length = view.metadata.road_length_km,
        pavement_options = pavement_options,
        capabilities = capabilities,
    )
}

fn processing_section(view: &ProcessingView) -> String {
    let phases: String = view
        .phases
        .iter()
        .map(|phase| {
            let (class, mark) = match phase.state {
                PhaseState::Done => ("done", "&#10003;"),
                PhaseState::Active => ("active", "&#9654;"),
                PhaseState::Pending => ("pending", "&#9675;"),
            };
            format!(r#"<div class="phase {}">{} {}</div>"#, class, mark, phase.label)
        })
        .collect();
    let status = view
        .status_message
        .as_deref()
        .map(|m| format!(r#"<div class="message">{}</div>"#, escape_html(m)))
        .unwrap_or_default();
    let metrics: String = view
        .metrics
        .iter()
        .map(|m| {
            format!(
                r#"<div class="card metric"><div class="value">{}</div><div class="title">{}</div></div>"#,
                escape_html(&m.value),
                escape_html(&m.title)
            )
        })
        .collect();
    let confirm = if view.can_confirm {
        r#"<button class="button" data-action="confirm">Go to results</button>"#
    } else {
        ""
    };

    format!(
        r#"<h2>2. Processing</h2>
<div class="card">
    <div class="progress"><div class="progress-bar" style="width: {pct:.0}%"></div></div>
    {phases}
    {status}
</div>
<div class="grid">{metrics}</div>
{confirm}"#,
        pct = view.percentage,
        phases = phases,
        status = status,
        metrics = metrics,
        confirm = confirm,
    )
}

fn results_section(view: &ResultsView) -> String {
    let summary = &view.analytics.summary;

    let type_filters: String = view
        .defects
        .type_options
        .iter()
        .map(|t| {
            format!(
                r#"<label><input type="checkbox" name="type" value="{:?}" checked data-action="filter"> {}</label>"#,
                t,
                t.label()
            )
        })
        .collect();
    let severity_filters: String = view
        .defects
        .severity_options
        .iter()
        .map(|s| {
            format!(
                r#"<label><input type="checkbox" name="severity" value="{:?}" checked data-action="filter"> {}</label>"#,
                s,
                s.label()
            )
        })
        .collect();

    let mut rows = String::new();
    for r in &view.defects.records {
        let _ = write!(
            rows,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class="severity-{}">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            r.id,
            r.defect_type.label(),
            r.depth_cm,
            r.width_cm,
            r.severity.label().to_ascii_lowercase(),
            r.severity.label(),
            r.recommendation.label(),
            r.coord_x,
            r.coord_y
        );
    }

    let distribution: String = view
        .analytics
        .distribution
        .iter()
        .map(|c| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><div class="bar" style="width: {:.0}%"></div></td></tr>"#,
                c.label,
                c.count,
                c.share * 100.0
            )
        })
        .collect();

    let histogram: String = view
        .analytics
        .histogram
        .bins
        .iter()
        .map(|bin| {
            let counts: String = bin
                .counts
                .iter()
                .map(|(severity, count)| {
                    format!(
                        r#"<span style="color: {}">{}: {}</span> "#,
                        severity.color(),
                        severity.label(),
                        count
                    )
                })
                .collect();
            format!(
                "<tr><td>{:.0}-{:.0} cm</td><td>{}</td></tr>",
                bin.lower, bin.upper, counts
            )
        })
        .collect();

    let report_options: String = view
        .report
        .formats
        .iter()
        .map(|f| format!(r#"<option value="{}">{}</option>"#, f.label(), f.label()))
        .collect();
    let report_status = view
        .report
        .acknowledgment
        .as_deref()
        .map(|m| format!(r#"<div class="message">{}</div>"#, m))
        .unwrap_or_default();

    format!(
        r#"<h2>3. Results</h2>
<div class="grid">
    <div class="card metric"><div class="value">{total}</div><div class="title">Defects</div></div>
    <div class="card metric"><div class="value">{critical}</div><div class="title">Critical</div></div>
    <div class="card metric"><div class="value">{max_depth:.1} cm</div><div class="title">Max depth</div></div>
    <div class="card metric"><div class="value">{mean_depth:.1} cm</div><div class="title">Mean depth</div></div>
</div>
<div class="card">
    <h2>Defects</h2>
    <div class="grid"><div>{type_filters}</div><div>{severity_filters}</div></div>
    <table>
        <thead><tr><th>#</th><th>Type</th><th>Depth, cm</th><th>Width, cm</th><th>Severity</th><th>Recommendation</th><th>X</th><th>Y</th></tr></thead>
        <tbody id="defect-rows">{rows}</tbody>
    </table>
    <button class="button secondary" data-action="export" data-format="csv">Export CSV</button>
    <button class="button secondary" data-action="export" data-format="dxf">Export DXF</button>
</div>
<div class="grid">
    <div class="card"><h2>By category</h2><table>{distribution}</table></div>
    <div class="card"><h2>Depth distribution</h2><table>{histogram}</table></div>
</div>
<div class="card"><h2>Surface model</h2>{surface}</div>
<div class="card">
    <h2>Report</h2>
    <pre>{preview}</pre>
    <select id="report-format">{report_options}</select>
    <button class="button" data-action="report">Generate report</button>
    {report_status}
</div>
<button class="button secondary" data-action="reset">New project</button>"#,
        total = summary.total,
        critical = summary.critical,
        max_depth = summary.max_depth_cm,
        mean_depth = summary.mean_depth_cm,
        type_filters = type_filters,
        severity_filters = severity_filters,
        rows = rows,
        distribution = distribution,
        histogram = histogram,
        surface = surface_svg(&view.surface),
        preview = escape_html(&view.report.preview),
        report_options = report_options,
        report_status = report_status,
    )
}

/// Top-down elevation map with defect markers
fn surface_svg(field: &HeightField) -> String {
    let (min, max) = (field.min_elevation(), field.max_elevation());
    let span = if max > min { max - min } else { 1.0 };
    let cols = field.xs.len().div_ceil(SURFACE_STRIDE);
    let rows = field.ys.len().div_ceil(SURFACE_STRIDE);
    let width = cols as f64 * SURFACE_CELL_PX;
    let height = rows as f64 * SURFACE_CELL_PX;

    let mut out = format!(
        r#"<svg viewBox="0 0 {w} {h}" width="100%" preserveAspectRatio="none">"#,
        w = width,
        h = height
    );
    for (r, row) in (0..field.ys.len()).step_by(SURFACE_STRIDE).enumerate() {
        for (c, col) in (0..field.xs.len()).step_by(SURFACE_STRIDE).enumerate() {
            let Some(z) = field.elevation_at(row, col) else {
                continue;
            };
            let shade = (40.0 + 180.0 * (z - min) / span).round() as u8;
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{s}" height="{s}" fill="rgb({},{},255)"/>"#,
                c as f64 * SURFACE_CELL_PX,
                height - (r + 1) as f64 * SURFACE_CELL_PX,
                shade / 2,
                shade,
                s = SURFACE_CELL_PX
            );
        }
    }

    let (x0, x1) = axis_bounds(&field.xs);
    let (y0, y1) = axis_bounds(&field.ys);
    for marker in &field.markers {
        let cx = (marker.x - x0) / (x1 - x0) * width;
        let cy = height - (marker.y - y0) / (y1 - y0) * height;
        let _ = write!(
            out,
            r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}"><title>#{} {} ({:.1} cm)</title></circle>"#,
            cx,
            cy,
            (marker.size / 4.0).max(4.0),
            marker.severity.color(),
            marker.defect_id,
            marker.defect_type.label(),
            marker.depth_cm
        );
    }
    out.push_str("</svg>");
    out
}

fn axis_bounds(axis: &[f64]) -> (f64, f64) {
    match (axis.first(), axis.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        _ => (0.0, 1.0),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessState;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Quarry" & Co</b>"#),
            "&lt;b&gt;&quot;Quarry&quot; &amp; Co&lt;/b&gt;"
        );
    }

    #[test]
    fn test_upload_page_escapes_project_name() {
        let mut state = ProcessState::new();
        let mut metadata = state.metadata().clone();
        metadata.project_name = "<script>".to_string();
        state.set_metadata(metadata).unwrap();

        let html = render_page(&render(&state));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"data-step="1""#));
        assert!(html.contains("Use sample data"));
    }

    #[test]
    fn test_results_page_lists_every_defect() {
        let mut state = ProcessState::new();
        state.use_sample_data(42, 27).unwrap();
        state.finish_processing().unwrap();
        state.confirm_results().unwrap();

        let html = render_page(&render(&state));
        let records = state.project_data().unwrap();
        assert!(html.matches("<tr><td>").count() >= records.len());
        assert!(html.contains("TECHNICAL REPORT"));
        assert!(html.contains("<svg"));
        assert!(html.contains("New project"));
    }

    #[test]
    fn test_surface_preview_samples_every_other_cell() {
        let records = crate::services::generator::generate(42, 27).unwrap();
        let field = crate::services::surface::synthesize_surface(42, &records);
        let svg = surface_svg(&field);

        let expected = field.xs.len().div_ceil(SURFACE_STRIDE)
            * field.ys.len().div_ceil(SURFACE_STRIDE);
        assert_eq!(svg.matches("<rect").count(), expected);
        assert_eq!(svg.matches("<circle").count(), field.markers.len());
    }
}
