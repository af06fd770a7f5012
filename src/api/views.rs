//! Server-rendered HTML pages.

use crate::api::flash::Flashes;
use crate::services::origin::OriginVerdict;
use crate::utils::html::escape;
use crate::utils::validation::{ALLOWED_EXTENSIONS, KNOWN_CATEGORIES};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
nav a { margin-right: 1rem; }
.flash { padding: .6rem 1rem; margin: .5rem 0; border-radius: 4px; }
.flash-success { background: #e3f6e8; border: 1px solid #8fd19e; }
.flash-warning { background: #fff6dd; border: 1px solid #f0c36d; }
.flash-danger { background: #fde8e8; border: 1px solid #f5a3a3; }
ul.metadata { font-family: ui-monospace, monospace; font-size: .9rem; list-style: none; padding: 0; }
ul.metadata li { padding: .15rem 0; border-bottom: 1px solid #eee; }
.columns { display: flex; gap: 2rem; }
.columns > section { flex: 1; min-width: 0; }
.verdict { font-weight: bold; }
"#;

/// `path?filename=<name>` with the name percent-encoded.
pub fn file_url(path: &str, filename: &str) -> String {
    format!("{}?filename={}", path, utf8_percent_encode(filename, NON_ALPHANUMERIC))
}

fn layout(title: &str, flashes: &Flashes, body: &str) -> String {
    let messages: String = flashes
        .iter()
        .map(|f| {
            format!(
                r#"<div class="flash flash-{}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head>
<meta charset="utf-8">
<title>{title} · Lens Analyzer</title>
<style>{STYLE}</style>
</head>
<body>
<nav><a href="/">Start</a><a href="/analyze">Analiza pliku</a><a href="/report">Raport</a></nav>
{messages}
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

fn metadata_list(lines: &[String]) -> String {
    if lines.is_empty() {
        return "<p>Brak metadanych.</p>".to_string();
    }
    let items: String = lines
        .iter()
        .map(|l| format!("<li>{}</li>", escape(l)))
        .collect();
    format!(r#"<ul class="metadata">{}</ul>"#, items)
}

fn export_links(filename: &str) -> String {
    format!(
        r#"<p>
<a href="{txt}">Pobierz raport TXT</a> ·
<a href="{pdf}">Pobierz raport PDF</a> ·
<a href="{tools}">Narzędzia metadanych</a> ·
<a href="{strip}">Usuń wszystkie metadane</a>
</p>"#,
        txt = escape(&file_url("/download-txt/", filename)),
        pdf = escape(&file_url("/download-pdf/", filename)),
        tools = escape(&file_url("/metadata-tools/", filename)),
        strip = escape(&file_url("/remove-metadata/", filename)),
    )
}

pub fn index_page(flashes: &Flashes) -> String {
    layout(
        "Start",
        flashes,
        r#"<h1>Lens Analyzer</h1>
<p>Prześlij plik, aby odczytać jego metadane, sprawdzić pochodzenie obrazu
i wyeksportować raport.</p>
<p><a href="/analyze">Rozpocznij analizę</a></p>"#,
    )
}

pub fn analyze_page(flashes: &Flashes) -> String {
    let accept: Vec<String> = ALLOWED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
    let body = format!(
        r#"<h1>Analiza pliku</h1>
<form method="post" action="/analyze" enctype="multipart/form-data">
<input type="file" name="file" accept="{accept}">
<button type="submit">Analizuj</button>
</form>
<p>Dozwolone typy: {allowed}</p>"#,
        accept = escape(&accept.join(",")),
        allowed = escape(&ALLOWED_EXTENSIONS.join(", ")),
    );
    layout("Analiza pliku", flashes, &body)
}

/// Result view of an analysis. `verdict` is only known right after upload.
pub fn report_page(flashes: &Flashes, filename: &str, lines: &[String], verdict: Option<OriginVerdict>) -> String {
    let verdict = verdict
        .map(|v| {
            format!(
                r#"<h2>Pochodzenie obrazu</h2>
<p class="verdict">{}</p>
<p><small>Heurystyka orientacyjna (ostrość i gęstość krawędzi), a nie zweryfikowany klasyfikator.</small></p>"#,
                escape(v.as_str())
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Raport metadanych</h1>
<p>Plik: <strong>{name}</strong></p>
{links}
{verdict}
<h2>Metadane</h2>
{metadata}"#,
        name = escape(filename),
        links = export_links(filename),
        metadata = metadata_list(lines),
    );
    layout("Raport", flashes, &body)
}

pub fn empty_report_page(flashes: &Flashes) -> String {
    layout(
        "Raport",
        flashes,
        r#"<h1>Raport metadanych</h1>
<p>Brak raportów. <a href="/analyze">Przeanalizuj plik</a>, aby utworzyć raport.</p>"#,
    )
}

/// Side-by-side view of the original's and the clean copy's metadata.
pub fn metadata_tools_page(
    flashes: &Flashes,
    filename: &str,
    metadata: &[String],
    clean_metadata: Option<&[String]>,
) -> String {
    let action = escape(&file_url("/metadata-tools/", filename));
    let options: String = KNOWN_CATEGORIES
        .iter()
        .map(|c| format!(r#"<option value="{c}">{c}</option>"#, c = escape(c)))
        .collect();

    let clean = match clean_metadata {
        Some(lines) => format!(
            r#"{}<p><a href="{}">Pobierz czystą kopię</a></p>"#,
            metadata_list(lines),
            escape(&file_url("/download-clean/", filename))
        ),
        None => "<p>Czysta kopia nie istnieje.</p>".to_string(),
    };

    let body = format!(
        r#"<h1>Narzędzia metadanych</h1>
<p>Plik: <strong>{name}</strong></p>
<form method="post" action="{action}">
<input type="hidden" name="action" value="remove_all">
<button type="submit">Usuń wszystkie metadane</button>
</form>
<form method="post" action="{action}">
<input type="hidden" name="action" value="remove_category">
<select name="category"><option value="">-- wybierz kategorię --</option>{options}</select>
<button type="submit">Usuń kategorię</button>
</form>
<form method="post" action="{action}">
<input type="hidden" name="action" value="clean_copy">
<button type="submit">Utwórz czystą kopię</button>
</form>
<div class="columns">
<section><h2>Obecne metadane</h2>{current}</section>
<section><h2>Czysta kopia</h2>{clean}</section>
</div>"#,
        name = escape(filename),
        current = metadata_list(metadata),
    );
    layout("Narzędzia metadanych", flashes, &body)
}
