use crate::config::ExportSettings;
use crate::media::TrackResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Flat field names in export order. Shared by the CSV, spreadsheet, XML and
/// HTML exports; the JSON export keeps the nested shape.
pub const FLAT_FIELDS: [&str; 11] = [
    "url",
    "result.url",
    "result.title",
    "result.thumbnail",
    "result.duration",
    "result.medias.url",
    "result.medias.quality",
    "result.medias.extension",
    "result.medias.type",
    "result.type",
    "result.error",
];

/// Single-level projection of one track, using only the first media
/// descriptor if present. Values line up with [`FLAT_FIELDS`].
pub struct FlatRow {
    values: [String; 11],
}

impl FlatRow {
    pub fn from_track(track: &TrackResult) -> Self {
        let media = track.medias.first();
        Self {
            values: [
                track.url.clone(),
                track.result_url.clone(),
                track.title.clone(),
                track.thumbnail.clone(),
                track.duration.clone(),
                media.map(|m| m.url.clone()).unwrap_or_default(),
                media.map(|m| m.quality.clone()).unwrap_or_default(),
                media.map(|m| m.extension.clone()).unwrap_or_default(),
                media.map(|m| m.media_type.clone()).unwrap_or_default(),
                track.track_type.clone(),
                track.error.to_string(),
            ],
        }
    }

    pub fn values(&self) -> &[String; 11] {
        &self.values
    }
}

/// Run every configured export. Formats are independent: a failure in one is
/// logged and never blocks the others. Relative paths resolve against
/// `project_root`.
pub fn export_all(tracks: &[TrackResult], export: &ExportSettings, project_root: &Path) {
    let json_path = resolve(project_root, &export.output_json);
    if let Err(e) = export_json(tracks, &json_path) {
        error!("JSON export failed: {:#}", e);
    }

    if let Some(path) = &export.output_csv {
        if let Err(e) = export_csv(tracks, &resolve(project_root, path)) {
            error!("CSV export failed: {:#}", e);
        }
    }
    if let Some(path) = &export.output_excel {
        if let Err(e) = export_excel(tracks, &resolve(project_root, path)) {
            error!("Excel export failed: {:#}", e);
        }
    }
    if let Some(path) = &export.output_xml {
        if let Err(e) = export_xml(tracks, &resolve(project_root, path)) {
            error!("XML export failed: {:#}", e);
        }
    }
    if let Some(path) = &export.output_html {
        if let Err(e) = export_html(tracks, &resolve(project_root, path)) {
            error!("HTML export failed: {:#}", e);
        }
    }
}

fn resolve(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Pretty-printed nested records. Always writes, even for an empty list.
pub fn export_json(tracks: &[TrackResult], path: &Path) -> Result<()> {
    let values: Vec<serde_json::Value> = tracks.iter().map(TrackResult::to_value).collect();
    let contents = serde_json::to_string_pretty(&values).context("Failed to serialize tracks")?;
    write_file(path, &contents)?;
    info!("Exported JSON data to {}", path.display());
    Ok(())
}

/// Header row plus one row per track, CRLF-terminated. Skipped entirely when
/// there are no tracks.
pub fn export_csv(tracks: &[TrackResult], path: &Path) -> Result<()> {
    if tracks.is_empty() {
        warn!("No tracks to export to CSV");
        return Ok(());
    }

    let mut out = String::new();
    push_csv_row(&mut out, FLAT_FIELDS.iter().copied());
    for track in tracks {
        let row = FlatRow::from_track(track);
        push_csv_row(&mut out, row.values().iter().map(String::as_str));
    }

    write_file(path, &out)?;
    info!("Exported CSV data to {}", path.display());
    Ok(())
}

fn push_csv_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&csv_escape(field));
    }
    out.push_str("\r\n");
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// SpreadsheetML 2003 workbook with a single `Tracks` worksheet. Skipped
/// entirely when there are no tracks.
pub fn export_excel(tracks: &[TrackResult], path: &Path) -> Result<()> {
    if tracks.is_empty() {
        warn!("No tracks to export to Excel");
        return Ok(());
    }

    let mut out = String::from(
        "<?xml version=\"1.0\"?>\n\
         <?mso-application progid=\"Excel.Sheet\"?>\n\
         <Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\"\n \
         xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\n \
         <Worksheet ss:Name=\"Tracks\">\n  <Table>\n",
    );

    push_spreadsheet_row(&mut out, FLAT_FIELDS.iter().copied());
    for track in tracks {
        let row = FlatRow::from_track(track);
        push_spreadsheet_row(&mut out, row.values().iter().map(String::as_str));
    }

    out.push_str("  </Table>\n </Worksheet>\n</Workbook>\n");

    write_file(path, &out)?;
    info!("Exported Excel data to {}", path.display());
    Ok(())
}

fn push_spreadsheet_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    out.push_str("   <Row>\n");
    for field in fields {
        out.push_str("    <Cell><Data ss:Type=\"String\">");
        out.push_str(&xml_escape(field));
        out.push_str("</Data></Cell>\n");
    }
    out.push_str("   </Row>\n");
}

/// `<tracks>` root with one `<track>` element per record; flat field names
/// become tags with `.` replaced by `_`. Writes even for an empty list.
pub fn export_xml(tracks: &[TrackResult], path: &Path) -> Result<()> {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<tracks>");
    for track in tracks {
        let row = FlatRow::from_track(track);
        out.push_str("<track>");
        for (field, value) in FLAT_FIELDS.iter().zip(row.values()) {
            let tag = field.replace('.', "_");
            out.push('<');
            out.push_str(&tag);
            out.push('>');
            out.push_str(&xml_escape(value));
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        out.push_str("</track>");
    }
    out.push_str("</tracks>");

    write_file(path, &out)?;
    info!("Exported XML data to {}", path.display());
    Ok(())
}

/// Single-table report. Skipped entirely when there are no tracks.
pub fn export_html(tracks: &[TrackResult], path: &Path) -> Result<()> {
    if tracks.is_empty() {
        warn!("No tracks to export to HTML");
        return Ok(());
    }

    let header_cells: String = FLAT_FIELDS
        .iter()
        .map(|field| format!("<th>{}</th>", xml_escape(field)))
        .collect();

    let mut rows_html = String::new();
    for track in tracks {
        let row = FlatRow::from_track(track);
        rows_html.push_str("<tr>");
        for value in row.values() {
            rows_html.push_str("<td>");
            rows_html.push_str(&xml_escape(value));
            rows_html.push_str("</td>");
        }
        rows_html.push_str("</tr>");
    }

    let contents = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Spotify Tracks Export</title>
  <style>
    body {{ font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ccc; padding: 6px 10px; font-size: 14px; }}
    th {{ background: #f5f5f5; text-align: left; }}
    tr:nth-child(even) {{ background: #fafafa; }}
  </style>
</head>
<body>
  <h1>Spotify Tracks Export</h1>
  <table>
    <thead>
      <tr>{header_cells}</tr>
    </thead>
    <tbody>
      {rows_html}
    </tbody>
  </table>
</body>
</html>"#
    );

    write_file(path, &contents)?;
    info!("Exported HTML data to {}", path.display());
    Ok(())
}

/// Escapes `&`, `<` and `>` only; quotes stay literal.
fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
