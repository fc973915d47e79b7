use chrono::NaiveDate;
use sheettrack_core::records::Paralelo;
use sheettrack_core::{
    GridExtractor, LocalWorkbookClient, MemoryStore, SpreadsheetClient, TrackerConfig,
    UpdateOrchestrator, ValidationOptions, find_valid_worksheets,
};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

type SheetSpec<'a> = (&'a str, &'a [(&'a str, &'a str)]);

fn split_a1(a1: &str) -> (u32, u32) {
    let letters: String = a1.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row: u32 = a1[letters.len()..].parse().unwrap();
    let col = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c as u32 - 'A' as u32 + 1));
    (row, col)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn sheet_xml(cells: &[(&str, &str)]) -> String {
    let mut rows: BTreeMap<u32, Vec<(u32, &str, &str)>> = BTreeMap::new();
    for (a1, value) in cells {
        let (row, col) = split_a1(a1);
        rows.entry(row).or_default().push((col, a1, value));
    }

    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row, mut row_cells) in rows {
        row_cells.sort_by_key(|(col, _, _)| *col);
        xml.push_str(&format!(r#"<row r="{}">"#, row));
        for (_, a1, value) in row_cells {
            if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, a1, value));
            } else {
                xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    a1,
                    escape(value)
                ));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

// Minimal XLSX with inline string and numeric cells
fn create_mock_xlsx(path: &Path, sheets: &[SheetSpec]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name,
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets></workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    for (i, (_, cells)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet_xml(cells).as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

const MARIA_1S: &[(&str, &str)] = &[
    ("E3", "DOCENTE"),
    ("E4", "Lic. María López"),
    ("A5", "1ER PERIODO"),
    ("O6", "90"),
    ("P6", "85,5%"),
    ("D7", "3"),
    ("E7", "Fracciones"),
    ("O7", "6/3/25"),
    ("R7", "10/3/25"),
    ("G9", "2DO PERIODO"),
    ("O10", "40%"),
];

const OTHER_TEACHER: &[(&str, &str)] = &[
    ("E3", "DOCENTE"),
    ("E4", "Pedro Gómez"),
    ("A5", "1ER PERIODO"),
    ("O6", "10%"),
];

const NO_MARKER: &[(&str, &str)] = &[("E3", "NOTAS"), ("E4", "María López")];

fn write_fixture(dir: &Path) -> anyhow::Result<()> {
    create_mock_xlsx(
        &dir.join("KEY1.xlsx"),
        &[("1S", MARIA_1S), ("2S", OTHER_TEACHER), ("3S", NO_MARKER)],
    )?;
    fs::write(dir.join("KEY1.title"), "María López_Matemáticas 2025\n")?;
    Ok(())
}

#[test]
fn test_local_client_title_and_sheets() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;
    create_mock_xlsx(&dir.path().join("KEY2.xlsx"), &[("Hoja1", &[])])?;

    let client = LocalWorkbookClient::new(dir.path());
    let spreadsheet = client.open("KEY1")?;
    assert_eq!(spreadsheet.title(), "María López_Matemáticas 2025");
    let titles: Vec<_> = spreadsheet
        .worksheets()?
        .iter()
        .map(|w| w.title().to_string())
        .collect();
    assert_eq!(titles, vec!["1S", "2S", "3S"]);

    // No side file: the file stem is the title
    assert_eq!(client.open("KEY2")?.title(), "KEY2");
    assert!(client.open("KEY404").is_err());
    Ok(())
}

#[test]
fn test_validate_and_extract_from_xlsx() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;
    let client = LocalWorkbookClient::new(dir.path());

    let valid = find_valid_worksheets(
        &client,
        "https://docs.google.com/spreadsheets/d/KEY1/edit#gid=0",
        "María López",
        &ValidationOptions::default(),
    )?;
    assert_eq!(valid, vec!["1S".to_string()]);

    let spreadsheet = client.open("KEY1")?;
    let data = GridExtractor::default().extract(spreadsheet.worksheet("1S")?);

    let progress: Vec<_> = data
        .period_progress
        .iter()
        .map(|r| (r.periodo, r.paralelo, r.progress_percentage))
        .collect();
    assert_eq!(
        progress,
        vec![
            (1, Paralelo::A, 90.0),
            (1, Paralelo::B, 85.5),
            (2, Paralelo::A, 40.0),
        ]
    );

    assert_eq!(data.topic_completion.len(), 2);
    let first = &data.topic_completion[0];
    assert_eq!(first.grade_level, "1S");
    assert_eq!(first.tema_number, "3");
    assert_eq!(first.tema_title, "Fracciones");
    assert_eq!(first.paralelo, Paralelo::A);
    assert_eq!(first.completion_date, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
    assert_eq!(data.topic_completion[1].paralelo, Paralelo::D);
    Ok(())
}

#[test]
fn test_update_run_from_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_fixture(dir.path())?;

    let toml = format!(
        r#"
[source]
directory = "{}"

[catalog]
academic_year = "2025-2026"
grade_levels = ["1S", "2S", "3S"]

[[teachers]]
full_name = "María López"
google_sheet_url = "https://docs.google.com/spreadsheets/d/KEY1/edit"

[[teachers]]
full_name = "Sin Hoja"
google_sheet_url = "https://docs.google.com/spreadsheets/d/MISSING/edit"
"#,
        dir.path().display()
    );
    let config_path = dir.path().join("sheettrack.toml");
    fs::write(&config_path, toml)?;

    let config = TrackerConfig::load(&config_path)?;
    let client = LocalWorkbookClient::new(&config.source.directory);
    let orchestrator = UpdateOrchestrator::from_config(&config, &client)?;
    let mut store = MemoryStore::new(config.catalog.clone());

    let report = orchestrator.run(&config.teachers, &mut store)?;
    assert_eq!(report.teachers.len(), 2);
    assert_eq!(report.failed_teachers(), 1);
    assert_eq!(report.counts().total(), 5);
    assert_eq!(store.period_progress().count(), 3);
    assert_eq!(store.topic_completion().count(), 2);

    let json: serde_json::Value = serde_json::from_str(&store.to_json()?)?;
    assert_eq!(json["period_progress"][0]["teacher"], "María López");
    Ok(())
}
