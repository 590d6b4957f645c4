use super::{defrost_execute_result, record_status, RecordStatus};
use crate::freeze::hash::content_hash;
use crate::freeze::{freeze_execute_result, ComputationResult, Includes};
use crate::temp::TempFiles;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

struct Doc {
    _dir: tempfile::TempDir,
    root: PathBuf,
    input: PathBuf,
}

fn doc_with(contents: &str) -> Doc {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().canonicalize().expect("canonical root");
    let input = root.join("doc.md");
    fs::write(&input, contents).expect("write input");
    Doc {
        _dir: dir,
        root,
        input,
    }
}

fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write file");
    path.to_path_buf()
}

fn html() -> &'static Path {
    Path::new("doc.html")
}

#[test]
fn frozen_record_matches_concrete_layout() {
    let doc = doc_with("A");
    let header = write_file(&doc.root.join("tmp").join("x.html"), "<meta>");
    let result = ComputationResult {
        supporting: vec![PathBuf::from("fig.png")],
        includes: Some(Includes {
            in_header: Some(vec![header.display().to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    };

    let record_path = freeze_execute_result(&doc.input, html(), &result).unwrap();
    assert_eq!(
        record_path,
        doc.root.join("doc_files/execute-results/html.json")
    );

    let record: Value = serde_json::from_str(&fs::read_to_string(&record_path).unwrap()).unwrap();
    assert_eq!(record["hash"], Value::from(content_hash(b"A")));
    assert_eq!(record["result"]["supporting"][0], "fig.png");
    assert_eq!(
        record["result"]["includes"]["include-in-header"][0],
        "<meta>"
    );

    fs::write(&doc.input, "B").unwrap();
    let temp = TempFiles::new().unwrap();
    assert!(defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .is_none());

    let forced = defrost_execute_result(&doc.input, html(), true, &temp)
        .unwrap()
        .expect("forced defrost");
    let header_files = forced.includes.unwrap().in_header.unwrap();
    assert_eq!(header_files.len(), 1);
    assert_ne!(header_files[0], header.display().to_string());
    assert!(Path::new(&header_files[0]).starts_with(temp.dir()));
    assert_eq!(fs::read_to_string(&header_files[0]).unwrap(), "<meta>");
}

#[test]
fn round_trip_restores_supporting_paths_and_include_content() {
    let doc = doc_with("print(1)");
    let inside = doc.root.join("doc_files").join("figure-html").join("plot.png");
    let outside = PathBuf::from("/opt/shared/logo.png");
    let before = write_file(&doc.root.join("before.html"), "<div>\u{e9}</div>\n");
    let after = write_file(&doc.root.join("after.html"), "<script>x()</script>");
    let mut extra = serde_json::Map::new();
    extra.insert("markdown".to_string(), Value::from("# Output"));
    let result = ComputationResult {
        supporting: vec![inside.clone(), outside.clone(), PathBuf::from("data.csv")],
        includes: Some(Includes {
            before_body: Some(vec![before.display().to_string()]),
            after_body: Some(vec![after.display().to_string()]),
            ..Default::default()
        }),
        extra,
    };

    let record_path = freeze_execute_result(&doc.input, html(), &result).unwrap();
    let record: Value = serde_json::from_str(&fs::read_to_string(&record_path).unwrap()).unwrap();
    assert_eq!(
        record["result"]["supporting"],
        serde_json::json!(["doc_files/figure-html/plot.png", "/opt/shared/logo.png", "data.csv"])
    );

    let temp = TempFiles::new().unwrap();
    let restored = defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .expect("fresh record");
    assert_eq!(
        restored.supporting,
        vec![inside, outside, doc.root.join("data.csv")]
    );
    assert_eq!(restored.extra["markdown"], "# Output");

    let includes = restored.includes.unwrap();
    assert!(includes.in_header.is_none());
    let before_files = includes.before_body.unwrap();
    let after_files = includes.after_body.unwrap();
    assert_eq!(
        fs::read_to_string(&before_files[0]).unwrap(),
        "<div>\u{e9}</div>\n"
    );
    assert_eq!(
        fs::read_to_string(&after_files[0]).unwrap(),
        "<script>x()</script>"
    );
}

#[test]
fn missing_record_is_a_miss() {
    let doc = doc_with("A");
    let temp = TempFiles::new().unwrap();
    assert!(defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .is_none());
    assert_eq!(
        record_status(&doc.input, html()).unwrap(),
        RecordStatus::Missing
    );
}

#[test]
fn corrupt_record_is_a_miss_and_is_overwritten_by_next_freeze() {
    let doc = doc_with("A");
    let record_path = write_file(
        &doc.root.join("doc_files/execute-results/html.json"),
        "{\"hash\": \"trunc",
    );
    let temp = TempFiles::new().unwrap();
    assert!(defrost_execute_result(&doc.input, html(), true, &temp)
        .unwrap()
        .is_none());
    assert_eq!(
        record_status(&doc.input, html()).unwrap().label(),
        "corrupt"
    );

    freeze_execute_result(&doc.input, html(), &ComputationResult::default()).unwrap();
    assert!(serde_json::from_str::<Value>(&fs::read_to_string(&record_path).unwrap()).is_ok());
    assert!(defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .is_some());
}

#[test]
fn status_tracks_input_changes() {
    let doc = doc_with("A");
    freeze_execute_result(&doc.input, html(), &ComputationResult::default()).unwrap();
    assert_eq!(
        record_status(&doc.input, html()).unwrap(),
        RecordStatus::Fresh {
            hash: content_hash(b"A")
        }
    );

    fs::write(&doc.input, "B").unwrap();
    assert_eq!(
        record_status(&doc.input, html()).unwrap(),
        RecordStatus::Stale {
            stored: content_hash(b"A"),
            current: content_hash(b"B"),
        }
    );
}

#[test]
fn output_formats_have_independent_records() {
    let doc = doc_with("A");
    let html_result = ComputationResult {
        supporting: vec![PathBuf::from("html.png")],
        ..Default::default()
    };
    freeze_execute_result(&doc.input, html(), &html_result).unwrap();

    let temp = TempFiles::new().unwrap();
    assert!(
        defrost_execute_result(&doc.input, Path::new("doc.pdf"), false, &temp)
            .unwrap()
            .is_none()
    );
    let restored = defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .unwrap();
    assert_eq!(restored.supporting, vec![doc.root.join("html.png")]);
}

#[test]
fn relocated_project_still_defrosts() {
    let doc = doc_with("A");
    let figure = doc.root.join("doc_files").join("fig.png");
    freeze_execute_result(
        &doc.input,
        html(),
        &ComputationResult {
            supporting: vec![figure],
            ..Default::default()
        },
    )
    .unwrap();

    let moved = doc.root.join("moved");
    fs::create_dir_all(&moved).unwrap();
    fs::rename(doc.root.join("doc.md"), moved.join("doc.md")).unwrap();
    fs::rename(doc.root.join("doc_files"), moved.join("doc_files")).unwrap();

    let temp = TempFiles::new().unwrap();
    let restored = defrost_execute_result(&moved.join("doc.md"), html(), false, &temp)
        .unwrap()
        .expect("relocated record");
    assert_eq!(
        restored.supporting,
        vec![moved.join("doc_files").join("fig.png")]
    );
}

#[test]
fn failed_write_keeps_previous_record() {
    let doc = doc_with("A");
    let first = ComputationResult {
        supporting: vec![PathBuf::from("fig.png")],
        ..Default::default()
    };
    let record_path = freeze_execute_result(&doc.input, html(), &first).unwrap();
    let before = fs::read_to_string(&record_path).unwrap();

    fs::create_dir_all(record_path.with_file_name(".html.json.tmp")).unwrap();
    assert!(freeze_execute_result(&doc.input, html(), &ComputationResult::default()).is_err());
    assert_eq!(fs::read_to_string(&record_path).unwrap(), before);

    let temp = TempFiles::new().unwrap();
    let restored = defrost_execute_result(&doc.input, html(), false, &temp)
        .unwrap()
        .expect("previous record");
    assert_eq!(restored.supporting, vec![doc.root.join("fig.png")]);
}
