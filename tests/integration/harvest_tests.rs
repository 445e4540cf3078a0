//! Integration tests for full harvest runs
//!
//! These tests use wiremock to serve target pages and files, and run the orchestrator
//! end-to-end against a temporary download tree and history file.

use chrono::NaiveDate;
use harvester::config::{parse_config, Config};
use harvester::crawler::{Fetcher, Orchestrator, RunOptions};
use harvester::history::HistoryStore;
use harvester::output::RunSummary;
use harvester::state::CandidateOutcome;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

/// Creates a test configuration rooted in `dir`
fn create_test_config(dir: &TempDir, targets: Vec<String>, rule: &str) -> Config {
    let json = serde_json::json!({
        "target_urls": targets,
        "organization_rule": rule,
        "allowed_extensions": [".pdf", ".zip"],
        "request_delay_seconds": 0,
    });
    let mut config = parse_config(&json.to_string()).unwrap();
    config.download_base_folder = dir.path().join("downloads");
    config.download_history_file = dir.path().join("history.json");
    config
}

fn orchestrator(config: &Config, options: RunOptions) -> Orchestrator {
    let history = HistoryStore::load(&config.download_history_file).unwrap();
    let fetcher = Fetcher::with_client(reqwest::Client::new(), Duration::ZERO);
    Orchestrator::with_fetcher(config.clone(), history, fetcher, options).with_today(today())
}

async fn run_once(config: &Config, options: RunOptions) -> RunSummary {
    orchestrator(config, options).run().await.unwrap()
}

fn html_page(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>Files</title></head><body>{}</body></html>",
            anchors
        ))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(links))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file_path: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

/// Every file under `root`, relative path -> contents
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[tokio::test]
async fn test_new_and_known_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/reports", &["/files/new.pdf", "/files/old.pdf"]).await;
    mount_file(&server, "/files/new.pdf", "new report", 1).await;
    mount_file(&server, "/files/old.pdf", "old report", 0).await;

    let config = create_test_config(&dir, vec![format!("{}/reports", base)], "flat");
    let mut history = HistoryStore::empty(&config.download_history_file);
    history.record(&format!("{}/files/old.pdf", base)).unwrap();

    let summary = run_once(&config, RunOptions::default()).await;

    assert_eq!(summary.pages_scanned, 1);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);

    let history = HistoryStore::load(&config.download_history_file).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.contains(&format!("{}/files/new.pdf", base)));

    let placed = config.download_base_folder.join("new.pdf");
    assert_eq!(std::fs::read_to_string(placed).unwrap(), "new report");
    assert!(!config.download_base_folder.join("old.pdf").exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/a.pdf", "/b.zip"]).await;
    mount_file(&server, "/a.pdf", "aaa", 1).await;
    mount_file(&server, "/b.zip", "bbb", 1).await;

    let config = create_test_config(&dir, vec![format!("{}/", base)], "type_then_date");

    let first = run_once(&config, RunOptions::default()).await;
    assert_eq!(first.succeeded, 2);

    let tree_after_first = snapshot(dir.path());
    let history_after_first = std::fs::read(&config.download_history_file).unwrap();

    let second = run_once(&config, RunOptions::default()).await;
    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(snapshot(dir.path()), tree_after_first);
    assert_eq!(
        std::fs::read(&config.download_history_file).unwrap(),
        history_after_first
    );
}

#[tokio::test]
async fn test_type_then_date_placement() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/docs/report.pdf", "/dl/bundle.ZIP"]).await;
    mount_file(&server, "/docs/report.pdf", "pdf", 1).await;
    mount_file(&server, "/dl/bundle.ZIP", "zip", 1).await;

    let config = create_test_config(&dir, vec![server.uri()], "type_then_date");
    let summary = run_once(&config, RunOptions::default()).await;
    assert_eq!(summary.succeeded, 2);

    let base = &config.download_base_folder;
    assert!(base.join("Pdf").join("2024-05-01").join("report.pdf").is_file());
    assert!(base.join("Zip").join("2024-05-01").join("bundle.ZIP").is_file());
}

#[tokio::test]
async fn test_date_rule_placement() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/report.pdf"]).await;
    mount_file(&server, "/report.pdf", "pdf", 1).await;

    let config = create_test_config(&dir, vec![server.uri()], "date");
    run_once(&config, RunOptions::default()).await;

    assert!(config
        .download_base_folder
        .join("2024-05-01")
        .join("report.pdf")
        .is_file());
}

#[tokio::test]
async fn test_disallowed_extension_never_fetched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/setup.exe", "/about", "/manual.pdf"]).await;
    mount_file(&server, "/setup.exe", "MZ", 0).await;
    mount_file(&server, "/about", "about", 0).await;
    mount_file(&server, "/manual.pdf", "manual", 1).await;

    let config = create_test_config(&dir, vec![server.uri()], "flat");
    let summary = run_once(&config, RunOptions::default()).await;

    assert_eq!(summary.links_found, 3);
    assert_eq!(summary.filtered, 2);
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn test_name_collision_is_disambiguated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/incoming/report.pdf"]).await;
    mount_file(&server, "/incoming/report.pdf", "fresh content", 1).await;

    let config = create_test_config(&dir, vec![server.uri()], "flat");
    std::fs::create_dir_all(&config.download_base_folder).unwrap();
    let existing = config.download_base_folder.join("report.pdf");
    std::fs::write(&existing, "unrelated content").unwrap();

    let summary = run_once(&config, RunOptions::default()).await;
    assert_eq!(summary.succeeded, 1);

    assert_eq!(
        std::fs::read_to_string(&existing).unwrap(),
        "unrelated content"
    );
    assert_eq!(
        std::fs::read_to_string(config.download_base_folder.join("report(1).pdf")).unwrap(),
        "fresh content"
    );
}

#[tokio::test]
async fn test_force_download_refetches_and_replaces() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/report.pdf"]).await;
    mount_file(&server, "/report.pdf", "version 2", 1).await;

    let config = create_test_config(&dir, vec![base.clone()], "flat");
    std::fs::create_dir_all(&config.download_base_folder).unwrap();
    let earlier_copy = config.download_base_folder.join("report.pdf");
    std::fs::write(&earlier_copy, "version 1").unwrap();

    let mut history = HistoryStore::empty(&config.download_history_file);
    history
        .record_at(&format!("{}/report.pdf", base), Path::new("report.pdf"))
        .unwrap();

    let summary = run_once(
        &config,
        RunOptions {
            force_download: true,
        },
    )
    .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(std::fs::read_to_string(&earlier_copy).unwrap(), "version 2");
    assert!(!config.download_base_folder.join("report(1).pdf").exists());

    let history = HistoryStore::load(&config.download_history_file).unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_force_download_keeps_files_of_other_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/a/report.pdf", "/b/report.pdf"]).await;
    mount_file(&server, "/a/report.pdf", "from A", 2).await;
    mount_file(&server, "/b/report.pdf", "from B", 2).await;

    let config = create_test_config(&dir, vec![format!("{}/", base)], "flat");

    run_once(&config, RunOptions::default()).await;
    let after_first = snapshot(&config.download_base_folder);
    assert_eq!(after_first.len(), 2);
    assert_eq!(after_first[Path::new("report.pdf")], b"from A");
    assert_eq!(after_first[Path::new("report(1).pdf")], b"from B");

    let summary = run_once(
        &config,
        RunOptions {
            force_download: true,
        },
    )
    .await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(snapshot(&config.download_base_folder), after_first);

    let history = HistoryStore::load(&config.download_history_file).unwrap();
    assert_eq!(
        history.location_of(&format!("{}/b/report.pdf", base)),
        Some(Path::new("report(1).pdf"))
    );
}

#[tokio::test]
async fn test_force_download_without_known_location_never_overwrites() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/report.pdf"]).await;
    mount_file(&server, "/report.pdf", "version 2", 1).await;

    let config = create_test_config(&dir, vec![base.clone()], "flat");
    std::fs::create_dir_all(&config.download_base_folder).unwrap();
    let existing = config.download_base_folder.join("report.pdf");
    std::fs::write(&existing, "version 1").unwrap();

    // History written by an older version: identifiers only
    std::fs::write(
        &config.download_history_file,
        format!(r#"["{}/report.pdf"]"#, base),
    )
    .unwrap();

    let summary = run_once(
        &config,
        RunOptions {
            force_download: true,
        },
    )
    .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "version 1");
    assert_eq!(
        std::fs::read_to_string(config.download_base_folder.join("report(1).pdf")).unwrap(),
        "version 2"
    );
}

#[tokio::test]
async fn test_force_download_fetches_each_link_once_per_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/one", &["/shared.pdf"]).await;
    mount_page(&server, "/two", &["/shared.pdf"]).await;
    mount_file(&server, "/shared.pdf", "shared", 1).await;

    let config = create_test_config(
        &dir,
        vec![format!("{}/one", base), format!("{}/two", base)],
        "flat",
    );
    let summary = run_once(
        &config,
        RunOptions {
            force_download: true,
        },
    )
    .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_failed_download_does_not_abort_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/broken.pdf", "/gone.zip", "/fine.pdf"]).await;
    Mock::given(method("GET"))
        .and(path("/broken.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_file(&server, "/fine.pdf", "fine", 1).await;

    let config = create_test_config(&dir, vec![format!("{}/", base)], "flat");
    let summary = run_once(&config, RunOptions::default()).await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures.get(&CandidateOutcome::HttpError), Some(&2));

    let history = HistoryStore::load(&config.download_history_file).unwrap();
    assert_eq!(history.sorted(), vec![format!("{}/fine.pdf", base)]);

    let placed: Vec<_> = snapshot(&config.download_base_folder).into_keys().collect();
    assert_eq!(placed, vec![PathBuf::from("fine.pdf")]);
}

#[tokio::test]
async fn test_unreachable_target_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/up", &["/ok.pdf"]).await;
    mount_file(&server, "/ok.pdf", "ok", 1).await;

    let config = create_test_config(
        &dir,
        vec![format!("{}/down", base), format!("{}/up", base)],
        "flat",
    );
    let summary = run_once(&config, RunOptions::default()).await;

    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_scanned, 1);
    assert_eq!(summary.succeeded, 1);
}

/// Serves one response that announces `declared_len` bytes but only sends `sent`
///
/// After the partial body is written the returned `Notify` fires; the connection is then
/// either held open (stalled) or closed.
async fn spawn_truncating_server(
    declared_len: usize,
    sent: &'static [u8],
    hold_open: bool,
) -> (String, Arc<Notify>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body_sent = Arc::new(Notify::new());
    let signal = body_sent.clone();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\n\r\n",
            declared_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(sent).await.unwrap();
        socket.flush().await.unwrap();
        signal.notify_one();

        if hold_open {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    (format!("http://{}", addr), body_sent)
}

fn part_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".part"))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_interrupted_download_leaves_no_trace() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let (file_base, body_sent) = spawn_truncating_server(100_000, b"%PDF-1.7 partial", true).await;
    let file_url = format!("{}/slow.pdf", file_base);
    mount_page(&server, "/", &[file_url.as_str()]).await;

    let config = create_test_config(&dir, vec![server.uri()], "flat");
    let mut orchestrator = orchestrator(&config, RunOptions::default());

    // Dropping the run future while the body is half received stands in for the
    // process being killed mid-download
    tokio::select! {
        _ = orchestrator.run() => panic!("run finished although the body never completed"),
        _ = async {
            body_sent.notified().await;
            tokio::time::sleep(Duration::from_millis(300)).await;
        } => {}
    }
    drop(orchestrator);

    // The download was under way: its temporary file exists
    assert_eq!(part_files(&config.download_base_folder).len(), 1);
    assert!(!config.download_base_folder.join("slow.pdf").exists());
    assert!(!config.download_history_file.exists());
}

#[tokio::test]
async fn test_truncated_body_is_a_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let (file_base, _) = spawn_truncating_server(100_000, b"%PDF-1.7 partial", false).await;
    let file_url = format!("{}/cut.pdf", file_base);
    mount_page(&server, "/", &[file_url.as_str()]).await;

    let config = create_test_config(&dir, vec![server.uri()], "flat");
    let summary = run_once(&config, RunOptions::default()).await;

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.get(&CandidateOutcome::NetworkError), Some(&1));

    assert!(!config.download_base_folder.join("cut.pdf").exists());
    assert!(part_files(&config.download_base_folder).is_empty());
    assert!(!config.download_history_file.exists());
}

#[tokio::test]
async fn test_traversal_names_stay_inside_base_folder() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", &["/files/..%2F..%2Fescape.pdf"]).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&server)
        .await;

    let config = create_test_config(&dir, vec![format!("{}/", server.uri())], "flat");
    let summary = run_once(&config, RunOptions::default()).await;
    assert_eq!(summary.succeeded, 1);

    assert!(config.download_base_folder.join("escape.pdf").is_file());
    assert!(!dir.path().join("escape.pdf").exists());
}
