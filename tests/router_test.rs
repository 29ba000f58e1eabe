mod common;

use common::{mock_config, session, session_with_launcher, RecordingLauncher, RecordingStatus};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use webhook_console::{ActionRouter, ConsoleError};

#[tokio::test]
async fn test_unknown_action_lists_names() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config = mock_config("http://localhost:9", &temp_dir.path().to_string_lossy());
    let mut session = session(config, Arc::new(RecordingStatus::default()));
    let router = ActionRouter::new();

    let err = router.dispatch(&mut session, "frobnicate now").await.unwrap_err();
    match err {
        ConsoleError::UnknownActionError { name, available } => {
            assert_eq!(name, "frobnicate");
            assert!(available.contains("submit"));
            assert!(available.contains("create-agent"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(router.dispatch(&mut session, "   ").await?, None);
    let help = router.dispatch(&mut session, "help").await?.unwrap();
    assert!(help.contains("edit"));
    Ok(())
}

#[tokio::test]
async fn test_presenting_before_submit_is_an_input_error() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config = mock_config("http://localhost:9", &temp_dir.path().to_string_lossy());
    let mut session = session(config, Arc::new(RecordingStatus::default()));
    let router = ActionRouter::new();

    for action in ["preview", "download", "copy", "open", "results"] {
        let err = router.dispatch(&mut session, action).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ValidationError { .. }), "{}", action);
    }
    Ok(())
}

#[tokio::test]
async fn test_submit_then_download() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_successful_submission(&server);

    let downloads = TempDir::new()?;
    let inputs = TempDir::new()?;
    let input_file = inputs.path().join("meter.csv");
    std::fs::write(&input_file, "kwh\n300\n")?;

    let config = mock_config(&server.base_url(), &downloads.path().to_string_lossy());
    let mut session = session(config, Arc::new(RecordingStatus::default()));
    session.temp_dir = inputs.path().join("opened");
    let router = ActionRouter::new();

    let line = format!(
        "submit -f \"{}\" -c energy=electricity",
        input_file.to_string_lossy()
    );
    let summary = router.dispatch(&mut session, &line).await?.unwrap();
    assert!(summary.contains("📄 meter.csv"));
    assert!(summary.contains("✅ Extraction Successful"));

    let preview = router.dispatch(&mut session, "preview").await?.unwrap();
    assert_eq!(preview, "<!DOCTYPE html><html><body>Totals</body></html>");

    let output = router.dispatch(&mut session, "download").await?.unwrap();
    assert!(output.starts_with("HTML file downloaded: "));
    let saved: Vec<_> = std::fs::read_dir(downloads.path())?.collect::<Result<_, _>>()?;
    assert_eq!(saved.len(), 1);

    router.dispatch(&mut session, "copy").await?;
    Ok(())
}

fn mock_successful_submission(server: &MockServer) {
    for i in 1..=5 {
        server.mock(|when, then| {
            when.method(POST).path(format!("/webhook/hook{}", i));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"ok": true}));
        });
    }
    server.mock(|when, then| {
        when.method(POST).path("/webhook/extraction");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"html": "<!DOCTYPE html><html><body>Totals</body></html>"}));
    });
}

#[tokio::test]
async fn test_submit_opens_result_automatically() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_successful_submission(&server);

    let inputs = TempDir::new()?;
    let input_file = inputs.path().join("meter.csv");
    std::fs::write(&input_file, "kwh\n300\n")?;
    let line = format!("submit -f \"{}\"", input_file.to_string_lossy());

    let launcher = RecordingLauncher::default();
    let config = mock_config(&server.base_url(), &inputs.path().to_string_lossy());
    let mut session = session_with_launcher(
        config.clone(),
        Arc::new(RecordingStatus::default()),
        Box::new(launcher.clone()),
    );
    let opened_dir = TempDir::new()?;
    session.temp_dir = opened_dir.path().to_path_buf();
    let router = ActionRouter::new();

    let output = router.dispatch(&mut session, &line).await?.unwrap();
    assert!(output.contains("HTML report opened: "));
    let opened = launcher.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&opened[0])?,
        "<!DOCTYPE html><html><body>Totals</body></html>"
    );

    // 瀏覽器被擋時改附上預覽
    let blocked = RecordingLauncher {
        blocked: true,
        ..Default::default()
    };
    let mut session = session_with_launcher(
        config.clone(),
        Arc::new(RecordingStatus::default()),
        Box::new(blocked),
    );
    session.temp_dir = opened_dir.path().to_path_buf();
    let output = router.dispatch(&mut session, &line).await?.unwrap();
    assert!(output.ends_with("HTML preview:\n<!DOCTYPE html><html><body>Totals</body></html>"));

    let mut quiet = config;
    quiet.output.auto_open = false;
    let mut session = session_with_launcher(
        quiet,
        Arc::new(RecordingStatus::default()),
        Box::new(launcher.clone()),
    );
    let output = router.dispatch(&mut session, &line).await?.unwrap();
    assert!(!output.contains("HTML report opened"));
    assert_eq!(launcher.opened.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_load_page_filter_and_edit() -> anyhow::Result<()> {
    let server = MockServer::start();
    let records: Vec<_> = (1..=30)
        .map(|i| json!({"id": i, "site": format!("Site {}", i), "consumption": i * 10}))
        .collect();
    server.mock(|when, then| {
        when.method(GET).path("/webhook/data-verification");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!(records));
    });
    let update = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook/data-verification-update")
            .json_body_partial(r#"{"id": "12", "column": "consumption", "newValue": 125}"#);
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true}));
    });

    let temp_dir = TempDir::new()?;
    let config = mock_config(&server.base_url(), &temp_dir.path().to_string_lossy());
    let mut session = session(config, Arc::new(RecordingStatus::default()));
    let router = ActionRouter::new();

    let page = router.dispatch(&mut session, "load").await?.unwrap();
    assert!(page.starts_with("Showing 1-25 of 30 records"));
    assert!(page.ends_with("Page 1 / 2"));

    let page = router.dispatch(&mut session, "page next").await?.unwrap();
    assert!(page.starts_with("Showing 26-30 of 30 records"));

    let page = router.dispatch(&mut session, "filter Site 12").await?.unwrap();
    assert!(page.starts_with("Showing 1-1 of 1 records"));

    let err = router
        .dispatch(&mut session, "edit 12:consumption -1")
        .await
        .unwrap_err();
    assert_eq!(err.user_friendly_message(), "Must be ≥ 0");
    update.assert_hits(0);

    let saved = router
        .dispatch(&mut session, "edit 12:consumption 125")
        .await?
        .unwrap();
    assert_eq!(saved, "12:consumption saved as 125");
    update.assert_hits(1);

    let table = session.table.as_ref().unwrap();
    assert_eq!(table.filtered()[0].display("consumption"), "125");
    assert_eq!(table.find("12").unwrap().display("consumption"), "125");
    Ok(())
}

#[tokio::test]
async fn test_agent_selection_requires_known_slug() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/py-agents");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"ok": true, "agents": [{"slug": "fleet", "name": "Fleet"}]}));
    });

    let temp_dir = TempDir::new()?;
    let config = mock_config(&server.base_url(), &temp_dir.path().to_string_lossy());
    let mut session = session(config, Arc::new(RecordingStatus::default()));
    let router = ActionRouter::new();

    assert!(router.dispatch(&mut session, "select fleet").await.is_err());

    let listing = router.dispatch(&mut session, "agents").await?.unwrap();
    assert_eq!(listing, "[ ] Fleet (/py-agents/fleet)");

    router.dispatch(&mut session, "select fleet").await?;
    router
        .dispatch(&mut session, "context fleet 'company cars only'")
        .await?;
    assert_eq!(session.selected().len(), 1);
    assert_eq!(
        session.agent_contexts.get("fleet").map(String::as_str),
        Some("company cars only")
    );

    let listing = router.dispatch(&mut session, "agents").await?.unwrap();
    assert_eq!(listing, "[x] Fleet (/py-agents/fleet)");
    Ok(())
}
