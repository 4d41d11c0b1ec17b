//! Integration tests for the HTTP API server and its typed client.
//!
//! The enabled tests bind an ephemeral port, run the router on a
//! background runtime thread, and drive it through `ApiClient` and
//! `TaskListSession` the way a remote frontend would: optimistic
//! mutations staged locally, confirmed or reverted by the server's
//! response.

#[cfg(feature = "server")]
mod server_enabled {
    use std::net::TcpListener;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use assert_cmd::Command;
    use chrono::{Duration as ChronoDuration, Local, Utc};
    use serial_test::serial;
    use tokio::sync::Mutex;

    use cairn::Error;
    use cairn::client::ApiClient;
    use cairn::models::{
        NewCategory, NewTask, ReasonCode, RenegotiationAction, TaskStatus,
    };
    use cairn::renegotiate::RenegotiationRequest;
    use cairn::server::{AppState, router};
    use cairn::session::TaskListSession;
    use cairn::store::Store;

    /// Serve the API for a fresh store on an ephemeral port and return the
    /// base URL once the health endpoint answers.
    fn spawn_server(data_dir: &Path) -> String {
        Store::init(data_dir).unwrap();
        let store = Store::open(data_dir).unwrap();
        let state = AppState {
            store: Arc::new(Mutex::new(store)),
        };

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router(state)).await.unwrap();
            });
        });

        let base = format!("http://{}", addr);
        for _ in 0..100 {
            if ureq::get(&format!("{}/api/health", base)).call().is_ok() {
                return base;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("server never became healthy at {}", base);
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    #[serial]
    fn test_health_reports_build_info() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());

        let body: serde_json::Value = ureq::get(&format!("{}/api/health", base))
            .call()
            .unwrap()
            .into_json()
            .unwrap();
        assert_eq!(body["ok"], serde_json::json!(true));
        assert!(body["version"].is_string());
    }

    #[test]
    #[serial]
    fn test_create_and_fetch_tasks() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);

        let task = client.create_task(&new_task("Pack for the trip")).unwrap();
        assert!(task.id.starts_with("cn-"));

        let session = TaskListSession::from_remote(&client).unwrap();
        assert_eq!(session.tasks().len(), 1);
        assert_eq!(session.tasks()[0].title, "Pack for the trip");
    }

    #[test]
    #[serial]
    fn test_session_toggle_done_confirms_against_server() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);
        let task = client.create_task(&new_task("Water the plants")).unwrap();

        let mut session = TaskListSession::from_remote(&client).unwrap();
        session.toggle_done(&client, &task.id, Utc::now()).unwrap();

        assert!(!session.has_pending());
        assert_eq!(session.task(&task.id).unwrap().status, TaskStatus::Done);

        // A fresh fetch agrees with the optimistic state
        session.refresh(&client).unwrap();
        assert_eq!(session.task(&task.id).unwrap().status, TaskStatus::Done);
    }

    #[test]
    #[serial]
    fn test_session_reorder_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);
        let a = client.create_task(&new_task("Alpha")).unwrap();
        let b = client.create_task(&new_task("Bravo")).unwrap();
        let c = client.create_task(&new_task("Charlie")).unwrap();

        let mut session = TaskListSession::from_remote(&client).unwrap();
        session
            .reorder(&client, &[c.id.clone(), a.id.clone(), b.id.clone()])
            .unwrap();

        session.refresh(&client).unwrap();
        let titles: Vec<&str> = session.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Charlie", "Alpha", "Bravo"]);
    }

    #[test]
    #[serial]
    fn test_unreachable_remote_reverts_optimistic_state() {
        // A port we just released, so nothing is listening on it
        let dead_port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let dead = ApiClient::new(format!("http://127.0.0.1:{}", dead_port));

        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);
        let task = client.create_task(&new_task("Fragile")).unwrap();

        let mut session = TaskListSession::from_remote(&client).unwrap();
        let err = session.toggle_done(&dead, &task.id, Utc::now()).unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.task(&task.id).unwrap().status, TaskStatus::Active);
        assert!(session.mutations().iter().all(|m| m.state.is_reverted()));
    }

    #[test]
    #[serial]
    fn test_conflict_surfaces_dependents() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);

        let category = client
            .create_category(&NewCategory {
                name: "Busy".to_string(),
                ..Default::default()
            })
            .unwrap();
        let task = client
            .create_task(&NewTask {
                title: "In flight".to_string(),
                category_id: Some(category.id.clone()),
                ..Default::default()
            })
            .unwrap();

        let err = client.delete_category(&category.id).unwrap_err();
        match err {
            Error::Conflict { dependents, .. } => assert_eq!(dependents, vec![task.id]),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_renegotiation_over_api() {
        let temp = tempfile::tempdir().unwrap();
        let base = spawn_server(temp.path());
        let client = ApiClient::new(base);

        let today = Local::now().date_naive();
        let task = client
            .create_task(&NewTask {
                title: "Call the bank".to_string(),
                due_date: Some(today - ChronoDuration::days(4)),
                ..Default::default()
            })
            .unwrap();

        let new_due = today + ChronoDuration::days(1);
        let outcome = client
            .submit_renegotiation(&RenegotiationRequest {
                task_id: task.id.clone(),
                action: RenegotiationAction::Reschedule,
                reason_code: ReasonCode::WrongTime,
                reason_text: None,
                new_due_date: Some(new_due),
                subtasks: None,
            })
            .unwrap();

        assert!(outcome.record.id.starts_with("cnr-"));
        assert_eq!(outcome.task.due_date, Some(new_due));

        let session = TaskListSession::from_remote(&client).unwrap();
        assert_eq!(session.task(&task.id).unwrap().due_date, Some(new_due));
    }

    #[test]
    fn test_serve_help() {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cairn"));
        cmd.args(["serve", "--help"]);
        cmd.assert()
            .success()
            .stdout(predicates::str::contains("Start the HTTP API server"));
    }

    #[test]
    fn test_serve_requires_init() {
        let temp = tempfile::tempdir().unwrap();
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cairn"));
        cmd.env("CAIRN_DATA_DIR", temp.path());
        cmd.arg("serve");
        cmd.assert()
            .failure()
            .stderr(predicates::str::contains("Not initialized"));
    }
}

#[cfg(not(feature = "server"))]
mod server_disabled {
    use assert_cmd::Command;

    #[test]
    fn test_serve_command_not_available() {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cairn"));
        cmd.args(["serve", "--help"]);
        // Without the server feature the subcommand does not exist
        cmd.assert().failure();
    }
}
