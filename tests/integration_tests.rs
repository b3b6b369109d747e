//! Integration tests: CLI smoke tests and full scenario runs against fake
//! storage tools.

mod common;

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: zph [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains(env!("CARGO_PKG_VERSION")),
        "missing version; log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_generate_bash_script() {
    let result = common::run_cli_case("completions_generate_bash_script", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(
        result.stdout.contains("zph"),
        "completions must mention the binary; log: {}",
        result.log_path.display()
    );
}

#[test]
fn run_rejects_missing_work_dir() {
    let result = common::run_cli_case(
        "run_rejects_missing_work_dir",
        &["run", "--path", "/nonexistent/zph-work", "--no-pool", "t/00.t"],
    );
    assert_eq!(result.status.code(), Some(1), "user error exits 1");
    assert!(
        result.stderr.contains("not a valid directory"),
        "missing diagnostic; log: {}",
        result.log_path.display()
    );
}

#[cfg(unix)]
mod with_fake_tools {
    use super::common;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn fake_scenario(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn no_pool_run_writes_results_log() {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        common::install_fake_tools(tools.path(), &work.path().join("state"));

        let scenario = fake_scenario(
            work.path(),
            "three-subtests",
            "#!/bin/sh\necho 'ok 1 create'\necho 'ok 2 write'\necho 'ok 3 unlink'\nexit 0\n",
        );

        let work_dir = work.path().display().to_string();
        let tools_dir = tools.path().display().to_string();
        let result = common::run_cli_case(
            "no_pool_run_writes_results_log",
            &[
                "--quiet",
                "--tools",
                &tools_dir,
                "run",
                "--path",
                &work_dir,
                "--no-pool",
                &scenario,
            ],
        );
        assert!(
            result.status.success(),
            "expected success; log: {}",
            result.log_path.display()
        );

        let log = fs::read_to_string(work.path().join("winfs.log")).unwrap();
        assert!(
            log.ends_with("3/3\n"),
            "unexpected results log {log:?}; log: {}",
            result.log_path.display()
        );
    }

    #[test]
    fn failing_scenario_exits_partial() {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        common::install_fake_tools(tools.path(), &work.path().join("state"));

        let good = fake_scenario(
            work.path(),
            "good",
            "#!/bin/sh\necho 'ok 1'\nexit 0\n",
        );
        let bad = fake_scenario(
            work.path(),
            "bad",
            "#!/bin/sh\necho 'not ok 1 broke'\nexit 1\n",
        );

        let work_dir = work.path().display().to_string();
        let tools_dir = tools.path().display().to_string();
        let events = work.path().join("events.jsonl");
        let events_arg = events.display().to_string();
        let result = common::run_cli_case(
            "failing_scenario_exits_partial",
            &[
                "--quiet",
                "--tools",
                &tools_dir,
                "--json-log",
                &events_arg,
                "run",
                "--path",
                &work_dir,
                "--no-pool",
                "--log",
                "results.log",
                &good,
                &bad,
            ],
        );
        assert_eq!(result.status.code(), Some(4), "partial failure exits 4");

        let log = fs::read_to_string(work.path().join("results.log")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2, "one summary line per scenario: {log:?}");
        assert!(lines[0].ends_with("1/1"));
        assert!(lines[1].ends_with("0/1"));

        // The failing scenario's output is carried in its event record.
        let text = fs::read_to_string(&events).unwrap();
        let failing = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .find(|v| v["event"] == "scenario_end" && v["exit_code"] == 1)
            .expect("scenario_end event for the failing scenario");
        assert!(
            failing["details"]
                .as_str()
                .unwrap()
                .contains("not ok 1 broke"),
            "details must carry the scenario output: {failing}"
        );
    }

    #[test]
    fn provisioned_run_creates_and_destroys_pool() {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        common::install_fake_tools(tools.path(), &work.path().join("state"));

        // The scenario proves it saw a live mount by writing into it.
        let scenario = fake_scenario(
            work.path(),
            "touch-mount",
            "#!/bin/sh\n[ -d \"$1\" ] || { echo 'not ok 1 mount missing'; exit 1; }\ntouch \"$1/probe\"\necho 'ok 1 mount visible'\nexit 0\n",
        );

        let work_dir = work.path().display().to_string();
        let tools_dir = tools.path().display().to_string();
        let result = common::run_cli_case(
            "provisioned_run_creates_and_destroys_pool",
            &[
                "--quiet",
                "--tools",
                &tools_dir,
                "run",
                "--path",
                &work_dir,
                &scenario,
            ],
        );
        assert!(
            result.status.success(),
            "expected success; log: {}",
            result.log_path.display()
        );

        assert!(
            !work.path().join("test01.dat").exists(),
            "backing file must be released"
        );
        let mnt = work.path().join("mnt");
        let leftover: Vec<_> = fs::read_dir(&mnt).unwrap().collect();
        assert!(leftover.is_empty(), "no residual mount dirs: {leftover:?}");
    }

    #[test]
    fn jsonl_log_records_run_events() {
        let tools = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        common::install_fake_tools(tools.path(), &work.path().join("state"));

        let scenario = fake_scenario(work.path(), "noop", "#!/bin/sh\necho 'ok 1'\nexit 0\n");
        let events = work.path().join("events.jsonl");

        let work_dir = work.path().display().to_string();
        let tools_dir = tools.path().display().to_string();
        let events_arg = events.display().to_string();
        let result = common::run_cli_case(
            "jsonl_log_records_run_events",
            &[
                "--quiet",
                "--tools",
                &tools_dir,
                "--json-log",
                &events_arg,
                "run",
                "--path",
                &work_dir,
                "--no-pool",
                &scenario,
            ],
        );
        assert!(result.status.success());

        let text = fs::read_to_string(&events).unwrap();
        let mut kinds = Vec::new();
        for line in text.lines() {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            kinds.push(v["event"].as_str().unwrap().to_string());
        }
        assert_eq!(kinds.first().map(String::as_str), Some("run_start"));
        assert!(kinds.iter().any(|k| k == "scenario_end"));
        assert_eq!(kinds.last().map(String::as_str), Some("run_end"));
    }
}
