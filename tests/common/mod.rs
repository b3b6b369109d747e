use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_zph") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "zph.exe" } else { "zph" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve zph binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("zph-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute zph command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_content = format!(
        "# case: {case_name}\n# args: {args:?}\n# status: {:?}\n\n## stdout\n{stdout}\n## stderr\n{stderr}\n",
        output.status
    );
    let _ = fs::write(&log_path, log_content);

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Install fake `zpool`/`zfs`/`zdb` shell tools into `dir`.
///
/// The fake pool tool keeps per-pool state under `state`: `create` makes the
/// requested mountpoint directory, `destroy` removes it, and the fake
/// filesystem tool's `mount` lists the live pools.
#[cfg(unix)]
pub fn install_fake_tools(dir: &Path, state: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(state).expect("create fake tool state dir");

    let zpool = format!(
        r#"#!/bin/sh
state="{state}"
cmd="$1"; shift
case "$cmd" in
  create)
    name=""; mp=""; expect_opt=0
    for a in "$@"; do
      if [ "$expect_opt" -eq 1 ]; then
        expect_opt=0
        case "$a" in mountpoint=*) mp="${{a#mountpoint=}}" ;; esac
        continue
      fi
      case "$a" in
        -f) ;;
        -o|-O) expect_opt=1 ;;
        /*) ;;
        *) [ -z "$name" ] && name="$a" ;;
      esac
    done
    [ -n "$mp" ] || exit 1
    mkdir -p "$mp" || exit 1
    printf '%s\n' "$mp" > "$state/pool.$name"
    ;;
  destroy|export)
    name=""
    for a in "$@"; do case "$a" in -*) ;; *) name="$a" ;; esac; done
    mp=$(cat "$state/pool.$name" 2>/dev/null) || exit 1
    rm -rf "$mp"
    rm -f "$state/pool.$name"
    ;;
  *) ;;
esac
exit 0
"#,
        state = state.display()
    );

    let zfs = format!(
        r#"#!/bin/sh
state="{state}"
case "$1" in
  mount)
    for f in "$state"/pool.*; do
      [ -e "$f" ] || continue
      name="${{f##*/pool.}}"
      printf '%-24s %s\n' "$name" "$(cat "$f")"
    done
    ;;
  *) ;;
esac
exit 0
"#,
        state = state.display()
    );

    for (tool, body) in [
        ("zpool", zpool.as_str()),
        ("zfs", zfs.as_str()),
        ("zdb", "#!/bin/sh\nexit 0\n"),
    ] {
        let path = dir.join(tool);
        fs::write(&path, body).expect("write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
    }
}
