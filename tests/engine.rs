#![allow(clippy::unwrap_used)]

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

/// 在 `dir` 中以 `-c` 模式运行一行命令
fn arbor(dir: &Path, line: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arbor"))
        .arg("-c")
        .arg(line)
        .current_dir(dir)
        .env("HOME", dir)
        .env("ARBOR_LOG_DIR", dir.join(".logs"))
        .env("ARBOR_HISTORY", dir.join(".history"))
        .env_remove("FOO")
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn workspace() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn pipeline_of_cats_preserves_every_byte() {
    let dir = workspace();
    let content: String = (0..2000).map(|i| format!("line {}\n", i)).collect();
    fs::write(dir.path().join("input.txt"), &content).unwrap();

    let output = arbor(dir.path(), "cat input.txt | cat | cat | cat");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), content);
}

#[test]
fn pipeline_leaves_no_channel_open_in_the_interpreter() {
    let dir = workspace();
    let output = arbor(
        dir.path(),
        "ls /proc/self/fd; echo hi | cat > /dev/null; ls /proc/self/fd",
    );
    let listing = stdout(&output);
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len() % 2, 0, "unexpected listing: {:?}", lines);
    let (before, after) = lines.split_at(lines.len() / 2);
    assert_eq!(before, after);
}

#[test]
fn pipeline_status_is_the_last_stage() {
    let dir = workspace();
    assert_eq!(arbor(dir.path(), "true | false").status.code(), Some(1));
    assert_eq!(arbor(dir.path(), "false | true").status.code(), Some(0));
}

#[test]
fn bare_cd_goes_home() {
    let dir = workspace();
    let output = arbor(dir.path(), "cd /; cd; pwd");
    let printed = stdout(&output);
    assert_eq!(
        Path::new(printed.trim()).canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}

#[test]
fn cd_failure_is_reported_and_survivable() {
    let dir = workspace();
    let output = arbor(dir.path(), "cd /no/such/dir; echo alive");
    assert_eq!(stdout(&output), "alive\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("cd: /no/such/dir"));
}

#[test]
fn subshell_isolates_working_directory() {
    let dir = workspace();
    let output = arbor(dir.path(), "(cd /); pwd");
    let printed = stdout(&output);
    assert_eq!(
        Path::new(printed.trim()).canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}

#[test]
fn set_is_visible_to_later_commands_but_not_outside_subshells() {
    let dir = workspace();
    let output = arbor(dir.path(), "set FOO=bar; printenv FOO");
    assert_eq!(stdout(&output), "bar\n");

    let output = arbor(dir.path(), "(set FOO=baz); printenv FOO");
    assert_eq!(stdout(&output), "");
    assert_eq!(output.status.code(), Some(1));

    let output = arbor(dir.path(), "set FOO=bar; unset FOO; printenv FOO");
    assert_eq!(stdout(&output), "");
}

#[test]
fn malformed_set_keeps_the_session_alive() {
    let dir = workspace();
    let output = arbor(dir.path(), "set NOEQUALS; echo still here");
    assert_eq!(stdout(&output), "still here\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn output_append_and_truncate() {
    let dir = workspace();
    let target = dir.path().join("out.txt");
    assert!(!target.exists());

    let output = arbor(dir.path(), "echo one > out.txt");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(&target).unwrap(), "one\n");

    arbor(dir.path(), "echo two >> out.txt");
    assert_eq!(fs::read_to_string(&target).unwrap(), "one\ntwo\n");

    arbor(dir.path(), "echo three > out.txt");
    assert_eq!(fs::read_to_string(&target).unwrap(), "three\n");
}

#[test]
fn redirect_propagates_child_status() {
    let dir = workspace();
    assert_eq!(arbor(dir.path(), "false > out.txt").status.code(), Some(1));
    assert_eq!(arbor(dir.path(), "true > out.txt").status.code(), Some(0));
}

#[test]
fn input_redirect_and_descriptor_duplication() {
    let dir = workspace();
    fs::write(dir.path().join("in.txt"), "b\na\n").unwrap();

    let output = arbor(dir.path(), "sort < in.txt");
    assert_eq!(stdout(&output), "a\nb\n");

    let output = arbor(dir.path(), "ls /no/such/file > err.txt 2>&1");
    assert_ne!(output.status.code(), Some(0));
    let captured = fs::read_to_string(dir.path().join("err.txt")).unwrap();
    assert!(captured.contains("/no/such/file"));
}

#[test]
fn missing_input_file_fails_the_redirect_only() {
    let dir = workspace();
    let output = arbor(dir.path(), "cat < missing.txt; echo after");
    assert_eq!(stdout(&output), "after\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.txt"));
}

#[test]
fn exit_codes() {
    let dir = workspace();
    assert_eq!(arbor(dir.path(), "exit 7").status.code(), Some(7));
    assert_eq!(arbor(dir.path(), "exit").status.code(), Some(42));
    assert_eq!(arbor(dir.path(), "(exit 5)").status.code(), Some(5));

    let output = arbor(dir.path(), "exit abc; echo still");
    assert_eq!(stdout(&output), "still\n");
}

#[test]
fn unknown_program_reports_127() {
    let dir = workspace();
    let output = arbor(dir.path(), "arbor-no-such-program");
    assert_eq!(output.status.code(), Some(127));
    assert!(String::from_utf8_lossy(&output.stderr).contains("arbor-no-such-program"));
}

#[test]
fn detach_returns_without_waiting() {
    let dir = workspace();
    let started = Instant::now();
    let status = Command::new(env!("CARGO_BIN_EXE_arbor"))
        .args(["-c", "sleep 3 &"])
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("ARBOR_LOG_DIR", dir.path().join(".logs"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn script_on_stdin_runs_line_by_line() {
    let dir = workspace();
    let mut child = Command::new(env!("CARGO_BIN_EXE_arbor"))
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env("ARBOR_LOG_DIR", dir.path().join(".logs"))
        .env("ARBOR_HISTORY", dir.path().join(".history"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(b"set GREETING=hello\nprintenv GREETING\nexit 3\necho unreachable\n").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout(&output), "hello\n");
}

#[test]
fn syntax_errors_are_reported() {
    let dir = workspace();
    let output = arbor(dir.path(), "echo hi |");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout(&output), "");

    let output = arbor(dir.path(), "echo a \"x");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout(&output), "");
}

#[test]
fn upstream_stage_ends_quietly_when_downstream_exits() {
    let dir = workspace();
    let output = arbor(dir.path(), "yes | head -1");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "y\n");
    assert_eq!(String::from_utf8_lossy(&output.stderr), "");
}

#[test]
fn external_programs_start_with_default_pipe_signal() {
    let dir = workspace();
    let output = arbor(dir.path(), "grep SigIgn /proc/self/status");
    let listing = stdout(&output);
    let mask = listing
        .trim()
        .strip_prefix("SigIgn:")
        .map(|hex| u64::from_str_radix(hex.trim(), 16).unwrap())
        .unwrap();
    // SIGPIPE 是 13 号信号
    assert_eq!(mask & (1 << 12), 0, "SIGPIPE ignored: {}", listing);
}

/// 从管道读取输入的会话，放在独立的进程组里，方便模拟终端的 Ctrl-C
fn session(dir: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_arbor"))
        .current_dir(dir)
        .env("HOME", dir)
        .env("ARBOR_LOG_DIR", dir.join(".logs"))
        .env("ARBOR_HISTORY", dir.join(".history"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .unwrap();
    let stdin = child.stdin.take().unwrap();
    let stdout = BufReader::new(child.stdout.take().unwrap());
    (child, stdin, stdout)
}

/// 让会话 echo 一行并等它输出，确认 shell 仍在处理输入
fn echo_through(stdin: &mut ChildStdin, stdout: &mut BufReader<ChildStdout>, text: &str) {
    writeln!(stdin, "echo {}", text).unwrap();
    stdin.flush().unwrap();
    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert_eq!(line, format!("{}\n", text));
}

#[test]
fn interrupt_while_idle_does_not_end_the_session() {
    let dir = workspace();
    let (mut child, mut stdin, mut stdout) = session(dir.path());
    echo_through(&mut stdin, &mut stdout, "ready");

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    thread::sleep(Duration::from_millis(200));

    echo_through(&mut stdin, &mut stdout, "alive");
    drop(stdin);
    assert_eq!(child.wait().unwrap().code(), Some(0));
}

#[test]
fn interrupt_ends_the_foreground_program_only() {
    let dir = workspace();
    let (mut child, mut stdin, mut stdout) = session(dir.path());
    echo_through(&mut stdin, &mut stdout, "ready");

    let started = Instant::now();
    writeln!(stdin, "sleep 5").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(500));
    killpg(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    // EOF 时以最后一条命令的状态退出：sleep 被 SIGINT 结束，即 128 + 2
    drop(stdin);
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(130));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn session_continues_after_foreground_interrupt() {
    let dir = workspace();
    let (mut child, mut stdin, mut stdout) = session(dir.path());
    echo_through(&mut stdin, &mut stdout, "ready");

    let started = Instant::now();
    writeln!(stdin, "sleep 5").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(500));
    killpg(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

    echo_through(&mut stdin, &mut stdout, "after");
    assert!(started.elapsed() < Duration::from_secs(4));
    drop(stdin);
    assert_eq!(child.wait().unwrap().code(), Some(0));
}
