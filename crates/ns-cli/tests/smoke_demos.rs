use std::fs;
use std::process::Command;

#[test]
fn agent_start_runs_all_demos() {
    let bin = env!("CARGO_BIN_EXE_ns-cli");
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let demos_root = manifest_dir.join("..").join("..").join("demos");

    let mut directories = fs::read_dir(&demos_root)
        .expect("demos root must exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    directories.sort();

    assert!(!directories.is_empty(), "expected demo scripts");

    for directory in directories {
        let state_out = std::env::temp_dir().join(format!(
            "ns-cli-smoke-{}.json",
            directory.file_name().unwrap_or_default().to_string_lossy()
        ));

        let output = Command::new(bin)
            .arg("agent")
            .arg("start")
            .arg("--scripts")
            .arg(&directory)
            .arg("--state-out")
            .arg(&state_out)
            .output()
            .expect("cli should execute");

        if !output.status.success() {
            panic!(
                "demo {} failed\nstdout:\n{}\nstderr:\n{}",
                directory.display(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("RESULT:OK"),
            "stdout missing RESULT:OK for {}",
            directory.display()
        );
        assert!(
            stdout.contains("EVENT:"),
            "stdout missing EVENT for {}",
            directory.display()
        );
    }
}
