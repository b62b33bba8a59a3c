use std::path::Path;
use std::process::Command;

use anyhow::Context as _;

const HEY_HEADER: &str =
    "response-time,DNS+dialup,DNS,Request-write,Response-delay,Response-read,status-code,offset";

fn write_result(dir: &Path, name: &str, times: &[&str]) -> anyhow::Result<()> {
    let mut body = String::from(HEY_HEADER);
    body.push('\n');
    for t in times {
        body.push_str(&format!("{t},0,0,0,0,0,200,0.0000\n"));
    }
    std::fs::write(dir.join(name), body).with_context(|| format!("write {name}"))
}

fn report(dir: &Path) -> anyhow::Result<String> {
    let mut out = Vec::new();
    rampr_stats::app::report(dir, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn counts_skipped_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_result(dir.path(), "result-1-1.csv", &["0.1000"])?;
    write_result(dir.path(), "result-1-2.csv", &["0.2000"])?;
    write_result(dir.path(), "result-2-1.csv", &["0.3000"])?;
    std::fs::write(dir.path().join("result-3-1.csv"), "status-code\n200\n")?;

    let mut out = Vec::new();
    let counts = rampr_stats::app::report(dir.path(), &mut out)?;
    anyhow::ensure!(
        counts
            == rampr_stats::app::ReportCounts {
                files_seen: 4,
                files_loaded: 3,
                sessions: 2,
            },
        "{counts:?}"
    );
    Ok(())
}

#[test]
fn one_row_per_session_sorted_by_id() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_result(dir.path(), "result-20240201000000000-1.csv", &["0.5000"])?;
    write_result(dir.path(), "result-20240101000000000-1.csv", &["0.1000", "0.2000"])?;
    write_result(dir.path(), "result-20240101000000000-2.csv", &["0.3000", "0.4000"])?;

    let out = report(dir.path())?;
    let rows: Vec<&str> = out.lines().filter(|l| l.starts_with("2024")).collect();

    anyhow::ensure!(rows.len() == 2, "output:\n{out}");
    anyhow::ensure!(
        rows[0] == "20240101000000000 & 0.250 & 0.100 & 0.400 & 0.103 & 0.250 & 0.370 \\\\",
        "row: {}",
        rows[0]
    );
    anyhow::ensure!(
        rows[1] == "20240201000000000 & 0.500 & 0.500 & 0.500 & 0.500 & 0.500 & 0.500 \\\\",
        "row: {}",
        rows[1]
    );
    anyhow::ensure!(out.starts_with("\\begin{tabular}{lrrrrrr}"));
    anyhow::ensure!(out.trim_end().ends_with("\\end{tabular}"));
    Ok(())
}

#[test]
fn empty_directory_prints_no_files_message() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("waves-1-1.csv"), "Sequence\n")?;

    let out = report(dir.path())?;
    anyhow::ensure!(out.trim_end() == rampr_stats::app::NO_FILES_MESSAGE, "{out}");
    Ok(())
}

#[test]
fn only_broken_files_prints_no_data_message() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("result-1-1.csv"), "status-code\n200\n")?;

    let out = report(dir.path())?;
    anyhow::ensure!(out.trim_end() == rampr_stats::app::NO_DATA_MESSAGE, "{out}");
    Ok(())
}

#[test]
fn binary_prints_table_and_exits_0() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_result(dir.path(), "result-7-1.csv", &["0.0100", "0.0300"])?;

    let out = Command::new(env!("CARGO_BIN_EXE_rampr-stats"))
        .arg(dir.path())
        .output()
        .context("run rampr-stats binary")?;

    anyhow::ensure!(out.status.success(), "status: {}", out.status);
    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        stdout.contains("7 & 0.020 & 0.010 & 0.030 & 0.010 & 0.020 & 0.028 \\\\"),
        "stdout:\n{stdout}"
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(
        stderr.contains("Loaded 1 of 1 result files (1 sessions)."),
        "stderr:\n{stderr}"
    );
    Ok(())
}
