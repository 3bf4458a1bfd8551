use std::path::Path;

use serde::Serialize;
use vportmsg_transport::path::{validate_port_name, POSIX_PORT_DIR};

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut checks = vec![backend_check()];
    checks.push(port_dir_check(Path::new(POSIX_PORT_DIR)));
    if let Some(port) = &args.port {
        checks.push(named_port_check(Path::new(POSIX_PORT_DIR), port));
    }

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("vportmsg doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<16} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn backend_check() -> CheckResult {
    let detail = if cfg!(windows) {
        "overlapped handles under \\\\.\\Global (buffered reader)"
    } else {
        "blocking device nodes under /dev/virtio-ports"
    };
    CheckResult {
        name: "backend".to_string(),
        status: CheckStatus::Info,
        detail: detail.to_string(),
    }
}

fn port_dir_check(dir: &Path) -> CheckResult {
    if cfg!(windows) {
        return CheckResult {
            name: "port_dir".to_string(),
            status: CheckStatus::Skip,
            detail: "ports are not listed on this platform".to_string(),
        };
    }

    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            let detail = if names.is_empty() {
                format!("{} has no named ports", dir.display())
            } else {
                names.join(", ")
            };
            CheckResult {
                name: "port_dir".to_string(),
                status: CheckStatus::Pass,
                detail,
            }
        }
        Err(err) => CheckResult {
            name: "port_dir".to_string(),
            status: CheckStatus::Fail,
            detail: format!("{}: {err}", dir.display()),
        },
    }
}

fn named_port_check(dir: &Path, port: &str) -> CheckResult {
    let name = format!("port:{port}");
    if let Err(err) = validate_port_name(port) {
        return CheckResult {
            name,
            status: CheckStatus::Fail,
            detail: err.to_string(),
        };
    }
    if cfg!(windows) {
        return CheckResult {
            name,
            status: CheckStatus::Skip,
            detail: "open the port with `send` to probe it".to_string(),
        };
    }

    let path = dir.join(port);
    if path.exists() {
        CheckResult {
            name,
            status: CheckStatus::Pass,
            detail: path.display().to_string(),
        }
    } else {
        CheckResult {
            name,
            status: CheckStatus::Fail,
            detail: format!("{} does not exist", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![backend_check()],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"info\""));
    }

    #[test]
    #[cfg(unix)]
    fn port_dir_lists_entries_sorted() {
        let dir = std::env::temp_dir().join(format!("vportmsg-doctor-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("vs2"), b"").unwrap();
        std::fs::write(dir.join("vs1"), b"").unwrap();

        let check = port_dir_check(&dir);
        assert!(matches!(check.status, CheckStatus::Pass));
        assert_eq!(check.detail, "vs1, vs2");

        let found = named_port_check(&dir, "vs1");
        assert!(matches!(found.status, CheckStatus::Pass));
        let missing = named_port_check(&dir, "vs9");
        assert!(matches!(missing.status, CheckStatus::Fail));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn port_names_outside_the_port_dir_fail() {
        let dir = std::env::temp_dir();
        for bad in ["../../etc/passwd", "a\\b", ""] {
            let check = named_port_check(&dir, bad);
            assert!(matches!(check.status, CheckStatus::Fail), "{bad:?} should fail");
            assert!(check.detail.contains("invalid port name"), "{}", check.detail);
        }
    }

    #[test]
    #[cfg(unix)]
    fn missing_port_dir_fails() {
        let dir = std::env::temp_dir().join(format!(
            "vportmsg-doctor-missing-{}",
            std::process::id()
        ));
        let check = port_dir_check(&dir);
        assert!(matches!(check.status, CheckStatus::Fail));
    }
}
