use anyhow::{Context, Result};
use base64::Engine;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::config::{self, ConfigDocument};
use crate::port;

/// Stdout/stderr of the spawned backend land in these files next to the jar,
/// truncated on every launch.
pub(crate) const STDOUT_LOG: &str = "backend-out.log";
pub(crate) const STDERR_LOG: &str = "backend-err.log";

/// Java runtime used to launch the jar. Overridable for installations with
/// a private JRE.
fn java_binary() -> String {
    std::env::var("JAVA_BIN").unwrap_or_else(|_| "java".to_string())
}

// ---------------------------------------------------------------------------
// Launch decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchDecision {
    /// No local backend configured
    Skip,
    /// Something already listens on the backend port; do not double-start
    PortBusy(u16),
    Launch,
}

pub(crate) fn decide(doc: &ConfigDocument, port_in_use: bool) -> LaunchDecision {
    if doc.local_jar_path.trim().is_empty() {
        return LaunchDecision::Skip;
    }
    if port_in_use {
        return LaunchDecision::PortBusy(doc.backend_port);
    }
    LaunchDecision::Launch
}

// ---------------------------------------------------------------------------
// Launch command
// ---------------------------------------------------------------------------

/// Decode `dbPasswordEncoded` to the plaintext the backend expects. Invalid
/// base64 or non-UTF-8 content degrades to an empty password; the backend
/// rejects it on its own terms.
pub(crate) fn decode_db_password(encoded: &str) -> String {
    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| {
            eprintln!("[Backend] Decoded database password is not valid UTF-8");
            String::new()
        }),
        Err(e) => {
            if !encoded.is_empty() {
                eprintln!("[Backend] dbPasswordEncoded is not valid base64: {e}");
            }
            String::new()
        }
    }
}

/// Arguments for `java`, Spring Boot style. The destructive schema-recreate
/// and seed flags ride along only while `seedDatabaseOnce` is set.
pub(crate) fn launch_args(doc: &ConfigDocument) -> Vec<String> {
    let mut args = vec![
        "-jar".to_string(),
        doc.local_jar_path.clone(),
        format!("--server.port={}", doc.backend_port),
        format!(
            "--spring.datasource.url=jdbc:mariadb://{}:3306/{}",
            doc.db_host, doc.db_name
        ),
        format!("--spring.datasource.username={}", doc.db_user),
        format!(
            "--spring.datasource.password={}",
            decode_db_password(&doc.db_password_encoded)
        ),
    ];
    if doc.seed_database_once {
        args.push("--spring.jpa.hibernate.ddl-auto=create".to_string());
        args.push("--app.db.seed=true".to_string());
    }
    args
}

fn open_log(dir: &Path, name: &str) -> Result<File> {
    File::create(dir.join(name)).with_context(|| format!("create {name}"))
}

fn spawn(doc: &ConfigDocument) -> Result<Child> {
    let jar = Path::new(&doc.local_jar_path);
    let log_dir = jar.parent().filter(|p| !p.as_os_str().is_empty());
    let log_dir = log_dir.unwrap_or_else(|| Path::new("."));

    let out = open_log(log_dir, STDOUT_LOG)?;
    let err = open_log(log_dir, STDERR_LOG)?;

    let mut cmd = Command::new(java_binary());
    cmd.args(launch_args(doc))
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err));

    // Own process group: the backend keeps serving if the shell crashes,
    // while the retained handle still reaches it at graceful shutdown.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
        .with_context(|| format!("spawn {} -jar {}", java_binary(), jar.display()))
}

// ---------------------------------------------------------------------------
// Supervisor entry points
// ---------------------------------------------------------------------------

pub(crate) struct LaunchReport {
    pub(crate) child: Option<Child>,
    /// Human-readable condition for the status window, when launch was
    /// skipped or failed
    pub(crate) warning: Option<String>,
}

/// Conditionally start the local backend per the decision table. On a
/// successful spawn with the seed flag set, the flag is persisted back as
/// `false` before returning: whether or not the backend ever becomes
/// healthy, the next launch must not re-seed. A failed spawn does not consume
/// the flag and does not abort startup; the caller proceeds to health
/// polling either way.
pub(crate) fn maybe_start_local(doc: &mut ConfigDocument, config_path: &Path) -> LaunchReport {
    let port_in_use =
        !doc.local_jar_path.trim().is_empty() && port::is_port_in_use(doc.backend_port);
    match decide(doc, port_in_use) {
        LaunchDecision::Skip => {
            eprintln!("[Backend] No local backend configured, expecting a remote one");
            LaunchReport {
                child: None,
                warning: None,
            }
        }
        LaunchDecision::PortBusy(busy_port) => {
            eprintln!("[Backend] Port {busy_port} already in use, skipping local launch");
            LaunchReport {
                child: None,
                warning: Some(format!(
                    "Port {busy_port} is already in use, skipping local backend launch"
                )),
            }
        }
        LaunchDecision::Launch => match spawn(doc) {
            Ok(child) => {
                eprintln!("[Backend] Started local backend (pid {})", child.id());
                if doc.seed_database_once {
                    doc.seed_database_once = false;
                    if let Err(e) = config::save_document(config_path, doc) {
                        eprintln!("[Backend] Failed to clear the seed flag: {e}");
                    }
                }
                LaunchReport {
                    child: Some(child),
                    warning: None,
                }
            }
            Err(e) => {
                eprintln!("[Backend] Failed to start local backend: {e:#}");
                LaunchReport {
                    child: None,
                    warning: Some(format!("Could not start the local backend: {e:#}")),
                }
            }
        },
    }
}

/// Best-effort teardown of the tracked backend, invoked once at shutdown.
/// Signals the whole process group first (Unix) so forked children go down
/// too; errors are logged, never propagated.
pub(crate) fn terminate(handle: &mut Option<Child>) {
    let Some(mut process) = handle.take() else {
        return;
    };
    let pid = process.id();
    eprintln!("[Backend] Terminating local backend (pid {pid})");

    #[cfg(unix)]
    unsafe {
        libc::kill(-(pid as i32), libc::SIGTERM);
    }

    if let Err(e) = process.kill() {
        eprintln!("[Backend] Failed to kill backend {pid}: {e}");
    }
    let _ = process.wait();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::net::TcpListener;
    use tempfile::TempDir;

    fn doc_with_jar(jar: &str, port: u16) -> ConfigDocument {
        ConfigDocument {
            local_jar_path: jar.to_string(),
            backend_port: port,
            ..ConfigDocument::default()
        }
    }

    #[test]
    fn blank_jar_path_skips_launch() {
        let doc = ConfigDocument::default();
        assert_eq!(decide(&doc, false), LaunchDecision::Skip);
        assert_eq!(decide(&doc, true), LaunchDecision::Skip);

        let doc = doc_with_jar("   ", 8080);
        assert_eq!(decide(&doc, false), LaunchDecision::Skip);
    }

    #[test]
    fn busy_port_skips_launch() {
        let doc = doc_with_jar("/opt/hotel/backend.jar", 8080);
        assert_eq!(decide(&doc, true), LaunchDecision::PortBusy(8080));
        assert_eq!(decide(&doc, false), LaunchDecision::Launch);
    }

    #[test]
    fn decode_handles_valid_and_broken_input() {
        assert_eq!(decode_db_password("c2VjcmV0"), "secret");
        assert_eq!(decode_db_password(""), "");
        assert_eq!(decode_db_password("!!! not base64 !!!"), "");
    }

    #[test]
    fn launch_args_carry_datasource_settings() {
        let mut doc = doc_with_jar("/opt/hotel/backend.jar", 8181);
        doc.db_host = "db.hotel.local".to_string();
        doc.db_name = "hotel".to_string();
        doc.db_user = "manager".to_string();
        doc.db_password_encoded = "c2VjcmV0".to_string();

        let args = launch_args(&doc);
        assert_eq!(args[0], "-jar");
        assert_eq!(args[1], "/opt/hotel/backend.jar");
        assert!(args.contains(&"--server.port=8181".to_string()));
        assert!(args.contains(
            &"--spring.datasource.url=jdbc:mariadb://db.hotel.local:3306/hotel".to_string()
        ));
        assert!(args.contains(&"--spring.datasource.username=manager".to_string()));
        assert!(args.contains(&"--spring.datasource.password=secret".to_string()));
    }

    #[test]
    fn seed_flags_ride_along_only_when_requested() {
        let mut doc = doc_with_jar("/opt/hotel/backend.jar", 8080);

        let args = launch_args(&doc);
        assert!(!args.iter().any(|a| a.contains("ddl-auto")));
        assert!(!args.iter().any(|a| a.contains("app.db.seed")));

        doc.seed_database_once = true;
        let args = launch_args(&doc);
        assert!(args.contains(&"--spring.jpa.hibernate.ddl-auto=create".to_string()));
        assert!(args.contains(&"--app.db.seed=true".to_string()));
    }

    #[test]
    fn busy_port_produces_warning_and_no_handle() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let busy_port = listener.local_addr().unwrap().port();

        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        let mut doc = doc_with_jar("/opt/hotel/backend.jar", busy_port);

        let report = maybe_start_local(&mut doc, &config_path);
        assert!(report.child.is_none());
        assert!(report.warning.unwrap().contains("already in use"));
    }

    #[test]
    fn empty_path_produces_neither_handle_nor_warning() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        let mut doc = ConfigDocument::default();

        let report = maybe_start_local(&mut doc, &config_path);
        assert!(report.child.is_none());
        assert!(report.warning.is_none());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn successful_spawn_clears_seed_flag_on_disk() {
        // `true` accepts and ignores the jar arguments; only the spawn matters
        unsafe { std::env::set_var("JAVA_BIN", "true") };

        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("backend.jar");
        std::fs::write(&jar, b"jar").unwrap();
        let config_path = dir.path().join("config.json");

        let mut doc = doc_with_jar(jar.to_str().unwrap(), free_port());
        doc.seed_database_once = true;
        config::save_document(&config_path, &doc).unwrap();

        let mut report = maybe_start_local(&mut doc, &config_path);
        assert!(report.child.is_some());
        assert!(report.warning.is_none());

        // Cleared in memory and on disk, before any health polling
        assert!(!doc.seed_database_once);
        assert!(!config::load_document(&config_path).seed_database_once);

        // Log files are created (truncated) beside the jar
        assert!(dir.path().join(STDOUT_LOG).exists());
        assert!(dir.path().join(STDERR_LOG).exists());

        terminate(&mut report.child);
        unsafe { std::env::remove_var("JAVA_BIN") };
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn failed_spawn_keeps_seed_flag_and_warns() {
        unsafe { std::env::set_var("JAVA_BIN", "/definitely/not/a/java") };

        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("backend.jar");
        std::fs::write(&jar, b"jar").unwrap();
        let config_path = dir.path().join("config.json");

        let mut doc = doc_with_jar(jar.to_str().unwrap(), free_port());
        doc.seed_database_once = true;
        config::save_document(&config_path, &doc).unwrap();

        let report = maybe_start_local(&mut doc, &config_path);
        assert!(report.child.is_none());
        assert!(report.warning.unwrap().contains("Could not start"));

        // Only a successful spawn consumes the one-shot flag
        assert!(doc.seed_database_once);
        assert!(config::load_document(&config_path).seed_database_once);

        unsafe { std::env::remove_var("JAVA_BIN") };
    }

    #[cfg(unix)]
    #[test]
    fn terminate_kills_tracked_process_and_is_idempotent() {
        let child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let mut handle = Some(child);
        terminate(&mut handle);
        assert!(handle.is_none());

        // Safe to call again with nothing tracked
        terminate(&mut handle);
    }

    fn free_port() -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    }
}
