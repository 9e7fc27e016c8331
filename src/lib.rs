pub(crate) mod backend;
pub(crate) mod config;
pub(crate) mod db_check;
pub(crate) mod health;
pub(crate) mod port;
pub(crate) mod splash;
pub(crate) mod state;
pub(crate) mod token_store;

use std::sync::Arc;
use std::time::Duration;
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

pub(crate) use state::AppState;

/// How long the bootstrap waits for a healthy backend before giving up and
/// revealing the main window anyway.
const HEALTH_BUDGET: Duration = Duration::from_secs(20);

/// How long a warning stays on the status window before the bootstrap moves
/// on. Long enough to read, short enough not to hold up launch.
const WARNING_HOLD: Duration = Duration::from_millis(2500);

const MAIN_LABEL: &str = "main";

// ---------------------------------------------------------------------------
// Window commands
// ---------------------------------------------------------------------------

#[tauri::command]
fn window_minimize(window: tauri::WebviewWindow) {
    let _ = window.minimize();
}

#[tauri::command]
fn window_maximize_toggle(window: tauri::WebviewWindow) {
    if window.is_maximized().unwrap_or(false) {
        let _ = window.unmaximize();
    } else {
        let _ = window.maximize();
    }
}

#[tauri::command]
fn window_close(window: tauri::WebviewWindow) {
    let _ = window.close();
}

#[tauri::command]
fn open_devtools(window: tauri::WebviewWindow) {
    window.open_devtools();
}

/// Open a URL with the OS default handler.
#[tauri::command]
fn open_external(app: AppHandle, url: String) -> Result<(), String> {
    app.opener()
        .open_url(url.clone(), None::<&str>)
        .map_err(|e| format!("Failed to open {url}: {e}"))
}

/// Native file picker constrained to jar archives. Resolves to `None` when
/// the user cancels.
#[tauri::command]
async fn select_jar_path(app: AppHandle) -> Result<Option<String>, String> {
    let (tx, rx) = std::sync::mpsc::channel();

    app.dialog()
        .file()
        .add_filter("Backend archive", &["jar"])
        .pick_file(move |file_path| {
            let _ = tx.send(file_path.map(|p| p.to_string()));
        });

    rx.recv()
        .map_err(|e| format!("File dialog closed unexpectedly: {e}"))
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// The startup sequence, strictly ordered: conditional local-backend launch
/// (config was already loaded/repaired before the Tauri builder ran), then
/// health polling against the resolved base URL, then main-window reveal.
/// The status window tracks whichever stage is active; every fallible step
/// has a fallback, so this task never aborts startup.
async fn run_bootstrap(app: AppHandle) {
    let state = app.state::<Arc<AppState>>().inner().clone();
    let doc = state.config.read().clone();

    if doc.local_jar_path.trim().is_empty() {
        state.splash.show(&app, "Connecting to the backend…");
    } else {
        state.splash.show(&app, "Starting the local backend…");
    }

    // Spawn decision + process start are synchronous filesystem/OS work
    let config_path = state.config_path.clone();
    let launch = tokio::task::spawn_blocking(move || {
        let mut doc = doc;
        let report = backend::maybe_start_local(&mut doc, &config_path);
        (doc, report)
    })
    .await;

    let doc = match launch {
        Ok((updated, report)) => {
            *state.config.write() = updated.clone();
            if let Some(child) = report.child {
                *state.backend.lock() = Some(child);
            }
            if let Some(warning) = report.warning {
                state.splash.show(&app, &warning);
                tokio::time::sleep(WARNING_HOLD).await;
            }
            updated
        }
        Err(e) => {
            eprintln!("[Bootstrap] Backend launch task failed: {e}");
            state.config.read().clone()
        }
    };

    state
        .splash
        .show(&app, "Waiting for the backend to become ready…");
    let healthy = health::wait_until_healthy(&doc.backend_base_url(), HEALTH_BUDGET).await;
    if !healthy {
        state.splash.show(
            &app,
            "The backend did not become ready in time. Continuing without it.",
        );
        tokio::time::sleep(WARNING_HOLD).await;
    }

    state.splash.close();
    create_main_window(&app);
}

/// Create and reveal the primary window: frameless with a custom title bar,
/// 1200×700 by default, never smaller than 550×400.
fn create_main_window(app: &AppHandle) {
    let built = WebviewWindowBuilder::new(app, MAIN_LABEL, WebviewUrl::App("index.html".into()))
        .title("Hotel Task Manager")
        .inner_size(1200.0, 700.0)
        .min_inner_size(550.0, 400.0)
        .decorations(false)
        .center()
        .build();

    match built {
        Ok(window) => {
            let _ = window.show();
            let _ = window.set_focus();
        }
        Err(e) => eprintln!("[Window] Failed to create main window: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Config is provisioned and loaded (repairing the file if needed) before
    // anything else; the rest of the bootstrap depends on it.
    let config_path = config::config_file();
    config::provision_default(&config_path);
    let doc = config::load_document(&config_path);

    let state = Arc::new(AppState::new(config_path, doc));

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            // Focus the existing window when another instance is launched
            if let Some(window) = app.get_webview_window(MAIN_LABEL) {
                let _ = window.unminimize();
                let _ = window.set_focus();
            }
        }))
        .manage(state)
        .setup(|app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(run_bootstrap(handle));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            window_minimize,
            window_maximize_toggle,
            window_close,
            open_devtools,
            open_external,
            select_jar_path,
            config::get_config,
            config::set_config,
            db_check::test_db_connection,
            token_store::set_auth_token,
            token_store::clear_auth_token,
            token_store::get_auth_email,
            token_store::is_logged_in,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            // Quitting must take any backend we started down with us
            if let tauri::RunEvent::Exit = event
                && let Some(state) = app_handle.try_state::<Arc<AppState>>()
            {
                backend::terminate(&mut state.backend.lock());
            }
        });
}
