use parking_lot::Mutex;
use tauri::{AppHandle, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

const SPLASH_LABEL: &str = "splash";

/// Owner of the transient status window shown while the bootstrap runs.
/// At most one instance is ever live: `show` replaces, `close` is idempotent.
/// That invariant lives here, not in the callers.
pub(crate) struct SplashController {
    window: Mutex<Option<WebviewWindow>>,
}

impl SplashController {
    pub(crate) fn new() -> Self {
        Self {
            window: Mutex::new(None),
        }
    }

    /// Create a fresh status window with `message`, tearing down any previous
    /// one first so two surfaces never overlap.
    pub(crate) fn show(&self, app: &AppHandle, message: &str) {
        self.close();
        let builder = WebviewWindowBuilder::new(
            app,
            SPLASH_LABEL,
            WebviewUrl::Html(splash_html(message)),
        )
        .title("Hotel Task Manager")
        .inner_size(420.0, 180.0)
        .resizable(false)
        .decorations(false)
        .always_on_top(true)
        .center()
        .skip_taskbar(true);

        match builder.build() {
            Ok(window) => {
                let _ = window.show();
                *self.window.lock() = Some(window);
            }
            Err(e) => eprintln!("[Splash] Failed to create status window: {e}"),
        }
    }

    /// Tear down the current status window, if any. Safe to call repeatedly.
    pub(crate) fn close(&self) {
        if let Some(window) = self.window.lock().take() {
            // destroy, not close: frees the label immediately for a replacement
            if let Err(e) = window.destroy() {
                eprintln!("[Splash] Failed to destroy status window: {e}");
            }
        }
    }
}

/// Inline document for the status window; no bundled asset needed.
fn splash_html(message: &str) -> String {
    format!(
        "<!doctype html><meta charset=\"utf-8\"><title>Hotel Task Manager</title>\
         <style>body{{font-family:system-ui,'Segoe UI',sans-serif;margin:0;height:100vh;\
         display:flex;flex-direction:column;align-items:center;justify-content:center;\
         background:#1e2430;color:#e6e9ef;user-select:none;cursor:default}}\
         h1{{font-size:15px;font-weight:600;margin:0 0 10px}}\
         p{{font-size:13px;margin:0;padding:0 24px;text-align:center;opacity:.85}}</style>\
         <h1>Hotel Task Manager</h1><p>{}</p>",
        html_escape(message)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_escaped_into_the_document() {
        let html = splash_html("Port 8080 <in use> & skipped");
        assert!(html.contains("Port 8080 &lt;in use&gt; &amp; skipped"));
        assert!(!html.contains("<in use>"));
    }

    #[test]
    fn plain_message_is_embedded_verbatim() {
        let html = splash_html("Waiting for the backend to become ready…");
        assert!(html.contains("<p>Waiting for the backend to become ready…</p>"));
    }
}
