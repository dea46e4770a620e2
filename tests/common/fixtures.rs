//! Mock backend fixtures

use pdftrans::{SourceFile, TranslateParams};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal document payload; the mock backend never parses it
pub const SAMPLE_PDF: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

pub fn sample_pdf(name: &str) -> SourceFile {
    SourceFile::new(name, SAMPLE_PDF.to_vec())
}

pub fn translate_params() -> TranslateParams {
    TranslateParams::new()
        .with("service", "SiliconFlowFree")
        .with("lang_from", "en")
        .with("lang_to", "zh")
}

/// Accept every translate request and hand out `task_id`
pub async fn mount_translate(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": task_id })))
        .mount(server)
        .await;
}

/// Answer the status endpoint of `task_id` with `bodies` in order; the last one repeats
pub async fn mount_status_sequence(
    server: &MockServer,
    task_id: &str,
    bodies: Vec<serde_json::Value>,
) {
    let last = bodies.len().saturating_sub(1);
    for (i, body) in bodies.into_iter().enumerate() {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/api/status/{task_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        let mock = if i < last { mock.up_to_n_times(1) } else { mock };
        mock.mount(server).await;
    }
}

/// Serve all three artifacts of `task_id`
pub async fn mount_artifacts(server: &MockServer, task_id: &str) {
    for (suffix, body) in [("", "combined"), ("/mono", "mono"), ("/dual", "dual")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/download_task/{task_id}{suffix}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(format!("%PDF {body}").into_bytes()),
            )
            .mount(server)
            .await;
    }
}
