use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::{
    capture::CaptureController,
    codec::CodecOptions,
    inference::InferenceClient,
    logs::{export_contacts, format_timestamp, render_log},
    parser::parse_reply,
    settings::{InferenceSettings, API_KEY_ENV, ENDPOINT_ENV, MODEL_ENV},
    AppState,
};

pub(crate) async fn capture(state: &AppState, image: &Path, save_to_gallery: bool) -> Result<String> {
    let settings = state.settings.inference();
    let client = InferenceClient::new(&settings)?;
    let codec = CodecOptions {
        max_dimension: settings.max_image_dimension,
        jpeg_quality: settings.jpeg_quality,
    };

    let mut controller = CaptureController::new(state.db.clone(), client, codec);
    if save_to_gallery {
        controller = controller.with_gallery(state.gallery_dir());
    }

    let outcome = controller.capture_file(image).await?;

    let mut output = outcome.display_text();
    match &outcome.persisted {
        Ok(record) => output.push_str(&format!("\n\n(saved as capture #{})", record.id)),
        Err(err) => output.push_str(&format!(
            "\n\nwarning: capture was not saved to the log: {err}"
        )),
    }
    Ok(output)
}

pub(crate) async fn list_logs(state: &AppState, limit: Option<usize>) -> Result<String> {
    let records = state.db.list_recent_captured_responses(limit).await?;
    Ok(render_log(&records))
}

pub(crate) async fn show_capture(state: &AppState, id: i64, image_out: Option<&Path>) -> Result<String> {
    let record = state
        .db
        .get_captured_response(id)
        .await?
        .ok_or_else(|| anyhow!("capture #{id} not found"))?;

    let mut output = format!(
        "Capture #{}\nCaptured: {}\nImage: {} bytes\n\n{}\n\nRaw reply:\n{}",
        record.id,
        format_timestamp(&record.captured_at),
        record.source_image.len(),
        parse_reply(&record.raw_reply).display_text(),
        record.raw_reply
    );

    if let Some(path) = image_out {
        tokio::fs::write(path, &record.source_image)
            .await
            .with_context(|| format!("failed to write image to {}", path.display()))?;
        output.push_str(&format!("\n\nImage written to {}", path.display()));
    }

    Ok(output)
}

pub(crate) async fn export(state: &AppState, output: Option<&Path>) -> Result<String> {
    let records = state.db.list_captured_responses().await?;
    let contacts = export_contacts(&records);
    let json = serde_json::to_string_pretty(&contacts).context("failed to serialize contacts")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write export to {}", path.display()))?;
            Ok(format!(
                "Exported {} contacts to {}",
                contacts.len(),
                path.display()
            ))
        }
        None => Ok(json),
    }
}

pub(crate) fn show_config(state: &AppState) -> String {
    render_config(
        &state.data_dir,
        &state.settings.inference(),
        &state.settings.stored_inference(),
    )
}

/// Effective settings, with values that came from the environment marked.
fn render_config(data_dir: &Path, effective: &InferenceSettings, stored: &InferenceSettings) -> String {
    let origin = |differs: bool, env: &str| {
        if differs {
            format!(" (from {env})")
        } else {
            String::new()
        }
    };

    format!(
        "data dir:      {}\nendpoint:      {}{}\nmodel:         {}{}\napi key:       {}{}\ntimeout:       {}s\nmax dimension: {}px\njpeg quality:  {}",
        data_dir.display(),
        effective.endpoint,
        origin(effective.endpoint != stored.endpoint, ENDPOINT_ENV),
        effective.model,
        origin(effective.model != stored.model, MODEL_ENV),
        effective.masked_api_key(),
        origin(effective.api_key != stored.api_key, API_KEY_ENV),
        effective.timeout_secs,
        effective.max_image_dimension,
        effective.jpeg_quality,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(dir.path().join("data")).unwrap();
        (dir, state)
    }

    #[tokio::test]
    async fn show_writes_the_stored_image() {
        let (dir, state) = open_state();
        let stored = state
            .db
            .insert_captured_response(r#"{"first_name":"Ana"}"#.into(), vec![9, 8, 7])
            .await
            .unwrap();

        let out_path = dir.path().join("card.jpg");
        let output = show_capture(&state, stored.id, Some(out_path.as_path())).await.unwrap();

        assert!(output.contains("First Name: Ana"));
        assert_eq!(std::fs::read(out_path).unwrap(), vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn show_unknown_capture_is_an_error() {
        let (_dir, state) = open_state();
        let err = show_capture(&state, 99, None).await.unwrap_err();
        assert!(err.to_string().contains("#99"));
    }

    #[tokio::test]
    async fn export_writes_only_contacts() {
        let (dir, state) = open_state();
        state
            .db
            .insert_captured_response(r#"{"company_name":"Acme"}"#.into(), vec![1])
            .await
            .unwrap();
        state
            .db
            .insert_captured_response("just prose".into(), vec![2])
            .await
            .unwrap();

        let path = dir.path().join("contacts.json");
        let message = export(&state, Some(path.as_path())).await.unwrap();
        assert!(message.starts_with("Exported 1 contacts"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["company_name"], "Acme");
    }

    #[tokio::test]
    async fn logs_list_newest_first() {
        let (_dir, state) = open_state();
        for name in ["first", "second"] {
            state
                .db
                .insert_captured_response(name.into(), vec![0])
                .await
                .unwrap();
        }

        let output = list_logs(&state, None).await.unwrap();
        let second = output.find("second").unwrap();
        let first = output.find("first").unwrap();
        assert!(second < first);
    }

    #[test]
    fn config_masks_api_key() {
        let (_dir, state) = open_state();
        state
            .settings
            .update_inference(|s| s.api_key = "secret-token".into())
            .unwrap();

        let output = show_config(&state);
        assert!(!output.contains("secret-token"));
    }

    #[test]
    fn config_marks_values_overridden_by_environment() {
        let stored = InferenceSettings::default();
        let effective = InferenceSettings {
            endpoint: "http://gpu-box:11434/api/chat".into(),
            api_key: "env-key-9876".into(),
            ..stored.clone()
        };

        let output = render_config(Path::new("/data"), &effective, &stored);
        assert!(output.contains("endpoint:      http://gpu-box:11434/api/chat (from CARDSCAN_ENDPOINT)"), "{output}");
        assert!(output.contains("api key:       ********9876 (from CARDSCAN_API_KEY)"), "{output}");
        assert!(output.contains(&format!("model:         {}\n", stored.model)), "{output}");
        assert!(!output.contains("CARDSCAN_MODEL"), "{output}");
    }
}
