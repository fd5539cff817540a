mod runtime;

pub use runtime::{InvocationReport, Runtime, ScanReport, SCRIPT_ATTRIBUTES};

use hs_core::ErrorDescriptor;
use hs_dom::{parse_document, Dom};
use hs_runtime::RuntimeOptions;

#[derive(Debug, Clone, Default)]
pub struct CreateRuntimeOptions {
    pub markup: String,
    pub options: Option<RuntimeOptions>,
    pub options_json: Option<String>,
}

/// Loads `markup` into a fresh document and wraps it in a [`Runtime`]. `options_json`, when
/// present, wins over `options`. Behaviours are not installed until [`Runtime::scan`].
pub fn create_runtime(options: CreateRuntimeOptions) -> Result<Runtime, ErrorDescriptor> {
    let runtime_options = match options.options_json.as_deref() {
        Some(raw) => RuntimeOptions::from_json_str(raw)?,
        None => options.options.unwrap_or_default(),
    };
    let document = parse_document(&options.markup)?;
    Ok(Runtime::new(Dom::new(document), runtime_options))
}

/// [`create_runtime`] followed by [`Runtime::scan`].
pub async fn create_scanned_runtime(
    options: CreateRuntimeOptions,
) -> Result<(Runtime, ScanReport), ErrorDescriptor> {
    let runtime = create_runtime(options)?;
    let scan = runtime.scan().await;
    Ok((runtime, scan))
}

#[cfg(test)]
mod tests {
    use super::*;

    use hs_core::{ErrorKind, Value};
    use hs_runtime::ErrorPolicy;

    fn markup(source: &str) -> CreateRuntimeOptions {
        CreateRuntimeOptions {
            markup: source.to_string(),
            ..CreateRuntimeOptions::default()
        }
    }

    #[test]
    fn create_runtime_applies_json_options_over_struct_options() {
        let runtime = create_runtime(CreateRuntimeOptions {
            markup: "<main/>".to_string(),
            options: Some(RuntimeOptions::default()),
            options_json: Some(r#"{"errorPolicy":"abort","globals":{"$n":3}}"#.to_string()),
        })
        .expect("runtime should be created");
        assert_eq!(runtime.evaluator().options().error_policy, ErrorPolicy::Abort);
        assert_eq!(runtime.global("$n"), Some(Value::Number(3.0)));
    }

    #[test]
    fn create_runtime_rejects_bad_markup_and_bad_options() {
        let error = create_runtime(markup("<main>")).expect_err("unclosed markup");
        assert_eq!(error.code, "DOM_MARKUP_PARSE");

        let error = create_runtime(CreateRuntimeOptions {
            markup: "<main/>".to_string(),
            options: None,
            options_json: Some("{".to_string()),
        })
        .expect_err("bad options");
        assert_eq!(error.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn create_scanned_runtime_installs_behaviours() {
        let (runtime, scan) = create_scanned_runtime(markup(
            r#"<main><p id="p" _="init put 'ready' into me"/></main>"#,
        ))
        .await
        .expect("runtime should be created");
        assert_eq!(scan.installed.len(), 1);
        assert_eq!(scan.invocations.len(), 1);
        let p = runtime.select("#p").expect("p");
        assert_eq!(runtime.dom().read(|doc| doc.text_content(p)), "ready");
    }
}
