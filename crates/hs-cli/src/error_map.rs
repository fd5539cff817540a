use std::fmt::Display;

use hs_core::{ErrorDescriptor, ErrorKind};

fn map_error(kind: ErrorKind, code: &'static str, error: impl Display) -> ErrorDescriptor {
    ErrorDescriptor::new(kind, code, error.to_string())
}

pub(crate) fn emit_error(error: ErrorDescriptor) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_KIND:{}", error.kind.as_str());
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    for suggestion in &error.suggestions {
        println!("SUGGESTION:{}", suggestion);
    }
    1
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> ErrorDescriptor {
    map_error(ErrorKind::InvalidArgument, "CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_config_read(error: std::io::Error) -> ErrorDescriptor {
    map_error(ErrorKind::InvalidArgument, "CLI_CONFIG_READ", error)
}

pub(crate) fn map_cli_detail(error: serde_json::Error) -> ErrorDescriptor {
    map_error(ErrorKind::InvalidArgument, "CLI_DETAIL_INVALID", error)
}

pub(crate) fn map_cli_async_runtime(error: std::io::Error) -> ErrorDescriptor {
    map_error(ErrorKind::RuntimeError, "CLI_ASYNC_RUNTIME", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> ErrorDescriptor {
    map_error(ErrorKind::RuntimeError, "CLI_OUTPUT", error)
}

pub(crate) fn map_cli_case(error: hs_tool::HsToolError) -> ErrorDescriptor {
    map_error(ErrorKind::InvalidArgument, "CLI_CASE", error)
}
