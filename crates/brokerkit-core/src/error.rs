use std::error::Error;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Formats an error together with every `source()` below it, one per line.
pub fn format_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();

    while let Some(err) = source {
        chain.push(format!("  caused by: {}", err));
        source = err.source();
    }

    chain.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: CoreError,
    }

    #[test]
    fn chain_includes_sources() {
        let err = Outer {
            inner: CoreError::Config("missing field".to_string()),
        };
        let chain = format_error_chain(&err);
        assert_eq!(
            chain,
            "outer failure\n  caused by: config error: missing field"
        );
    }

    #[test]
    fn chain_of_leaf_error_is_its_message() {
        let err = CoreError::Runtime("no reactor".to_string());
        assert_eq!(format_error_chain(&err), "runtime error: no reactor");
    }
}
