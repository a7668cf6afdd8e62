use std::path::Path;

use anyhow::Context;
use indoc::formatdoc;

use crate::{BackendKind, Config, LlmConfig};

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        anyhow::anyhow!(formatdoc! {r#"
            Failed to parse configuration file {path}:

            {e}

            Example configuration:

              [llm]
              default_backend = "ollama"

              [llm.backends.ollama]
              type = "ollama"
              base_url = "http://localhost:11434"

              [llm.routing]
              llama3 = "ollama"
        "#, path = path.display()})
    })?;

    for warning in validate_routing(&config.llm) {
        log::warn!("{warning}");
    }

    if config.llm.has_routing_table() {
        log::debug!(
            "Loaded routing table with {} backend(s) and {} model route(s)",
            config.llm.backends.len(),
            config.llm.routing.len()
        );
    } else {
        log::debug!(
            "No routing table configured, all models go to Ollama at {}",
            config.llm.ollama_base_url
        );
    }

    Ok(config)
}

/// Validates the routing table and returns warnings.
///
/// Nothing here is fatal: a model routed to a missing backend fails per request, so the rest of
/// the table keeps working.
pub(crate) fn validate_routing(config: &LlmConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.has_routing_table() {
        return warnings;
    }

    if let Some(default) = &config.default_backend
        && !config.backends.contains_key(default)
    {
        warnings.push(format!("Default backend '{default}' is not defined in [llm.backends]"));
    }

    for (model, backend) in &config.routing {
        if !config.backends.contains_key(backend) {
            warnings.push(format!(
                "Model '{model}' is routed to backend '{backend}', which is not defined in [llm.backends]"
            ));
        }
    }

    for (name, backend) in &config.backends {
        if let BackendKind::Unsupported(kind) = &backend.kind {
            warnings.push(format!(
                "Backend '{name}' has unsupported type '{kind}'; requests routed to it will be rejected"
            ));
        }
    }

    warnings
}
