//! Advisory lookup of external tools on PATH.

/// Tools the provisioning flow shells out to
pub const EXTERNAL_TOOLS: &[&str] = &["git", "node", "npm", "ffmpeg"];

/// Names from `tools` that cannot be found; each is logged as a warning
pub fn check_tools(tools: &[&str]) -> Vec<String> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect();

    for tool in &missing {
        tracing::warn!("{} not found on PATH; steps that need it will fail", tool);
    }
    if missing.is_empty() {
        tracing::debug!("All external tools found");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported_not_fatal() {
        let missing = check_tools(&["comfy-stack-definitely-not-a-tool"]);
        assert_eq!(missing, vec!["comfy-stack-definitely-not-a-tool"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_present_tool_is_not_reported() {
        assert!(check_tools(&["sh"]).is_empty());
    }
}
