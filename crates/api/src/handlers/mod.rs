pub mod executions;
pub mod webhooks;
pub mod workflows;

/// Builds an `Engine` for a stored workflow's payload against the shared
/// config/registry, seeding the given trigger input as a `trigger` constant.
fn build_engine(
    state: &crate::AppState,
    stored: &db::StoredWorkflow,
    trigger_input: serde_json::Value,
) -> Result<engine::Engine, engine::EngineError> {
    let workflow: engine::Workflow = serde_json::from_value(stored.definition.clone())
        .map_err(|e| engine::EngineError::InvalidPayload(e.to_string()))?;

    let mut constants = std::collections::HashMap::new();
    constants.insert("trigger".to_string(), trigger_input);

    let engine = engine::Engine::new(workflow.payload, state.config.clone(), state.registry.clone())?
        .with_workflow_id(workflow.id)
        .with_constants(constants);
    Ok(engine)
}
