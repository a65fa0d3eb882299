use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("duplicate flow id: {0}")]
  DuplicateFlow(String),

  #[error("duplicate component id in flow '{flow}': {component}")]
  DuplicateComponent { flow: String, component: String },

  #[error("connection in flow '{flow}' references unknown component: {component}")]
  UnknownComponent { flow: String, component: String },

  #[error("connection in flow '{flow}' targets unknown input '{input}' of {component}")]
  UnknownInput {
    flow: String,
    component: String,
    input: String,
  },

  #[error("connection in flow '{flow}' leaves unknown output '{output}' of {component}")]
  UnknownOutput {
    flow: String,
    component: String,
    output: String,
  },
}
