use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid configuration json: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("configuration rejected: {0}")]
    InvalidConfig(String),

    #[error("infinite mode has not been unlocked")]
    InfiniteLocked,

    #[error("unlock storage failed: {0}")]
    Storage(String),

    #[error("no run in progress")]
    NoRun,
}

impl From<GameError> for wasm_bindgen::JsValue {
    fn from(err: GameError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
