use serde::Deserialize;

use crate::providers::{ApiSnafu, ProviderError};

/// Alpha Vantage answers errors and throttling with HTTP 200 and a JSON body,
/// even when CSV was requested.
#[derive(Deserialize, Debug, Default)]
pub struct AlphaVantageMessage {
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

impl AlphaVantageMessage {
    fn into_message(self) -> Option<String> {
        self.error_message.or(self.note).or(self.information)
    }
}

/// Returns the body when it is a CSV payload, or the vendor's message as an error.
pub fn check_body(body: &str) -> Result<&str, ProviderError> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return Ok(body);
    }
    let message = serde_json::from_str::<AlphaVantageMessage>(trimmed)
        .ok()
        .and_then(AlphaVantageMessage::into_message)
        .unwrap_or_else(|| trimmed.to_string());
    ApiSnafu {
        message,
        status: None::<u16>,
    }
    .fail()
}
