use serde::{Deserialize, Serialize};

use super::{MlClassifier, Prediction, ServiceError};

/// JSON-over-HTTP client for a hosted document classification model.
///
/// POSTs `{"text": ...}` and expects `{"predictions": [{"label", "score"}]}`.
pub struct HttpMlClassifier {
    endpoint: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    predictions: Vec<Prediction>,
}

impl HttpMlClassifier {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, ServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            timeout_secs,
        })
    }
}

impl MlClassifier for HttpMlClassifier {
    fn classify(&self, text: &str) -> Result<Vec<Prediction>, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text })
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ServiceError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    ServiceError::Timeout(self.timeout_secs)
                } else {
                    ServiceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ClassifyResponse = response
            .json()
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        Ok(parsed.predictions)
    }
}
