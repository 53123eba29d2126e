//! Wire types for the Gemini REST API

use serde::{Deserialize, Serialize};

/// Models used by tpub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Image generation
    Imagen,
    /// Text generation for hashtags
    Flash,
}

impl Model {
    /// Model name in the REST path
    pub fn api_name(&self) -> &'static str {
        match self {
            Model::Imagen => "imagen-4.0-generate-001",
            Model::Flash => "gemini-2.0-flash",
        }
    }

    /// REST method called on the model
    pub fn method(&self) -> &'static str {
        match self {
            Model::Imagen => "predict",
            Model::Flash => "generateContent",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.api_name(), self.method())
    }
}

/// Image prediction request
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
}

impl PredictRequest {
    /// One 16:9 image for `prompt`
    pub fn single(prompt: &str) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "16:9".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}

/// Text generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_request_shape() {
        let json = serde_json::to_value(PredictRequest::single("a chart")).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "a chart");
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
    }

    #[test]
    fn test_predict_response_parses() {
        let body = r#"{"predictions":[{"bytesBase64Encoded":"aGk=","mimeType":"image/png"}]}"#;
        let response: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.predictions[0].bytes_base64_encoded.as_deref(),
            Some("aGk=")
        );
    }

    #[test]
    fn test_filtered_prediction_is_empty() {
        let response: PredictResponse = serde_json::from_str("{}").unwrap();
        assert!(response.predictions.is_empty());
    }

    #[test]
    fn test_first_text() {
        let body = r##"{"candidates":[{"content":{"parts":[{"text":" #경제 #금리\n"}],"role":"model"}}]}"##;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text(), Some(" #경제 #금리\n"));

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), None);
    }

    #[test]
    fn test_model_display() {
        assert_eq!(Model::Flash.to_string(), "gemini-2.0-flash:generateContent");
    }
}
