use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ClassificationResult, Label};

use super::BiasApiClient;

/// Remote bias classifier.
///
/// Both methods resolve every failure mode (network error, non-2xx,
/// malformed body) to `None`: the post is left unlabeled for this session
/// and nothing propagates upward.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Single-item endpoint; used for the opened post.
    async fn classify(&self, text: &str) -> Option<ClassificationResult>;

    /// Batch endpoint invoked with exactly one item; used for feed and
    /// search tiles. The wire contract accepts arrays, but size >1 is a
    /// follow-on optimization nobody has needed yet.
    async fn classify_batched(&self, text: &str) -> Option<ClassificationResult>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct BatchClassifyRequest<'a> {
    texts: [&'a str; 1],
}

#[derive(Deserialize)]
struct WireClassification {
    label: Option<String>,
    confidence: Option<f32>,
}

impl WireClassification {
    fn into_result(self) -> Option<ClassificationResult> {
        let raw = self.label?;
        if raw.trim().is_empty() {
            return None;
        }
        Some(ClassificationResult {
            label: Label::parse(&raw),
            confidence: self.confidence,
        })
    }
}

#[derive(Deserialize)]
struct BatchClassifyResponse {
    #[serde(default)]
    results: Vec<WireClassification>,
}

impl BiasApiClient {
    async fn post_classify<Req, Resp>(&self, path: &str, request: &Req) -> Option<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = match self
            .http()
            .post(self.endpoint(path))
            .timeout(self.request_timeout())
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: "classify", error = %err, path, "classifier unreachable");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                target: "classify",
                status = response.status().as_u16(),
                path,
                "classifier returned an error status"
            );
            return None;
        }

        match response.json::<Resp>().await {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(target: "classify", error = %err, path, "malformed classifier response");
                None
            }
        }
    }
}

#[async_trait]
impl Classifier for BiasApiClient {
    async fn classify(&self, text: &str) -> Option<ClassificationResult> {
        let wire: WireClassification = self
            .post_classify("/classify", &ClassifyRequest { text })
            .await?;
        wire.into_result()
    }

    async fn classify_batched(&self, text: &str) -> Option<ClassificationResult> {
        let wire: BatchClassifyResponse = self
            .post_classify("/classify_batch", &BatchClassifyRequest { texts: [text] })
            .await?;
        wire.results.into_iter().next()?.into_result()
    }
}
