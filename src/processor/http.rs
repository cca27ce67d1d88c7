//! reqwest-backed [`ProcessorApi`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::ProcessorConfig;
use crate::errors::ServiceError;

use super::types::{
    CardCharge, ChargeResult, Customer, CustomerDraft, CustomerUpdate, Invoice, InvoiceDraft,
};
use super::{Lookup, ProcessorApi};

const LIVE_BASE_URL: &str = "https://api.payments62.com/v1";
const SANDBOX_BASE_URL: &str = "https://sandbox.payments62.com/v1";

pub struct HttpProcessorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProcessorClient {
    pub fn new(cfg: &ProcessorConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client init: {e}")))?;

        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| {
                if cfg.live_mode {
                    LIVE_BASE_URL.to_string()
                } else {
                    SANDBOX_BASE_URL.to_string()
                }
            })
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn lookup<T: DeserializeOwned>(&self, path: &str) -> Lookup<T> {
        let response = self
            .http
            .get(self.url(path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return Lookup::TransportError(e.to_string()),
        };

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Lookup::NotFound,
            status if status.is_success() => match response.json::<T>().await {
                Ok(body) => Lookup::Found(body),
                Err(e) => Lookup::TransportError(format!("decode: {e}")),
            },
            status => Lookup::TransportError(format!("http {status}")),
        }
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let response = self
            .http
            .post(self.url(path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "processor rejected request");
            return Err(ServiceError::ExternalServiceError(format!(
                "http {status}: {detail}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("decode: {e}")))
    }
}

#[async_trait]
impl ProcessorApi for HttpProcessorClient {
    async fn get_customer(&self, id: &str) -> Lookup<Customer> {
        self.lookup(&format!("/customers/{id}")).await
    }

    async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, ServiceError> {
        self.post("/customers", draft).await
    }

    async fn update_customer(
        &self,
        id: &str,
        update: &CustomerUpdate,
    ) -> Result<(), ServiceError> {
        let _: serde_json::Value = self.post(&format!("/customers/{id}"), update).await?;
        Ok(())
    }

    async fn get_invoice(&self, id: &str) -> Lookup<Invoice> {
        self.lookup(&format!("/invoices/{id}")).await
    }

    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, ServiceError> {
        self.post("/invoices", draft).await
    }

    async fn charge_card(
        &self,
        invoice_id: &str,
        charge: &CardCharge,
    ) -> Result<ChargeResult, ServiceError> {
        self.post(&format!("/invoices/{invoice_id}/charges"), charge)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpProcessorClient {
        HttpProcessorClient::new(&ProcessorConfig {
            api_key: "test-key".into(),
            live_mode: false,
            base_url: Some(server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn get_customer_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers/cus_1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "cus_1"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_matches!(
            client.get_customer("cus_1").await,
            Lookup::Found(c) if c.id == "cus_1"
        );
    }

    #[tokio::test]
    async fn get_customer_not_found_is_distinct_from_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers/stale"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customers/boom"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_matches!(client.get_customer("stale").await, Lookup::NotFound);
        assert_matches!(client.get_customer("boom").await, Lookup::TransportError(_));
    }

    #[tokio::test]
    async fn create_invoice_maps_rejection_to_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invoices"))
            .respond_with(ResponseTemplate::new(422).set_body_string("amount required"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let draft = InvoiceDraft {
            customer: "cus_1".into(),
            payment_method: super::super::types::PaymentMethod::Pix,
            amount: 1000,
            due_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            description: "Order #1".into(),
            installments: Some(1),
            immutable: Some(true),
            tags: vec![],
        };
        assert_matches!(
            client.create_invoice(&draft).await,
            Err(ServiceError::ExternalServiceError(_))
        );
    }
}
