#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tempfile::TempDir;
use tower::ServiceExt;

use paygate_api::config::{AppConfig, MethodsConfig, ProcessorConfig};
use paygate_api::entities::order;
use paygate_api::errors::ServiceError;
use paygate_api::events::EventSender;
use paygate_api::processor::types::{
    CardCharge, ChargeResult, ChargeStatus, Customer, CustomerDraft, CustomerUpdate, Invoice,
    InvoiceDraft, PaymentAttempt,
};
use paygate_api::processor::{Lookup, ProcessorApi};
use paygate_api::store::memory::InMemoryOrderStore;
use paygate_api::AppState;

pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Scripted processor for API-level tests: remembers created resources,
/// attaches the scripted payments to new invoices.
#[derive(Default)]
pub struct ScriptedProcessor {
    customers: Mutex<Vec<Customer>>,
    invoices: Mutex<Vec<Invoice>>,
    invoice_payments: Mutex<Vec<PaymentAttempt>>,
    charge_status: Mutex<Option<ChargeStatus>>,
    creates: AtomicUsize,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_invoice_payments(&self, payments: Vec<PaymentAttempt>) {
        *self.invoice_payments.lock().unwrap() = payments;
    }

    #[allow(dead_code)]
    pub fn script_charge_status(&self, status: ChargeStatus) {
        *self.charge_status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl ProcessorApi for ScriptedProcessor {
    async fn get_customer(&self, id: &str) -> Lookup<Customer> {
        match self.customers.lock().unwrap().iter().find(|c| c.id == id) {
            Some(c) => Lookup::Found(c.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, ServiceError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        let customer = Customer {
            id: format!("cus_{n}"),
            name: draft.name.clone(),
            email: draft.email.clone(),
            document_number: draft.document_number.clone(),
        };
        self.customers.lock().unwrap().push(customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        _id: &str,
        _update: &CustomerUpdate,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn get_invoice(&self, id: &str) -> Lookup<Invoice> {
        match self.invoices.lock().unwrap().iter().find(|i| i.id == id) {
            Some(i) => Lookup::Found(i.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn create_invoice(&self, _draft: &InvoiceDraft) -> Result<Invoice, ServiceError> {
        let n = self.invoices.lock().unwrap().len() + 1;
        let invoice = Invoice {
            id: format!("inv_{n}"),
            status: Some("pending".into()),
            payments: self.invoice_payments.lock().unwrap().clone(),
        };
        self.invoices.lock().unwrap().push(invoice.clone());
        Ok(invoice)
    }

    async fn charge_card(
        &self,
        _invoice_id: &str,
        _charge: &CardCharge,
    ) -> Result<ChargeResult, ServiceError> {
        Ok(ChargeResult {
            id: "chg_1".into(),
            status: self
                .charge_status
                .lock()
                .unwrap()
                .unwrap_or(ChargeStatus::Approved),
        })
    }
}

pub struct TestApp {
    router: Router,
    pub store: Arc<InMemoryOrderStore>,
    pub processor: Arc<ScriptedProcessor>,
    _artifact_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_secret(Some(WEBHOOK_SECRET.to_string())).await
    }

    pub async fn with_secret(webhook_secret: Option<String>) -> Self {
        let artifact_dir = TempDir::new().expect("artifact dir");
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            environment: "test".into(),
            log_level: "info".into(),
            log_json: false,
            auto_migrate: false,
            processor: ProcessorConfig {
                api_key: "test-key".into(),
                live_mode: false,
                base_url: None,
                timeout_secs: 5,
            },
            methods: MethodsConfig::default(),
            store_name: "Minha Loja".into(),
            max_installments: 12,
            webhook_secret,
            webhook_tolerance_secs: 300,
            artifact_dir: artifact_dir.path().display().to_string(),
            artifact_base_url: None,
            artifact_timeout_secs: 5,
        };

        let store = Arc::new(InMemoryOrderStore::new());
        let processor = Arc::new(ScriptedProcessor::new());
        let (events, mut rx) = EventSender::channel(64);
        let event_task = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let state = AppState::new(
            store.clone(),
            processor.clone(),
            Arc::new(config.clone()),
            events,
        );
        let router = paygate_api::app_router(&config.artifact_dir).with_state(state);

        Self {
            router,
            store,
            processor,
            _artifact_dir: artifact_dir,
            _event_task: event_task,
        }
    }

    pub async fn seed_order(&self, id: i64) -> order::Model {
        let order = order_fixture(id);
        self.store.insert_order(order.clone()).await;
        order
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request");
        self.send(request).await
    }

    /// Signed webhook delivery using the shared-secret HMAC scheme.
    pub async fn deliver_webhook(&self, secret: &str, payload: &Value) -> (StatusCode, Value) {
        let body = payload.to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_webhook(secret, timestamp, body.as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-timestamp", timestamp.to_string())
            .header("x-signature", signature)
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn sign_webhook(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn order_fixture(id: i64) -> order::Model {
    use chrono::Utc;
    use rust_decimal::Decimal;

    order::Model {
        id,
        order_number: format!("{id}-1001"),
        customer_account_id: Some(501),
        status: "pending".into(),
        payment_method: None,
        total_amount: Decimal::new(12990, 2),
        currency: "BRL".into(),
        billing_first_name: "Ana".into(),
        billing_last_name: "Souza".into(),
        billing_company: None,
        billing_email: "ana@example.com".into(),
        billing_phone: Some("+55 62 99999-0000".into()),
        billing_address_1: Some("Rua das Flores, 100".into()),
        billing_address_2: None,
        billing_neighborhood: Some("Centro".into()),
        billing_city: Some("Goiânia".into()),
        billing_state: Some("GO".into()),
        billing_postcode: Some("74000-000".into()),
        transaction_id: None,
        paid_at: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn pix_attempt() -> PaymentAttempt {
    use paygate_api::processor::types::Payable;

    PaymentAttempt {
        id: "pay_pix".into(),
        payment_method: "PIX".into(),
        status: Some("PENDING".into()),
        amount: Some(12990),
        payable: Some(Payable {
            copy_paste: Some("00020126580014br.gov.bcb.pix...".into()),
            qr_code_base64: Some("cGl4".into()),
            ..Payable::default()
        }),
    }
}
