//! Persists extracted payment data onto the order and materializes payment
//! artifacts (Pix QR PNG, bank slip PDF) on local disk.
//!
//! Metadata writes are the durable record and must succeed; artifact
//! materialization is best effort. A failed decode, download, or disk write
//! is logged and the checkout proceeds, because the buyer can still pay from
//! the copy-paste code or the hosted slip URL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{instrument, warn};

use crate::errors::ServiceError;
use crate::processor::types::PaymentMethod;
use crate::services::payloads::{BankSlipPaymentData, CardPaymentData, PixPaymentData};
use crate::store::{meta_keys, OrderStore};

/// Local artifact storage. Filenames are deterministic per order so a
/// re-checkout overwrites instead of accumulating files.
#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl ArtifactStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        base_url: Option<String>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            base_url,
            http: reqwest::Client::builder()
                .timeout(download_timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// URL the stored file is served under: the configured base when set,
    /// otherwise a path relative to this service's own static mount.
    fn public_url(&self, file_name: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
            None => format!("/artifacts/{file_name}"),
        }
    }

    async fn write(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(file_name), bytes).await?;
        Ok(self.public_url(file_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub struct PaymentDataPersister {
    store: Arc<dyn OrderStore>,
    artifacts: ArtifactStore,
}

impl PaymentDataPersister {
    pub fn new(store: Arc<dyn OrderStore>, artifacts: ArtifactStore) -> Self {
        Self { store, artifacts }
    }

    async fn put_present(
        &self,
        order_id: i64,
        key: &str,
        value: Option<&String>,
    ) -> Result<(), ServiceError> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.store.put_meta(order_id, key, value).await?;
        }
        Ok(())
    }

    /// Marks which method the latest record belongs to, so a retried
    /// checkout on another method takes over the receipt.
    async fn mark_method(
        &self,
        order_id: i64,
        method: PaymentMethod,
    ) -> Result<(), ServiceError> {
        self.store
            .put_meta(order_id, meta_keys::PAYMENT_METHOD, &method.to_string())
            .await
    }

    #[instrument(skip(self, data), fields(order_id, payment_id = %data.payment_id))]
    pub async fn persist_pix(
        &self,
        order_id: i64,
        data: &PixPaymentData,
    ) -> Result<(), ServiceError> {
        self.mark_method(order_id, PaymentMethod::Pix).await?;
        self.store
            .put_meta(order_id, meta_keys::PIX_PAYMENT_ID, &data.payment_id)
            .await?;
        self.put_present(order_id, meta_keys::PIX_STATUS, data.status.as_ref())
            .await?;
        if let Some(amount) = data.amount {
            self.store
                .put_meta(order_id, meta_keys::PIX_AMOUNT, &amount.to_string())
                .await?;
        }
        self.put_present(order_id, meta_keys::PIX_COPY_PASTE, data.copy_paste.as_ref())
            .await?;
        self.put_present(order_id, meta_keys::PIX_QR_BASE64, data.qr_base64.as_ref())
            .await?;
        self.put_present(order_id, meta_keys::PIX_EXPIRES_AT, data.expires_at.as_ref())
            .await?;

        if let Some(encoded) = data.qr_base64.as_deref() {
            match self.save_qr_png(order_id, encoded).await {
                Ok(url) => {
                    self.store
                        .put_meta(order_id, meta_keys::PIX_QR_PNG_URL, &url)
                        .await?;
                }
                Err(e) => warn!(order_id, error = %e, "could not materialize Pix QR PNG"),
            }
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(order_id, payment_id = %data.payment_id))]
    pub async fn persist_bank_slip(
        &self,
        order_id: i64,
        data: &BankSlipPaymentData,
    ) -> Result<(), ServiceError> {
        self.mark_method(order_id, PaymentMethod::BankSlip).await?;
        self.store
            .put_meta(order_id, meta_keys::BANKSLIP_PAYMENT_ID, &data.payment_id)
            .await?;
        self.put_present(order_id, meta_keys::BANKSLIP_STATUS, data.status.as_ref())
            .await?;
        if let Some(amount) = data.amount {
            self.store
                .put_meta(order_id, meta_keys::BANKSLIP_AMOUNT, &amount.to_string())
                .await?;
        }
        self.put_present(
            order_id,
            meta_keys::BANKSLIP_IDENTIFICATION_FIELD,
            data.identification_field.as_ref(),
        )
        .await?;
        self.put_present(
            order_id,
            meta_keys::BANKSLIP_NUMBER,
            data.bank_slip_number.as_ref(),
        )
        .await?;
        self.put_present(order_id, meta_keys::BANKSLIP_BARCODE, data.barcode.as_ref())
            .await?;
        self.put_present(
            order_id,
            meta_keys::BANKSLIP_URL,
            data.bank_slip_url.as_ref(),
        )
        .await?;

        if let Some(url) = data.bank_slip_url.as_deref() {
            match self.download_slip_pdf(order_id, url).await {
                Ok(local_url) => {
                    self.store
                        .put_meta(order_id, meta_keys::BANKSLIP_PDF_URL, &local_url)
                        .await?;
                }
                Err(e) => warn!(order_id, error = %e, "could not download bank slip PDF"),
            }
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(order_id, payment_id = %data.payment_id))]
    pub async fn persist_card(
        &self,
        order_id: i64,
        data: &CardPaymentData,
        installments: u32,
    ) -> Result<(), ServiceError> {
        self.mark_method(order_id, PaymentMethod::CreditCard).await?;
        self.store
            .put_meta(order_id, meta_keys::CARD_PAYMENT_ID, &data.payment_id)
            .await?;
        self.put_present(order_id, meta_keys::CARD_STATUS, data.status.as_ref())
            .await?;
        if let Some(amount) = data.amount {
            self.store
                .put_meta(order_id, meta_keys::CARD_AMOUNT, &amount.to_string())
                .await?;
        }
        self.put_present(order_id, meta_keys::CARD_CHARGE_ID, data.charge_id.as_ref())
            .await?;
        self.store
            .put_meta(
                order_id,
                meta_keys::CARD_INSTALLMENTS,
                &installments.to_string(),
            )
            .await
    }

    async fn save_qr_png(&self, order_id: i64, encoded: &str) -> anyhow::Result<String> {
        // Some payloads arrive as a data URI; only the payload decodes.
        let encoded = encoded
            .rsplit_once("base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(encoded);
        let bytes = BASE64.decode(encoded.trim())?;
        let url = self
            .artifacts
            .write(&format!("pix-{order_id}.png"), &bytes)
            .await?;
        Ok(url)
    }

    async fn download_slip_pdf(&self, order_id: i64, url: &str) -> anyhow::Result<String> {
        let response = self
            .artifacts
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/pdf,*/*")
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            anyhow::bail!("empty response body from {url}");
        }
        let url = self
            .artifacts
            .write(&format!("boleto-{order_id}.pdf"), &bytes)
            .await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryOrderStore;
    use tempfile::TempDir;

    fn persister(store: Arc<InMemoryOrderStore>, dir: &TempDir) -> PaymentDataPersister {
        PaymentDataPersister::new(
            store,
            ArtifactStore::new(dir.path(), None, Duration::from_secs(20)),
        )
    }

    fn pix_data() -> PixPaymentData {
        PixPaymentData {
            payment_id: "pay_1".into(),
            status: Some("PENDING".into()),
            amount: Some(12990),
            copy_paste: Some("00020126...".into()),
            // "pix" in base64; any bytes make a valid artifact for the test
            qr_base64: Some("cGl4".into()),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn pix_persist_writes_meta_and_materializes_png() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();
        persister(store.clone(), &dir)
            .persist_pix(9, &pix_data())
            .await
            .unwrap();

        assert_eq!(
            store.get_meta(9, meta_keys::PIX_PAYMENT_ID).await.unwrap(),
            Some("pay_1".into())
        );
        assert_eq!(
            store.get_meta(9, meta_keys::PIX_AMOUNT).await.unwrap(),
            Some("12990".into())
        );
        // Absent fields write nothing
        assert_eq!(store.get_meta(9, meta_keys::PIX_EXPIRES_AT).await.unwrap(), None);
        assert_eq!(
            store.get_meta(9, meta_keys::PAYMENT_METHOD).await.unwrap(),
            Some("PIX".into())
        );

        let png = dir.path().join("pix-9.png");
        assert_eq!(std::fs::read(&png).unwrap(), b"pix");
        assert_eq!(
            store.get_meta(9, meta_keys::PIX_QR_PNG_URL).await.unwrap(),
            Some("/artifacts/pix-9.png".into())
        );
    }

    #[tokio::test]
    async fn pix_persist_strips_data_uri_prefix_and_overwrites() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();
        let persister = persister(store.clone(), &dir);

        persister.persist_pix(9, &pix_data()).await.unwrap();

        let mut updated = pix_data();
        updated.qr_base64 = Some("data:image/png;base64,bmV3".into());
        persister.persist_pix(9, &updated).await.unwrap();

        // Re-checkout replaced the file, same name
        assert_eq!(std::fs::read(dir.path().join("pix-9.png")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn bad_qr_base64_is_tolerated() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();
        let mut data = pix_data();
        data.qr_base64 = Some("not base64 at all!!!".into());

        persister(store.clone(), &dir)
            .persist_pix(9, &data)
            .await
            .unwrap();

        // Meta written even though the artifact failed
        assert_eq!(
            store.get_meta(9, meta_keys::PIX_PAYMENT_ID).await.unwrap(),
            Some("pay_1".into())
        );
        assert_eq!(store.get_meta(9, meta_keys::PIX_QR_PNG_URL).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bank_slip_download_failure_keeps_hosted_url() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();
        let data = BankSlipPaymentData {
            payment_id: "pay_2".into(),
            status: Some("PENDING".into()),
            amount: Some(12990),
            identification_field: Some("34191.79001".into()),
            bank_slip_number: None,
            barcode: None,
            // Unroutable host: the download fails, the persist must not
            bank_slip_url: Some("http://127.0.0.1:1/slip.pdf".into()),
        };

        persister(store.clone(), &dir)
            .persist_bank_slip(11, &data)
            .await
            .unwrap();

        assert_eq!(
            store.get_meta(11, meta_keys::BANKSLIP_URL).await.unwrap(),
            Some("http://127.0.0.1:1/slip.pdf".into())
        );
        assert_eq!(
            store.get_meta(11, meta_keys::BANKSLIP_PDF_URL).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn empty_pdf_body_is_not_materialized() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/slip.pdf"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let data = BankSlipPaymentData {
            payment_id: "pay_2".into(),
            status: None,
            amount: None,
            identification_field: None,
            bank_slip_number: None,
            barcode: None,
            bank_slip_url: Some(format!("{}/slip.pdf", server.uri())),
        };

        persister(store.clone(), &dir)
            .persist_bank_slip(11, &data)
            .await
            .unwrap();

        // A 200 with no bytes is as useless as a failed download: no file,
        // no local URL, hosted URL still recorded
        assert!(!dir.path().join("boleto-11.pdf").exists());
        assert_eq!(
            store.get_meta(11, meta_keys::BANKSLIP_PDF_URL).await.unwrap(),
            None
        );
        assert_eq!(
            store.get_meta(11, meta_keys::BANKSLIP_URL).await.unwrap(),
            Some(format!("{}/slip.pdf", server.uri()))
        );
    }

    #[tokio::test]
    async fn bank_slip_pdf_is_downloaded_when_reachable() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/slip.pdf"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()),
            )
            .mount(&server)
            .await;

        let data = BankSlipPaymentData {
            payment_id: "pay_2".into(),
            status: None,
            amount: None,
            identification_field: None,
            bank_slip_number: None,
            barcode: None,
            bank_slip_url: Some(format!("{}/slip.pdf", server.uri())),
        };

        persister(store.clone(), &dir)
            .persist_bank_slip(11, &data)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("boleto-11.pdf")).unwrap(),
            b"%PDF-1.4"
        );
        assert_eq!(
            store.get_meta(11, meta_keys::BANKSLIP_PDF_URL).await.unwrap(),
            Some("/artifacts/boleto-11.pdf".into())
        );
    }

    #[tokio::test]
    async fn card_persist_records_installments() {
        let store = Arc::new(InMemoryOrderStore::new());
        let dir = TempDir::new().unwrap();
        let data = CardPaymentData {
            payment_id: "pay_3".into(),
            status: Some("APPROVED".into()),
            amount: Some(12990),
            charge_id: Some("chg_1".into()),
        };

        persister(store.clone(), &dir)
            .persist_card(13, &data, 3)
            .await
            .unwrap();

        assert_eq!(
            store.get_meta(13, meta_keys::CARD_INSTALLMENTS).await.unwrap(),
            Some("3".into())
        );
        assert_eq!(
            store.get_meta(13, meta_keys::CARD_CHARGE_ID).await.unwrap(),
            Some("chg_1".into())
        );
    }
}
