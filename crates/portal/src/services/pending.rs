//! Pending payments: payments received before the payer had an account.

use bookvision_core::{Email, PendingPayment};
use tracing::instrument;

use crate::storage::{BlobStore, Scope, StorageError};

/// Pending-payment records, one per normalized email.
#[derive(Clone)]
pub struct PendingPayments {
    store: BlobStore,
}

impl PendingPayments {
    #[must_use]
    pub const fn new(store: BlobStore) -> Self {
        Self { store }
    }

    /// Store a record, replacing any earlier one for the same email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    #[instrument(skip(self, payment), fields(email = %payment.email, status = %payment.status))]
    pub async fn record(&self, payment: &PendingPayment) -> Result<(), StorageError> {
        self.store
            .set_json(&Scope::PendingPayments, payment.email.as_str(), payment)
            .await
    }

    /// The record for `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails or the record is corrupt.
    pub async fn get(&self, email: &Email) -> Result<Option<PendingPayment>, StorageError> {
        self.store
            .get_json(&Scope::PendingPayments, email.as_str())
            .await
    }

    /// Remove and return the record for `email`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read or delete fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn take(&self, email: &Email) -> Result<Option<PendingPayment>, StorageError> {
        let payment = self.get(email).await?;
        if payment.is_some() {
            self.store
                .delete(&Scope::PendingPayments, email.as_str())
                .await?;
        }
        Ok(payment)
    }

    /// Delete the record for `email`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub async fn remove(&self, email: &Email) -> Result<bool, StorageError> {
        self.store
            .delete(&Scope::PendingPayments, email.as_str())
            .await
    }

    /// All records, ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if listing or reading fails.
    pub async fn list(&self) -> Result<Vec<PendingPayment>, StorageError> {
        let keys = self.store.list(&Scope::PendingPayments, "").await?;
        let mut payments = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(payment) = self
                .store
                .get_json::<PendingPayment>(&Scope::PendingPayments, &key)
                .await?
            {
                payments.push(payment);
            }
        }
        Ok(payments)
    }
}
