//! Payment records received from the billing webhook.
//!
//! The file backend appends one JSON object per line to `payments.jsonl`.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sx_domain::trace::TraceEvent;

use crate::error::{AccountError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub user_id: u64,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub struct PaymentLedger {
    entries: Mutex<Vec<Payment>>,
    path: Option<PathBuf>,
}

impl PaymentLedger {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            path: None,
        }
    }

    /// Load or create `dir/payments.jsonl`.  Blank lines are skipped; a
    /// malformed line is an error.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("payments.jsonl");
        let mut entries = Vec::new();
        if path.exists() {
            let reader = BufReader::new(std::fs::File::open(&path)?);
            for (n, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let payment: Payment = serde_json::from_str(&line).map_err(|e| {
                    AccountError::Storage(format!("{}:{}: {e}", path.display(), n + 1))
                })?;
                entries.push(payment);
            }
        }
        tracing::info!(payments = entries.len(), path = %path.display(), "payment ledger loaded");
        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    pub fn record(&self, user_id: u64, amount: i64, status: &str) -> Result<Payment> {
        let status = status.trim();
        if status.is_empty() {
            return Err(AccountError::InvalidInput("status must not be empty".into()));
        }

        let mut entries = self.entries.lock();
        let payment = Payment {
            id: entries.last().map_or(1, |p| p.id + 1),
            user_id,
            amount,
            status: status.to_owned(),
            created_at: Utc::now(),
        };

        if let Some(path) = &self.path {
            let mut line = serde_json::to_string(&payment)?;
            line.push('\n');
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(line.as_bytes())?;
        }
        entries.push(payment.clone());
        drop(entries);

        TraceEvent::PaymentRecorded {
            payment_id: payment.id,
            user_id,
            amount,
            status: payment.status.clone(),
        }
        .emit();

        Ok(payment)
    }

    pub fn list(&self) -> Vec<Payment> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_assigns_sequential_ids() {
        let ledger = PaymentLedger::in_memory();
        let a = ledger.record(1, 1999, "paid").unwrap();
        let b = ledger.record(2, 4999, "pending").unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn empty_status_is_rejected() {
        let ledger = PaymentLedger::in_memory();
        assert!(matches!(
            ledger.record(1, 100, "  "),
            Err(AccountError::InvalidInput(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn jsonl_ledger_survives_reload() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let ledger = PaymentLedger::open(tmp.path()).unwrap();
            ledger.record(7, 1000, "paid").unwrap();
            ledger.record(7, -1000, "refunded").unwrap();
        }
        let raw = std::fs::read_to_string(tmp.path().join("payments.jsonl")).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let ledger = PaymentLedger::open(tmp.path()).unwrap();
        let all = ledger.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].status, "refunded");
        assert_eq!(ledger.record(8, 1, "paid").unwrap().id, 3);
    }

    #[test]
    fn malformed_line_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("payments.jsonl"), "{not json}\n").unwrap();
        assert!(PaymentLedger::open(tmp.path()).is_err());
    }
}
