//! # Settings Repository
//!
//! Shop settings are a flat key/value map in the `settings` collection.
//! Values are stored as text and typed on read by [`ShopSettings`].
//!
//! ```text
//! ┌───────────────────┬──────────────────────────┬──────────┐
//! │ key               │ default                  │ category │
//! ├───────────────────┼──────────────────────────┼──────────┤
//! │ invoice_prefix    │ GST                      │ invoice  │
//! │ invoice_counter   │ 0                        │ invoice  │
//! │ financial_year    │ 2025/26                  │ invoice  │
//! │ default_cgst      │ 2.5                      │ tax      │
//! │ default_sgst      │ 2.5                      │ tax      │
//! │ default_state     │ Madhya Pradesh           │ tax      │
//! │ shop_*            │ -                        │ shop     │
//! │ upi_id            │ -                        │ payment  │
//! └───────────────────┴──────────────────────────┴──────────┘
//! ```
//!
//! A value of `-` means "not configured".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use dukaan_core::invoice::financial_year_for;
use dukaan_core::{InvoiceSequence, TaxRate, DEFAULT_CUSTOMER_STATE};

use crate::error::StoreResult;
use crate::memory::counter_value;
use crate::record::{Collection, Filter};
use crate::store::{SharedStore, INVOICE_COUNTER_KEY};

pub const KEY_INVOICE_PREFIX: &str = "invoice_prefix";
pub const KEY_FINANCIAL_YEAR: &str = "financial_year";
pub const KEY_DEFAULT_CGST: &str = "default_cgst";
pub const KEY_DEFAULT_SGST: &str = "default_sgst";
pub const KEY_DEFAULT_STATE: &str = "default_state";

/// Placeholder for an unset text setting.
pub const UNSET: &str = "-";

/// Seeded settings as `(key, value, category)`.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    ("shop_name", UNSET, "shop"),
    ("shop_address", "Harda, Madhya Pradesh", "shop"),
    ("shop_phone", UNSET, "shop"),
    ("shop_gstin", UNSET, "shop"),
    (KEY_INVOICE_PREFIX, "GST", "invoice"),
    (INVOICE_COUNTER_KEY, "0", "invoice"),
    (KEY_FINANCIAL_YEAR, "2025/26", "invoice"),
    (KEY_DEFAULT_CGST, "2.5", "tax"),
    (KEY_DEFAULT_SGST, "2.5", "tax"),
    (KEY_DEFAULT_STATE, DEFAULT_CUSTOMER_STATE, "tax"),
    ("upi_id", UNSET, "payment"),
    ("bank_details", UNSET, "payment"),
];

/// One stored setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub category: Option<String>,
}

// =============================================================================
// Typed View
// =============================================================================

/// Typed view over the settings map.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopSettings {
    pub shop_name: Option<String>,
    pub shop_address: Option<String>,
    pub shop_phone: Option<String>,
    pub shop_gstin: Option<String>,
    pub upi_id: Option<String>,
    pub bank_details: Option<String>,
    /// Prefix, financial year and last issued counter.
    pub sequence: InvoiceSequence,
    pub default_cgst: TaxRate,
    pub default_sgst: TaxRate,
    /// State given to customers created at checkout.
    pub default_state: String,
}

impl ShopSettings {
    /// Builds the typed view. Missing or unparsable values fall back to
    /// defaults; a missing financial year is derived from `today`.
    pub fn from_map(map: &HashMap<String, String>, today: NaiveDate) -> Self {
        let text = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty() && *v != UNSET)
                .map(str::to_string)
        };
        let rate = |key: &str| {
            let parsed = text(key).and_then(|v| match v.parse::<f64>() {
                Ok(pct) if pct >= 0.0 => Some(TaxRate::from_percentage(pct)),
                _ => {
                    warn!(key = %key, value = %v, "Ignoring invalid tax rate setting");
                    None
                }
            });
            TaxRate::or_default_to(parsed, TaxRate::DEFAULT_COMPONENT)
        };

        let counter = match text(INVOICE_COUNTER_KEY) {
            None => 0,
            Some(v) => v.parse().unwrap_or_else(|_| {
                warn!(value = %v, "Invoice counter is not a number, starting from 0");
                0
            }),
        };

        ShopSettings {
            shop_name: text("shop_name"),
            shop_address: text("shop_address"),
            shop_phone: text("shop_phone"),
            shop_gstin: text("shop_gstin"),
            upi_id: text("upi_id"),
            bank_details: text("bank_details"),
            sequence: InvoiceSequence {
                prefix: text(KEY_INVOICE_PREFIX)
                    .unwrap_or_else(|| InvoiceSequence::default().prefix),
                financial_year: text(KEY_FINANCIAL_YEAR)
                    .unwrap_or_else(|| financial_year_for(today)),
                counter,
            },
            default_cgst: rate(KEY_DEFAULT_CGST),
            default_sgst: rate(KEY_DEFAULT_SGST),
            default_state: text(KEY_DEFAULT_STATE)
                .unwrap_or_else(|| DEFAULT_CUSTOMER_STATE.to_string()),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    store: SharedStore,
}

impl SettingsRepository {
    pub fn new(store: SharedStore) -> Self {
        SettingsRepository { store }
    }

    /// Every setting as a key/value map.
    pub async fn all(&self) -> StoreResult<HashMap<String, String>> {
        let records = self
            .store
            .list_all(Collection::Settings, Filter::All, "key")
            .await?;
        let mut map = HashMap::with_capacity(records.len());
        for record in &records {
            let setting: Setting = record.decode()?;
            map.insert(setting.key, setting.value);
        }
        Ok(map)
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Setting>> {
        self.store
            .first(Collection::Settings, Filter::eq("key", key), "")
            .await?
            .map(|r| r.decode())
            .transpose()
    }

    /// Writes a setting, creating it when missing.
    pub async fn set(&self, key: &str, value: &str, category: Option<&str>) -> StoreResult<Setting> {
        debug!(key = %key, "Writing setting");
        let mut payload = Map::new();
        payload.insert("value".to_string(), Value::String(value.to_string()));
        if let Some(category) = category {
            payload.insert("category".to_string(), Value::String(category.to_string()));
        }

        match self.get(key).await? {
            Some(existing) => self
                .store
                .update(Collection::Settings, &existing.id, payload)
                .await?
                .decode(),
            None => {
                payload.insert("key".to_string(), Value::String(key.to_string()));
                self.store
                    .create(Collection::Settings, payload)
                    .await?
                    .decode()
            }
        }
    }

    /// Typed settings for a session.
    pub async fn load(&self, today: NaiveDate) -> StoreResult<ShopSettings> {
        Ok(ShopSettings::from_map(&self.all().await?, today))
    }

    /// Current value of the invoice counter; 0 when unset.
    pub async fn invoice_counter(&self) -> StoreResult<u64> {
        match self
            .store
            .first(Collection::Settings, Filter::eq("key", INVOICE_COUNTER_KEY), "")
            .await?
        {
            Some(record) => counter_value(&record),
            None => Ok(0),
        }
    }

    /// Reserves the next invoice counter in one store call.
    pub async fn reserve_invoice_counter(&self) -> StoreResult<u64> {
        let counter = self.store.increment_counter(INVOICE_COUNTER_KEY).await?;
        info!(counter, "Invoice counter reserved");
        Ok(counter)
    }

    /// Persists `counter` as the last issued number. Used by two-phase
    /// allocation after the invoice row exists.
    pub async fn advance_invoice_counter(&self, counter: u64) -> StoreResult<()> {
        self.set(INVOICE_COUNTER_KEY, &counter.to_string(), Some("invoice"))
            .await?;
        info!(counter, "Invoice counter advanced");
        Ok(())
    }

    /// Creates any missing default settings. Existing values are kept.
    /// Returns the number of settings created.
    pub async fn seed_defaults(&self) -> StoreResult<usize> {
        let existing = self.all().await?;
        let mut created = 0;
        for (key, value, category) in DEFAULT_SETTINGS {
            if existing.contains_key(*key) {
                continue;
            }
            self.set(key, value, Some(category)).await?;
            created += 1;
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shop_settings_defaults() {
        let settings = ShopSettings::from_map(&HashMap::new(), date(2026, 2, 10));
        assert_eq!(settings.sequence.prefix, "GST");
        assert_eq!(settings.sequence.financial_year, "2025/26");
        assert_eq!(settings.sequence.counter, 0);
        assert_eq!(settings.default_cgst, TaxRate::DEFAULT_COMPONENT);
        assert_eq!(settings.default_state, "Madhya Pradesh");
        assert_eq!(settings.upi_id, None);
    }

    #[test]
    fn test_shop_settings_parsing() {
        let map: HashMap<String, String> = [
            ("invoice_prefix", "INV"),
            ("invoice_counter", "41"),
            ("financial_year", "2026/27"),
            ("default_cgst", "6"),
            ("default_sgst", "0"),
            ("upi_id", "shop@upi"),
            ("shop_name", "-"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = ShopSettings::from_map(&map, date(2026, 5, 1));
        assert_eq!(settings.sequence.candidate().to_string(), "INV-0042-2026/27");
        assert_eq!(settings.default_cgst, TaxRate::from_bps(600));
        // Zero falls back to the default component rate
        assert_eq!(settings.default_sgst, TaxRate::DEFAULT_COMPONENT);
        assert_eq!(settings.upi_id.as_deref(), Some("shop@upi"));
        assert_eq!(settings.shop_name, None);
    }

    #[tokio::test]
    async fn test_set_get_and_seed() {
        let repo = SettingsRepository::new(Arc::new(MemoryStore::new()));
        repo.set("invoice_prefix", "INV", Some("invoice")).await.unwrap();

        let created = repo.seed_defaults().await.unwrap();
        assert_eq!(created, DEFAULT_SETTINGS.len() - 1);
        assert_eq!(repo.seed_defaults().await.unwrap(), 0);

        let all = repo.all().await.unwrap();
        assert_eq!(all.get("invoice_prefix").map(String::as_str), Some("INV"));
        assert_eq!(all.get("default_cgst").map(String::as_str), Some("2.5"));

        let updated = repo.set("invoice_prefix", "GST", None).await.unwrap();
        assert_eq!(updated.value, "GST");
        assert_eq!(updated.category.as_deref(), Some("invoice"));
    }

    #[tokio::test]
    async fn test_counter_modes() {
        let repo = SettingsRepository::new(Arc::new(MemoryStore::new()));
        assert_eq!(repo.invoice_counter().await.unwrap(), 0);

        repo.advance_invoice_counter(7).await.unwrap();
        assert_eq!(repo.invoice_counter().await.unwrap(), 7);

        assert_eq!(repo.reserve_invoice_counter().await.unwrap(), 8);
        assert_eq!(repo.reserve_invoice_counter().await.unwrap(), 9);
        assert_eq!(repo.invoice_counter().await.unwrap(), 9);
    }
}
