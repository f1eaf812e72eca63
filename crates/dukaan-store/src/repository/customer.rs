//! Customer repository. Customers are keyed by mobile number.

use tracing::debug;

use dukaan_core::Customer;

use crate::error::StoreResult;
use crate::record::{encode, Collection, Filter, ListQuery, ListResult};
use crate::store::SharedStore;

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    store: SharedStore,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(store: SharedStore) -> Self {
        CustomerRepository { store }
    }

    pub async fn get(&self, id: &str) -> StoreResult<Customer> {
        self.store.get(Collection::Customers, id).await?.decode()
    }

    /// Finds a customer by an already-normalized mobile number.
    pub async fn find_by_mobile(&self, mobile: &str) -> StoreResult<Option<Customer>> {
        self.store
            .first(Collection::Customers, Filter::eq("mobile", mobile), "")
            .await?
            .map(|r| r.decode())
            .transpose()
    }

    pub async fn create(&self, customer: &Customer) -> StoreResult<Customer> {
        debug!(mobile = %customer.mobile, "Creating customer");
        self.store
            .create(Collection::Customers, encode(customer)?)
            .await?
            .decode()
    }

    pub async fn update(&self, customer: &Customer) -> StoreResult<Customer> {
        debug!(id = %customer.id, "Updating customer");
        self.store
            .update(Collection::Customers, &customer.id, encode(customer)?)
            .await?
            .decode()
    }

    /// Searches name and mobile, sorted by name.
    pub async fn search(&self, query: &str, page: u32, per_page: u32) -> StoreResult<ListResult<Customer>> {
        let query = query.trim();
        let filter = if query.is_empty() {
            Filter::All
        } else {
            Filter::any_of(vec![
                Filter::contains("name", query),
                Filter::contains("mobile", query),
            ])
        };
        let list = ListQuery::new(filter).sort("name").page(page, per_page);
        self.store
            .list(Collection::Customers, &list)
            .await?
            .try_map(|r| r.decode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    fn customer(name: &str, mobile: &str) -> Customer {
        Customer {
            id: String::new(),
            name: name.to_string(),
            mobile: mobile.to_string(),
            email: None,
            address: None,
            city: None,
            state: Some("Madhya Pradesh".to_string()),
            gstin: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_mobile() {
        let repo = CustomerRepository::new(Arc::new(MemoryStore::new()));
        let created = repo.create(&customer("Asha", "9876543210")).await.unwrap();

        let found = repo.find_by_mobile("9876543210").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.find_by_mobile("9999999999").await.unwrap().is_none());

        let err = repo.create(&customer("Other", "9876543210")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_update_and_search() {
        let repo = CustomerRepository::new(Arc::new(MemoryStore::new()));
        let mut asha = repo.create(&customer("Asha", "9876543210")).await.unwrap();
        repo.create(&customer("Bela", "9123456780")).await.unwrap();

        asha.city = Some("Indore".to_string());
        let updated = repo.update(&asha).await.unwrap();
        assert_eq!(updated.city.as_deref(), Some("Indore"));

        let hits = repo.search("9123", 1, 10).await.unwrap();
        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].name, "Bela");

        let all = repo.search("", 1, 10).await.unwrap();
        let names: Vec<&str> = all.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Bela"]);
    }
}
