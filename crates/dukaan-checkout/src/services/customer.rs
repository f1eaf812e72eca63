//! # Customer Resolution
//!
//! Turns what the cashier typed on the customer step into a customer
//! record id for the invoice header.
//!
//! ```text
//! mobile has ≥10 digits and is not 0000000000?
//!   ├── yes ─► find by mobile ─► found ─────────────────► use it
//!   │                         └► not found ─► create ───► use it
//!   │                                          └ duplicate ─► re-read
//!   └── no ──► customer bound to the cart? ─► use it
//!                                         └► walk-in customer
//! ```

use tracing::{debug, info, warn};

use dukaan_core::validation::{is_registrable_mobile, normalize_mobile};
use dukaan_core::{Cart, Customer, DEFAULT_CUSTOMER_NAME, WALK_IN_MOBILE};
use dukaan_store::{Database, ListResult, StoreError};

use crate::error::CheckoutResult;

/// Name given to the shared walk-in record when it has to be created.
pub const WALK_IN_NAME: &str = "Walk-in Customer";

#[derive(Debug, Clone)]
pub struct CustomerService {
    db: Database,
}

impl CustomerService {
    pub fn new(db: Database) -> Self {
        CustomerService { db }
    }

    /// Customer the cart's invoice should be billed to.
    ///
    /// New customers get `default_state`.
    pub async fn resolve(&self, cart: &Cart, default_state: &str) -> CheckoutResult<Customer> {
        if is_registrable_mobile(&cart.customer_mobile) {
            let mobile = normalize_mobile(&cart.customer_mobile);
            if let Some(existing) = self.db.customers().find_by_mobile(&mobile).await? {
                debug!(mobile = %mobile, id = %existing.id, "Customer found by mobile");
                return Ok(existing);
            }
            let name = match cart.customer_name.trim() {
                "" => DEFAULT_CUSTOMER_NAME,
                name => name,
            };
            return self.create_or_reread(name, &mobile, default_state).await;
        }

        if let Some(bound) = &cart.customer {
            return Ok(bound.clone());
        }

        self.walk_in(default_state).await
    }

    /// The shared walk-in customer, created on first use.
    pub async fn walk_in(&self, default_state: &str) -> CheckoutResult<Customer> {
        match self.db.customers().find_by_mobile(WALK_IN_MOBILE).await? {
            Some(customer) => Ok(customer),
            None => {
                self.create_or_reread(WALK_IN_NAME, WALK_IN_MOBILE, default_state)
                    .await
            }
        }
    }

    /// Looks up a typed mobile number for the customer step.
    pub async fn lookup(&self, mobile: &str) -> CheckoutResult<Option<Customer>> {
        let mobile = normalize_mobile(mobile);
        if mobile.is_empty() {
            return Ok(None);
        }
        Ok(self.db.customers().find_by_mobile(&mobile).await?)
    }

    pub async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> CheckoutResult<ListResult<Customer>> {
        Ok(self.db.customers().search(query, page, per_page).await?)
    }

    async fn create_or_reread(
        &self,
        name: &str,
        mobile: &str,
        state: &str,
    ) -> CheckoutResult<Customer> {
        let customer = Customer {
            id: String::new(),
            name: name.to_string(),
            mobile: mobile.to_string(),
            email: None,
            address: None,
            city: None,
            state: Some(state.to_string()),
            gstin: None,
            notes: None,
        };

        match self.db.customers().create(&customer).await {
            Ok(created) => {
                info!(id = %created.id, mobile = %mobile, "Customer created at checkout");
                Ok(created)
            }
            Err(e) if e.is_unique_violation() => {
                // Another terminal registered the same mobile first
                warn!(mobile = %mobile, "Customer mobile taken, using existing record");
                self.db
                    .customers()
                    .find_by_mobile(mobile)
                    .await?
                    .ok_or_else(|| StoreError::not_found("customers", mobile).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dukaan_core::DEFAULT_CUSTOMER_STATE;

    fn cart_with(mobile: &str, name: &str) -> Cart {
        let mut cart = Cart::new();
        cart.customer_mobile = mobile.to_string();
        cart.customer_name = name.to_string();
        cart
    }

    #[tokio::test]
    async fn test_new_mobile_creates_customer() {
        let service = CustomerService::new(Database::memory());
        let customer = service
            .resolve(&cart_with("+91 98765 43210", ""), DEFAULT_CUSTOMER_STATE)
            .await
            .unwrap();
        assert_eq!(customer.mobile, "9876543210");
        assert_eq!(customer.name, "Customer");
        assert_eq!(customer.state.as_deref(), Some("Madhya Pradesh"));

        // Second bill for the same mobile reuses the record
        let again = service
            .resolve(&cart_with("9876543210", "Asha"), DEFAULT_CUSTOMER_STATE)
            .await
            .unwrap();
        assert_eq!(again.id, customer.id);
        assert_eq!(again.name, "Customer");
    }

    #[tokio::test]
    async fn test_short_mobile_uses_bound_customer() {
        let db = Database::memory();
        let service = CustomerService::new(db.clone());
        let bound = service
            .resolve(&cart_with("9000000001", "Meena"), "Gujarat")
            .await
            .unwrap();

        let mut cart = cart_with("12345", "");
        cart.customer = Some(bound.clone());
        let resolved = service.resolve(&cart, "Gujarat").await.unwrap();
        assert_eq!(resolved, bound);
    }

    #[tokio::test]
    async fn test_walk_in_fallback() {
        let service = CustomerService::new(Database::memory());
        let first = service
            .resolve(&cart_with(WALK_IN_MOBILE, "Someone"), DEFAULT_CUSTOMER_STATE)
            .await
            .unwrap();
        assert!(first.is_walk_in());
        assert_eq!(first.name, WALK_IN_NAME);

        let second = service
            .resolve(&Cart::new(), DEFAULT_CUSTOMER_STATE)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_lookup() {
        let service = CustomerService::new(Database::memory());
        assert!(service.lookup("").await.unwrap().is_none());
        service
            .resolve(&cart_with("9876543210", "Asha"), DEFAULT_CUSTOMER_STATE)
            .await
            .unwrap();
        let found = service.lookup("98765-43210").await.unwrap();
        assert_eq!(found.map(|c| c.name), Some("Asha".to_string()));
        assert_eq!(service.search("Asha", 1, 10).await.unwrap().total_items, 1);
    }
}
