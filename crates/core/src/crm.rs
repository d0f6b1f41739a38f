//! Static mock CRM directory: orders and customers keyed by id.
//!
//! Pure lookup, no mutation. The bundled records back the sample threads; a
//! deployment can point `crm.orders_path` / `crm.customers_path` at its own
//! JSON files instead.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub status: String,
    pub policy: String,
    pub stock_available: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
}

/// The slice of CRM context embedded into a draft's structured fields. Only
/// fields actually present in the directory appear; nothing is fabricated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmSnapshot {
    pub policy: Option<String>,
    pub order_status: Option<String>,
    pub stock_available: Option<bool>,
    pub customer: Option<CustomerSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub customer_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum CrmLoadError {
    #[error("could not read CRM fixture `{path}`: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("could not parse CRM fixture `{path}`: {source}")]
    Parse { path: String, source: serde_json::Error },
}

#[derive(Clone, Debug, Default)]
pub struct CrmDirectory {
    orders: HashMap<String, Order>,
    customers: HashMap<String, Customer>,
}

impl CrmDirectory {
    pub fn new(orders: Vec<Order>, customers: Vec<Customer>) -> Self {
        Self {
            orders: orders.into_iter().map(|o| (o.order_id.clone(), o)).collect(),
            customers: customers.into_iter().map(|c| (c.customer_id.clone(), c)).collect(),
        }
    }

    /// The canonical mock records shipped with the service. These back the
    /// bundled sample threads.
    pub fn bundled() -> Self {
        let orders = vec![
            Order {
                order_id: "ORD-71023".to_string(),
                customer_id: "CUST-2201".to_string(),
                status: "Delivered".to_string(),
                policy: "30-day returns, photos required for damage claims".to_string(),
                stock_available: Some(true),
            },
            Order {
                order_id: "ORD-71547".to_string(),
                customer_id: "CUST-2278".to_string(),
                status: "In transit".to_string(),
                policy: "Free reshipment on carrier loss".to_string(),
                stock_available: None,
            },
            Order {
                order_id: "ORD-72011".to_string(),
                customer_id: "CUST-2304".to_string(),
                status: "Delivered".to_string(),
                policy: "Exchanges within 45 days".to_string(),
                stock_available: Some(false),
            },
        ];
        let customers = vec![
            Customer {
                customer_id: "CUST-2201".to_string(),
                name: "Priya Raman".to_string(),
                email: "priya.raman@example.com".to_string(),
            },
            Customer {
                customer_id: "CUST-2278".to_string(),
                name: "Daniel Okafor".to_string(),
                email: "d.okafor@example.com".to_string(),
            },
            Customer {
                customer_id: "CUST-2304".to_string(),
                name: "Mei-Ling Chou".to_string(),
                email: "meiling.chou@example.com".to_string(),
            },
        ];
        Self::new(orders, customers)
    }

    pub fn from_json_files(
        orders_path: &Path,
        customers_path: &Path,
    ) -> Result<Self, CrmLoadError> {
        let orders: Vec<Order> = load_json(orders_path)?;
        let customers: Vec<Customer> = load_json(customers_path)?;
        Ok(Self::new(orders, customers))
    }

    pub fn get_order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn get_customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.get(customer_id)
    }

    /// Builds the snapshot embedded into draft fields for a given order id.
    /// Empty order ids and unknown orders both yield an empty snapshot.
    pub fn snapshot_for(&self, order_id: &str) -> CrmSnapshot {
        let Some(order) = (!order_id.is_empty()).then(|| self.get_order(order_id)).flatten() else {
            return CrmSnapshot::default();
        };

        let customer = self.get_customer(&order.customer_id).map(|c| CustomerSnapshot {
            customer_id: c.customer_id.clone(),
            name: c.name.clone(),
            email: c.email.clone(),
        });

        CrmSnapshot {
            policy: Some(order.policy.clone()),
            order_status: Some(order.status.clone()),
            stock_available: order.stock_available,
            customer,
        }
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CrmLoadError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CrmLoadError::Read { path: path.display().to_string(), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| CrmLoadError::Parse { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::CrmDirectory;

    #[test]
    fn snapshot_joins_order_and_customer() {
        let directory = CrmDirectory::bundled();
        let snapshot = directory.snapshot_for("ORD-71023");

        assert_eq!(snapshot.order_status.as_deref(), Some("Delivered"));
        assert_eq!(snapshot.stock_available, Some(true));
        let customer = snapshot.customer.expect("customer should resolve");
        assert_eq!(customer.customer_id, "CUST-2201");
        assert_eq!(customer.name, "Priya Raman");
    }

    #[test]
    fn unknown_or_empty_order_yields_empty_snapshot() {
        let directory = CrmDirectory::bundled();

        assert_eq!(directory.snapshot_for("ORD-00000"), Default::default());
        assert_eq!(directory.snapshot_for(""), Default::default());
    }

    #[test]
    fn loads_directory_from_json_files() {
        let dir = TempDir::new().expect("tempdir");
        let orders = dir.path().join("orders.json");
        let customers = dir.path().join("customers.json");
        fs::write(
            &orders,
            r#"[{"order_id": "ORD-1", "customer_id": "CUST-1", "status": "Delivered", "policy": "none", "stock_available": null}]"#,
        )
        .expect("write orders");
        fs::write(
            &customers,
            r#"[{"customer_id": "CUST-1", "name": "Ada", "email": "ada@example.com"}]"#,
        )
        .expect("write customers");

        let directory =
            CrmDirectory::from_json_files(&orders, &customers).expect("load fixtures");
        assert!(directory.get_order("ORD-1").is_some());
        assert_eq!(directory.snapshot_for("ORD-1").customer.expect("customer").name, "Ada");
    }
}
