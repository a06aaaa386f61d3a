#![allow(dead_code)]

use std::sync::Arc;

use purser::{
    Entity, EntityMeta, MemoryEngine, PersistenceError, Record, Relation, UnitOfWork, Value,
};

/// Totals of the seeded OPEN orders; exactly one sits below the 100 mark.
pub const OPEN_TOTALS: [f64; 12] = [
    50.0, 100.0, 150.0, 200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0, 550.0, 600.0,
];

pub const CLOSED_TOTALS: [f64; 3] = [120.0, 480.0, 999.0];

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub status: String,
    pub total: f64,
    pub customer_id: Option<i64>,
    pub memo: Option<String>,
}

impl Order {
    pub fn new(status: &str, total: f64) -> Self {
        Self {
            id: None,
            status: status.to_owned(),
            total,
            customer_id: None,
            memo: None,
        }
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = Some(memo.to_owned());
        self
    }
}

impl Entity for Order {
    fn meta() -> EntityMeta {
        EntityMeta::new("orders", "id")
    }

    fn key(&self) -> Value {
        self.id.into()
    }

    fn relations() -> Vec<Relation> {
        vec![Relation {
            name: "customer",
            target: "customers",
            owner_column: "customer_id",
            target_column: "id",
        }]
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("status", self.status.clone())
            .with("total", self.total)
            .with("customer_id", self.customer_id)
            .with("memo", self.memo.clone())
    }

    fn from_record(record: &Record) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: record.try_get("id")?,
            status: record.try_get("status")?,
            total: record.try_get("total")?,
            customer_id: record.try_get("customer_id")?,
            memo: record.try_get("memo")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub city: String,
}

impl Customer {
    pub fn new(name: &str, city: &str) -> Self {
        Self {
            id: None,
            name: name.to_owned(),
            city: city.to_owned(),
        }
    }
}

impl Entity for Customer {
    fn meta() -> EntityMeta {
        EntityMeta::new("customers", "id")
    }

    fn key(&self) -> Value {
        self.id.into()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.clone())
            .with("city", self.city.clone())
    }

    fn from_record(record: &Record) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: record.try_get("id")?,
            name: record.try_get("name")?,
            city: record.try_get("city")?,
        })
    }
}

pub fn engine() -> Arc<MemoryEngine> {
    Arc::new(MemoryEngine::new())
}

pub fn open_uow(engine: &Arc<MemoryEngine>) -> UnitOfWork {
    let mut uow = UnitOfWork::new(engine.clone());
    uow.open().expect("open session");
    uow
}

/// Fifteen orders: twelve OPEN (one under 100), three CLOSED.
pub fn seed_order_book(uow: &UnitOfWork) -> Vec<Order> {
    let mut created = Vec::new();
    for total in OPEN_TOTALS {
        created.push(uow.create(&Order::new("OPEN", total)).expect("seed order"));
    }
    for total in CLOSED_TOTALS {
        created.push(uow.create(&Order::new("CLOSED", total)).expect("seed order"));
    }
    created
}

/// Two customers with one order each, plus one order without a customer.
/// Returns the customer keys in insertion order.
pub fn seed_customer_orders(uow: &UnitOfWork) -> (i64, i64) {
    let acme = uow
        .create(&Customer::new("ACME", "Oslo"))
        .expect("seed customer");
    let globex = uow
        .create(&Customer::new("Globex", "Berlin"))
        .expect("seed customer");
    let (acme_id, globex_id) = (
        acme.id.expect("assigned key"),
        globex.id.expect("assigned key"),
    );

    uow.create(&Order::new("OPEN", 75.0).for_customer(acme_id))
        .expect("seed order");
    uow.create(&Order::new("OPEN", 220.0).for_customer(globex_id))
        .expect("seed order");
    uow.create(&Order::new("OPEN", 10.0)).expect("seed order");

    (acme_id, globex_id)
}
