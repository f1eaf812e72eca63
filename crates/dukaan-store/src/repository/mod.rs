//! # Repository Module
//!
//! Typed access to the record store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Typed Boundary                                       │
//! │                                                                         │
//! │  Checkout service                                                      │
//! │       │  store.products().find_by_code("QA-7001")                      │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── builds Filter / ListQuery                                         │
//! │  ├── encode(&Product)   → JSON payload (id stripped)                   │
//! │  └── record.decode()    → Product (id filled in)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Arc<dyn RecordStore>  (MemoryStore | SqliteStore)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No repository hands raw JSON to its caller: every payload is decoded
//! into a `dukaan-core` type at this boundary.

pub mod customer;
pub mod invoice;
pub mod product;
pub mod settings;
pub mod stock;
pub mod supplier;
