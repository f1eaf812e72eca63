//! # Session State
//!
//! Separate state types rather than one `AppState`: each service takes
//! only what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   Database   │  │    CartState     │  │  SettingsCache   │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  record      │  │  Arc<Mutex<      │  │  Arc<RwLock<     │          │
//! │  │  store       │  │    Cart>>        │  │    ShopSettings  │          │
//! │  │  handle      │  │  + snapshot file │  │  >>              │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: backends are Send + Sync                                  │
//! │  • CartState: std Mutex, never held across an await                    │
//! │  • SettingsCache: tokio RwLock, held across the load                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod settings;

pub use cart::CartState;
pub use settings::SettingsCache;
