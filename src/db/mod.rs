pub mod db;
pub mod memorydb;
pub mod offerdb;
pub mod store;

pub use db::DBClient;
pub use memorydb::MemoryStore;
pub use store::{MarketStore, StoreTx};
