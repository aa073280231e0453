// QSAN appliance scraping and Zabbix output rendering.
//
// The binary in main.rs is a thin driver over this library; keeping the
// logic here lets the integration tests run the same code path against a
// mock console.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod repo;
pub mod scrape;

pub use config::{Config, Generation, GenerationMode, Method};
pub use error::{AdapterError, Result};
pub use scrape::Appliance;
