pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod platform;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Brand, BrandPartnership, Conversion, CreditPosting, CreditTransaction, Customer, EventTopic,
    Money, OrderEvent, SampleHistory, Store, TimeMs, WholesaleOrder, WholesaleStatus,
};
pub use error::AppError;
