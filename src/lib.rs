pub mod api;
pub mod config;
pub mod currency;
pub mod data_models;
pub mod db;
pub mod domains;
pub mod error;
pub mod normalizer;
pub mod offers;
pub mod pipeline;
pub mod provider;
pub mod search_log;
pub mod validator;
