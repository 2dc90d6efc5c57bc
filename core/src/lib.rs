pub mod binder;
pub mod db;
pub mod decode;
pub mod merge;
pub mod models;
pub mod rotation;
pub mod service;
pub mod timeline;
