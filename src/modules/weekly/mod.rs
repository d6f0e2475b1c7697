pub mod controller;
pub mod merge;
pub mod model;
pub mod router;
pub mod service;
