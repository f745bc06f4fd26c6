//! Delivery core: channel providers, the notification/attempt store and the
//! fallback orchestrator that drives them.

pub mod orchestrator;
pub mod providers;
pub mod store;
