pub mod alert;
pub mod instrument;
pub mod portfolio;
pub mod quote;
pub mod session;
pub mod settings;
