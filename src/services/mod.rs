pub mod chat_api_http;
pub mod formatter;
pub mod presenter;
pub mod session;
pub mod store;
pub mod topics;
