pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod routes;
pub mod session;
pub mod store;

pub use config::Config;
pub use dispatch::{Dispatcher, HttpTransport, Method, RequestForm, ResponseRecord};
pub use session::{SessionState, Workbench};
pub use store::PrefsStore;
