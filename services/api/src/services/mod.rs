//! External service adapters: AI, medication registry, payments, storage, email

pub mod ai;
pub mod email;
pub mod payment;
pub mod registry;
pub mod storage;

pub use ai::AiClient;
pub use email::EmailService;
pub use payment::PaymentClient;
pub use registry::RegistryClient;
pub use storage::StorageService;
