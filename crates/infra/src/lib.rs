//! Infrastructure layer: identity stores, password hashing, email delivery,
//! role seeding and database wiring.

pub mod db;
pub mod email;
pub mod password;
pub mod seed;
pub mod store;

pub use email::{ConsoleEmailSender, InMemoryEmailSender};
pub use password::{Argon2PasswordHasher, PasswordCost};
pub use seed::{SeedReport, default_role_grants, seed_roles};
pub use store::in_memory::InMemoryIdentityStore;
pub use store::postgres::PostgresIdentityStore;
