pub mod auth;
pub mod cnpj;
pub mod dashboard;
pub mod users;
