pub mod guard;
pub mod navigation;
pub mod session;
