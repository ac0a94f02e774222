pub mod core;
pub mod imports;
pub mod items;
pub mod lists;
pub mod rbac;
pub mod references;
pub mod session;
pub mod setup;
pub mod translations;
