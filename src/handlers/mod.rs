pub mod health;
pub mod list;
pub mod get;
pub mod create;
pub mod put;
pub mod patch;
pub mod delete;

#[cfg(test)]
pub(crate) mod test_support;

pub use health::health_handler;
pub use list::list_handler;
pub use get::get_handler;
pub use create::create_handler;
pub use put::put_handler;
pub use patch::patch_handler;
pub use delete::delete_handler;
