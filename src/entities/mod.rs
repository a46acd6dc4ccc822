pub mod alert;

pub use alert::Entity as Alert;
