pub mod billing_provider;
pub mod image_editor;
pub mod object_storage;
