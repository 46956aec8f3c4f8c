pub mod credits;
pub mod gallery_item;
pub mod plan;
pub mod profile;
pub mod style;
pub mod subscription;
