pub mod billing;
pub mod credits;
pub mod gallery;
pub mod generate;
pub mod profile;
pub mod referral;
