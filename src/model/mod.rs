pub mod application;
pub mod job;
pub mod legal;
pub mod login_device;
pub mod notification;
pub mod user;
